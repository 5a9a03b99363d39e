//! Unique key indexes over stored records.
//!
//! One map per declared [`KeyGroup`], from the group's raw value tuple to the position of
//! the stored record that claimed it. Records are referenced by position in the owning
//! generator's record list, which only ever grows.

use crate::table::{KeyGroup, TableSpec};
use crate::value::{Record, Value};
use std::collections::HashMap;

/// Value tuple of one key group, unescaped, with defaults applied.
pub type KeyTuple = Vec<Value>;

/// Per-group lookup from key tuple to stored record position.
#[derive(Debug, Clone)]
pub struct UniqueIndex {
    groups: Vec<KeyGroup>,
    maps: Vec<HashMap<KeyTuple, usize>>,
}

/// Result of checking a record against every group.
#[derive(Debug)]
pub(crate) struct KeyLookup {
    /// One tuple per group, in declaration order.
    pub(crate) keys: Vec<KeyTuple>,
    /// `(group index, record position)` for every group that already holds the tuple.
    pub(crate) hits: Vec<(usize, usize)>,
}

impl KeyLookup {
    pub(crate) fn is_duplicate(&self) -> bool {
        !self.hits.is_empty()
    }
}

impl UniqueIndex {
    /// Empty index over the table's unique groups.
    pub fn new(spec: &TableSpec) -> Self {
        let groups = spec.unique().to_vec();
        let maps = groups.iter().map(|_| HashMap::new()).collect();
        Self { groups, maps }
    }

    /// Indexed key groups, in declaration order.
    pub fn groups(&self) -> &[KeyGroup] {
        &self.groups
    }

    /// Index of the group declared as exactly `fields`.
    pub fn group_position<S: AsRef<str>>(&self, fields: &[S]) -> Option<usize> {
        self.groups.iter().position(|g| g.matches(fields))
    }

    /// Tuple of `group`'s values for `record`.
    pub fn key_of(spec: &TableSpec, group: &KeyGroup, record: &Record) -> KeyTuple {
        group
            .fields()
            .iter()
            .map(|field| spec.resolve(record, field).clone())
            .collect()
    }

    pub(crate) fn lookup(&self, spec: &TableSpec, record: &Record) -> KeyLookup {
        let mut keys = Vec::with_capacity(self.groups.len());
        let mut hits = Vec::new();
        for (i, group) in self.groups.iter().enumerate() {
            let key = Self::key_of(spec, group, record);
            if let Some(&pos) = self.maps[i].get(&key) {
                hits.push((i, pos));
            }
            keys.push(key);
        }
        KeyLookup { keys, hits }
    }

    /// Register a stored record under every group. The lookup must have found no collision.
    pub(crate) fn register(&mut self, lookup: KeyLookup, position: usize) {
        debug_assert!(!lookup.is_duplicate());
        for (map, key) in self.maps.iter_mut().zip(lookup.keys) {
            map.insert(key, position);
        }
    }

    /// Position of the record owning `key` in group `group`.
    pub fn get(&self, group: usize, key: &[Value]) -> Option<usize> {
        self.maps.get(group)?.get(key).copied()
    }
}
