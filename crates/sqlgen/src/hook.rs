//! Duplicate resolution.
//!
//! When an incoming record collides with a stored one on any unique key group, the
//! generator hands both to a [`DuplicateHook`] and acts on the returned
//! [`DuplicateAction`]. The hook only sees shared references, so it cannot touch the
//! index while the generator is deciding.
//!
//! # Example
//! ```ignore
//! use sqlgen::{DuplicateAction, InsertGenerator};
//!
//! let generator = InsertGenerator::new(spec)
//!     .with_hook(|incoming: &Record, collisions: &Collisions<'_>| {
//!         eprintln!("duplicate {incoming:?} on {} key(s)", collisions.len());
//!         DuplicateAction::UseExisting
//!     });
//! ```

use crate::table::KeyGroup;
use crate::value::Record;

/// What to do with a record that collides with a stored one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DuplicateAction {
    /// Drop the incoming record.
    #[default]
    Skip,
    /// Drop the incoming record and hand back the stored record that owns the first
    /// colliding key group.
    UseExisting,
    /// Drop the incoming record and return [`crate::GenError::Duplicate`].
    Fail,
}

/// Stored records that collide with an incoming one, in key group declaration order.
#[derive(Debug, Clone)]
pub struct Collisions<'a> {
    entries: Vec<(&'a KeyGroup, &'a Record)>,
}

impl<'a> Collisions<'a> {
    pub(crate) fn new(entries: Vec<(&'a KeyGroup, &'a Record)>) -> Self {
        Self { entries }
    }

    /// Number of groups that collided.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// The first colliding group and its owner.
    pub fn first(&self) -> Option<(&'a KeyGroup, &'a Record)> {
        self.entries.first().copied()
    }

    /// Owner of the group declared as exactly `fields`, if that group collided.
    pub fn get<S: AsRef<str>>(&self, fields: &[S]) -> Option<&'a Record> {
        self.entries
            .iter()
            .find(|(group, _)| group.matches(fields))
            .map(|(_, record)| *record)
    }

    /// Every colliding group with its owner, in declaration order.
    pub fn iter(&self) -> impl Iterator<Item = (&'a KeyGroup, &'a Record)> + '_ {
        self.entries.iter().copied()
    }
}

/// Strategy invoked for every rejected duplicate.
pub trait DuplicateHook: Send + Sync {
    fn on_duplicate(&self, incoming: &Record, collisions: &Collisions<'_>) -> DuplicateAction;
}

impl<F> DuplicateHook for F
where
    F: Fn(&Record, &Collisions<'_>) -> DuplicateAction + Send + Sync,
{
    fn on_duplicate(&self, incoming: &Record, collisions: &Collisions<'_>) -> DuplicateAction {
        self(incoming, collisions)
    }
}

/// Default hook: silently drop duplicates.
#[derive(Debug, Clone, Copy, Default)]
pub struct SkipDuplicates;

impl DuplicateHook for SkipDuplicates {
    fn on_duplicate(&self, _incoming: &Record, _collisions: &Collisions<'_>) -> DuplicateAction {
        DuplicateAction::Skip
    }
}

/// Hook that always answers with the same action.
#[derive(Debug, Clone, Copy)]
pub struct FixedAction(pub DuplicateAction);

impl DuplicateHook for FixedAction {
    fn on_duplicate(&self, _incoming: &Record, _collisions: &Collisions<'_>) -> DuplicateAction {
        self.0
    }
}
