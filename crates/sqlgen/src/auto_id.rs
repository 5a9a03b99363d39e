//! Surrogate primary keys for records that omit one.
//!
//! [`AutoIdGenerator`] hands out ids from a counter, emulating the table's
//! AUTO_INCREMENT, so child rows can reference parents before anything is inserted.
//! When a record that received a generated id is rejected as a duplicate, the counter
//! is moved back by one so the ids that do get stored stay contiguous.
//!
//! The rollback assumes one writer adding records strictly one after another.

use crate::error::{GenError, GenResult};
use crate::generator::{AddOutcome, InsertGenerator};
use crate::hook::{Collisions, DuplicateAction, DuplicateHook};
use crate::statement::InsertBatches;
use crate::table::TableSpec;
use crate::value::{Record, Value};
use std::sync::Arc;

/// An [`InsertGenerator`] that fills in the primary key.
#[derive(Debug)]
pub struct AutoIdGenerator {
    inner: InsertGenerator,
    next_id: i64,
    pk_group: usize,
}

impl AutoIdGenerator {
    /// Create a generator whose first generated id is `next_id`.
    ///
    /// The table's primary key must be one of its fields; it is added as a single-field
    /// unique group unless already declared.
    pub fn new(spec: TableSpec, next_id: i64) -> GenResult<Self> {
        let spec = spec.with_primary_key_group()?;
        let pk = spec.primary_key().to_string();
        let inner = InsertGenerator::new(spec);
        let pk_group = inner
            .index()
            .group_position(&[pk.as_str()])
            .ok_or_else(|| GenError::unknown_group(inner.spec().name(), &[pk.as_str()]))?;
        Ok(Self {
            inner,
            next_id,
            pk_group,
        })
    }

    /// Set the duplicate hook.
    pub fn with_hook<H: DuplicateHook + 'static>(mut self, hook: H) -> Self {
        self.inner = self.inner.with_hook(hook);
        self
    }

    /// Set the duplicate hook from an Arc.
    pub fn with_hook_arc(mut self, hook: Arc<dyn DuplicateHook>) -> Self {
        self.inner = self.inner.with_hook_arc(hook);
        self
    }

    /// Set the duplicate hook from a closure.
    pub fn on_duplicate<F>(mut self, f: F) -> Self
    where
        F: Fn(&Record, &Collisions<'_>) -> DuplicateAction + Send + Sync + 'static,
    {
        self.inner = self.inner.on_duplicate(f);
        self
    }

    /// The id the next record without a primary key will get.
    pub fn next_id(&self) -> i64 {
        self.next_id
    }

    /// Table description, with the primary-key group folded in.
    pub fn spec(&self) -> &TableSpec {
        self.inner.spec()
    }

    /// Stored records in insertion order.
    pub fn records(&self) -> &[Record] {
        self.inner.records()
    }

    /// Number of stored records.
    pub fn len(&self) -> usize {
        self.inner.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }

    /// Consume the generator, keeping its stored records.
    pub fn into_records(self) -> Vec<Record> {
        self.inner.into_records()
    }

    /// Store `record`, assigning the next id if it has no primary key.
    ///
    /// A generated id is given back when the record is not stored. Fails with
    /// [`GenError::IdExhausted`] once the counter cannot move past `i64::MAX`; records
    /// carrying their own primary key are still accepted then.
    pub fn add(&mut self, mut record: Record) -> GenResult<AddOutcome<'_>> {
        let pk = self.inner.spec().primary_key();
        let auto_assigned = !record.contains(pk);
        if auto_assigned {
            let next = self
                .next_id
                .checked_add(1)
                .ok_or_else(|| GenError::IdExhausted {
                    table: self.inner.spec().name().to_string(),
                })?;
            record.set(pk, self.next_id);
            self.next_id = next;
        }

        let result = self.inner.add(record);
        if auto_assigned && !matches!(result, Ok(AddOutcome::Inserted(_))) {
            self.next_id -= 1;
            tracing::debug!(
                target: "sqlgen.generator",
                next_id = self.next_id,
                "generated id released"
            );
        }
        result
    }

    /// Stored record with primary key `pk`.
    pub fn get_by_primary_key(&self, pk: impl Into<Value>) -> Option<&Record> {
        self.inner.find_in_group(self.pk_group, &[pk.into()])
    }

    /// Look up a stored record by any declared key group.
    pub fn find_by_key<S: AsRef<str>>(
        &self,
        group: &[S],
        values: &[Value],
    ) -> GenResult<Option<&Record>> {
        self.inner.find_by_key(group, values)
    }

    /// INSERT statements of at most `max_batch_bytes` (soft limit), produced lazily.
    pub fn batches(&self, max_batch_bytes: usize) -> InsertBatches<'_> {
        self.inner.batches(max_batch_bytes)
    }

    /// [`AutoIdGenerator::batches`] with the default batch size.
    pub fn sql(&self) -> InsertBatches<'_> {
        self.inner.sql()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hook::FixedAction;

    fn parent(next_id: i64) -> AutoIdGenerator {
        let spec = TableSpec::builder("test_parent")
            .fields(["id", "name"])
            .unique(["name"])
            .build()
            .unwrap();
        AutoIdGenerator::new(spec, next_id).unwrap()
    }

    fn id_of(outcome: AddOutcome<'_>) -> Option<i64> {
        outcome.record()?.get("id")?.as_int()
    }

    #[test]
    fn assigns_sequential_ids() {
        let mut g = parent(1);
        assert_eq!(id_of(g.add(Record::new().with("name", "a")).unwrap()), Some(1));
        assert_eq!(id_of(g.add(Record::new().with("name", "b")).unwrap()), Some(2));
        assert_eq!(g.next_id(), 3);
    }

    #[test]
    fn explicit_id_does_not_move_counter() {
        let mut g = parent(10);
        g.add(Record::new().with("id", 99).with("name", "x")).unwrap();
        assert_eq!(g.next_id(), 10);
        assert!(g.get_by_primary_key(99).is_some());
    }

    #[test]
    fn duplicate_releases_generated_id() {
        let mut g = parent(1);
        g.add(Record::new().with("name", "a")).unwrap();
        assert_eq!(g.add(Record::new().with("name", "a")).unwrap(), AddOutcome::Skipped);
        assert_eq!(g.next_id(), 2);
        assert_eq!(id_of(g.add(Record::new().with("name", "b")).unwrap()), Some(2));
        assert_eq!(g.len(), 2);
    }

    #[test]
    fn explicit_duplicate_keeps_counter() {
        let mut g = parent(1);
        g.add(Record::new().with("name", "a")).unwrap();
        g.add(Record::new().with("id", 1).with("name", "other")).unwrap();
        assert_eq!(g.next_id(), 2);
        assert_eq!(g.len(), 1);
    }

    #[test]
    fn use_existing_releases_id_and_returns_owner() {
        let mut g = parent(1).with_hook(FixedAction(DuplicateAction::UseExisting));
        g.add(Record::new().with("name", "a")).unwrap();
        let outcome = g.add(Record::new().with("name", "a")).unwrap();
        assert_eq!(id_of(outcome), Some(1));
        assert_eq!(g.next_id(), 2);
    }

    #[test]
    fn fail_releases_id() {
        let mut g = parent(1).with_hook(FixedAction(DuplicateAction::Fail));
        g.add(Record::new().with("name", "a")).unwrap();
        assert!(g.add(Record::new().with("name", "a")).is_err());
        assert_eq!(g.next_id(), 2);
    }

    #[test]
    fn stored_record_has_no_bookkeeping_fields() {
        let mut g = parent(1);
        g.add(Record::new().with("name", "a")).unwrap();
        let stored = g.get_by_primary_key(1).unwrap();
        let fields: Vec<_> = stored.iter().map(|(k, _)| k).collect();
        assert_eq!(fields, vec!["name", "id"]);
    }

    #[test]
    fn exhausted_counter_is_an_error() {
        let mut g = parent(i64::MAX - 1);
        assert_eq!(
            id_of(g.add(Record::new().with("name", "a")).unwrap()),
            Some(i64::MAX - 1)
        );
        assert_eq!(g.next_id(), i64::MAX);

        let err = g.add(Record::new().with("name", "b")).unwrap_err();
        assert!(matches!(err, GenError::IdExhausted { .. }));
        assert_eq!(g.next_id(), i64::MAX);
        assert_eq!(g.len(), 1);

        g.add(Record::new().with("id", 5).with("name", "c")).unwrap();
        assert_eq!(g.len(), 2);
    }

    #[test]
    fn requires_primary_key_field() {
        let spec = TableSpec::builder("t").fields(["name"]).build().unwrap();
        let err = AutoIdGenerator::new(spec, 1).unwrap_err();
        assert!(matches!(err, GenError::MissingPrimaryKey { .. }));
    }

    #[test]
    fn custom_primary_key() {
        let spec = TableSpec::builder("t")
            .fields(["uid", "name"])
            .primary_key("uid")
            .build()
            .unwrap();
        let mut g = AutoIdGenerator::new(spec, 7).unwrap();
        g.add(Record::new().with("name", "a")).unwrap();
        assert_eq!(
            g.sql().collect::<Vec<_>>(),
            vec!["INSERT INTO `t` (`uid`,`name`) VALUES \n(7,'a')"]
        );
        assert!(g.find_by_key(&["uid"], &[Value::Int(7)]).unwrap().is_some());
    }
}
