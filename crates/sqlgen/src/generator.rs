//! Record collector with unique key checks.

use crate::error::{GenError, GenResult};
use crate::hook::{Collisions, DuplicateAction, DuplicateHook, SkipDuplicates};
use crate::index::UniqueIndex;
use crate::statement::{DEFAULT_MAX_BATCH_BYTES, InsertBatches, generate_batches};
use crate::table::TableSpec;
use crate::value::{Record, Value};
use std::fmt;
use std::sync::Arc;

/// What happened to a record passed to `add`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AddOutcome<'a> {
    /// The record was stored and indexed.
    Inserted(&'a Record),
    /// The record was a duplicate; this is the stored record it collided with.
    Existing(&'a Record),
    /// The record was a duplicate and was dropped.
    Skipped,
}

impl<'a> AddOutcome<'a> {
    /// Whether the record was stored.
    pub fn is_inserted(&self) -> bool {
        matches!(self, AddOutcome::Inserted(_))
    }

    /// The stored record this outcome refers to, if any.
    pub fn record(&self) -> Option<&'a Record> {
        match *self {
            AddOutcome::Inserted(r) | AddOutcome::Existing(r) => Some(r),
            AddOutcome::Skipped => None,
        }
    }
}

/// Collects records for one table, rejecting duplicates on the declared key groups.
///
/// ```ignore
/// let spec = TableSpec::builder("tag").fields(["name", "color"]).unique(["name"]).build()?;
/// let mut tags = InsertGenerator::new(spec);
/// tags.add(Record::new().with("name", "red"))?;
/// tags.add(Record::new().with("name", "red"))?; // skipped
/// for sql in tags.batches(64 * 1024) {
///     // execute sql
/// }
/// ```
pub struct InsertGenerator {
    spec: TableSpec,
    records: Vec<Record>,
    index: UniqueIndex,
    hook: Arc<dyn DuplicateHook>,
}

impl fmt::Debug for InsertGenerator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InsertGenerator")
            .field("table", &self.spec.name())
            .field("records", &self.records.len())
            .finish_non_exhaustive()
    }
}

impl InsertGenerator {
    /// Create an empty generator that skips duplicates.
    pub fn new(spec: TableSpec) -> Self {
        let index = UniqueIndex::new(&spec);
        Self {
            spec,
            records: Vec::new(),
            index,
            hook: Arc::new(SkipDuplicates),
        }
    }

    /// Set the duplicate hook.
    pub fn with_hook<H: DuplicateHook + 'static>(mut self, hook: H) -> Self {
        self.hook = Arc::new(hook);
        self
    }

    /// Set the duplicate hook from an Arc.
    pub fn with_hook_arc(mut self, hook: Arc<dyn DuplicateHook>) -> Self {
        self.hook = hook;
        self
    }

    /// Set the duplicate hook from a closure.
    pub fn on_duplicate<F>(self, f: F) -> Self
    where
        F: Fn(&Record, &Collisions<'_>) -> DuplicateAction + Send + Sync + 'static,
    {
        self.with_hook(f)
    }

    /// Table description the generator renders.
    pub fn spec(&self) -> &TableSpec {
        &self.spec
    }

    /// Stored records in insertion order.
    pub fn records(&self) -> &[Record] {
        &self.records
    }

    /// Number of stored records.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Consume the generator, keeping its stored records.
    pub fn into_records(self) -> Vec<Record> {
        self.records
    }

    /// Store `record` unless it collides with a stored record on any key group.
    ///
    /// On a collision nothing is stored and the hook decides the outcome. Only
    /// [`DuplicateAction::Fail`] turns a duplicate into an error.
    pub fn add(&mut self, record: Record) -> GenResult<AddOutcome<'_>> {
        let lookup = self.index.lookup(&self.spec, &record);

        if lookup.is_duplicate() {
            let groups = self.index.groups();
            let collisions = Collisions::new(
                lookup
                    .hits
                    .iter()
                    .map(|&(g, pos)| (&groups[g], &self.records[pos]))
                    .collect(),
            );
            let action = self.hook.on_duplicate(&record, &collisions);
            tracing::debug!(
                target: "sqlgen.generator",
                table = self.spec.name(),
                collisions = collisions.len(),
                ?action,
                "duplicate record"
            );

            let (group, pos) = lookup.hits[0];
            return match action {
                DuplicateAction::Skip => Ok(AddOutcome::Skipped),
                DuplicateAction::UseExisting => Ok(AddOutcome::Existing(&self.records[pos])),
                DuplicateAction::Fail => Err(GenError::duplicate(
                    self.spec.name(),
                    groups[group].fields(),
                )),
            };
        }

        let pos = self.records.len();
        self.index.register(lookup, pos);
        self.records.push(record);
        Ok(AddOutcome::Inserted(&self.records[pos]))
    }

    /// Look up the stored record owning `values` in the group declared as `group`.
    pub fn find_by_key<S: AsRef<str>>(
        &self,
        group: &[S],
        values: &[Value],
    ) -> GenResult<Option<&Record>> {
        let g = self
            .index
            .group_position(group)
            .ok_or_else(|| GenError::unknown_group(self.spec.name(), group))?;
        Ok(self.find_in_group(g, values))
    }

    pub(crate) fn find_in_group(&self, group: usize, values: &[Value]) -> Option<&Record> {
        self.index
            .get(group, values)
            .map(|pos| &self.records[pos])
    }

    pub(crate) fn index(&self) -> &UniqueIndex {
        &self.index
    }

    /// INSERT statements of at most `max_batch_bytes` (soft limit), produced lazily.
    pub fn batches(&self, max_batch_bytes: usize) -> InsertBatches<'_> {
        generate_batches(&self.records, &self.spec, max_batch_bytes)
    }

    /// [`InsertGenerator::batches`] with [`DEFAULT_MAX_BATCH_BYTES`].
    pub fn sql(&self) -> InsertBatches<'_> {
        self.batches(DEFAULT_MAX_BATCH_BYTES)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hook::FixedAction;
    use std::sync::Mutex;

    fn tags() -> InsertGenerator {
        let spec = TableSpec::builder("tag")
            .fields(["name", "color"])
            .default("color", "grey")
            .unique(["name"])
            .build()
            .unwrap();
        InsertGenerator::new(spec)
    }

    #[test]
    fn plain_generator_without_groups_keeps_everything() {
        let spec = TableSpec::builder("log").fields(["msg"]).build().unwrap();
        let mut g = InsertGenerator::new(spec);
        g.add(Record::new().with("msg", "a")).unwrap();
        g.add(Record::new().with("msg", "a")).unwrap();
        assert_eq!(g.len(), 2);
        assert_eq!(
            g.sql().collect::<Vec<_>>(),
            vec!["INSERT INTO `log` (`msg`) VALUES \n('a'),\n('a')"]
        );
    }

    #[test]
    fn duplicate_is_skipped_by_default() {
        let mut g = tags();
        assert!(g.add(Record::new().with("name", "red")).unwrap().is_inserted());
        let outcome = g.add(Record::new().with("name", "red").with("color", "x")).unwrap();
        assert_eq!(outcome, AddOutcome::Skipped);
        assert_eq!(g.len(), 1);
        assert_eq!(
            g.sql().collect::<Vec<_>>(),
            vec!["INSERT INTO `tag` (`name`,`color`) VALUES \n('red','grey')"]
        );
    }

    #[test]
    fn use_existing_returns_stored_record() {
        let mut g = tags().with_hook(FixedAction(DuplicateAction::UseExisting));
        g.add(Record::new().with("name", "red").with("color", "r")).unwrap();
        let outcome = g.add(Record::new().with("name", "red")).unwrap();
        let existing = outcome.record().unwrap();
        assert_eq!(existing.get("color"), Some(&Value::from("r")));
        assert!(!outcome.is_inserted());
        assert_eq!(g.len(), 1);
    }

    #[test]
    fn fail_hook_surfaces_error() {
        let mut g = tags().with_hook(FixedAction(DuplicateAction::Fail));
        g.add(Record::new().with("name", "red")).unwrap();
        let err = g.add(Record::new().with("name", "red")).unwrap_err();
        assert!(err.is_duplicate());
        assert_eq!(g.len(), 1);
    }

    #[test]
    fn hook_sees_incoming_and_collisions() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = seen.clone();
        let mut g = tags().on_duplicate(move |incoming, collisions| {
            let existing = collisions.get(&["name"]).unwrap();
            sink.lock().unwrap().push((
                incoming.get("color").cloned(),
                existing.get("color").cloned(),
            ));
            DuplicateAction::Skip
        });
        g.add(Record::new().with("name", "red").with("color", "a")).unwrap();
        g.add(Record::new().with("name", "red").with("color", "b")).unwrap();
        assert_eq!(
            *seen.lock().unwrap(),
            vec![(Some(Value::from("b")), Some(Value::from("a")))]
        );
    }

    #[test]
    fn find_by_key_requires_declared_group() {
        let mut g = tags();
        g.add(Record::new().with("name", "red")).unwrap();
        let found = g.find_by_key(&["name"], &[Value::from("red")]).unwrap();
        assert!(found.is_some());
        assert!(g.find_by_key(&["name"], &[Value::from("blue")]).unwrap().is_none());

        let err = g.find_by_key(&["color"], &[Value::from("grey")]).unwrap_err();
        assert!(matches!(err, GenError::UnknownKeyGroup { .. }));
    }

    #[test]
    fn rendering_is_repeatable() {
        let mut g = tags();
        for name in ["a", "b", "c"] {
            g.add(Record::new().with("name", name)).unwrap();
        }
        let first: Vec<_> = g.batches(60).collect();
        let second: Vec<_> = g.batches(60).collect();
        assert!(first.len() > 1);
        assert_eq!(first, second);
    }
}
