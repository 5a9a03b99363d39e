//! Multi-row INSERT rendering.
//!
//! Output format (one batch):
//!
//! ```text
//! INSERT INTO `t` (`id`,`name`) VALUES
//! (1,'p1'),
//! (2,'p2')
//! ```
//!
//! The header line ends with `VALUES ` followed by a newline and rows are joined with
//! `,\n`. Batches are produced lazily by [`InsertBatches`].

use crate::escape::{write_escaped, write_ident};
use crate::table::TableSpec;
use crate::value::Record;
use std::iter::FusedIterator;

/// Batch size limit used when the caller does not pick one (1 MiB).
pub const DEFAULT_MAX_BATCH_BYTES: usize = 1024 * 1024;

const ROW_SEPARATOR: &str = ",\n";

/// Render the `INSERT INTO ... VALUES` header, ending in a newline.
pub fn render_header<S: AsRef<str>>(table: &str, fields: &[S]) -> String {
    let mut out = String::with_capacity(32 + fields.len() * 8);
    out.push_str("INSERT INTO ");
    write_ident(&mut out, table);
    out.push_str(" (");
    for (i, field) in fields.iter().enumerate() {
        if i > 0 {
            out.push(',');
        }
        write_ident(&mut out, field.as_ref());
    }
    out.push_str(") VALUES \n");
    out
}

/// Render one `(v1,v2,...)` tuple in the table's field order.
pub fn render_record(record: &Record, spec: &TableSpec) -> String {
    let mut out = String::new();
    write_record(&mut out, record, spec);
    out
}

fn write_record(out: &mut String, record: &Record, spec: &TableSpec) {
    out.push('(');
    for (i, field) in spec.fields().iter().enumerate() {
        if i > 0 {
            out.push(',');
        }
        write_escaped(out, spec.resolve(record, field));
    }
    out.push(')');
}

/// Lazily split `records` into INSERT statements of at most `max_batch_bytes`.
///
/// The limit is checked before each row is appended. A batch that already holds at
/// least one row is flushed when the next row would push it over the limit, so a single
/// row larger than the limit still gets a statement of its own.
pub fn generate_batches<'a>(
    records: &'a [Record],
    spec: &'a TableSpec,
    max_batch_bytes: usize,
) -> InsertBatches<'a> {
    InsertBatches {
        spec,
        records: records.iter(),
        header: render_header(spec.name(), spec.fields()),
        max_batch_bytes,
        current: String::new(),
        row: String::new(),
    }
}

/// Iterator over complete INSERT statements.
///
/// Created by [`generate_batches`] or a generator's `batches()`. Each call to
/// `generate_batches` starts again from the first record.
#[derive(Debug)]
#[must_use = "iterators are lazy and do nothing unless consumed"]
pub struct InsertBatches<'a> {
    spec: &'a TableSpec,
    records: std::slice::Iter<'a, Record>,
    header: String,
    max_batch_bytes: usize,
    current: String,
    row: String,
}

impl InsertBatches<'_> {
    /// Number of records not yet part of a returned statement.
    ///
    /// Between calls to `next` the buffer holds at most the one row that triggered the
    /// last flush.
    pub(crate) fn pending_records(&self) -> usize {
        self.records.len() + usize::from(!self.current.is_empty())
    }
}

impl Iterator for InsertBatches<'_> {
    type Item = String;

    fn next(&mut self) -> Option<String> {
        for record in self.records.by_ref() {
            self.row.clear();
            write_record(&mut self.row, record, self.spec);

            let projected = if self.current.is_empty() {
                self.header.len() + self.row.len()
            } else {
                self.current.len() + ROW_SEPARATOR.len() + self.row.len()
            };

            let flushed = if !self.current.is_empty() && projected > self.max_batch_bytes {
                Some(std::mem::take(&mut self.current))
            } else {
                None
            };

            if self.current.is_empty() {
                self.current.push_str(&self.header);
            } else {
                self.current.push_str(ROW_SEPARATOR);
            }
            self.current.push_str(&self.row);

            if flushed.is_some() {
                return flushed;
            }
        }

        if self.current.is_empty() {
            None
        } else {
            Some(std::mem::take(&mut self.current))
        }
    }
}

impl FusedIterator for InsertBatches<'_> {}

#[cfg(test)]
mod tests {
    use super::*;

    fn spec() -> TableSpec {
        TableSpec::builder("t")
            .fields(["id", "name", "flag"])
            .default("flag", 7)
            .build()
            .unwrap()
    }

    fn rows(n: i64) -> Vec<Record> {
        (1..=n)
            .map(|i| Record::new().with("id", i).with("name", format!("n{i}")))
            .collect()
    }

    #[test]
    fn header_quotes_identifiers() {
        assert_eq!(
            render_header("test_parent", &["id", "name"]),
            "INSERT INTO `test_parent` (`id`,`name`) VALUES \n"
        );
    }

    #[test]
    fn record_applies_defaults_and_nulls() {
        let spec = spec();
        let r = Record::new().with("id", 1);
        assert_eq!(render_record(&r, &spec), "(1,NULL,7)");

        let r = Record::new().with("flag", "x").with("name", "a'b").with("id", 2);
        assert_eq!(render_record(&r, &spec), r"(2,'a\'b','x')");
    }

    #[test]
    fn explicit_null_overrides_default() {
        let spec = spec();
        let r = Record::new().with("id", 1).with("flag", Option::<i32>::None);
        assert_eq!(render_record(&r, &spec), "(1,NULL,NULL)");
    }

    #[test]
    fn empty_input_yields_nothing() {
        let spec = spec();
        assert_eq!(generate_batches(&[], &spec, 10).count(), 0);
    }

    #[test]
    fn single_batch_when_under_limit() {
        let spec = spec();
        let records = rows(2);
        let batches: Vec<_> = generate_batches(&records, &spec, DEFAULT_MAX_BATCH_BYTES).collect();
        assert_eq!(
            batches,
            vec!["INSERT INTO `t` (`id`,`name`,`flag`) VALUES \n(1,'n1',7),\n(2,'n2',7)"]
        );
    }

    #[test]
    fn splits_on_limit() {
        let spec = spec();
        let records = rows(3);
        let header_len = render_header("t", spec.fields()).len();
        // Room for exactly two rows of "(i,'ni',7)" (10 bytes) plus one separator.
        let limit = header_len + 10 + 2 + 10;
        let batches: Vec<_> = generate_batches(&records, &spec, limit).collect();
        assert_eq!(batches.len(), 2);
        assert!(batches[0].ends_with("(1,'n1',7),\n(2,'n2',7)"));
        assert!(batches[1].ends_with("VALUES \n(3,'n3',7)"));
        assert!(batches.iter().all(|b| b.len() <= limit));
    }

    #[test]
    fn oversized_row_gets_its_own_batch() {
        let spec = spec();
        let records = rows(3);
        let batches: Vec<_> = generate_batches(&records, &spec, 1).collect();
        assert_eq!(batches.len(), 3);
        for (i, batch) in batches.iter().enumerate() {
            assert!(batch.starts_with("INSERT INTO `t`"));
            assert!(batch.ends_with(&format!("({},'n{}',7)", i + 1, i + 1)));
        }
    }

    #[test]
    fn iterator_is_fused_and_tracks_progress() {
        let spec = spec();
        let records = rows(2);
        let mut it = generate_batches(&records, &spec, 1);
        assert_eq!(it.pending_records(), 2);
        assert!(it.next().is_some());
        assert_eq!(it.pending_records(), 1);
        assert!(it.next().is_some());
        assert_eq!(it.pending_records(), 0);
        assert!(it.next().is_none());
        assert!(it.next().is_none());
    }
}
