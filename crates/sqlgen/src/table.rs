//! Table descriptions.
//!
//! A [`TableSpec`] fixes everything a generator needs to know about its target table:
//! the table name, the column order, per-column defaults, the unique key groups and the
//! primary-key column used for auto ids. It is validated once, when built.
//!
//! # Example
//! ```ignore
//! use sqlgen::TableSpec;
//!
//! let spec = TableSpec::builder("test_child")
//!     .fields(["id", "pid", "name"])
//!     .default("pid", 0)
//!     .unique(["id", "name"])
//!     .build()?;
//! # Ok::<(), sqlgen::GenError>(())
//! ```
//!
//! The same table as TOML:
//! ```toml
//! table = "test_child"
//! fields = ["id", "pid", "name"]
//! unique = [["id", "name"]]
//!
//! [defaults]
//! pid = 0
//! ```

use crate::error::{GenError, GenResult};
use crate::escape::validate_ident;
use crate::value::{Record, Value};
use serde::Deserialize;
use std::collections::{BTreeMap, HashSet};
use std::fmt;
use std::path::Path;

/// Primary-key column used when none is configured.
pub const DEFAULT_PRIMARY_KEY: &str = "id";

/// An ordered tuple of fields whose combined values must be unique.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct KeyGroup {
    fields: Vec<String>,
}

impl KeyGroup {
    /// Group over `fields`, in order.
    pub fn new<I, S>(fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            fields: fields.into_iter().map(Into::into).collect(),
        }
    }

    /// Field names of the group.
    pub fn fields(&self) -> &[String] {
        &self.fields
    }

    /// Whether this group is exactly `fields`, in order.
    pub fn matches<S: AsRef<str>>(&self, fields: &[S]) -> bool {
        self.fields.len() == fields.len()
            && self
                .fields
                .iter()
                .zip(fields)
                .all(|(a, b)| a == b.as_ref())
    }
}

impl fmt::Display for KeyGroup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.fields.join(", "))
    }
}

/// Validated description of an INSERT target.
#[derive(Debug, Clone, PartialEq)]
pub struct TableSpec {
    name: String,
    fields: Vec<String>,
    defaults: BTreeMap<String, Value>,
    unique: Vec<KeyGroup>,
    primary_key: String,
}

impl TableSpec {
    /// Start describing `table`.
    pub fn builder(table: impl Into<String>) -> TableSpecBuilder {
        TableSpecBuilder {
            name: table.into(),
            fields: Vec::new(),
            defaults: BTreeMap::new(),
            unique: Vec::new(),
            primary_key: DEFAULT_PRIMARY_KEY.to_string(),
        }
    }

    /// Parse and validate a TOML table description.
    pub fn from_toml_str(raw: &str) -> GenResult<Self> {
        let file: TableFile = toml::from_str(raw)?;
        file.into_builder().build()
    }

    /// Read, parse and validate a TOML table description from disk.
    pub fn load(path: impl AsRef<Path>) -> GenResult<Self> {
        let raw = std::fs::read_to_string(path.as_ref())?;
        Self::from_toml_str(&raw)
    }

    /// Table name, unquoted.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Columns in INSERT order.
    pub fn fields(&self) -> &[String] {
        &self.fields
    }

    /// Declared default values by field.
    pub fn defaults(&self) -> &BTreeMap<String, Value> {
        &self.defaults
    }

    /// Declared unique key groups.
    pub fn unique(&self) -> &[KeyGroup] {
        &self.unique
    }

    /// Primary-key column name.
    pub fn primary_key(&self) -> &str {
        &self.primary_key
    }

    /// Whether `field` is one of the columns.
    pub fn has_field(&self, field: &str) -> bool {
        self.fields.iter().any(|f| f == field)
    }

    /// Raw value of `field` for `record`: the record's own value, else the declared
    /// default, else `NULL`.
    pub fn resolve<'a>(&'a self, record: &'a Record, field: &str) -> &'a Value {
        const NULL: &Value = &Value::Null;
        record
            .get(field)
            .or_else(|| self.defaults.get(field))
            .unwrap_or(NULL)
    }

    /// Copy of this spec with the primary key folded into the unique groups.
    pub(crate) fn with_primary_key_group(&self) -> GenResult<Self> {
        if !self.has_field(&self.primary_key) {
            return Err(GenError::MissingPrimaryKey {
                table: self.name.clone(),
                field: self.primary_key.clone(),
            });
        }
        let mut spec = self.clone();
        if !spec.unique.iter().any(|g| g.matches(&[&spec.primary_key])) {
            spec.unique.push(KeyGroup::new([spec.primary_key.clone()]));
        }
        Ok(spec)
    }
}

/// Builder for [`TableSpec`].
#[derive(Debug, Clone)]
#[must_use]
pub struct TableSpecBuilder {
    name: String,
    fields: Vec<String>,
    defaults: BTreeMap<String, Value>,
    unique: Vec<KeyGroup>,
    primary_key: String,
}

impl TableSpecBuilder {
    /// Append columns, in order.
    pub fn fields<I, S>(mut self, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.fields.extend(fields.into_iter().map(Into::into));
        self
    }

    /// Declare the value used when a record omits `field`.
    pub fn default(mut self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        self.defaults.insert(field.into(), value.into());
        self
    }

    /// Declare a unique key group.
    pub fn unique<I, S>(mut self, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.unique.push(KeyGroup::new(fields));
        self
    }

    /// Override the primary-key column (default `id`).
    pub fn primary_key(mut self, field: impl Into<String>) -> Self {
        self.primary_key = field.into();
        self
    }

    /// Validate names, defaults and key groups.
    pub fn build(self) -> GenResult<TableSpec> {
        validate_ident(&self.name)?;
        if self.fields.is_empty() {
            return Err(GenError::config(format!(
                "Table '{}' has no fields",
                self.name
            )));
        }

        let mut seen = HashSet::new();
        for field in &self.fields {
            validate_ident(field)?;
            if !seen.insert(field.as_str()) {
                return Err(GenError::config(format!(
                    "Field '{field}' declared twice on table '{}'",
                    self.name
                )));
            }
        }

        if let Some(field) = self.defaults.keys().find(|f| !seen.contains(f.as_str())) {
            return Err(GenError::config(format!(
                "Default for unknown field '{field}' on table '{}'",
                self.name
            )));
        }

        for (i, group) in self.unique.iter().enumerate() {
            if group.fields().is_empty() {
                return Err(GenError::config(format!(
                    "Empty unique key group on table '{}'",
                    self.name
                )));
            }
            if let Some(field) = group.fields().iter().find(|f| !seen.contains(f.as_str())) {
                return Err(GenError::config(format!(
                    "Unique key field '{field}' is not a field of table '{}'",
                    self.name
                )));
            }
            if self.unique[..i].contains(group) {
                return Err(GenError::config(format!(
                    "Unique key group ({group}) declared twice on table '{}'",
                    self.name
                )));
            }
        }

        validate_ident(&self.primary_key)?;

        Ok(TableSpec {
            name: self.name,
            fields: self.fields,
            defaults: self.defaults,
            unique: self.unique,
            primary_key: self.primary_key,
        })
    }
}

#[derive(Debug, Deserialize)]
struct TableFile {
    table: String,
    fields: Vec<String>,
    primary_key: Option<String>,
    #[serde(default)]
    defaults: BTreeMap<String, Value>,
    #[serde(default)]
    unique: Vec<Vec<String>>,
}

impl TableFile {
    fn into_builder(self) -> TableSpecBuilder {
        let mut builder = TableSpec::builder(self.table).fields(self.fields);
        if let Some(pk) = self.primary_key {
            builder = builder.primary_key(pk);
        }
        for (field, value) in self.defaults {
            builder = builder.default(field, value);
        }
        for group in self.unique {
            builder = builder.unique(group);
        }
        builder
    }
}
