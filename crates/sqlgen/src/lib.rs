//! # sqlgen
//!
//! Batch in-memory records into a few size-bounded, multi-row INSERT statements.
//!
//! ## Features
//!
//! - **Explicit tables**: a validated [`TableSpec`] fixes column order, defaults and unique
//!   key groups
//! - **Duplicate detection**: records colliding on any unique key group never reach the
//!   SQL; a [`DuplicateHook`] decides what happens to them
//! - **Auto ids**: [`AutoIdGenerator`] emulates AUTO_INCREMENT so child rows can reference
//!   parents before anything is written
//! - **Bounded batches**: statements are produced lazily and split at a byte limit
//! - **Logged execution**: [`LoggedExecutor`] times and logs every statement and turns
//!   database errors into `None`
//!
//! ## Example
//!
//! ```ignore
//! use sqlgen::{AutoIdGenerator, Record, TableSpec};
//!
//! let parent = TableSpec::builder("test_parent").fields(["id", "name"]).build()?;
//! let child = TableSpec::builder("test_child")
//!     .fields(["id", "pid", "name"])
//!     .unique(["id", "name"])
//!     .build()?;
//!
//! let mut parents = AutoIdGenerator::new(parent, 1)?;
//! let mut children = AutoIdGenerator::new(child, 5)?;
//!
//! let pid = parents
//!     .add(Record::new().with("name", "p1"))?
//!     .record()
//!     .and_then(|p| p.get("id").cloned());
//! children.add(Record::new().with("pid", pid).with("name", "c1"))?;
//!
//! for sql in parents.sql().chain(children.sql()) {
//!     println!("{sql}");
//! }
//! # Ok::<(), sqlgen::GenError>(())
//! ```

pub mod auto_id;
pub mod error;
pub mod escape;
pub mod executor;
pub mod generator;
pub mod hook;
pub mod index;
pub mod statement;
pub mod table;
pub mod value;

pub use auto_id::AutoIdGenerator;
pub use error::{GenError, GenResult};
pub use escape::{escape, quote_ident};
pub use executor::{ExecutorConfig, LoggedExecutor, SqlExecutor};
pub use generator::{AddOutcome, InsertGenerator};
pub use hook::{Collisions, DuplicateAction, DuplicateHook, FixedAction, SkipDuplicates};
pub use index::{KeyTuple, UniqueIndex};
pub use statement::{
    DEFAULT_MAX_BATCH_BYTES, InsertBatches, generate_batches, render_header, render_record,
};
pub use table::{DEFAULT_PRIMARY_KEY, KeyGroup, TableSpec, TableSpecBuilder};
pub use value::{Record, Value};
