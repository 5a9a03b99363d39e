//! Database collaborator boundary.
//!
//! [`SqlExecutor`] is what a driver has to provide: run one statement, or run a query and
//! return its rows as [`Record`]s. [`LoggedExecutor`] wraps an executor for batch jobs:
//! every statement is timed and logged through `tracing`, an optional timeout is
//! applied, and failures are logged with the full SQL and turned into `None`.
//!
//! `None` means the outcome is unknown. It is never the same as `Some(0)`.
//!
//! # Example
//!
//! ```rust,ignore
//! use sqlgen::{ExecutorConfig, LoggedExecutor};
//! use std::time::Duration;
//!
//! let db = LoggedExecutor::new(driver).with_config(
//!     ExecutorConfig::new()
//!         .with_query_timeout(Duration::from_secs(30))
//!         .with_slow_query_threshold(Duration::from_secs(5)),
//! );
//!
//! let start = db.next_auto_increment("shop", "test_parent").await.unwrap_or(1);
//! let mut parents = AutoIdGenerator::new(spec, start)?;
//! // ... add records ...
//! let inserted = db.insert_all(parents.sql()).await;
//! ```

use crate::error::{GenError, GenResult};
use crate::escape::escape;
use crate::statement::InsertBatches;
use crate::value::{Record, Value};
use std::future::Future;
use std::time::{Duration, Instant};

/// A database connection able to run raw SQL.
pub trait SqlExecutor: Send + Sync {
    /// Execute a statement and return the number of affected rows.
    fn execute(&self, sql: &str) -> impl Future<Output = GenResult<u64>> + Send;

    /// Execute a query and return all rows.
    fn query(&self, sql: &str) -> impl Future<Output = GenResult<Vec<Record>>> + Send;
}

/// Configuration for [`LoggedExecutor`].
#[derive(Debug, Clone)]
pub struct ExecutorConfig {
    /// Per-statement timeout. `None` means no timeout (default).
    pub query_timeout: Option<Duration>,
    /// Statements slower than this are logged at WARN.
    pub slow_query_threshold: Option<Duration>,
    /// Truncate SQL in success logs (in bytes). Failures always log the full SQL.
    pub max_sql_log_length: Option<usize>,
}

impl Default for ExecutorConfig {
    fn default() -> Self {
        Self {
            query_timeout: None,
            slow_query_threshold: None,
            max_sql_log_length: Some(200),
        }
    }
}

impl ExecutorConfig {
    /// Create a new config with default settings.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the per-statement timeout.
    pub fn with_query_timeout(mut self, timeout: Duration) -> Self {
        self.query_timeout = Some(timeout);
        self
    }

    /// Set the slow statement threshold.
    pub fn with_slow_query_threshold(mut self, threshold: Duration) -> Self {
        self.slow_query_threshold = Some(threshold);
        self
    }

    /// Set maximum SQL length in success logs.
    pub fn max_sql_log_length(mut self, len: usize) -> Self {
        self.max_sql_log_length = Some(len);
        self
    }

    /// Log full SQL on success too.
    pub fn no_truncate(mut self) -> Self {
        self.max_sql_log_length = None;
        self
    }
}

fn truncate_sql_bytes(sql: &str, max_bytes: usize) -> &str {
    if sql.len() <= max_bytes {
        return sql;
    }
    let mut end = max_bytes;
    while end > 0 && !sql.is_char_boundary(end) {
        end -= 1;
    }
    &sql[..end]
}

/// Executor wrapper that logs, times out and swallows errors.
#[derive(Debug, Clone)]
pub struct LoggedExecutor<C> {
    client: C,
    config: ExecutorConfig,
}

impl<C: SqlExecutor> LoggedExecutor<C> {
    /// Wrap `client` with the default config.
    pub fn new(client: C) -> Self {
        Self {
            client,
            config: ExecutorConfig::default(),
        }
    }

    /// Replace the config.
    pub fn with_config(mut self, config: ExecutorConfig) -> Self {
        self.config = config;
        self
    }

    /// Current config.
    pub fn config(&self) -> &ExecutorConfig {
        &self.config
    }

    /// Get the inner executor.
    pub fn inner(&self) -> &C {
        &self.client
    }

    /// Unwrap the inner executor.
    pub fn into_inner(self) -> C {
        self.client
    }

    async fn execute_with_timeout<T, F>(&self, future: F) -> GenResult<T>
    where
        F: Future<Output = GenResult<T>> + Send,
    {
        match self.config.query_timeout {
            Some(timeout) => {
                tokio::pin!(future);
                tokio::select! {
                    result = &mut future => result,
                    _ = tokio::time::sleep(timeout) => Err(GenError::Timeout(timeout)),
                }
            }
            None => future.await,
        }
    }

    fn log_sql(&self, sql: &str) -> String {
        match self.config.max_sql_log_length {
            Some(max) if sql.len() > max => format!("{}...", truncate_sql_bytes(sql, max)),
            _ => sql.to_string(),
        }
    }

    fn report<T>(
        &self,
        sql: &str,
        elapsed: Duration,
        result: &GenResult<T>,
        rows: impl Fn(&T) -> u64,
    ) {
        match result {
            Ok(value) => {
                let rows = rows(value);
                tracing::info!(
                    target: "sqlgen.sql",
                    elapsed = ?elapsed,
                    rows,
                    sql = %self.log_sql(sql),
                    "sql finished"
                );
                if let Some(threshold) = self.config.slow_query_threshold {
                    if elapsed > threshold {
                        tracing::warn!(
                            target: "sqlgen.sql",
                            elapsed = ?elapsed,
                            threshold = ?threshold,
                            sql = %self.log_sql(sql),
                            "slow sql"
                        );
                    }
                }
            }
            Err(err) => {
                tracing::error!(
                    target: "sqlgen.sql",
                    elapsed = ?elapsed,
                    error = %err,
                    sql = %sql,
                    "sql failed"
                );
            }
        }
    }

    /// Run `statements` in order and return the total affected rows.
    ///
    /// Stops at the first failure and returns `None`; statements that already ran are
    /// not undone.
    pub async fn execute_many<I, S>(&self, statements: I) -> Option<u64>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut total = 0u64;
        for statement in statements {
            let sql = statement.as_ref();
            let start = Instant::now();
            let result = self.execute_with_timeout(self.client.execute(sql)).await;
            self.report(sql, start.elapsed(), &result, |n| *n);
            total += result.ok()?;
        }
        Some(total)
    }

    /// Run a query and return its rows, or `None` on failure.
    pub async fn query(&self, sql: &str) -> Option<Vec<Record>> {
        let start = Instant::now();
        let result = self.execute_with_timeout(self.client.query(sql)).await;
        self.report(sql, start.elapsed(), &result, |rows| rows.len() as u64);
        result.ok()
    }

    /// Next AUTO_INCREMENT value of `schema`.`table`, read from `INFORMATION_SCHEMA`.
    ///
    /// `None` when the query fails, the table does not exist or has no counter.
    pub async fn next_auto_increment(&self, schema: &str, table: &str) -> Option<i64> {
        let sql = next_auto_increment_sql(schema, table);
        let rows = self.query(&sql).await?;
        match rows.first()?.get("id")? {
            Value::Int(id) => Some(*id),
            Value::Str(s) => s.trim().parse().ok(),
            Value::Null => None,
        }
    }

    /// Execute every batch of a generator.
    ///
    /// On failure, records that never reached the executor are reported as
    /// `pending_records`.
    pub async fn insert_all(&self, mut batches: InsertBatches<'_>) -> Option<u64> {
        let mut statements = 0usize;
        let total = self
            .execute_many(batches.by_ref().inspect(|_| statements += 1))
            .await;
        tracing::info!(
            target: "sqlgen.sql",
            statements,
            rows = ?total,
            pending_records = batches.pending_records(),
            "insert finished"
        );
        total
    }
}

pub(crate) fn next_auto_increment_sql(schema: &str, table: &str) -> String {
    format!(
        "SELECT AUTO_INCREMENT AS id FROM INFORMATION_SCHEMA.TABLES WHERE TABLE_SCHEMA = {} AND TABLE_NAME = {}",
        escape(&Value::from(schema)),
        escape(&Value::from(table)),
    )
}
