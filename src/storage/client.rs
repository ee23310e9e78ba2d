//! Storage client trait
//!
//! The connection pool and driver live outside this crate. Everything the
//! gate needs from them is expressed by [`StorageClient`].

use async_trait::async_trait;
use thiserror::Error;

use super::statement::Statement;
use crate::core::Record;

/// Errors raised by a storage backend
#[derive(Error, Debug)]
pub enum StorageError {
    /// Could not obtain or use a connection
    #[error("Connection error: {0}")]
    Connection(String),

    /// Statement failed in the driver (syntax, constraint, missing relation, ...)
    #[error("Query error: {0}")]
    Query(String),

    /// The backend cannot run this kind of statement
    #[error("Unsupported by backend: {0}")]
    Unsupported(String),
}

/// Outcome of a raw text statement
#[derive(Debug, Clone, Default)]
pub struct RawOutcome {
    /// Returned rows (empty for statements without a result set)
    pub rows: Vec<Record>,
    /// Command tag reported by the driver, if any
    pub command: Option<String>,
    /// Affected/returned row count reported by the driver, if any
    pub row_count: Option<u64>,
}

impl RawOutcome {
    /// Outcome carrying only rows
    pub fn from_rows(rows: Vec<Record>) -> Self {
        Self {
            rows,
            command: None,
            row_count: None,
        }
    }
}

/// Parameterized and raw statement execution
///
/// Each call runs exactly one statement. Implementations own pooling,
/// cancellation and timeouts.
#[async_trait]
pub trait StorageClient: Send + Sync {
    /// Run a statement built by the gate and return its rows
    async fn execute(&self, statement: &Statement) -> Result<Vec<Record>, StorageError>;

    /// Run free text already cleared by the raw SQL guard
    async fn execute_raw(&self, sql: &str) -> Result<RawOutcome, StorageError>;

    /// Backend name for logging
    fn name(&self) -> &str;
}
