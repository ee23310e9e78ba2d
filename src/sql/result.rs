//! Raw SQL execution results

use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::core::{parse_timestamp, Record};
use crate::storage::RawOutcome;

/// Column type inferred from a sample value
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ColumnType {
    Null,
    Integer,
    Decimal,
    Boolean,
    Text,
    Timestamp,
    Array,
    Json,
}

impl ColumnType {
    /// Infer from the runtime shape of a value
    pub fn infer(value: &Value) -> Self {
        match value {
            Value::Null => ColumnType::Null,
            Value::Bool(_) => ColumnType::Boolean,
            Value::Number(n) if n.is_i64() || n.is_u64() => ColumnType::Integer,
            Value::Number(_) => ColumnType::Decimal,
            Value::String(s) if looks_like_timestamp(s) => ColumnType::Timestamp,
            Value::String(_) => ColumnType::Text,
            Value::Array(_) => ColumnType::Array,
            Value::Object(_) => ColumnType::Json,
        }
    }
}

/// Only strings starting with a date are considered, so plain numbers
/// in text columns stay text
fn looks_like_timestamp(s: &str) -> bool {
    let bytes = s.as_bytes();
    bytes.len() >= 10 && bytes[4] == b'-' && bytes[7] == b'-' && parse_timestamp(s).is_some()
}

/// Name and inferred type of a result column
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnInfo {
    pub name: String,
    #[serde(rename = "type")]
    pub data_type: ColumnType,
}

/// Column types from the first row; `None` when there are no rows
pub fn infer_columns(rows: &[Record]) -> Option<Vec<ColumnInfo>> {
    rows.first().map(|row| {
        row.iter()
            .map(|(name, value)| ColumnInfo {
                name: name.clone(),
                data_type: ColumnType::infer(value),
            })
            .collect()
    })
}

/// Outcome of a raw statement, returned as data even on failure
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExecutionResult {
    pub rows: Vec<Record>,
    /// Command verb, e.g. `SELECT`
    pub command: String,
    pub row_count: u64,
    /// Elapsed time in milliseconds
    pub duration_ms: u64,
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub columns: Option<Vec<ColumnInfo>>,
}

impl ExecutionResult {
    /// Successful execution; driver-supplied command and count win
    pub fn success(outcome: RawOutcome, command: &str, elapsed: Duration) -> Self {
        let row_count = outcome.row_count.unwrap_or(outcome.rows.len() as u64);
        let columns = infer_columns(&outcome.rows);
        Self {
            command: outcome
                .command
                .map(|c| c.to_ascii_uppercase())
                .unwrap_or_else(|| command.to_string()),
            rows: outcome.rows,
            row_count,
            duration_ms: elapsed.as_millis() as u64,
            success: true,
            error: None,
            columns,
        }
    }

    /// Failed execution
    pub fn failure(command: &str, error: impl Into<String>, elapsed: Duration) -> Self {
        Self {
            rows: Vec::new(),
            command: command.to_string(),
            row_count: 0,
            duration_ms: elapsed.as_millis() as u64,
            success: false,
            error: Some(error.into()),
            columns: None,
        }
    }
}
