//! Raw SQL sandbox
//!
//! An independent path for ad hoc reporting statements that do not fit the
//! entity model. Not routed through the function registry.

mod guard;
mod result;

pub use guard::{classify, Classification, RawSqlGuard, SqlRule};
pub use result::{infer_columns, ColumnInfo, ColumnType, ExecutionResult};
