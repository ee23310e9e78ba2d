//! Core types for the data gate
//!
//! This module provides the fundamental types used throughout the crate:
//! - `GateError` / `GateResult` - Error types
//! - `Record`, `EntityId`, `Filters` - Row and predicate types
//! - `parse_timestamp` - Lenient timestamp parsing

pub mod error;
pub mod record;
pub mod time;

pub use error::{ErrorPayload, GateError, GateResult};
pub use record::{ensure_scalar, filters_from_value, record_id, EntityId, Filters, Record};
pub use time::parse_timestamp;
