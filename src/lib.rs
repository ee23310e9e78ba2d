//! Permission-checked data access layer for an AI agent
//!
//! The agent never talks to storage directly. Every read and write passes a
//! role-based permission check, statements are parameterized with validated
//! identifiers, and free-text SQL goes through a rule-based guard.

pub mod core;
pub mod entities;
pub mod permissions;
pub mod storage;

// Engines
pub mod query;
pub mod sql;

// Agent-facing function catalog
pub mod functions;

pub mod config;
pub mod gate;
pub mod logging;

#[cfg(test)]
pub(crate) mod test_support;

pub use crate::config::{GateConfig, LoggingConfig, QueryConfig};
pub use crate::core::{GateError, GateResult, Record};
pub use crate::entities::EntityType;
pub use crate::functions::{FunctionDispatcher, FunctionRegistry};
pub use crate::gate::DataGate;
pub use crate::permissions::{PermissionLevel, PermissionMatrix, Role};
pub use crate::storage::{MemoryStore, StorageClient};
