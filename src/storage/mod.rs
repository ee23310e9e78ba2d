//! Storage boundary
//!
//! This module provides:
//! - `StorageClient` trait - The single I/O seam (pool and driver live outside)
//! - `Statement` / `Plan` - Parameterized statements with validated identifiers
//! - `MemoryStore` - In-process backend for the CLI and tests

mod client;
mod memory;
mod statement;

pub use client::{RawOutcome, StorageClient, StorageError};
pub use memory::MemoryStore;
pub use statement::{AggregateFn, Binding, Plan, Statement, TimeBucket};
