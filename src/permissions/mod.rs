//! Permission model for mediated data access
//!
//! Every engine asks the [`PermissionMatrix`] before it builds a statement.
//!
//! ## Levels
//!
//! - `Read`: get, query, aggregate, time series
//! - `Write`: create, update
//! - `Admin`: delete
//!
//! Levels are granted individually. `admin` bypasses the table; unknown
//! roles hold nothing.
//!
//! ## Example
//!
//! ```rust
//! use agent_data_gate::entities::EntityType;
//! use agent_data_gate::permissions::{PermissionLevel, PermissionMatrix, Role};
//!
//! let matrix = PermissionMatrix::builder()
//!     .grant("operator", EntityType::Task, &[PermissionLevel::Read, PermissionLevel::Write])
//!     .build();
//!
//! assert!(matrix.has_permission(&Role::from("operator"), EntityType::Task, PermissionLevel::Write));
//! assert!(!matrix.has_permission(&Role::from("operator"), EntityType::Task, PermissionLevel::Admin));
//! ```

mod matrix;

pub use matrix::{
    PermissionGrants, PermissionLevel, PermissionMatrix, PermissionMatrixBuilder, Role,
    ADMIN_ROLE, MANAGER_ROLE,
};
