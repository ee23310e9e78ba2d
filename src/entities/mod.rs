//! Entity model
//!
//! - `EntityType` - closed set of logical resources
//! - `EntityRegistry` - entity → table and column allow-list

mod entity;
mod registry;

pub use entity::EntityType;
pub use registry::{Column, EntityRegistry, EntitySchema, Table};
