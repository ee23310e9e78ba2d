//! Entity registry
//!
//! Maps each [`EntityType`] to its physical table and the allow-list of
//! column identifiers that may be spliced into statement text. Identifiers
//! only reach the statement builder as [`Table`] / [`Column`] values, which
//! can only be obtained through this registry.

use std::collections::HashMap;

use super::entity::EntityType;
use crate::core::{GateError, GateResult};

/// Physical layout of one entity
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EntitySchema {
    /// Table name
    pub table: &'static str,
    /// Allow-listed columns, `id` included
    pub columns: &'static [&'static str],
}

impl EntitySchema {
    pub const fn new(table: &'static str, columns: &'static [&'static str]) -> Self {
        Self { table, columns }
    }

    /// Whether the column is on the allow-list
    pub fn has_column(&self, name: &str) -> bool {
        self.columns.iter().any(|c| *c == name)
    }
}

/// A table identifier resolved from the registry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Table(&'static str);

impl Table {
    pub fn as_str(&self) -> &'static str {
        self.0
    }
}

/// A column identifier validated against an entity's allow-list
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Column(&'static str);

impl Column {
    /// The primary key column, present on every entity
    pub const ID: Column = Column("id");

    pub fn as_str(&self) -> &'static str {
        self.0
    }
}

const POWER_DATA: EntitySchema = EntitySchema::new(
    "power_data",
    &[
        "id",
        "timestamp",
        "equipment_id",
        "power_kw",
        "energy_kwh",
        "voltage",
        "current",
        "power_factor",
        "frequency",
        "created_at",
    ],
);

const ENVIRONMENTAL_DATA: EntitySchema = EntitySchema::new(
    "environmental_data",
    &[
        "id",
        "timestamp",
        "location",
        "temperature",
        "humidity",
        "pressure",
        "co2_level",
        "created_at",
    ],
);

const EQUIPMENT: EntitySchema = EntitySchema::new(
    "equipment",
    &[
        "id",
        "name",
        "type",
        "location",
        "status",
        "model",
        "manufacturer",
        "rated_power_kw",
        "installation_date",
        "last_maintenance",
        "created_at",
        "updated_at",
    ],
);

const SETTINGS: EntitySchema = EntitySchema::new(
    "settings",
    &["id", "user_id", "key", "value", "created_at", "updated_at"],
);

const USERS: EntitySchema = EntitySchema::new(
    "users",
    &[
        "id",
        "username",
        "email",
        "full_name",
        "role",
        "is_active",
        "created_at",
        "updated_at",
    ],
);

const CONVERSATIONS: EntitySchema = EntitySchema::new(
    "conversations",
    &["id", "user_id", "title", "created_at", "updated_at"],
);

const MESSAGES: EntitySchema = EntitySchema::new(
    "messages",
    &["id", "conversation_id", "role", "content", "created_at"],
);

const TASKS: EntitySchema = EntitySchema::new(
    "tasks",
    &[
        "id",
        "title",
        "description",
        "status",
        "priority",
        "assigned_to",
        "equipment_id",
        "due_date",
        "created_by",
        "created_at",
        "updated_at",
    ],
);

const FUNCTIONS: EntitySchema = EntitySchema::new(
    "functions",
    &[
        "id",
        "name",
        "description",
        "module",
        "parameters",
        "return_type",
        "enabled",
        "created_at",
    ],
);

const AGENT_SETTINGS: EntitySchema = EntitySchema::new(
    "agent_settings",
    &["id", "name", "value", "description", "category", "updated_at"],
);

const NOTIFICATIONS: EntitySchema = EntitySchema::new(
    "notifications",
    &[
        "id", "user_id", "title", "message", "type", "severity", "read", "created_at",
    ],
);

const ISSUES: EntitySchema = EntitySchema::new(
    "issues",
    &[
        "id",
        "title",
        "description",
        "status",
        "priority",
        "equipment_id",
        "reported_by",
        "assigned_to",
        "created_at",
        "updated_at",
    ],
);

const COMMENTS: EntitySchema = EntitySchema::new(
    "comments",
    &["id", "issue_id", "user_id", "content", "created_at"],
);

/// Entity → schema lookup, immutable once built
#[derive(Debug, Clone, Default)]
pub struct EntityRegistry {
    schemas: HashMap<EntityType, EntitySchema>,
}

impl EntityRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// The dashboard's table map, covering every entity type
    pub fn standard() -> Self {
        Self::new()
            .with(EntityType::PowerData, POWER_DATA)
            .with(EntityType::EnvironmentalData, ENVIRONMENTAL_DATA)
            .with(EntityType::Equipment, EQUIPMENT)
            .with(EntityType::Settings, SETTINGS)
            .with(EntityType::User, USERS)
            .with(EntityType::Conversation, CONVERSATIONS)
            .with(EntityType::Message, MESSAGES)
            .with(EntityType::Task, TASKS)
            .with(EntityType::Function, FUNCTIONS)
            .with(EntityType::Setting, AGENT_SETTINGS)
            .with(EntityType::Notification, NOTIFICATIONS)
            .with(EntityType::Issue, ISSUES)
            .with(EntityType::Comment, COMMENTS)
    }

    /// Register a schema for an entity
    pub fn with(mut self, entity: EntityType, schema: EntitySchema) -> Self {
        self.schemas.insert(entity, schema);
        self
    }

    /// Check that every entity type is mapped and every schema has an `id`
    pub fn validate(&self) -> GateResult<()> {
        for entity in EntityType::ALL {
            let schema = self.schemas.get(&entity).ok_or_else(|| {
                GateError::Config(format!("Entity type '{}' has no table mapping", entity))
            })?;
            if !schema.has_column("id") {
                return Err(GateError::Config(format!(
                    "Table '{}' for entity '{}' does not list an id column",
                    schema.table, entity
                )));
            }
        }
        Ok(())
    }

    /// Get the schema for an entity
    pub fn schema(&self, entity: EntityType) -> GateResult<&EntitySchema> {
        self.schemas.get(&entity).ok_or_else(|| {
            GateError::bad_request(format!("Entity type '{}' is not mapped to a table", entity))
        })
    }

    /// Resolve the physical table for an entity
    pub fn resolve_table(&self, entity: EntityType) -> GateResult<Table> {
        self.schema(entity).map(|s| Table(s.table))
    }

    /// Validate a caller-supplied column name against the entity's allow-list
    pub fn column(&self, entity: EntityType, name: &str) -> GateResult<Column> {
        let schema = self.schema(entity)?;
        schema
            .columns
            .iter()
            .find(|c| **c == name)
            .map(|c| Column(*c))
            .ok_or_else(|| {
                GateError::bad_request(format!(
                    "Unknown column '{}' for entity '{}'",
                    name, entity
                ))
            })
    }
}
