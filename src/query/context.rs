//! Shared engine context
//!
//! Holds the immutable permission matrix and entity registry plus the storage
//! client. Cloning is cheap; every engine owns one.

use std::sync::Arc;

use serde_json::Value;

use crate::config::QueryConfig;
use crate::core::{ensure_scalar, GateError, GateResult, Record};
use crate::entities::{EntityRegistry, EntityType};
use crate::permissions::PermissionMatrix;
use crate::storage::{Binding, Statement, StorageClient};

/// Dependencies injected into every engine
#[derive(Clone)]
pub struct GateContext {
    permissions: Arc<PermissionMatrix>,
    entities: Arc<EntityRegistry>,
    storage: Arc<dyn StorageClient>,
    limits: QueryConfig,
}

impl GateContext {
    pub fn new(
        permissions: Arc<PermissionMatrix>,
        entities: Arc<EntityRegistry>,
        storage: Arc<dyn StorageClient>,
        limits: QueryConfig,
    ) -> Self {
        Self {
            permissions,
            entities,
            storage,
            limits,
        }
    }

    pub fn permissions(&self) -> &PermissionMatrix {
        &self.permissions
    }

    pub fn entities(&self) -> &EntityRegistry {
        &self.entities
    }

    pub fn storage(&self) -> &Arc<dyn StorageClient> {
        &self.storage
    }

    pub fn limits(&self) -> &QueryConfig {
        &self.limits
    }

    /// Validate column names and scalar values, preserving input order
    pub(crate) fn bind_columns<'a, I>(&self, entity: EntityType, pairs: I) -> GateResult<Vec<Binding>>
    where
        I: IntoIterator<Item = (&'a String, &'a Value)>,
    {
        pairs
            .into_iter()
            .map(|(name, value)| {
                let column = self.entities.column(entity, name)?;
                ensure_scalar(name, value)?;
                Ok((column, value.clone()))
            })
            .collect()
    }

    /// Validate a write payload: allow-listed columns, no `id`
    pub(crate) fn bind_payload(&self, entity: EntityType, data: &Record) -> GateResult<Vec<Binding>> {
        if data.contains_key("id") {
            return Err(GateError::bad_request(
                "Field 'id' is assigned by storage and cannot be written",
            ));
        }
        self.bind_columns(entity, data.iter())
    }

    /// Execute one statement, logging and sanitizing driver failures
    pub(crate) async fn run(
        &self,
        operation: &'static str,
        entity: EntityType,
        statement: Statement,
    ) -> GateResult<Vec<Record>> {
        tracing::debug!(
            "[{}] {} on {}: {} ({} params)",
            self.storage.name(),
            operation,
            entity,
            statement.sql,
            statement.params.len()
        );

        self.storage.execute(&statement).await.map_err(|e| {
            tracing::error!(
                error = %e,
                sql = %statement.sql,
                "[{}] {} on {} failed",
                self.storage.name(),
                operation,
                entity
            );
            GateError::storage(operation, e)
        })
    }
}

impl std::fmt::Debug for GateContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GateContext")
            .field("storage", &self.storage.name())
            .field("roles", &self.permissions.roles().len())
            .field("limits", &self.limits)
            .finish()
    }
}
