//! Generic CRUD over any registered entity
//!
//! Every operation checks the permission matrix first, then validates its
//! input, and only then builds and runs exactly one statement.

use crate::core::{EntityId, Filters, GateError, GateResult, Record};
use crate::entities::EntityType;
use crate::permissions::{PermissionLevel, Role};
use crate::storage::Statement;

use super::context::GateContext;

/// Permission-gated get/query/create/update/delete
#[derive(Debug, Clone)]
pub struct QueryMediator {
    ctx: GateContext,
}

impl QueryMediator {
    pub fn new(ctx: GateContext) -> Self {
        Self { ctx }
    }

    /// Fetch one record by id (READ)
    pub async fn get_by_id(&self, role: &Role, entity: EntityType, id: EntityId) -> GateResult<Record> {
        self.ctx.permissions().require(role, entity, PermissionLevel::Read)?;
        let table = self.ctx.entities().resolve_table(entity)?;

        let rows = self
            .ctx
            .run("get", entity, Statement::select_by_id(table, id))
            .await?;

        rows.into_iter()
            .next()
            .ok_or_else(|| GateError::not_found(format!("{} with id {} not found", entity, id)))
    }

    /// Filtered listing, most recent first (READ)
    ///
    /// `limit` defaults to the configured default and is capped at the
    /// configured maximum.
    pub async fn query(
        &self,
        role: &Role,
        entity: EntityType,
        filters: &Filters,
        limit: Option<u64>,
        offset: Option<u64>,
    ) -> GateResult<Vec<Record>> {
        self.ctx.permissions().require(role, entity, PermissionLevel::Read)?;
        let table = self.ctx.entities().resolve_table(entity)?;
        let bindings = self.ctx.bind_columns(entity, filters.iter())?;
        let limit = self.ctx.limits().effective_limit(limit);

        let rows = self
            .ctx
            .run(
                "query",
                entity,
                Statement::select(table, bindings, Some(limit), offset.unwrap_or(0)),
            )
            .await?;

        tracing::debug!("[QueryMediator] {} rows from {}", rows.len(), entity);
        Ok(rows)
    }

    /// Insert a record and return it with its assigned id (WRITE)
    pub async fn create(&self, role: &Role, entity: EntityType, data: &Record) -> GateResult<Record> {
        self.ctx.permissions().require(role, entity, PermissionLevel::Write)?;
        let table = self.ctx.entities().resolve_table(entity)?;
        let values = self.ctx.bind_payload(entity, data)?;

        let rows = self.ctx.run("create", entity, Statement::insert(table, values)).await?;

        let created = rows.into_iter().next().ok_or_else(|| {
            GateError::Internal(format!("Insert into {} returned no row", entity))
        })?;
        tracing::info!("[QueryMediator] Role '{}' created {} {:?}", role, entity, created.get("id"));
        Ok(created)
    }

    /// Update fields of a record (WRITE)
    ///
    /// An empty payload is rejected before any statement is issued.
    pub async fn update(
        &self,
        role: &Role,
        entity: EntityType,
        id: EntityId,
        data: &Record,
    ) -> GateResult<Record> {
        self.ctx.permissions().require(role, entity, PermissionLevel::Write)?;
        if data.is_empty() {
            return Err(GateError::bad_request("No fields to update"));
        }
        let table = self.ctx.entities().resolve_table(entity)?;
        let values = self.ctx.bind_payload(entity, data)?;

        let rows = self
            .ctx
            .run("update", entity, Statement::update(table, id, values))
            .await?;

        let updated = rows
            .into_iter()
            .next()
            .ok_or_else(|| GateError::not_found(format!("{} with id {} not found", entity, id)))?;
        tracing::info!("[QueryMediator] Role '{}' updated {} {}", role, entity, id);
        Ok(updated)
    }

    /// Delete a record (ADMIN, regardless of WRITE grants)
    ///
    /// Returns whether a row was removed.
    pub async fn delete(&self, role: &Role, entity: EntityType, id: EntityId) -> GateResult<bool> {
        self.ctx.permissions().require(role, entity, PermissionLevel::Admin)?;
        let table = self.ctx.entities().resolve_table(entity)?;

        let rows = self.ctx.run("delete", entity, Statement::delete(table, id)).await?;

        let removed = !rows.is_empty();
        if removed {
            tracing::info!("[QueryMediator] Role '{}' deleted {} {}", role, entity, id);
        }
        Ok(removed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::{MemoryStore, Plan, StorageError};
    use crate::test_support::{context, record, RecordingStore};
    use serde_json::json;
    use std::sync::Arc;

    fn memory_mediator() -> QueryMediator {
        QueryMediator::new(context(Arc::new(MemoryStore::new())))
    }

    #[tokio::test]
    async fn test_create_then_get_round_trip() {
        let mediator = memory_mediator();
        let role = Role::from("operator");
        let data = record(json!({"title": "Replace inverter fan", "priority": "high", "equipment_id": 4}));

        let created = mediator.create(&role, EntityType::Task, &data).await.unwrap();
        let id = created["id"].as_i64().unwrap();

        let fetched = mediator.get_by_id(&role, EntityType::Task, id).await.unwrap();
        let mut expected = data.clone();
        expected.insert("id".into(), json!(id));
        assert_eq!(fetched, expected);
    }

    #[tokio::test]
    async fn test_get_missing_is_not_found() {
        let mediator = memory_mediator();
        let err = mediator
            .get_by_id(&Role::from("admin"), EntityType::Equipment, 42)
            .await
            .unwrap_err();
        assert_eq!(err.status(), 404);
    }

    #[tokio::test]
    async fn test_query_orders_and_pages() {
        let store = Arc::new(MemoryStore::new());
        store
            .seed(
                "equipment",
                (1..=5)
                    .map(|i| record(json!({"name": format!("meter-{}", i), "status": if i % 2 == 0 { "active" } else { "offline" }})))
                    .collect(),
            )
            .await;
        let mediator = QueryMediator::new(context(store));
        let role = Role::from("user");

        let all = mediator
            .query(&role, EntityType::Equipment, &Filters::new(), None, None)
            .await
            .unwrap();
        let ids: Vec<_> = all.iter().map(|r| r["id"].as_i64().unwrap()).collect();
        assert_eq!(ids, vec![5, 4, 3, 2, 1]);

        let mut filters = Filters::new();
        filters.insert("status".into(), json!("active"));
        let active = mediator
            .query(&role, EntityType::Equipment, &filters, Some(1), Some(1))
            .await
            .unwrap();
        assert_eq!(active.len(), 1);
        assert_eq!(active[0]["id"], json!(2));
    }

    #[tokio::test]
    async fn test_query_applies_default_and_max_limit() {
        let store = RecordingStore::new();
        let mediator = QueryMediator::new(context(store.clone()));
        let role = Role::from("user");

        mediator
            .query(&role, EntityType::PowerData, &Filters::new(), None, None)
            .await
            .unwrap();
        mediator
            .query(&role, EntityType::PowerData, &Filters::new(), Some(1_000_000), None)
            .await
            .unwrap();

        let limits: Vec<_> = store
            .statements()
            .into_iter()
            .map(|s| match s.plan {
                Plan::Select { limit, .. } => limit,
                other => panic!("unexpected plan {:?}", other),
            })
            .collect();
        assert_eq!(limits, vec![Some(100), Some(1000)]);
    }

    #[tokio::test]
    async fn test_read_denied_before_any_query() {
        let store = RecordingStore::new();
        let mediator = QueryMediator::new(context(store.clone()));
        let role = Role::from("user");

        let err = mediator
            .query(&role, EntityType::User, &Filters::new(), None, None)
            .await
            .unwrap_err();
        assert!(matches!(err, GateError::PermissionDenied { .. }));

        let err = mediator.get_by_id(&role, EntityType::User, 1).await.unwrap_err();
        assert_eq!(err.status(), 403);
        assert_eq!(store.call_count(), 0);
    }

    #[tokio::test]
    async fn test_unknown_filter_column_rejected() {
        let store = RecordingStore::new();
        let mediator = QueryMediator::new(context(store.clone()));

        let mut filters = Filters::new();
        filters.insert("1=1 OR status".into(), json!("x"));
        let err = mediator
            .query(&Role::from("admin"), EntityType::Task, &filters, None, None)
            .await
            .unwrap_err();
        assert_eq!(err.status(), 400);
        assert_eq!(store.call_count(), 0);
    }

    #[tokio::test]
    async fn test_delete_requires_admin_even_with_write() {
        let mediator = memory_mediator();
        let operator = Role::from("operator");

        let created = mediator
            .create(&operator, EntityType::Equipment, &record(json!({"name": "chiller", "status": "active"})))
            .await
            .unwrap();
        let id = created["id"].as_i64().unwrap();

        let updated = mediator
            .update(&operator, EntityType::Equipment, id, &record(json!({"status": "maintenance"})))
            .await
            .unwrap();
        assert_eq!(updated["status"], json!("maintenance"));

        let err = mediator.delete(&operator, EntityType::Equipment, id).await.unwrap_err();
        assert!(matches!(
            err,
            GateError::PermissionDenied { level: PermissionLevel::Admin, .. }
        ));

        assert!(mediator.delete(&Role::from("admin"), EntityType::Equipment, id).await.unwrap());
        assert!(!mediator.delete(&Role::from("admin"), EntityType::Equipment, id).await.unwrap());
    }

    #[tokio::test]
    async fn test_empty_update_rejected_without_storage() {
        let store = RecordingStore::new();
        let mediator = QueryMediator::new(context(store.clone()));

        let err = mediator
            .update(&Role::from("operator"), EntityType::Task, 1, &Record::new())
            .await
            .unwrap_err();
        assert!(matches!(err, GateError::BadRequest(_)));
        assert_eq!(store.call_count(), 0);
    }

    #[tokio::test]
    async fn test_update_missing_is_not_found() {
        let mediator = memory_mediator();
        let err = mediator
            .update(&Role::from("admin"), EntityType::Task, 77, &record(json!({"status": "done"})))
            .await
            .unwrap_err();
        assert_eq!(err.status(), 404);
    }

    #[tokio::test]
    async fn test_payload_cannot_set_id_or_unknown_columns() {
        let store = RecordingStore::new();
        let mediator = QueryMediator::new(context(store.clone()));
        let admin = Role::from("admin");

        let err = mediator
            .create(&admin, EntityType::Task, &record(json!({"id": 5, "title": "x"})))
            .await
            .unwrap_err();
        assert_eq!(err.status(), 400);

        let err = mediator
            .update(&admin, EntityType::Task, 1, &record(json!({"owner_password": "x"})))
            .await
            .unwrap_err();
        assert_eq!(err.status(), 400);
        assert_eq!(store.call_count(), 0);
    }

    #[tokio::test]
    async fn test_storage_failure_is_sanitized() {
        let store = RecordingStore::new();
        store.respond(Err(StorageError::Query(
            "column \"secret\" of relation \"tasks\" does not exist".into(),
        )));
        let mediator = QueryMediator::new(context(store));

        let err = mediator
            .query(&Role::from("admin"), EntityType::Task, &Filters::new(), None, None)
            .await
            .unwrap_err();
        assert_eq!(err.status(), 500);
        assert!(!err.to_string().contains("secret"));
    }
}
