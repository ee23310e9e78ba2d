//! Data gate facade
//!
//! Wires the permission matrix, entity registry, engines, raw SQL guard and
//! function dispatcher over one storage client. Cheap to clone; every
//! component is shared behind an `Arc`.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde_json::Value;

use crate::config::GateConfig;
use crate::core::{EntityId, Filters, GateResult, Record};
use crate::entities::{EntityRegistry, EntityType};
use crate::functions::{FunctionDispatcher, FunctionRegistration, FunctionRegistry};
use crate::permissions::{PermissionLevel, PermissionMatrix, Role};
use crate::query::{
    AggregateFn, AggregationEngine, GateContext, QueryMediator, TimeBucket, TimeSeriesEngine,
    TimeSeriesPoint, TimeSeriesQuery,
};
use crate::sql::{ExecutionResult, RawSqlGuard};
use crate::storage::StorageClient;

/// Permission-checked access to the dashboard's data
#[derive(Debug, Clone)]
pub struct DataGate {
    ctx: GateContext,
    mediator: QueryMediator,
    aggregates: AggregationEngine,
    time_series: TimeSeriesEngine,
    sql: RawSqlGuard,
    dispatcher: FunctionDispatcher,
}

impl DataGate {
    /// Build a gate from configuration over the given storage client
    pub fn new(config: &GateConfig, storage: Arc<dyn StorageClient>) -> GateResult<Self> {
        config.validate()?;

        let entities = EntityRegistry::standard();
        entities.validate()?;

        let permissions = config.permission_matrix();
        tracing::info!(
            "[DataGate] Using storage '{}' with {} configured roles",
            storage.name(),
            permissions.roles().len()
        );

        let ctx = GateContext::new(
            Arc::new(permissions),
            Arc::new(entities),
            storage,
            config.query,
        );

        Ok(Self::from_context(ctx, Arc::new(FunctionRegistry::standard())))
    }

    /// Build a gate from an assembled context and function registry
    pub fn from_context(ctx: GateContext, functions: Arc<FunctionRegistry>) -> Self {
        Self {
            mediator: QueryMediator::new(ctx.clone()),
            aggregates: AggregationEngine::new(ctx.clone()),
            time_series: TimeSeriesEngine::new(ctx.clone()),
            sql: RawSqlGuard::new(ctx.storage().clone()),
            dispatcher: FunctionDispatcher::new(functions, ctx.clone()),
            ctx,
        }
    }

    pub fn permissions(&self) -> &PermissionMatrix {
        self.ctx.permissions()
    }

    pub fn functions(&self) -> &FunctionRegistry {
        self.dispatcher.registry()
    }

    pub fn has_permission(&self, role: &Role, entity: EntityType, level: PermissionLevel) -> bool {
        self.ctx.permissions().has_permission(role, entity, level)
    }

    pub async fn get_entity_by_id(&self, role: &Role, entity: EntityType, id: EntityId) -> GateResult<Record> {
        self.mediator.get_by_id(role, entity, id).await
    }

    pub async fn query_entities(
        &self,
        role: &Role,
        entity: EntityType,
        filters: &Filters,
        limit: Option<u64>,
        offset: Option<u64>,
    ) -> GateResult<Vec<Record>> {
        self.mediator.query(role, entity, filters, limit, offset).await
    }

    pub async fn create_entity(&self, role: &Role, entity: EntityType, data: &Record) -> GateResult<Record> {
        self.mediator.create(role, entity, data).await
    }

    pub async fn update_entity(
        &self,
        role: &Role,
        entity: EntityType,
        id: EntityId,
        data: &Record,
    ) -> GateResult<Record> {
        self.mediator.update(role, entity, id, data).await
    }

    pub async fn delete_entity(&self, role: &Role, entity: EntityType, id: EntityId) -> GateResult<bool> {
        self.mediator.delete(role, entity, id).await
    }

    pub async fn get_aggregate_stats(
        &self,
        role: &Role,
        entity: EntityType,
        column: &str,
        function: AggregateFn,
        filters: &Filters,
    ) -> GateResult<f64> {
        self.aggregates.aggregate(role, entity, column, function, filters).await
    }

    #[allow(clippy::too_many_arguments)]
    pub async fn execute_time_series_query(
        &self,
        role: &Role,
        entity: EntityType,
        time_column: &str,
        value_column: &str,
        bucket: TimeBucket,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        filters: &Filters,
    ) -> GateResult<Vec<TimeSeriesPoint>> {
        self.time_series
            .execute(
                role,
                TimeSeriesQuery {
                    entity,
                    time_column,
                    value_column,
                    bucket,
                    start,
                    end,
                    filters,
                },
            )
            .await
    }

    /// Run a raw statement through the SQL guard
    pub async fn execute_sql(&self, sql: &str, role: &Role) -> GateResult<ExecutionResult> {
        self.sql.execute_sql(sql, role).await
    }

    /// Look up a function registration; unknown names give `None`
    pub fn get_database_function(&self, name: &str) -> Option<&FunctionRegistration> {
        self.functions().get(name)
    }

    pub async fn execute_database_function(&self, name: &str, params: &Value, role: &Role) -> GateResult<Value> {
        self.dispatcher.execute(name, params, role).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::GateError;
    use crate::permissions::PermissionGrants;
    use crate::storage::MemoryStore;
    use crate::test_support::{record, RecordingStore};
    use serde_json::json;
    use std::collections::HashMap;

    fn gate() -> DataGate {
        DataGate::new(&GateConfig::default(), Arc::new(MemoryStore::new())).unwrap()
    }

    #[tokio::test]
    async fn test_create_then_get_round_trip() {
        let gate = gate();
        let role = Role::from("operator");
        let data = record(json!({"name": "Chiller 2", "type": "hvac", "status": "running"}));

        let created = gate.create_entity(&role, EntityType::Equipment, &data).await.unwrap();
        let id = created["id"].as_i64().unwrap();
        let fetched = gate.get_entity_by_id(&role, EntityType::Equipment, id).await.unwrap();

        let mut expected = data.clone();
        expected.insert("id".to_string(), json!(id));
        assert_eq!(fetched, expected);
    }

    #[tokio::test]
    async fn test_delete_requires_admin_level() {
        let gate = gate();
        let created = gate
            .create_entity(&Role::from("operator"), EntityType::Issue, &record(json!({"title": "Leak"})))
            .await
            .unwrap();
        let id = created["id"].as_i64().unwrap();

        let err = gate
            .delete_entity(&Role::from("operator"), EntityType::Issue, id)
            .await
            .unwrap_err();
        assert!(matches!(err, GateError::PermissionDenied { .. }));

        assert!(gate.delete_entity(&Role::from("admin"), EntityType::Issue, id).await.unwrap());
    }

    #[tokio::test]
    async fn test_sql_policy_through_gate() {
        let store = RecordingStore::new();
        let gate = DataGate::new(&GateConfig::default(), store.clone()).unwrap();

        let err = gate.execute_sql("DROP TABLE foo", &Role::from("user")).await.unwrap_err();
        assert!(matches!(err, GateError::SqlPolicyViolation { .. }));
        assert!(gate.execute_sql("DROP TABLE foo", &Role::from("admin")).await.is_ok());
        assert!(gate.execute_sql("EXEC sp_x", &Role::from("admin")).await.is_err());
        assert_eq!(store.raw_calls(), vec!["DROP TABLE foo".to_string()]);
    }

    #[tokio::test]
    async fn test_configured_grants_replace_standard() {
        let mut grants: PermissionGrants = HashMap::new();
        grants.insert(
            "auditor".to_string(),
            HashMap::from([(EntityType::PowerData, vec![PermissionLevel::Read])]),
        );
        let config = GateConfig::default().with_permissions(grants);
        let gate = DataGate::new(&config, Arc::new(MemoryStore::new())).unwrap();

        assert!(gate.has_permission(&Role::from("auditor"), EntityType::PowerData, PermissionLevel::Read));
        assert!(!gate.has_permission(&Role::from("user"), EntityType::PowerData, PermissionLevel::Read));
        assert!(gate.has_permission(&Role::from("admin"), EntityType::User, PermissionLevel::Admin));
    }

    #[tokio::test]
    async fn test_function_lookup() {
        let gate = gate();
        assert!(gate.get_database_function("list_tasks").is_some());
        assert!(gate.get_database_function("doesNotExist").is_none());

        let err = gate
            .execute_database_function("doesNotExist", &json!({}), &Role::from("admin"))
            .await
            .unwrap_err();
        assert_eq!(err.status(), 404);
    }

    #[test]
    fn test_invalid_config_rejected() {
        let config = GateConfig::default().with_limits(0, 10);
        let err = DataGate::new(&config, Arc::new(MemoryStore::new())).unwrap_err();
        assert!(matches!(err, GateError::Config(_)));
    }
}
