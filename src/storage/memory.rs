//! In-memory storage backend
//!
//! Executes the structured [`Plan`] of each statement against tables held in
//! process. Used by the CLI and by tests; raw text is not supported.

use std::collections::{BTreeMap, HashMap};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::{json, Value};
use tokio::sync::RwLock;

use super::client::{RawOutcome, StorageClient, StorageError};
use super::statement::{AggregateFn, Binding, Plan, Statement};
use crate::core::{parse_timestamp, record_id, EntityId, Record};

#[derive(Debug, Default)]
struct MemoryTable {
    next_id: EntityId,
    rows: Vec<Record>,
}

impl MemoryTable {
    fn allocate_id(&mut self) -> EntityId {
        self.next_id = self.next_id.max(1);
        let id = self.next_id;
        self.next_id = self.next_id.saturating_add(1);
        id
    }

    fn matching<'a>(&'a self, filters: &'a [Binding]) -> impl Iterator<Item = &'a Record> + 'a {
        self.rows.iter().filter(move |row| matches_filters(row, filters))
    }
}

/// Tables keyed by name, each behind one lock held for a single statement
#[derive(Debug, Default)]
pub struct MemoryStore {
    tables: RwLock<HashMap<String, MemoryTable>>,
}

impl MemoryStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert rows into a table, assigning ids where missing
    pub async fn seed(&self, table: &str, rows: Vec<Record>) {
        let mut tables = self.tables.write().await;
        let target = tables.entry(table.to_string()).or_default();

        for mut row in rows {
            let id = match record_id(&row) {
                Some(id) => {
                    target.next_id = target.next_id.max(id.saturating_add(1));
                    id
                }
                None => {
                    let id = target.allocate_id();
                    row.insert("id".to_string(), json!(id));
                    id
                }
            };
            tracing::trace!("[MemoryStore] Seeded {} row {}", table, id);
            target.rows.push(row);
        }
    }

    /// Load a fixture of the form `{"table": [row, ...], ...}`
    pub async fn load_fixture(&self, fixture: &Value) -> Result<usize, StorageError> {
        let tables = fixture
            .as_object()
            .ok_or_else(|| StorageError::Query("Fixture must be a JSON object".to_string()))?;

        let mut loaded = 0;
        for (table, rows) in tables {
            let rows = rows.as_array().ok_or_else(|| {
                StorageError::Query(format!("Fixture table '{}' must be an array", table))
            })?;
            let mut records = Vec::with_capacity(rows.len());
            for row in rows {
                match row {
                    Value::Object(map) if record_id(map) == Some(EntityId::MAX) => {
                        return Err(StorageError::Query(format!(
                            "Fixture row id in '{}' leaves no room for new ids",
                            table
                        )))
                    }
                    Value::Object(map) => records.push(map.clone()),
                    _ => {
                        return Err(StorageError::Query(format!(
                            "Fixture rows for '{}' must be objects",
                            table
                        )))
                    }
                }
            }
            loaded += records.len();
            self.seed(table, records).await;
        }

        tracing::info!("[MemoryStore] Loaded {} fixture rows", loaded);
        Ok(loaded)
    }

    /// Snapshot of a table's rows
    pub async fn rows(&self, table: &str) -> Vec<Record> {
        self.tables
            .read()
            .await
            .get(table)
            .map(|t| t.rows.clone())
            .unwrap_or_default()
    }

    async fn run(&self, plan: &Plan) -> Vec<Record> {
        match plan {
            Plan::Select {
                table,
                filters,
                limit,
                offset,
            } => {
                let tables = self.tables.read().await;
                let Some(t) = tables.get(table.as_str()) else {
                    return Vec::new();
                };
                let mut rows: Vec<Record> = t.matching(filters).cloned().collect();
                rows.sort_by(|a, b| record_id(b).cmp(&record_id(a)));
                rows.into_iter()
                    .skip(*offset as usize)
                    .take(limit.map(|l| l as usize).unwrap_or(usize::MAX))
                    .collect()
            }
            Plan::Insert { table, values } => {
                let mut tables = self.tables.write().await;
                let t = tables.entry(table.as_str().to_string()).or_default();
                let mut row = Record::new();
                row.insert("id".to_string(), json!(t.allocate_id()));
                for (column, value) in values {
                    row.insert(column.as_str().to_string(), value.clone());
                }
                t.rows.push(row.clone());
                vec![row]
            }
            Plan::Update { table, id, values } => {
                let mut tables = self.tables.write().await;
                let Some(t) = tables.get_mut(table.as_str()) else {
                    return Vec::new();
                };
                match t.rows.iter_mut().find(|row| record_id(row) == Some(*id)) {
                    Some(row) => {
                        for (column, value) in values {
                            row.insert(column.as_str().to_string(), value.clone());
                        }
                        vec![row.clone()]
                    }
                    None => Vec::new(),
                }
            }
            Plan::Delete { table, id } => {
                let mut tables = self.tables.write().await;
                let Some(t) = tables.get_mut(table.as_str()) else {
                    return Vec::new();
                };
                match t.rows.iter().position(|row| record_id(row) == Some(*id)) {
                    Some(index) => {
                        t.rows.remove(index);
                        vec![json_row(json!({ "id": id }))]
                    }
                    None => Vec::new(),
                }
            }
            Plan::Aggregate {
                table,
                function,
                column,
                filters,
            } => {
                let tables = self.tables.read().await;
                let value = match tables.get(table.as_str()) {
                    Some(t) => {
                        let rows: Vec<&Record> = t.matching(filters).collect();
                        aggregate(&rows, *function, column.map(|c| c.as_str()))
                    }
                    None => 0.0,
                };
                vec![json_row(json!({ "value": value }))]
            }
            Plan::TimeSeries {
                table,
                bucket,
                time_column,
                value_column,
                start,
                end,
                filters,
            } => {
                let tables = self.tables.read().await;
                let Some(t) = tables.get(table.as_str()) else {
                    return Vec::new();
                };

                let mut buckets: BTreeMap<DateTime<Utc>, (f64, u64)> = BTreeMap::new();
                for row in t.matching(filters) {
                    let Some(ts) = row
                        .get(time_column.as_str())
                        .and_then(Value::as_str)
                        .and_then(parse_timestamp)
                    else {
                        continue;
                    };
                    if ts < *start || ts > *end {
                        continue;
                    }
                    let Some(value) = row.get(value_column.as_str()).and_then(Value::as_f64) else {
                        continue;
                    };
                    let entry = buckets.entry(bucket.truncate(ts)).or_insert((0.0, 0));
                    entry.0 += value;
                    entry.1 += 1;
                }

                buckets
                    .into_iter()
                    .map(|(time, (sum, count))| {
                        json_row(json!({
                            "time": time.to_rfc3339(),
                            "value": sum / count as f64,
                        }))
                    })
                    .collect()
            }
        }
    }
}

#[async_trait]
impl StorageClient for MemoryStore {
    async fn execute(&self, statement: &Statement) -> Result<Vec<Record>, StorageError> {
        tracing::debug!("[MemoryStore] {}", statement.sql);
        Ok(self.run(&statement.plan).await)
    }

    async fn execute_raw(&self, _sql: &str) -> Result<RawOutcome, StorageError> {
        Err(StorageError::Unsupported(
            "the in-memory store cannot execute raw SQL text".to_string(),
        ))
    }

    fn name(&self) -> &str {
        "memory"
    }
}

fn json_row(value: Value) -> Record {
    match value {
        Value::Object(map) => map,
        _ => Record::new(),
    }
}

fn values_equal(a: &Value, b: &Value) -> bool {
    match (a.as_f64(), b.as_f64()) {
        (Some(x), Some(y)) => x == y,
        _ => a == b,
    }
}

fn matches_filters(row: &Record, filters: &[Binding]) -> bool {
    filters.iter().all(|(column, expected)| {
        let actual = row.get(column.as_str()).unwrap_or(&Value::Null);
        if expected.is_null() {
            actual.is_null()
        } else {
            values_equal(actual, expected)
        }
    })
}

fn aggregate(rows: &[&Record], function: AggregateFn, column: Option<&str>) -> f64 {
    let Some(column) = column else {
        return rows.len() as f64;
    };

    let present: Vec<&Value> = rows
        .iter()
        .filter_map(|row| row.get(column))
        .filter(|v| !v.is_null())
        .collect();

    if function == AggregateFn::Count {
        return present.len() as f64;
    }

    let numbers: Vec<f64> = present.iter().filter_map(|v| v.as_f64()).collect();
    if numbers.is_empty() {
        return 0.0;
    }

    match function {
        AggregateFn::Sum => numbers.iter().sum(),
        AggregateFn::Avg => numbers.iter().sum::<f64>() / numbers.len() as f64,
        AggregateFn::Min => numbers.iter().copied().fold(f64::INFINITY, f64::min),
        AggregateFn::Max => numbers.iter().copied().fold(f64::NEG_INFINITY, f64::max),
        AggregateFn::Count => present.len() as f64,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entities::{EntityRegistry, EntityType};
    use crate::storage::TimeBucket;
    use chrono::TimeZone;

    fn row(value: Value) -> Record {
        json_row(value)
    }

    #[tokio::test]
    async fn test_insert_select_update_delete() {
        let registry = EntityRegistry::standard();
        let table = registry.resolve_table(EntityType::Task).unwrap();
        let title = registry.column(EntityType::Task, "title").unwrap();
        let store = MemoryStore::new();

        let inserted = store
            .execute(&Statement::insert(table, vec![(title, json!("first"))]))
            .await
            .unwrap();
        assert_eq!(inserted[0]["id"], json!(1));
        store
            .execute(&Statement::insert(table, vec![(title, json!("second"))]))
            .await
            .unwrap();

        let rows = store.execute(&Statement::select(table, vec![], Some(10), 0)).await.unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0]["title"], json!("second"));

        let updated = store
            .execute(&Statement::update(table, 1, vec![(title, json!("renamed"))]))
            .await
            .unwrap();
        assert_eq!(updated[0]["title"], json!("renamed"));

        let missing = store
            .execute(&Statement::update(table, 99, vec![(title, json!("x"))]))
            .await
            .unwrap();
        assert!(missing.is_empty());

        let deleted = store.execute(&Statement::delete(table, 1)).await.unwrap();
        assert_eq!(deleted.len(), 1);
        assert!(store.execute(&Statement::delete(table, 1)).await.unwrap().is_empty());
        assert_eq!(store.rows("tasks").await.len(), 1);
    }

    #[tokio::test]
    async fn test_seed_keeps_ids_monotonic() {
        let store = MemoryStore::new();
        store.seed("tasks", vec![row(json!({"id": 10, "title": "a"}))]).await;
        store.seed("tasks", vec![row(json!({"title": "b"}))]).await;

        let rows = store.rows("tasks").await;
        assert_eq!(rows[1]["id"], json!(11));
    }

    #[tokio::test]
    async fn test_fixture_rejects_max_id() {
        let store = MemoryStore::new();
        let err = store
            .load_fixture(&json!({"tasks": [{"id": i64::MAX, "title": "a"}]}))
            .await
            .unwrap_err();
        assert!(matches!(err, StorageError::Query(_)));
        assert!(store.rows("tasks").await.is_empty());

        store.seed("tasks", vec![row(json!({"id": i64::MAX - 1}))]).await;
        store.seed("tasks", vec![row(json!({"id": i64::MAX}))]).await;
        assert_eq!(store.rows("tasks").await.len(), 2);
    }

    #[tokio::test]
    async fn test_time_series_skips_empty_buckets() {
        let registry = EntityRegistry::standard();
        let table = registry.resolve_table(EntityType::PowerData).unwrap();
        let ts = registry.column(EntityType::PowerData, "timestamp").unwrap();
        let power = registry.column(EntityType::PowerData, "power_kw").unwrap();

        let store = MemoryStore::new();
        store
            .seed(
                "power_data",
                vec![
                    row(json!({"timestamp": "2024-01-01T01:00:00Z", "power_kw": 2.0})),
                    row(json!({"timestamp": "2024-01-01T05:00:00Z", "power_kw": 4.0})),
                    row(json!({"timestamp": "2024-01-03T05:00:00Z", "power_kw": 10.0})),
                    row(json!({"timestamp": "2024-01-03T06:00:00Z", "power_kw": null})),
                ],
            )
            .await;

        let stmt = Statement::time_series(
            table,
            TimeBucket::Day,
            ts,
            power,
            Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap(),
            Utc.with_ymd_and_hms(2024, 1, 4, 0, 0, 0).unwrap(),
            vec![],
        );
        let rows = store.execute(&stmt).await.unwrap();

        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0]["value"], json!(3.0));
        assert_eq!(rows[1]["value"], json!(10.0));
    }

    #[tokio::test]
    async fn test_raw_sql_unsupported() {
        let store = MemoryStore::new();
        assert!(matches!(
            store.execute_raw("SELECT 1").await,
            Err(StorageError::Unsupported(_))
        ));
    }

    #[test]
    fn test_aggregate_empty_is_zero() {
        for function in [
            AggregateFn::Count,
            AggregateFn::Sum,
            AggregateFn::Avg,
            AggregateFn::Min,
            AggregateFn::Max,
        ] {
            assert_eq!(aggregate(&[], function, Some("power_kw")), 0.0);
        }
        assert_eq!(aggregate(&[], AggregateFn::Count, None), 0.0);
    }
}
