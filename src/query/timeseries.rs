//! Time-bucketed averages

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::core::{parse_timestamp, Filters, GateError, GateResult, Record};
use crate::entities::EntityType;
use crate::permissions::{PermissionLevel, Role};
use crate::storage::{Statement, TimeBucket};

use super::context::GateContext;

/// Average of one bucket
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimeSeriesPoint {
    /// Bucket start
    pub time: DateTime<Utc>,
    pub value: f64,
}

/// Parameters of a time series request
#[derive(Debug, Clone)]
pub struct TimeSeriesQuery<'a> {
    pub entity: EntityType,
    pub time_column: &'a str,
    pub value_column: &'a str,
    pub bucket: TimeBucket,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub filters: &'a Filters,
}

/// Bucketed AVG over `[start, end]`, READ required
///
/// Buckets without matching rows are omitted; the series is sparse.
#[derive(Debug, Clone)]
pub struct TimeSeriesEngine {
    ctx: GateContext,
}

impl TimeSeriesEngine {
    pub fn new(ctx: GateContext) -> Self {
        Self { ctx }
    }

    pub async fn execute(&self, role: &Role, query: TimeSeriesQuery<'_>) -> GateResult<Vec<TimeSeriesPoint>> {
        let entity = query.entity;
        self.ctx.permissions().require(role, entity, PermissionLevel::Read)?;

        if query.start > query.end {
            return Err(GateError::bad_request(format!(
                "Time range start {} is after end {}",
                query.start.to_rfc3339(),
                query.end.to_rfc3339()
            )));
        }

        let entities = self.ctx.entities();
        let table = entities.resolve_table(entity)?;
        let time_column = entities.column(entity, query.time_column)?;
        let value_column = entities.column(entity, query.value_column)?;
        let bindings = self.ctx.bind_columns(entity, query.filters.iter())?;

        let rows = self
            .ctx
            .run(
                "time_series",
                entity,
                Statement::time_series(
                    table,
                    query.bucket,
                    time_column,
                    value_column,
                    query.start,
                    query.end,
                    bindings,
                ),
            )
            .await?;

        let mut points: Vec<TimeSeriesPoint> = rows.iter().filter_map(to_point).collect();
        points.sort_by(|a, b| a.time.cmp(&b.time));
        points.dedup_by(|later, earlier| later.time == earlier.time);

        tracing::debug!(
            "[TimeSeriesEngine] {} {} buckets for {}",
            points.len(),
            query.bucket,
            entity
        );
        Ok(points)
    }
}

/// Rows with an unreadable time or a null average carry no data
fn to_point(row: &Record) -> Option<TimeSeriesPoint> {
    let time = row.get("time").and_then(Value::as_str).and_then(parse_timestamp)?;
    let value = match row.get("value")? {
        Value::Number(n) => n.as_f64()?,
        Value::String(s) => s.trim().parse().ok()?,
        _ => return None,
    };
    Some(TimeSeriesPoint { time, value })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryStore;
    use crate::test_support::{context, record, RecordingStore};
    use chrono::TimeZone;
    use serde_json::json;
    use std::sync::Arc;

    fn ts(y: i32, m: u32, d: u32, h: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, m, d, h, 0, 0).unwrap()
    }

    fn query<'a>(bucket: TimeBucket, filters: &'a Filters, start: DateTime<Utc>, end: DateTime<Utc>) -> TimeSeriesQuery<'a> {
        TimeSeriesQuery {
            entity: EntityType::EnvironmentalData,
            time_column: "timestamp",
            value_column: "temperature",
            bucket,
            start,
            end,
            filters,
        }
    }

    async fn seeded_engine() -> TimeSeriesEngine {
        let store = Arc::new(MemoryStore::new());
        store
            .seed(
                "environmental_data",
                vec![
                    record(json!({"timestamp": "2024-05-06T08:00:00Z", "temperature": 20.0, "location": "roof"})),
                    record(json!({"timestamp": "2024-05-06T09:30:00Z", "temperature": 22.0, "location": "roof"})),
                    record(json!({"timestamp": "2024-05-08T10:00:00Z", "temperature": 25.0, "location": "roof"})),
                    record(json!({"timestamp": "2024-05-08T10:00:00Z", "temperature": 99.0, "location": "boiler"})),
                    record(json!({"timestamp": "2024-05-20T10:00:00Z", "temperature": 30.0, "location": "roof"})),
                    record(json!({"timestamp": "2024-07-01T00:00:00Z", "temperature": 40.0, "location": "roof"})),
                ],
            )
            .await;
        TimeSeriesEngine::new(context(store))
    }

    #[tokio::test]
    async fn test_daily_series_is_sparse_and_ascending() {
        let engine = seeded_engine().await;
        let mut filters = Filters::new();
        filters.insert("location".into(), json!("roof"));

        let points = engine
            .execute(
                &Role::from("user"),
                query(TimeBucket::Day, &filters, ts(2024, 5, 6, 0), ts(2024, 5, 31, 0)),
            )
            .await
            .unwrap();

        assert_eq!(
            points,
            vec![
                TimeSeriesPoint { time: ts(2024, 5, 6, 0), value: 21.0 },
                TimeSeriesPoint { time: ts(2024, 5, 8, 0), value: 25.0 },
                TimeSeriesPoint { time: ts(2024, 5, 20, 0), value: 30.0 },
            ]
        );
        assert!(points.windows(2).all(|w| w[0].time < w[1].time));
    }

    #[tokio::test]
    async fn test_range_is_inclusive() {
        let engine = seeded_engine().await;
        let filters = Filters::new();

        let points = engine
            .execute(
                &Role::from("user"),
                query(TimeBucket::Month, &filters, ts(2024, 5, 20, 10), ts(2024, 7, 1, 0)),
            )
            .await
            .unwrap();

        assert_eq!(points.len(), 2);
        assert_eq!(points[0].time, ts(2024, 5, 1, 0));
        assert_eq!(points[1].value, 40.0);
    }

    #[tokio::test]
    async fn test_weekly_buckets_start_monday() {
        let engine = seeded_engine().await;
        let mut filters = Filters::new();
        filters.insert("location".into(), json!("roof"));

        let points = engine
            .execute(
                &Role::from("user"),
                query(TimeBucket::Week, &filters, ts(2024, 5, 1, 0), ts(2024, 5, 31, 0)),
            )
            .await
            .unwrap();

        assert_eq!(points[0].time, ts(2024, 5, 6, 0));
        assert!((points[0].value - (20.0 + 22.0 + 25.0) / 3.0).abs() < 1e-9);
        assert_eq!(points[1].time, ts(2024, 5, 20, 0));
    }

    #[tokio::test]
    async fn test_driver_rows_are_sorted_and_cleaned() {
        let store = RecordingStore::new();
        store.respond_rows(vec![
            json!({"time": "2024-01-02 00:00:00", "value": "3.5"}),
            json!({"time": "2024-01-01T00:00:00Z", "value": 1.0}),
            json!({"time": "2024-01-03T00:00:00Z", "value": null}),
        ]);
        let engine = TimeSeriesEngine::new(context(store));
        let filters = Filters::new();

        let points = engine
            .execute(&Role::from("user"), query(TimeBucket::Day, &filters, ts(2024, 1, 1, 0), ts(2024, 1, 5, 0)))
            .await
            .unwrap();

        assert_eq!(points.len(), 2);
        assert_eq!(points[0].time, ts(2024, 1, 1, 0));
        assert_eq!(points[1].value, 3.5);
    }

    #[tokio::test]
    async fn test_rejections_happen_before_storage() {
        let store = RecordingStore::new();
        let engine = TimeSeriesEngine::new(context(store.clone()));
        let filters = Filters::new();

        let err = engine
            .execute(&Role::from("nobody"), query(TimeBucket::Day, &filters, ts(2024, 1, 1, 0), ts(2024, 1, 2, 0)))
            .await
            .unwrap_err();
        assert!(matches!(err, GateError::PermissionDenied { .. }));

        let err = engine
            .execute(&Role::from("user"), query(TimeBucket::Day, &filters, ts(2024, 1, 2, 0), ts(2024, 1, 1, 0)))
            .await
            .unwrap_err();
        assert!(matches!(err, GateError::BadRequest(_)));

        let mut bad = query(TimeBucket::Day, &filters, ts(2024, 1, 1, 0), ts(2024, 1, 2, 0));
        bad.value_column = "temperature) FROM users; --";
        let err = engine.execute(&Role::from("user"), bad).await.unwrap_err();
        assert!(matches!(err, GateError::BadRequest(_)));

        assert_eq!(store.call_count(), 0);
    }
}
