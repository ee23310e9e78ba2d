//! Function handlers
//!
//! One arm per [`FunctionName`]. Handlers receive parameters already resolved
//! against the registration's schema and call into the engines, which check
//! permissions again on their own.

use anyhow::Result;
use chrono::{DateTime, Utc};
use serde_json::{json, Map, Value};

use super::registration::FunctionName;
use crate::core::{parse_timestamp, EntityId, Filters, GateError, Record};
use crate::entities::EntityType;
use crate::permissions::Role;
use crate::query::{
    AggregateFn, AggregationEngine, GateContext, QueryMediator, TimeBucket, TimeSeriesEngine,
    TimeSeriesQuery,
};

/// Engines available to handlers
#[derive(Debug, Clone)]
pub struct DataServices {
    pub mediator: QueryMediator,
    pub aggregates: AggregationEngine,
    pub time_series: TimeSeriesEngine,
}

impl DataServices {
    pub fn new(ctx: GateContext) -> Self {
        Self {
            mediator: QueryMediator::new(ctx.clone()),
            aggregates: AggregationEngine::new(ctx.clone()),
            time_series: TimeSeriesEngine::new(ctx),
        }
    }
}

/// Read access to resolved parameters
struct Params<'a>(&'a Map<String, Value>);

impl<'a> Params<'a> {
    fn str(&self, name: &str) -> Option<&'a str> {
        self.0.get(name).and_then(Value::as_str)
    }

    fn i64(&self, name: &str) -> Option<i64> {
        self.0.get(name).and_then(Value::as_i64)
    }

    fn u64(&self, name: &str) -> Option<u64> {
        self.i64(name).map(|v| v.max(0) as u64)
    }

    fn require_str(&self, name: &str) -> Result<&'a str, GateError> {
        self.str(name)
            .ok_or_else(|| GateError::bad_request(format!("Missing parameter '{}'", name)))
    }

    fn require_id(&self, name: &str) -> Result<EntityId, GateError> {
        self.i64(name)
            .ok_or_else(|| GateError::bad_request(format!("Missing parameter '{}'", name)))
    }

    fn require_time(&self, name: &str) -> Result<DateTime<Utc>, GateError> {
        self.str(name)
            .and_then(parse_timestamp)
            .ok_or_else(|| GateError::bad_request(format!("Missing or invalid timestamp '{}'", name)))
    }

    /// Copy the named parameters that are present into a filter set
    fn filters(&self, names: &[&str]) -> Filters {
        names
            .iter()
            .filter_map(|name| self.0.get(*name).map(|v| (name.to_string(), v.clone())))
            .collect()
    }

    /// Copy the named parameters that are present into a write payload
    fn record(&self, names: &[&str]) -> Record {
        names
            .iter()
            .filter_map(|name| self.0.get(*name).map(|v| (name.to_string(), v.clone())))
            .collect()
    }
}

/// Run the handler for `name`
pub async fn execute(
    name: FunctionName,
    services: &DataServices,
    params: &Map<String, Value>,
    role: &Role,
) -> Result<Value> {
    let p = Params(params);
    let mediator = &services.mediator;

    let value = match name {
        FunctionName::GetPowerData => {
            let rows = mediator
                .query(role, EntityType::PowerData, &p.filters(&["equipment_id"]), p.u64("limit"), p.u64("offset"))
                .await?;
            json!(rows)
        }
        FunctionName::GetEnvironmentalData => {
            let rows = mediator
                .query(role, EntityType::EnvironmentalData, &p.filters(&["location"]), p.u64("limit"), p.u64("offset"))
                .await?;
            json!(rows)
        }
        FunctionName::GetPowerStatistics => {
            statistics(services, role, EntityType::PowerData, &p, &["equipment_id"]).await?
        }
        FunctionName::GetEnvironmentalStatistics => {
            statistics(services, role, EntityType::EnvironmentalData, &p, &["location"]).await?
        }
        FunctionName::GetPowerTimeSeries => {
            time_series(services, role, EntityType::PowerData, &p, &["equipment_id"]).await?
        }
        FunctionName::GetEnvironmentalTimeSeries => {
            time_series(services, role, EntityType::EnvironmentalData, &p, &["location"]).await?
        }
        FunctionName::ListEquipment => {
            let rows = mediator
                .query(role, EntityType::Equipment, &p.filters(&["status", "type", "location"]), p.u64("limit"), None)
                .await?;
            json!(rows)
        }
        FunctionName::GetEquipment => {
            json!(mediator.get_by_id(role, EntityType::Equipment, p.require_id("id")?).await?)
        }
        FunctionName::UpdateEquipmentStatus => {
            let data = p.record(&["status"]);
            json!(mediator.update(role, EntityType::Equipment, p.require_id("id")?, &data).await?)
        }
        FunctionName::ListTasks => {
            let rows = mediator
                .query(
                    role,
                    EntityType::Task,
                    &p.filters(&["status", "priority", "assigned_to", "equipment_id"]),
                    p.u64("limit"),
                    p.u64("offset"),
                )
                .await?;
            json!(rows)
        }
        FunctionName::CreateTask => {
            let data = p.record(&[
                "title",
                "description",
                "status",
                "priority",
                "assigned_to",
                "equipment_id",
                "due_date",
            ]);
            json!(mediator.create(role, EntityType::Task, &data).await?)
        }
        FunctionName::UpdateTask => {
            let data = p.record(&["title", "description", "status", "priority", "assigned_to", "due_date"]);
            json!(mediator.update(role, EntityType::Task, p.require_id("id")?, &data).await?)
        }
        FunctionName::DeleteTask => {
            let id = p.require_id("id")?;
            let deleted = mediator.delete(role, EntityType::Task, id).await?;
            json!({ "id": id, "deleted": deleted })
        }
        FunctionName::ListIssues => {
            let rows = mediator
                .query(role, EntityType::Issue, &p.filters(&["status", "priority", "equipment_id"]), p.u64("limit"), None)
                .await?;
            json!(rows)
        }
        FunctionName::CreateIssue => {
            let data = p.record(&["title", "description", "status", "priority", "equipment_id", "reported_by"]);
            json!(mediator.create(role, EntityType::Issue, &data).await?)
        }
        FunctionName::AddComment => {
            let issue_id = p.require_id("issue_id")?;
            // Comments on missing issues are refused up front
            mediator.get_by_id(role, EntityType::Issue, issue_id).await?;
            let data = p.record(&["issue_id", "user_id", "content"]);
            json!(mediator.create(role, EntityType::Comment, &data).await?)
        }
        FunctionName::CreateNotification => {
            let mut data = p.record(&["user_id", "title", "message", "type", "severity"]);
            data.insert("read".to_string(), json!(false));
            json!(mediator.create(role, EntityType::Notification, &data).await?)
        }
        FunctionName::ListSettings => {
            let rows = mediator
                .query(role, EntityType::Setting, &p.filters(&["category"]), None, None)
                .await?;
            json!(rows)
        }
        FunctionName::UpdateSetting => {
            let mut data = p.record(&["value"]);
            data.insert("updated_at".to_string(), json!(Utc::now().to_rfc3339()));
            json!(mediator.update(role, EntityType::Setting, p.require_id("id")?, &data).await?)
        }
    };

    Ok(value)
}

async fn statistics(
    services: &DataServices,
    role: &Role,
    entity: EntityType,
    p: &Params<'_>,
    filter_names: &[&str],
) -> Result<Value> {
    let column = p.require_str("column")?;
    let function: AggregateFn = p.require_str("aggregation")?.parse()?;
    let value = services
        .aggregates
        .aggregate(role, entity, column, function, &p.filters(filter_names))
        .await?;

    Ok(json!({
        "column": column,
        "aggregation": function,
        "value": value,
    }))
}

async fn time_series(
    services: &DataServices,
    role: &Role,
    entity: EntityType,
    p: &Params<'_>,
    filter_names: &[&str],
) -> Result<Value> {
    let bucket: TimeBucket = p.require_str("interval")?.parse()?;
    let filters = p.filters(filter_names);
    let points = services
        .time_series
        .execute(
            role,
            TimeSeriesQuery {
                entity,
                time_column: "timestamp",
                value_column: p.require_str("value_column")?,
                bucket,
                start: p.require_time("start")?,
                end: p.require_time("end")?,
                filters: &filters,
            },
        )
        .await?;

    Ok(serde_json::to_value(points)?)
}
