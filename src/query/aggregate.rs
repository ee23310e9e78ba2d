//! Aggregate statistics over a filtered entity set

use serde_json::Value;

use crate::core::{Filters, GateError, GateResult};
use crate::entities::EntityType;
use crate::permissions::{PermissionLevel, Role};
use crate::storage::{AggregateFn, Statement};

use super::context::GateContext;

/// count/sum/avg/min/max over one column, READ required
#[derive(Debug, Clone)]
pub struct AggregationEngine {
    ctx: GateContext,
}

impl AggregationEngine {
    pub fn new(ctx: GateContext) -> Self {
        Self { ctx }
    }

    /// Compute one aggregate
    ///
    /// `column` may be `*` for `count`. An empty set yields `0.0` for every
    /// function.
    pub async fn aggregate(
        &self,
        role: &Role,
        entity: EntityType,
        column: &str,
        function: AggregateFn,
        filters: &Filters,
    ) -> GateResult<f64> {
        self.ctx.permissions().require(role, entity, PermissionLevel::Read)?;
        let table = self.ctx.entities().resolve_table(entity)?;

        let column = match (function, column) {
            (AggregateFn::Count, "*") => None,
            (_, "*") => {
                return Err(GateError::bad_request(format!(
                    "'*' is only valid for count, not {}",
                    function
                )))
            }
            (_, name) => Some(self.ctx.entities().column(entity, name)?),
        };
        let bindings = self.ctx.bind_columns(entity, filters.iter())?;

        let rows = self
            .ctx
            .run(
                "aggregate",
                entity,
                Statement::aggregate(table, function, column, bindings),
            )
            .await?;

        Ok(rows
            .first()
            .and_then(|row| row.get("value"))
            .map(numeric)
            .unwrap_or(0.0))
    }

    /// Same as [`aggregate`](Self::aggregate) with the function given as text
    pub async fn aggregate_named(
        &self,
        role: &Role,
        entity: EntityType,
        column: &str,
        function: &str,
        filters: &Filters,
    ) -> GateResult<f64> {
        self.ctx.permissions().require(role, entity, PermissionLevel::Read)?;
        let function: AggregateFn = function.parse()?;
        self.aggregate(role, entity, column, function, filters).await
    }
}

/// Drivers may return numerics as strings (e.g. NUMERIC); null means empty
fn numeric(value: &Value) -> f64 {
    match value {
        Value::Number(n) => n.as_f64().unwrap_or(0.0),
        Value::String(s) => s.trim().parse().unwrap_or(0.0),
        _ => 0.0,
    }
}
