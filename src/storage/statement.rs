//! Statement builder
//!
//! Two binding paths, never mixed:
//! - values always become `$n` placeholders in `params`
//! - identifiers are only accepted as registry-validated [`Table`] / [`Column`]
//!
//! Each [`Statement`] carries both the rendered PostgreSQL text and the
//! structured [`Plan`] it was rendered from, so backends that do not speak
//! SQL can still execute it.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Datelike, Duration, TimeZone, Timelike, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::core::{EntityId, GateError};
use crate::entities::{Column, Table};

/// A validated column bound to a value
pub type Binding = (Column, Value);

/// Aggregate function, closed set
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AggregateFn {
    Count,
    Sum,
    Avg,
    Min,
    Max,
}

impl AggregateFn {
    fn sql_name(&self) -> &'static str {
        match self {
            AggregateFn::Count => "COUNT",
            AggregateFn::Sum => "SUM",
            AggregateFn::Avg => "AVG",
            AggregateFn::Min => "MIN",
            AggregateFn::Max => "MAX",
        }
    }
}

impl fmt::Display for AggregateFn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.sql_name().to_ascii_lowercase())
    }
}

impl FromStr for AggregateFn {
    type Err = GateError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "count" => Ok(AggregateFn::Count),
            "sum" => Ok(AggregateFn::Sum),
            "avg" => Ok(AggregateFn::Avg),
            "min" => Ok(AggregateFn::Min),
            "max" => Ok(AggregateFn::Max),
            _ => Err(GateError::bad_request(format!(
                "Invalid aggregation type '{}', expected one of count, sum, avg, min, max",
                s
            ))),
        }
    }
}

/// Time bucket width, closed set
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TimeBucket {
    Hour,
    Day,
    Week,
    Month,
}

impl TimeBucket {
    /// Unit name understood by `date_trunc`
    pub fn unit(&self) -> &'static str {
        match self {
            TimeBucket::Hour => "hour",
            TimeBucket::Day => "day",
            TimeBucket::Week => "week",
            TimeBucket::Month => "month",
        }
    }

    /// Start of the bucket containing `ts`
    ///
    /// Matches `date_trunc`: weeks start Monday 00:00, months on day 1.
    pub fn truncate(&self, ts: DateTime<Utc>) -> DateTime<Utc> {
        let date = ts.date_naive();
        let start = match self {
            TimeBucket::Hour => date.and_hms_opt(ts.hour(), 0, 0),
            TimeBucket::Day => date.and_hms_opt(0, 0, 0),
            TimeBucket::Week => {
                let monday = date - Duration::days(i64::from(date.weekday().num_days_from_monday()));
                monday.and_hms_opt(0, 0, 0)
            }
            TimeBucket::Month => date.with_day(1).and_then(|d| d.and_hms_opt(0, 0, 0)),
        };
        start.map(|naive| Utc.from_utc_datetime(&naive)).unwrap_or(ts)
    }
}

impl fmt::Display for TimeBucket {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.unit())
    }
}

impl FromStr for TimeBucket {
    type Err = GateError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "hour" => Ok(TimeBucket::Hour),
            "day" => Ok(TimeBucket::Day),
            "week" => Ok(TimeBucket::Week),
            "month" => Ok(TimeBucket::Month),
            _ => Err(GateError::bad_request(format!(
                "Invalid interval '{}', expected one of hour, day, week, month",
                s
            ))),
        }
    }
}

/// Structured form of a statement
#[derive(Debug, Clone, PartialEq)]
pub enum Plan {
    /// Filtered select ordered by id descending
    Select {
        table: Table,
        filters: Vec<Binding>,
        limit: Option<u64>,
        offset: u64,
    },
    Insert {
        table: Table,
        values: Vec<Binding>,
    },
    Update {
        table: Table,
        id: EntityId,
        values: Vec<Binding>,
    },
    Delete {
        table: Table,
        id: EntityId,
    },
    /// Single aggregate; `column: None` means `COUNT(*)`
    Aggregate {
        table: Table,
        function: AggregateFn,
        column: Option<Column>,
        filters: Vec<Binding>,
    },
    /// Bucketed averages over `[start, end]`
    TimeSeries {
        table: Table,
        bucket: TimeBucket,
        time_column: Column,
        value_column: Column,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        filters: Vec<Binding>,
    },
}

/// A single statement ready for a [`StorageClient`](super::StorageClient)
#[derive(Debug, Clone, PartialEq)]
pub struct Statement {
    /// PostgreSQL text with `$n` placeholders
    pub sql: String,
    /// Values bound to the placeholders, in order
    pub params: Vec<Value>,
    /// What the text does, for non-SQL backends
    pub plan: Plan,
}

impl Statement {
    /// `SELECT * ... WHERE id = $1 LIMIT 1`
    pub fn select_by_id(table: Table, id: EntityId) -> Self {
        Self::select(table, vec![(Column::ID, Value::from(id))], Some(1), 0)
    }

    /// `SELECT * ... ORDER BY id DESC LIMIT .. OFFSET ..`
    pub fn select(table: Table, filters: Vec<Binding>, limit: Option<u64>, offset: u64) -> Self {
        let mut w = SqlWriter::new(format!("SELECT * FROM {}", quote(table.as_str())));
        w.push_where(&filters, &[]);
        w.push(&format!(" ORDER BY {} DESC", quote(Column::ID.as_str())));
        if let Some(limit) = limit {
            let p = w.bind(Value::from(limit));
            w.push(&format!(" LIMIT {}", p));
        }
        if offset > 0 {
            let p = w.bind(Value::from(offset));
            w.push(&format!(" OFFSET {}", p));
        }
        w.finish(Plan::Select {
            table,
            filters,
            limit,
            offset,
        })
    }

    /// `INSERT ... RETURNING *`
    pub fn insert(table: Table, values: Vec<Binding>) -> Self {
        let mut w = SqlWriter::new(format!("INSERT INTO {}", quote(table.as_str())));
        if values.is_empty() {
            w.push(" DEFAULT VALUES");
        } else {
            let columns: Vec<String> = values.iter().map(|(c, _)| quote(c.as_str())).collect();
            let placeholders: Vec<String> = values.iter().map(|(_, v)| w.bind(v.clone())).collect();
            w.push(&format!(
                " ({}) VALUES ({})",
                columns.join(", "),
                placeholders.join(", ")
            ));
        }
        w.push(" RETURNING *");
        w.finish(Plan::Insert { table, values })
    }

    /// `UPDATE ... SET .. WHERE id = $n RETURNING *`
    pub fn update(table: Table, id: EntityId, values: Vec<Binding>) -> Self {
        let mut w = SqlWriter::new(format!("UPDATE {} SET ", quote(table.as_str())));
        let assignments: Vec<String> = values
            .iter()
            .map(|(c, v)| format!("{} = {}", quote(c.as_str()), w.bind(v.clone())))
            .collect();
        w.push(&assignments.join(", "));
        let p = w.bind(Value::from(id));
        w.push(&format!(" WHERE {} = {} RETURNING *", quote(Column::ID.as_str()), p));
        w.finish(Plan::Update { table, id, values })
    }

    /// `DELETE ... WHERE id = $1 RETURNING id`
    pub fn delete(table: Table, id: EntityId) -> Self {
        let mut w = SqlWriter::new(format!("DELETE FROM {}", quote(table.as_str())));
        let p = w.bind(Value::from(id));
        let id_col = quote(Column::ID.as_str());
        w.push(&format!(" WHERE {} = {} RETURNING {}", id_col, p, id_col));
        w.finish(Plan::Delete { table, id })
    }

    /// `SELECT COALESCE(fn(col), 0) AS value ...`
    pub fn aggregate(
        table: Table,
        function: AggregateFn,
        column: Option<Column>,
        filters: Vec<Binding>,
    ) -> Self {
        let target = column
            .map(|c| quote(c.as_str()))
            .unwrap_or_else(|| "*".to_string());
        let mut w = SqlWriter::new(format!(
            "SELECT COALESCE({}({}), 0) AS \"value\" FROM {}",
            function.sql_name(),
            target,
            quote(table.as_str())
        ));
        w.push_where(&filters, &[]);
        w.finish(Plan::Aggregate {
            table,
            function,
            column,
            filters,
        })
    }

    /// `SELECT date_trunc(..) AS time, AVG(..) AS value ... GROUP BY 1 ORDER BY 1 ASC`
    pub fn time_series(
        table: Table,
        bucket: TimeBucket,
        time_column: Column,
        value_column: Column,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        filters: Vec<Binding>,
    ) -> Self {
        let time = quote(time_column.as_str());
        let value = quote(value_column.as_str());
        let mut w = SqlWriter::new(format!(
            "SELECT date_trunc('{}', {}) AS \"time\", AVG({}) AS \"value\" FROM {}",
            bucket.unit(),
            time,
            value,
            quote(table.as_str())
        ));

        let from = w.bind(Value::from(start.to_rfc3339()));
        let to = w.bind(Value::from(end.to_rfc3339()));
        let fixed = [
            format!("{} >= {}::timestamptz", time, from),
            format!("{} <= {}::timestamptz", time, to),
            format!("{} IS NOT NULL", value),
        ];
        w.push_where(&filters, &fixed);
        w.push(" GROUP BY 1 ORDER BY 1 ASC");

        w.finish(Plan::TimeSeries {
            table,
            bucket,
            time_column,
            value_column,
            start,
            end,
            filters,
        })
    }
}

fn quote(ident: &str) -> String {
    format!("\"{}\"", ident)
}

/// Accumulates statement text and bound values
struct SqlWriter {
    sql: String,
    params: Vec<Value>,
}

impl SqlWriter {
    fn new(head: String) -> Self {
        Self {
            sql: head,
            params: Vec::new(),
        }
    }

    fn push(&mut self, text: &str) {
        self.sql.push_str(text);
    }

    /// Add a value and return its placeholder
    fn bind(&mut self, value: Value) -> String {
        self.params.push(value);
        format!("${}", self.params.len())
    }

    /// `WHERE` clause from fixed predicates followed by equality filters
    fn push_where(&mut self, filters: &[Binding], fixed: &[String]) {
        let mut predicates: Vec<String> = fixed.to_vec();
        for (column, value) in filters {
            if value.is_null() {
                predicates.push(format!("{} IS NULL", quote(column.as_str())));
            } else {
                let p = self.bind(value.clone());
                predicates.push(format!("{} = {}", quote(column.as_str()), p));
            }
        }
        if !predicates.is_empty() {
            self.sql.push_str(" WHERE ");
            self.sql.push_str(&predicates.join(" AND "));
        }
    }

    fn finish(self, plan: Plan) -> Statement {
        Statement {
            sql: self.sql,
            params: self.params,
            plan,
        }
    }
}
