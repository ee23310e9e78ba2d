//! Permission-gated query engines
//!
//! - `QueryMediator` - get/query/create/update/delete
//! - `AggregationEngine` - count/sum/avg/min/max
//! - `TimeSeriesEngine` - bucketed averages
//!
//! All three share a [`GateContext`] and check the permission matrix before
//! building a statement.

mod aggregate;
mod context;
mod mediator;
mod timeseries;

pub use aggregate::AggregationEngine;
pub use context::GateContext;
pub use mediator::QueryMediator;
pub use timeseries::{TimeSeriesEngine, TimeSeriesPoint, TimeSeriesQuery};

pub use crate::storage::{AggregateFn, TimeBucket};
