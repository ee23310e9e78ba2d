//! Function catalog for the agent
//!
//! The agent calls named functions with JSON parameters. Each
//! [`FunctionRegistration`] declares the (entity, level) a caller must hold,
//! which the [`FunctionDispatcher`] enforces before any handler runs.
//!
//! # Example
//!
//! ```no_run
//! use agent_data_gate::functions::FunctionDispatcher;
//! use agent_data_gate::permissions::Role;
//! # async fn run(dispatcher: FunctionDispatcher) -> agent_data_gate::core::GateResult<()> {
//! let tasks = dispatcher
//!     .execute("list_tasks", &serde_json::json!({"status": "open"}), &Role::from("operator"))
//!     .await?;
//! # Ok(())
//! # }
//! ```

mod catalog;
mod dispatcher;
mod handlers;
mod registration;
mod registry;

pub use dispatcher::FunctionDispatcher;
pub use handlers::DataServices;
pub use registration::{
    FunctionName, FunctionRegistration, ParamType, ParameterSpec, ToolDefinition, ToolInputSchema,
};
pub use registry::FunctionRegistry;
