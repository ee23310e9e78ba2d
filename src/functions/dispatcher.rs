//! Function dispatcher
//!
//! Resolves a call by name, enforces the registration's declared permission,
//! resolves parameters and runs the handler. Typed gate errors raised inside
//! handlers keep their status; anything else is reported as internal.

use std::sync::Arc;

use serde_json::Value;
use tracing::Instrument;
use uuid::Uuid;

use super::handlers::{self, DataServices};
use super::registry::FunctionRegistry;
use crate::core::{GateError, GateResult};
use crate::permissions::Role;
use crate::query::GateContext;

/// Executes registered functions on behalf of a role
#[derive(Debug, Clone)]
pub struct FunctionDispatcher {
    registry: Arc<FunctionRegistry>,
    services: DataServices,
    ctx: GateContext,
}

impl FunctionDispatcher {
    pub fn new(registry: Arc<FunctionRegistry>, ctx: GateContext) -> Self {
        Self {
            registry,
            services: DataServices::new(ctx.clone()),
            ctx,
        }
    }

    pub fn registry(&self) -> &FunctionRegistry {
        &self.registry
    }

    /// Execute a function by name
    pub async fn execute(&self, name: &str, params: &Value, role: &Role) -> GateResult<Value> {
        let call_id = Uuid::new_v4();
        let span = tracing::info_span!("function_call", %call_id, function = name, role = %role);
        self.dispatch(name, params, role).instrument(span).await
    }

    async fn dispatch(&self, name: &str, params: &Value, role: &Role) -> GateResult<Value> {
        let registration = self
            .registry
            .get(name)
            .ok_or_else(|| GateError::not_found(format!("Function '{}' not found", name)))?;

        self.ctx.permissions().require(
            role,
            registration.required_entity,
            registration.required_level,
        )?;

        let resolved = registration.resolve_params(params)?;
        tracing::info!("[FunctionDispatcher] Executing '{}'", name);
        tracing::debug!("[FunctionDispatcher] Params: {}", serde_json::Value::Object(resolved.clone()));

        match handlers::execute(registration.name, &self.services, &resolved, role).await {
            Ok(value) => {
                tracing::debug!("[FunctionDispatcher] '{}' completed", name);
                Ok(value)
            }
            Err(err) => Err(classify_failure(name, err)),
        }
    }
}

fn classify_failure(name: &str, err: anyhow::Error) -> GateError {
    match err.downcast::<GateError>() {
        Ok(gate) => {
            tracing::warn!("[FunctionDispatcher] '{}' failed: {}", name, gate);
            gate
        }
        Err(other) => {
            tracing::error!("[FunctionDispatcher] '{}' failed: {:#}", name, other);
            GateError::Internal(format!("Function '{}' failed", name))
        }
    }
}
