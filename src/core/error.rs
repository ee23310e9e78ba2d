//! Gate error types
//!
//! Every public operation returns [`GateResult`]. Each variant maps onto an
//! HTTP-like status so the tool-calling caller can react uniformly.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::entities::EntityType;
use crate::permissions::PermissionLevel;
use crate::sql::SqlRule;
use crate::storage::StorageError;

/// Errors that can occur while mediating data access
#[derive(Error, Debug)]
pub enum GateError {
    /// Caller lacks the required level on the entity
    #[error("Permission denied: role '{role}' lacks {level} access to {entity}")]
    PermissionDenied {
        role: String,
        entity: EntityType,
        level: PermissionLevel,
    },

    /// Record or function does not exist
    #[error("Not found: {0}")]
    NotFound(String),

    /// Input rejected before any storage access
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// Raw SQL statement rejected by the guard
    #[error("SQL policy violation: {rule} statements are not permitted for role '{role}'")]
    SqlPolicyViolation { rule: SqlRule, role: String },

    /// Storage driver failure. The source is kept for logging only.
    #[error("Database operation failed")]
    Storage {
        operation: &'static str,
        #[source]
        source: StorageError,
    },

    /// Unclassified failure inside a function handler
    #[error("Internal error: {0}")]
    Internal(String),

    /// Invalid configuration detected at startup
    #[error("Invalid configuration: {0}")]
    Config(String),
}

impl GateError {
    /// Create a bad request error
    pub fn bad_request(msg: impl Into<String>) -> Self {
        GateError::BadRequest(msg.into())
    }

    /// Create a not found error
    pub fn not_found(msg: impl Into<String>) -> Self {
        GateError::NotFound(msg.into())
    }

    /// Wrap a storage failure for the given operation
    pub fn storage(operation: &'static str, source: StorageError) -> Self {
        GateError::Storage { operation, source }
    }

    /// HTTP-like status code for this error
    pub fn status(&self) -> u16 {
        match self {
            GateError::PermissionDenied { .. } | GateError::SqlPolicyViolation { .. } => 403,
            GateError::NotFound(_) => 404,
            GateError::BadRequest(_) => 400,
            GateError::Storage { .. } | GateError::Internal(_) | GateError::Config(_) => 500,
        }
    }

    /// Short machine-readable error kind
    pub fn kind(&self) -> &'static str {
        match self {
            GateError::PermissionDenied { .. } => "permission_denied",
            GateError::NotFound(_) => "not_found",
            GateError::BadRequest(_) => "bad_request",
            GateError::SqlPolicyViolation { .. } => "sql_policy_violation",
            GateError::Storage { .. } => "storage_error",
            GateError::Internal(_) => "internal_error",
            GateError::Config(_) => "config_error",
        }
    }

    /// Serializable form handed back to the tool-calling caller
    pub fn to_payload(&self) -> ErrorPayload {
        ErrorPayload {
            status: self.status(),
            error: self.kind().to_string(),
            message: self.to_string(),
        }
    }
}

/// JSON-friendly error body
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorPayload {
    pub status: u16,
    pub error: String,
    pub message: String,
}

/// Result type alias for gate operations
pub type GateResult<T> = Result<T, GateError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = GateError::PermissionDenied {
            role: "user".into(),
            entity: EntityType::Task,
            level: PermissionLevel::Admin,
        };
        assert_eq!(
            err.to_string(),
            "Permission denied: role 'user' lacks ADMIN access to task"
        );
        assert_eq!(err.status(), 403);
    }

    #[test]
    fn test_storage_error_hides_driver_detail() {
        let err = GateError::storage(
            "query",
            StorageError::Query("relation \"secret_table\" does not exist".into()),
        );
        assert_eq!(err.to_string(), "Database operation failed");
        assert_eq!(err.status(), 500);

        let source = std::error::Error::source(&err).unwrap();
        assert!(source.to_string().contains("secret_table"));
    }

    #[test]
    fn test_payload() {
        let payload = GateError::not_found("task 7").to_payload();
        assert_eq!(payload.status, 404);
        assert_eq!(payload.error, "not_found");
        assert_eq!(payload.message, "Not found: task 7");
    }
}
