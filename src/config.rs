//! Gate configuration
//!
//! Loaded once at startup from a JSON file. Every field has a default, so an
//! empty object is a valid configuration.
//!
//! ```json
//! {
//!   "query": { "default_limit": 100, "max_limit": 1000 },
//!   "logging": { "filter": "agent_data_gate=info", "json": false, "directory": "logs" },
//!   "permissions": { "auditor": { "power_data": ["read"] } }
//! }
//! ```

use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::core::{GateError, GateResult};
use crate::permissions::{PermissionGrants, PermissionMatrix};

/// Paging limits for entity queries
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueryConfig {
    /// Limit used when the caller gives none
    #[serde(default = "default_limit")]
    pub default_limit: u64,

    /// Upper bound applied to caller-supplied limits
    #[serde(default = "default_max_limit")]
    pub max_limit: u64,
}

fn default_limit() -> u64 {
    100
}

fn default_max_limit() -> u64 {
    1000
}

impl Default for QueryConfig {
    fn default() -> Self {
        Self {
            default_limit: default_limit(),
            max_limit: default_max_limit(),
        }
    }
}

impl QueryConfig {
    /// Effective limit for a request
    pub fn effective_limit(&self, requested: Option<u64>) -> u64 {
        requested.unwrap_or(self.default_limit).min(self.max_limit)
    }
}

/// Logging output settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// `EnvFilter` directive; `RUST_LOG` takes precedence when set
    #[serde(default = "default_filter")]
    pub filter: String,

    /// Emit JSON lines instead of human-readable output
    #[serde(default)]
    pub json: bool,

    /// Directory for daily rolling log files (stdout only when unset)
    #[serde(default)]
    pub directory: Option<PathBuf>,

    /// File name prefix for rolling log files
    #[serde(default = "default_file_prefix")]
    pub file_prefix: String,
}

fn default_filter() -> String {
    "agent_data_gate=info".to_string()
}

fn default_file_prefix() -> String {
    "agent-data-gate.log".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            filter: default_filter(),
            json: false,
            directory: None,
            file_prefix: default_file_prefix(),
        }
    }
}

/// Top-level configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GateConfig {
    #[serde(default)]
    pub query: QueryConfig,

    #[serde(default)]
    pub logging: LoggingConfig,

    /// Replaces the standard grant table when present
    #[serde(default)]
    pub permissions: Option<PermissionGrants>,
}

impl GateConfig {
    /// Create a configuration with defaults
    pub fn new() -> Self {
        Self::default()
    }

    /// Load a configuration file
    pub fn from_file(path: impl AsRef<Path>) -> GateResult<Self> {
        let path = path.as_ref();
        let file = File::open(path).map_err(|e| {
            GateError::Config(format!("Cannot open {}: {}", path.display(), e))
        })?;
        let config: GateConfig = serde_json::from_reader(BufReader::new(file)).map_err(|e| {
            GateError::Config(format!("Cannot parse {}: {}", path.display(), e))
        })?;
        config.validate()?;

        tracing::info!("[GateConfig] Loaded configuration from {}", path.display());
        Ok(config)
    }

    /// Check limits are usable
    pub fn validate(&self) -> GateResult<()> {
        if self.query.max_limit == 0 {
            return Err(GateError::Config("query.max_limit must be positive".to_string()));
        }
        if self.query.default_limit == 0 || self.query.default_limit > self.query.max_limit {
            return Err(GateError::Config(format!(
                "query.default_limit must be between 1 and {}",
                self.query.max_limit
            )));
        }
        Ok(())
    }

    /// Set paging limits
    pub fn with_limits(mut self, default_limit: u64, max_limit: u64) -> Self {
        self.query = QueryConfig {
            default_limit,
            max_limit,
        };
        self
    }

    /// Set logging options
    pub fn with_logging(mut self, logging: LoggingConfig) -> Self {
        self.logging = logging;
        self
    }

    /// Replace the standard grant table
    pub fn with_permissions(mut self, grants: PermissionGrants) -> Self {
        self.permissions = Some(grants);
        self
    }

    /// Build the permission matrix this configuration describes
    pub fn permission_matrix(&self) -> PermissionMatrix {
        match &self.permissions {
            Some(grants) => PermissionMatrix::from_grants(grants),
            None => PermissionMatrix::standard(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entities::EntityType;
    use crate::permissions::{PermissionLevel, Role};
    use std::io::Write;

    #[test]
    fn test_defaults() {
        let config: GateConfig = serde_json::from_str("{}").unwrap();
        assert_eq!(config.query.default_limit, 100);
        assert_eq!(config.query.max_limit, 1000);
        assert_eq!(config.logging.filter, "agent_data_gate=info");
        assert!(config.permissions.is_none());
        config.validate().unwrap();
    }

    #[test]
    fn test_effective_limit() {
        let query = QueryConfig::default();
        assert_eq!(query.effective_limit(None), 100);
        assert_eq!(query.effective_limit(Some(5)), 5);
        assert_eq!(query.effective_limit(Some(50_000)), 1000);
    }

    #[test]
    fn test_invalid_limits() {
        assert!(GateConfig::new().with_limits(0, 10).validate().is_err());
        assert!(GateConfig::new().with_limits(20, 10).validate().is_err());
    }

    #[test]
    fn test_from_file_with_permissions() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{"query": {{"max_limit": 50, "default_limit": 25}},
                "permissions": {{"auditor": {{"power_data": ["read"]}}}}}}"#
        )
        .unwrap();

        let config = GateConfig::from_file(file.path()).unwrap();
        assert_eq!(config.query.max_limit, 50);

        let matrix = config.permission_matrix();
        let auditor = Role::from("auditor");
        assert!(matrix.has_permission(&auditor, EntityType::PowerData, PermissionLevel::Read));
        // Configured grants replace the standard table
        assert!(!matrix.has_permission(&Role::from("user"), EntityType::PowerData, PermissionLevel::Read));
    }

    #[test]
    fn test_from_file_errors() {
        assert!(matches!(
            GateConfig::from_file("/nonexistent/gate.json"),
            Err(GateError::Config(_))
        ));

        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "not json").unwrap();
        assert!(GateConfig::from_file(file.path()).is_err());
    }
}
