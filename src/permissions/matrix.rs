//! Permission matrix implementation
//!
//! A static role → entity → levels table. Built once at startup, shared
//! behind an `Arc`, never mutated afterwards.

use std::collections::{HashMap, HashSet};
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::core::{GateError, GateResult};
use crate::entities::EntityType;

/// Role that bypasses the matrix entirely
pub const ADMIN_ROLE: &str = "admin";

/// Role allowed to run data-modifying raw SQL alongside `admin`
pub const MANAGER_ROLE: &str = "manager";

/// Caller privilege class, resolved by the auth layer before reaching the gate
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Role(String);

impl Role {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Exact match on `admin`; no case folding
    pub fn is_admin(&self) -> bool {
        self.0 == ADMIN_ROLE
    }

    pub fn is_manager(&self) -> bool {
        self.0 == MANAGER_ROLE
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for Role {
    fn from(value: &str) -> Self {
        Role::new(value)
    }
}

impl From<String> for Role {
    fn from(value: String) -> Self {
        Role(value)
    }
}

/// Grant level on an entity
///
/// Ordered by privilege, but a grant of one level never implies another:
/// `Write` does not include `Read`, and only `Admin` allows deletion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PermissionLevel {
    #[serde(alias = "READ")]
    Read,
    #[serde(alias = "WRITE")]
    Write,
    #[serde(alias = "ADMIN")]
    Admin,
}

impl fmt::Display for PermissionLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PermissionLevel::Read => f.write_str("READ"),
            PermissionLevel::Write => f.write_str("WRITE"),
            PermissionLevel::Admin => f.write_str("ADMIN"),
        }
    }
}

impl std::str::FromStr for PermissionLevel {
    type Err = GateError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "read" => Ok(PermissionLevel::Read),
            "write" => Ok(PermissionLevel::Write),
            "admin" => Ok(PermissionLevel::Admin),
            other => Err(GateError::bad_request(format!(
                "Unknown permission level: {}",
                other
            ))),
        }
    }
}

/// Serialized form of the grant table: role → entity → levels
pub type PermissionGrants = HashMap<String, HashMap<EntityType, Vec<PermissionLevel>>>;

/// Immutable role → entity → levels table
#[derive(Debug, Clone, Default)]
pub struct PermissionMatrix {
    grants: HashMap<Role, HashMap<EntityType, HashSet<PermissionLevel>>>,
}

impl PermissionMatrix {
    /// Start building a matrix
    pub fn builder() -> PermissionMatrixBuilder {
        PermissionMatrixBuilder::default()
    }

    /// Build from a serialized grant table
    pub fn from_grants(grants: &PermissionGrants) -> Self {
        let mut builder = Self::builder();
        for (role, entities) in grants {
            for (entity, levels) in entities {
                builder = builder.grant(role.as_str(), *entity, levels);
            }
        }
        builder.build()
    }

    /// The dashboard's default grant table
    pub fn standard() -> Self {
        use EntityType::*;
        use PermissionLevel::{Admin, Read, Write};

        let mut builder = Self::builder();

        for entity in [
            PowerData,
            EnvironmentalData,
            Equipment,
            Settings,
            Conversation,
            Message,
            Task,
            Notification,
            Issue,
            Comment,
            Setting,
        ] {
            builder = builder.grant("user", entity, &[Read]);
        }
        for entity in [Conversation, Message, Issue, Comment] {
            builder = builder.grant("user", entity, &[Write]);
        }

        for entity in EntityType::ALL {
            if !matches!(entity, User | Function) {
                builder = builder.grant("operator", entity, &[Read]);
            }
        }
        for entity in [
            PowerData,
            EnvironmentalData,
            Equipment,
            Task,
            Issue,
            Comment,
            Notification,
            Conversation,
            Message,
        ] {
            builder = builder.grant("operator", entity, &[Write]);
        }

        for entity in EntityType::ALL {
            builder = builder.grant("manager", entity, &[Read]);
            if !matches!(entity, User | Function) {
                builder = builder.grant("manager", entity, &[Write]);
            }
        }
        for entity in [Task, Issue, Comment, Notification, Conversation, Message] {
            builder = builder.grant("manager", entity, &[Admin]);
        }

        builder.build()
    }

    /// Check whether a role holds a level on an entity
    ///
    /// `admin` is always permitted. Unknown roles hold nothing.
    pub fn has_permission(&self, role: &Role, entity: EntityType, level: PermissionLevel) -> bool {
        if role.is_admin() {
            return true;
        }

        self.grants
            .get(role)
            .and_then(|entities| entities.get(&entity))
            .map(|levels| levels.contains(&level))
            .unwrap_or(false)
    }

    /// Like [`has_permission`](Self::has_permission) but returns `PermissionDenied`
    pub fn require(&self, role: &Role, entity: EntityType, level: PermissionLevel) -> GateResult<()> {
        if self.has_permission(role, entity, level) {
            Ok(())
        } else {
            tracing::warn!(
                "[PermissionMatrix] Denied {} on {} for role '{}'",
                level,
                entity,
                role
            );
            Err(GateError::PermissionDenied {
                role: role.to_string(),
                entity,
                level,
            })
        }
    }

    /// Levels granted to a role on an entity, sorted by privilege
    pub fn levels_for(&self, role: &Role, entity: EntityType) -> Vec<PermissionLevel> {
        let mut levels: Vec<_> = self
            .grants
            .get(role)
            .and_then(|entities| entities.get(&entity))
            .map(|levels| levels.iter().copied().collect())
            .unwrap_or_default();
        levels.sort();
        levels
    }

    /// Roles listed in the table (`admin` is implicit and never listed)
    pub fn roles(&self) -> Vec<&Role> {
        self.grants.keys().collect()
    }
}

/// Builder for [`PermissionMatrix`]
#[derive(Debug, Default)]
pub struct PermissionMatrixBuilder {
    grants: HashMap<Role, HashMap<EntityType, HashSet<PermissionLevel>>>,
}

impl PermissionMatrixBuilder {
    /// Grant levels on an entity to a role
    pub fn grant(
        mut self,
        role: impl Into<Role>,
        entity: EntityType,
        levels: &[PermissionLevel],
    ) -> Self {
        let role = role.into();
        if role.is_admin() {
            tracing::debug!("[PermissionMatrix] Ignoring explicit grants for admin");
            return self;
        }
        self.grants
            .entry(role)
            .or_default()
            .entry(entity)
            .or_default()
            .extend(levels.iter().copied());
        self
    }

    /// Freeze the table
    pub fn build(self) -> PermissionMatrix {
        tracing::info!(
            "[PermissionMatrix] Built grant table for {} roles",
            self.grants.len()
        );
        PermissionMatrix {
            grants: self.grants,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use PermissionLevel::{Admin, Read, Write};

    #[test]
    fn test_admin_always_permitted() {
        let matrix = PermissionMatrix::builder().build();
        let admin = Role::from("admin");

        for entity in EntityType::ALL {
            for level in [Read, Write, Admin] {
                assert!(matrix.has_permission(&admin, entity, level));
            }
        }
    }

    #[test]
    fn test_unknown_role_fails_closed() {
        let matrix = PermissionMatrix::standard();
        let stranger = Role::from("contractor");

        for entity in EntityType::ALL {
            for level in [Read, Write, Admin] {
                assert!(!matrix.has_permission(&stranger, entity, level));
            }
        }
    }

    #[test]
    fn test_role_names_are_case_sensitive() {
        let matrix = PermissionMatrix::standard();
        assert!(!matrix.has_permission(&Role::from("ADMIN"), EntityType::User, Read));
    }

    #[test]
    fn test_write_does_not_imply_read_or_admin() {
        let matrix = PermissionMatrix::builder()
            .grant("writer", EntityType::Task, &[Write])
            .build();
        let writer = Role::from("writer");

        assert!(matrix.has_permission(&writer, EntityType::Task, Write));
        assert!(!matrix.has_permission(&writer, EntityType::Task, Read));
        assert!(!matrix.has_permission(&writer, EntityType::Task, Admin));
    }

    #[test]
    fn test_standard_table() {
        let matrix = PermissionMatrix::standard();
        let user = Role::from("user");
        let operator = Role::from("operator");
        let manager = Role::from("manager");

        assert!(matrix.has_permission(&user, EntityType::PowerData, Read));
        assert!(!matrix.has_permission(&user, EntityType::PowerData, Write));
        assert!(!matrix.has_permission(&user, EntityType::User, Read));

        assert!(matrix.has_permission(&operator, EntityType::Task, Write));
        assert!(!matrix.has_permission(&operator, EntityType::Task, Admin));

        assert!(matrix.has_permission(&manager, EntityType::Task, Admin));
        assert!(!matrix.has_permission(&manager, EntityType::Equipment, Admin));
        assert!(!matrix.has_permission(&manager, EntityType::Function, Write));
    }

    #[test]
    fn test_require_reports_denial() {
        let matrix = PermissionMatrix::standard();
        let err = matrix
            .require(&Role::from("user"), EntityType::Equipment, Write)
            .unwrap_err();
        assert!(matches!(
            err,
            GateError::PermissionDenied { entity: EntityType::Equipment, level: Write, .. }
        ));
    }

    #[test]
    fn test_from_grants() {
        let grants: PermissionGrants = serde_json::from_str(
            r#"{"auditor": {"power_data": ["read"], "issue": ["READ", "write"]}}"#,
        )
        .unwrap();
        let matrix = PermissionMatrix::from_grants(&grants);
        let auditor = Role::from("auditor");

        assert!(matrix.has_permission(&auditor, EntityType::PowerData, Read));
        assert_eq!(matrix.levels_for(&auditor, EntityType::Issue), vec![Read, Write]);
        assert!(!matrix.has_permission(&auditor, EntityType::Task, Read));
    }
}
