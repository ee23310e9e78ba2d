//! Logical entity kinds the gate can mediate access to

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::core::GateError;

/// Closed set of logical resources
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityType {
    PowerData,
    EnvironmentalData,
    Equipment,
    /// Per-user dashboard settings
    Settings,
    User,
    Conversation,
    Message,
    Task,
    Function,
    /// System-wide agent settings
    Setting,
    Notification,
    Issue,
    Comment,
}

impl EntityType {
    /// Every entity type, in declaration order
    pub const ALL: [EntityType; 13] = [
        EntityType::PowerData,
        EntityType::EnvironmentalData,
        EntityType::Equipment,
        EntityType::Settings,
        EntityType::User,
        EntityType::Conversation,
        EntityType::Message,
        EntityType::Task,
        EntityType::Function,
        EntityType::Setting,
        EntityType::Notification,
        EntityType::Issue,
        EntityType::Comment,
    ];

    /// Stable snake_case identifier
    pub fn as_str(&self) -> &'static str {
        match self {
            EntityType::PowerData => "power_data",
            EntityType::EnvironmentalData => "environmental_data",
            EntityType::Equipment => "equipment",
            EntityType::Settings => "settings",
            EntityType::User => "user",
            EntityType::Conversation => "conversation",
            EntityType::Message => "message",
            EntityType::Task => "task",
            EntityType::Function => "function",
            EntityType::Setting => "setting",
            EntityType::Notification => "notification",
            EntityType::Issue => "issue",
            EntityType::Comment => "comment",
        }
    }
}

impl fmt::Display for EntityType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EntityType {
    type Err = GateError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_ascii_lowercase().replace('-', "_");
        EntityType::ALL
            .iter()
            .copied()
            .find(|e| e.as_str() == normalized)
            .ok_or_else(|| GateError::bad_request(format!("Unknown entity type: {}", s)))
    }
}
