//! Function registration types
//!
//! A registration binds a [`FunctionName`] to its parameter schema and the
//! (entity, level) the caller must hold. Handlers are selected by matching on
//! the name, so adding a variant without a handler does not compile.

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};

use crate::core::{parse_timestamp, GateError, GateResult};
use crate::entities::EntityType;
use crate::permissions::PermissionLevel;

/// Every function the agent can call
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FunctionName {
    GetPowerData,
    GetEnvironmentalData,
    GetPowerStatistics,
    GetEnvironmentalStatistics,
    GetPowerTimeSeries,
    GetEnvironmentalTimeSeries,
    ListEquipment,
    GetEquipment,
    UpdateEquipmentStatus,
    ListTasks,
    CreateTask,
    UpdateTask,
    DeleteTask,
    ListIssues,
    CreateIssue,
    AddComment,
    CreateNotification,
    ListSettings,
    UpdateSetting,
}

impl FunctionName {
    pub const ALL: [FunctionName; 19] = [
        FunctionName::GetPowerData,
        FunctionName::GetEnvironmentalData,
        FunctionName::GetPowerStatistics,
        FunctionName::GetEnvironmentalStatistics,
        FunctionName::GetPowerTimeSeries,
        FunctionName::GetEnvironmentalTimeSeries,
        FunctionName::ListEquipment,
        FunctionName::GetEquipment,
        FunctionName::UpdateEquipmentStatus,
        FunctionName::ListTasks,
        FunctionName::CreateTask,
        FunctionName::UpdateTask,
        FunctionName::DeleteTask,
        FunctionName::ListIssues,
        FunctionName::CreateIssue,
        FunctionName::AddComment,
        FunctionName::CreateNotification,
        FunctionName::ListSettings,
        FunctionName::UpdateSetting,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            FunctionName::GetPowerData => "get_power_data",
            FunctionName::GetEnvironmentalData => "get_environmental_data",
            FunctionName::GetPowerStatistics => "get_power_statistics",
            FunctionName::GetEnvironmentalStatistics => "get_environmental_statistics",
            FunctionName::GetPowerTimeSeries => "get_power_time_series",
            FunctionName::GetEnvironmentalTimeSeries => "get_environmental_time_series",
            FunctionName::ListEquipment => "list_equipment",
            FunctionName::GetEquipment => "get_equipment",
            FunctionName::UpdateEquipmentStatus => "update_equipment_status",
            FunctionName::ListTasks => "list_tasks",
            FunctionName::CreateTask => "create_task",
            FunctionName::UpdateTask => "update_task",
            FunctionName::DeleteTask => "delete_task",
            FunctionName::ListIssues => "list_issues",
            FunctionName::CreateIssue => "create_issue",
            FunctionName::AddComment => "add_comment",
            FunctionName::CreateNotification => "create_notification",
            FunctionName::ListSettings => "list_settings",
            FunctionName::UpdateSetting => "update_setting",
        }
    }

    /// Look up a name as sent by the caller
    pub fn parse(name: &str) -> Option<Self> {
        FunctionName::ALL.iter().copied().find(|f| f.as_str() == name)
    }
}

impl fmt::Display for FunctionName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// JSON type of a parameter
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ParamType {
    String,
    Integer,
    Number,
    Boolean,
    /// RFC 3339 string
    Timestamp,
    Object,
}

impl ParamType {
    fn schema_type(&self) -> &'static str {
        match self {
            ParamType::String | ParamType::Timestamp => "string",
            ParamType::Integer => "integer",
            ParamType::Number => "number",
            ParamType::Boolean => "boolean",
            ParamType::Object => "object",
        }
    }

    /// Check a value, accepting numeric strings for numeric types
    fn coerce(&self, name: &str, value: &Value) -> GateResult<Value> {
        let mismatch = || {
            GateError::bad_request(format!(
                "Parameter '{}' must be of type {}",
                name,
                self.schema_type()
            ))
        };

        match (self, value) {
            (ParamType::String, Value::String(_))
            | (ParamType::Boolean, Value::Bool(_))
            | (ParamType::Object, Value::Object(_)) => Ok(value.clone()),
            (ParamType::Integer, Value::Number(n)) if n.is_i64() => Ok(value.clone()),
            (ParamType::Integer, Value::String(s)) => {
                s.trim().parse::<i64>().map(Value::from).map_err(|_| mismatch())
            }
            (ParamType::Number, Value::Number(_)) => Ok(value.clone()),
            (ParamType::Number, Value::String(s)) => s
                .trim()
                .parse::<f64>()
                .ok()
                .and_then(serde_json::Number::from_f64)
                .map(Value::Number)
                .ok_or_else(mismatch),
            (ParamType::Timestamp, Value::String(s)) => match parse_timestamp(s) {
                Some(ts) => Ok(Value::from(ts.to_rfc3339())),
                None => Err(GateError::bad_request(format!(
                    "Parameter '{}' is not a valid timestamp: {}",
                    name, s
                ))),
            },
            _ => Err(mismatch()),
        }
    }
}

/// One entry of a function's parameter schema
#[derive(Debug, Clone, Serialize)]
pub struct ParameterSpec {
    pub name: &'static str,
    pub param_type: ParamType,
    pub description: &'static str,
    pub required: bool,
    pub default: Option<Value>,
}

impl ParameterSpec {
    pub fn required(name: &'static str, param_type: ParamType, description: &'static str) -> Self {
        Self {
            name,
            param_type,
            description,
            required: true,
            default: None,
        }
    }

    pub fn optional(name: &'static str, param_type: ParamType, description: &'static str) -> Self {
        Self {
            name,
            param_type,
            description,
            required: false,
            default: None,
        }
    }

    /// Optional with a default applied when absent
    pub fn with_default(mut self, default: Value) -> Self {
        self.default = Some(default);
        self
    }
}

/// Tool definition handed to the LLM caller
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolDefinition {
    pub name: String,
    pub description: String,
    pub input_schema: ToolInputSchema,
}

/// JSON schema for tool input
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolInputSchema {
    /// Always "object"
    #[serde(rename = "type")]
    pub schema_type: String,
    pub properties: Value,
    pub required: Vec<String>,
}

/// A named, schema-described operation with a fixed permission requirement
#[derive(Debug, Clone)]
pub struct FunctionRegistration {
    pub name: FunctionName,
    pub description: &'static str,
    pub parameters: Vec<ParameterSpec>,
    pub required_entity: EntityType,
    pub required_level: PermissionLevel,
}

impl FunctionRegistration {
    pub fn new(
        name: FunctionName,
        description: &'static str,
        required_entity: EntityType,
        required_level: PermissionLevel,
    ) -> Self {
        Self {
            name,
            description,
            parameters: Vec::new(),
            required_entity,
            required_level,
        }
    }

    /// Append a parameter
    pub fn param(mut self, parameter: ParameterSpec) -> Self {
        self.parameters.push(parameter);
        self
    }

    /// Apply defaults and check presence and types
    ///
    /// Unknown parameters are rejected.
    pub fn resolve_params(&self, params: &Value) -> GateResult<Map<String, Value>> {
        let supplied = match params {
            Value::Null => Map::new(),
            Value::Object(map) => map.clone(),
            _ => return Err(GateError::bad_request("Parameters must be a JSON object")),
        };

        if let Some(unknown) = supplied
            .keys()
            .find(|k| !self.parameters.iter().any(|p| p.name == k.as_str()))
        {
            return Err(GateError::bad_request(format!(
                "Unknown parameter '{}' for function '{}'",
                unknown, self.name
            )));
        }

        let mut resolved = Map::new();
        for parameter in &self.parameters {
            match supplied.get(parameter.name) {
                Some(value) if !value.is_null() => {
                    resolved.insert(parameter.name.to_string(), parameter.param_type.coerce(parameter.name, value)?);
                }
                _ => {
                    if let Some(default) = &parameter.default {
                        resolved.insert(parameter.name.to_string(), default.clone());
                    } else if parameter.required {
                        return Err(GateError::bad_request(format!(
                            "Missing required parameter '{}' for function '{}'",
                            parameter.name, self.name
                        )));
                    }
                }
            }
        }
        Ok(resolved)
    }

    /// Tool definition for the LLM caller
    pub fn definition(&self) -> ToolDefinition {
        let mut properties = Map::new();
        for parameter in &self.parameters {
            let mut property = json!({
                "type": parameter.param_type.schema_type(),
                "description": parameter.description,
            });
            if parameter.param_type == ParamType::Timestamp {
                property["format"] = json!("date-time");
            }
            if let Some(default) = &parameter.default {
                property["default"] = default.clone();
            }
            properties.insert(parameter.name.to_string(), property);
        }

        ToolDefinition {
            name: self.name.as_str().to_string(),
            description: self.description.to_string(),
            input_schema: ToolInputSchema {
                schema_type: "object".to_string(),
                properties: Value::Object(properties),
                required: self
                    .parameters
                    .iter()
                    .filter(|p| p.required)
                    .map(|p| p.name.to_string())
                    .collect(),
            },
        }
    }
}
