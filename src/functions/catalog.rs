//! The dashboard's function catalog

use serde_json::json;

use super::registration::{FunctionName, FunctionRegistration, ParameterSpec};
use crate::entities::EntityType;
use crate::permissions::PermissionLevel;

use super::registration::ParamType::{Integer, String as Text, Timestamp};

fn limit() -> ParameterSpec {
    ParameterSpec::optional("limit", Integer, "Maximum number of rows to return").with_default(json!(100))
}

fn offset() -> ParameterSpec {
    ParameterSpec::optional("offset", Integer, "Number of rows to skip").with_default(json!(0))
}

fn aggregation() -> ParameterSpec {
    ParameterSpec::optional("aggregation", Text, "One of count, sum, avg, min, max").with_default(json!("avg"))
}

fn interval() -> ParameterSpec {
    ParameterSpec::optional("interval", Text, "Bucket size: hour, day, week or month").with_default(json!("hour"))
}

fn range() -> [ParameterSpec; 2] {
    [
        ParameterSpec::required("start", Timestamp, "Start of the range, inclusive"),
        ParameterSpec::required("end", Timestamp, "End of the range, inclusive"),
    ]
}

fn id(description: &'static str) -> ParameterSpec {
    ParameterSpec::required("id", Integer, description)
}

/// All registrations of the standard catalog
pub(super) fn standard_registrations() -> Vec<FunctionRegistration> {
    let [start, end] = range();

    vec![
        FunctionRegistration::new(
            FunctionName::GetPowerData,
            "List power meter readings",
            EntityType::PowerData,
            PermissionLevel::Read,
        )
        .param(ParameterSpec::optional("equipment_id", Integer, "Only readings of this equipment"))
        .param(limit())
        .param(offset()),
        FunctionRegistration::new(
            FunctionName::GetEnvironmentalData,
            "List environmental sensor readings",
            EntityType::EnvironmentalData,
            PermissionLevel::Read,
        )
        .param(ParameterSpec::optional("location", Text, "Only readings from this location"))
        .param(limit())
        .param(offset()),
        FunctionRegistration::new(
            FunctionName::GetPowerStatistics,
            "Aggregate a power data column",
            EntityType::PowerData,
            PermissionLevel::Read,
        )
        .param(ParameterSpec::optional("column", Text, "Column to aggregate").with_default(json!("power_kw")))
        .param(aggregation())
        .param(ParameterSpec::optional("equipment_id", Integer, "Only readings of this equipment")),
        FunctionRegistration::new(
            FunctionName::GetEnvironmentalStatistics,
            "Aggregate an environmental data column",
            EntityType::EnvironmentalData,
            PermissionLevel::Read,
        )
        .param(ParameterSpec::optional("column", Text, "Column to aggregate").with_default(json!("temperature")))
        .param(aggregation())
        .param(ParameterSpec::optional("location", Text, "Only readings from this location")),
        FunctionRegistration::new(
            FunctionName::GetPowerTimeSeries,
            "Average of a power column per time bucket",
            EntityType::PowerData,
            PermissionLevel::Read,
        )
        .param(interval())
        .param(start.clone())
        .param(end.clone())
        .param(ParameterSpec::optional("value_column", Text, "Column to average").with_default(json!("power_kw")))
        .param(ParameterSpec::optional("equipment_id", Integer, "Only readings of this equipment")),
        FunctionRegistration::new(
            FunctionName::GetEnvironmentalTimeSeries,
            "Average of an environmental column per time bucket",
            EntityType::EnvironmentalData,
            PermissionLevel::Read,
        )
        .param(interval())
        .param(start)
        .param(end)
        .param(ParameterSpec::optional("value_column", Text, "Column to average").with_default(json!("temperature")))
        .param(ParameterSpec::optional("location", Text, "Only readings from this location")),
        FunctionRegistration::new(
            FunctionName::ListEquipment,
            "List equipment",
            EntityType::Equipment,
            PermissionLevel::Read,
        )
        .param(ParameterSpec::optional("status", Text, "Equipment status"))
        .param(ParameterSpec::optional("type", Text, "Equipment type"))
        .param(ParameterSpec::optional("location", Text, "Installation location"))
        .param(limit()),
        FunctionRegistration::new(
            FunctionName::GetEquipment,
            "Get one piece of equipment",
            EntityType::Equipment,
            PermissionLevel::Read,
        )
        .param(id("Equipment id")),
        FunctionRegistration::new(
            FunctionName::UpdateEquipmentStatus,
            "Change the status of a piece of equipment",
            EntityType::Equipment,
            PermissionLevel::Write,
        )
        .param(id("Equipment id"))
        .param(ParameterSpec::required("status", Text, "New status")),
        FunctionRegistration::new(
            FunctionName::ListTasks,
            "List maintenance tasks",
            EntityType::Task,
            PermissionLevel::Read,
        )
        .param(ParameterSpec::optional("status", Text, "Task status"))
        .param(ParameterSpec::optional("priority", Text, "Task priority"))
        .param(ParameterSpec::optional("assigned_to", Integer, "Assignee user id"))
        .param(ParameterSpec::optional("equipment_id", Integer, "Related equipment"))
        .param(limit())
        .param(offset()),
        FunctionRegistration::new(
            FunctionName::CreateTask,
            "Create a maintenance task",
            EntityType::Task,
            PermissionLevel::Write,
        )
        .param(ParameterSpec::required("title", Text, "Task title"))
        .param(ParameterSpec::optional("description", Text, "Details"))
        .param(ParameterSpec::optional("priority", Text, "low, medium, high or critical").with_default(json!("medium")))
        .param(ParameterSpec::optional("status", Text, "Initial status").with_default(json!("open")))
        .param(ParameterSpec::optional("assigned_to", Integer, "Assignee user id"))
        .param(ParameterSpec::optional("equipment_id", Integer, "Related equipment"))
        .param(ParameterSpec::optional("due_date", Timestamp, "Due date")),
        FunctionRegistration::new(
            FunctionName::UpdateTask,
            "Update fields of a task",
            EntityType::Task,
            PermissionLevel::Write,
        )
        .param(id("Task id"))
        .param(ParameterSpec::optional("title", Text, "Task title"))
        .param(ParameterSpec::optional("description", Text, "Details"))
        .param(ParameterSpec::optional("status", Text, "Task status"))
        .param(ParameterSpec::optional("priority", Text, "Task priority"))
        .param(ParameterSpec::optional("assigned_to", Integer, "Assignee user id"))
        .param(ParameterSpec::optional("due_date", Timestamp, "Due date")),
        FunctionRegistration::new(
            FunctionName::DeleteTask,
            "Delete a task",
            EntityType::Task,
            PermissionLevel::Admin,
        )
        .param(id("Task id")),
        FunctionRegistration::new(
            FunctionName::ListIssues,
            "List reported issues",
            EntityType::Issue,
            PermissionLevel::Read,
        )
        .param(ParameterSpec::optional("status", Text, "Issue status"))
        .param(ParameterSpec::optional("priority", Text, "Issue priority"))
        .param(ParameterSpec::optional("equipment_id", Integer, "Related equipment"))
        .param(limit()),
        FunctionRegistration::new(
            FunctionName::CreateIssue,
            "Report an issue",
            EntityType::Issue,
            PermissionLevel::Write,
        )
        .param(ParameterSpec::required("title", Text, "Issue title"))
        .param(ParameterSpec::optional("description", Text, "Details"))
        .param(ParameterSpec::optional("priority", Text, "low, medium, high or critical").with_default(json!("medium")))
        .param(ParameterSpec::optional("status", Text, "Initial status").with_default(json!("open")))
        .param(ParameterSpec::optional("equipment_id", Integer, "Related equipment"))
        .param(ParameterSpec::optional("reported_by", Integer, "Reporting user id")),
        FunctionRegistration::new(
            FunctionName::AddComment,
            "Comment on an issue",
            EntityType::Comment,
            PermissionLevel::Write,
        )
        .param(ParameterSpec::required("issue_id", Integer, "Issue to comment on"))
        .param(ParameterSpec::required("content", Text, "Comment text"))
        .param(ParameterSpec::optional("user_id", Integer, "Author user id")),
        FunctionRegistration::new(
            FunctionName::CreateNotification,
            "Send a notification to a user",
            EntityType::Notification,
            PermissionLevel::Write,
        )
        .param(ParameterSpec::required("user_id", Integer, "Recipient user id"))
        .param(ParameterSpec::required("title", Text, "Notification title"))
        .param(ParameterSpec::required("message", Text, "Notification body"))
        .param(ParameterSpec::optional("type", Text, "info, warning or alert").with_default(json!("info")))
        .param(ParameterSpec::optional("severity", Text, "Severity label")),
        FunctionRegistration::new(
            FunctionName::ListSettings,
            "List agent settings",
            EntityType::Setting,
            PermissionLevel::Read,
        )
        .param(ParameterSpec::optional("category", Text, "Settings category")),
        FunctionRegistration::new(
            FunctionName::UpdateSetting,
            "Change the value of an agent setting",
            EntityType::Setting,
            PermissionLevel::Write,
        )
        .param(id("Setting id"))
        .param(ParameterSpec::required("value", Text, "New value")),
    ]
}
