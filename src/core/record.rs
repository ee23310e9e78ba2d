//! Record, id and filter types shared by every engine

use std::collections::BTreeMap;

use serde_json::Value;

use super::error::{GateError, GateResult};

/// An opaque row as returned by storage
pub type Record = serde_json::Map<String, Value>;

/// Primary key of every mediated entity
pub type EntityId = i64;

/// Column name → scalar value, combined with AND
pub type Filters = BTreeMap<String, Value>;

/// Read the `id` column of a record, if it is an integer
pub fn record_id(record: &Record) -> Option<EntityId> {
    record.get("id").and_then(Value::as_i64)
}

/// Check that a value can be bound as a single scalar parameter
pub fn ensure_scalar(column: &str, value: &Value) -> GateResult<()> {
    match value {
        Value::Array(_) | Value::Object(_) => Err(GateError::bad_request(format!(
            "Value for column '{}' must be a scalar",
            column
        ))),
        _ => Ok(()),
    }
}

/// Build a filter set from a JSON object
///
/// `null` or a missing value yields an empty filter set.
pub fn filters_from_value(value: Option<&Value>) -> GateResult<Filters> {
    match value {
        None | Some(Value::Null) => Ok(Filters::new()),
        Some(Value::Object(map)) => {
            let mut filters = Filters::new();
            for (column, value) in map {
                ensure_scalar(column, value)?;
                filters.insert(column.clone(), value.clone());
            }
            Ok(filters)
        }
        Some(_) => Err(GateError::bad_request("Filters must be a JSON object")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_record_id() {
        let record = json!({"id": 12, "name": "pump"});
        assert_eq!(record_id(record.as_object().unwrap()), Some(12));

        let record = json!({"name": "pump"});
        assert_eq!(record_id(record.as_object().unwrap()), None);
    }

    #[test]
    fn test_filters_from_value() {
        let filters = filters_from_value(Some(&json!({"status": "active", "floor": 2}))).unwrap();
        assert_eq!(filters.len(), 2);
        assert_eq!(filters["status"], json!("active"));

        assert!(filters_from_value(None).unwrap().is_empty());
        assert!(filters_from_value(Some(&json!([1, 2]))).is_err());
        assert!(filters_from_value(Some(&json!({"tags": ["a"]}))).is_err());
    }
}
