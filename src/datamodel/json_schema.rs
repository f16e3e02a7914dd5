//! JSON-Schema helpers used by tasks and runs.
//!
//! Schemas are stored as JSON strings on the task; they are compiled on
//! demand and every failure is mapped into [`ValidationError`].

use serde_json::Value;

use crate::error::ValidationError;

/// Parses a schema string and checks that it compiles as a JSON-Schema object.
pub fn parse_schema(schema: &str) -> Result<Value, ValidationError> {
    let value: Value = serde_json::from_str(schema)
        .map_err(|e| ValidationError::InvalidSchema(format!("not valid JSON: {}", e)))?;

    if !value.is_object() {
        return Err(ValidationError::InvalidSchema(
            "schema must be a JSON object".to_string(),
        ));
    }

    jsonschema::validator_for(&value)
        .map_err(|e| ValidationError::InvalidSchema(e.to_string()))?;

    Ok(value)
}

/// Validates a structured value against a schema string.
///
/// `context` names the validated field in error messages (e.g. "Task output").
pub fn validate_value(value: &Value, schema: &str, context: &str) -> Result<(), ValidationError> {
    let schema = parse_schema(schema)?;
    let validator = jsonschema::validator_for(&schema)
        .map_err(|e| ValidationError::InvalidSchema(e.to_string()))?;

    let errors: Vec<String> = validator
        .iter_errors(value)
        .map(|e| e.to_string())
        .collect();

    if errors.is_empty() {
        Ok(())
    } else {
        Err(ValidationError::SchemaViolation {
            context: context.to_string(),
            message: errors.join("; "),
        })
    }
}

/// Parses `text` as JSON and validates it against a schema string.
///
/// Returns the parsed value so callers don't parse twice.
pub fn validate_json_text(text: &str, schema: &str, context: &str) -> Result<Value, ValidationError> {
    let value: Value = serde_json::from_str(text).map_err(|e| ValidationError::SchemaViolation {
        context: context.to_string(),
        message: format!("not valid JSON: {}", e),
    })?;
    validate_value(&value, schema, context)?;
    Ok(value)
}
