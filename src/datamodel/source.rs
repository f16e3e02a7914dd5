//! Provenance tags for task inputs and outputs.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

/// Who produced a piece of data.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DataSourceType {
    Human,
    Synthetic,
}

impl fmt::Display for DataSourceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DataSourceType::Human => write!(f, "human"),
            DataSourceType::Synthetic => write!(f, "synthetic"),
        }
    }
}

/// A scalar property value. Nested values cannot be represented.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PropertyValue {
    Int(i64),
    Float(f64),
    String(String),
}

impl PropertyValue {
    pub fn as_str(&self) -> Option<&str> {
        match self {
            PropertyValue::String(s) => Some(s),
            _ => None,
        }
    }
}

impl fmt::Display for PropertyValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PropertyValue::Int(v) => write!(f, "{}", v),
            PropertyValue::Float(v) => write!(f, "{}", v),
            PropertyValue::String(v) => write!(f, "{}", v),
        }
    }
}

impl From<&str> for PropertyValue {
    fn from(value: &str) -> Self {
        PropertyValue::String(value.to_string())
    }
}

impl From<String> for PropertyValue {
    fn from(value: String) -> Self {
        PropertyValue::String(value)
    }
}

impl From<i64> for PropertyValue {
    fn from(value: i64) -> Self {
        PropertyValue::Int(value)
    }
}

impl From<f64> for PropertyValue {
    fn from(value: f64) -> Self {
        PropertyValue::Float(value)
    }
}

/// Property keys and the source types that require or forbid them.
struct PropertyRule {
    name: &'static str,
    required_for: DataSourceType,
}

const PROPERTY_RULES: &[PropertyRule] = &[
    PropertyRule {
        name: "created_by",
        required_for: DataSourceType::Human,
    },
    PropertyRule {
        name: "model_name",
        required_for: DataSourceType::Synthetic,
    },
    PropertyRule {
        name: "model_provider",
        required_for: DataSourceType::Synthetic,
    },
    PropertyRule {
        name: "adapter_name",
        required_for: DataSourceType::Synthetic,
    },
    PropertyRule {
        name: "prompt_id",
        required_for: DataSourceType::Synthetic,
    },
];

/// Provenance of a task input or output.
///
/// The required property set depends on the source type: human sources carry
/// `created_by`; synthetic sources carry the adapter, model, provider and prompt
/// used to produce the data. Keys belonging to the other type are rejected.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DataSource {
    #[serde(rename = "type")]
    source_type: DataSourceType,
    #[serde(default)]
    properties: BTreeMap<String, PropertyValue>,
}

impl DataSource {
    /// Creates a data source and validates its properties.
    pub fn new(
        source_type: DataSourceType,
        properties: BTreeMap<String, PropertyValue>,
    ) -> Result<Self, ValidationError> {
        let source = Self {
            source_type,
            properties,
        };
        source.validate()?;
        Ok(source)
    }

    /// A human source attributed to `created_by`.
    pub fn human(created_by: impl Into<String>) -> Result<Self, ValidationError> {
        let mut properties = BTreeMap::new();
        properties.insert("created_by".to_string(), PropertyValue::String(created_by.into()));
        Self::new(DataSourceType::Human, properties)
    }

    /// A synthetic source describing the model run that produced the data.
    pub fn synthetic(
        adapter_name: impl Into<String>,
        model_name: impl Into<String>,
        model_provider: impl Into<String>,
        prompt_id: impl Into<String>,
    ) -> Result<Self, ValidationError> {
        let mut properties = BTreeMap::new();
        properties.insert("adapter_name".to_string(), PropertyValue::String(adapter_name.into()));
        properties.insert("model_name".to_string(), PropertyValue::String(model_name.into()));
        properties.insert(
            "model_provider".to_string(),
            PropertyValue::String(model_provider.into()),
        );
        properties.insert("prompt_id".to_string(), PropertyValue::String(prompt_id.into()));
        Self::new(DataSourceType::Synthetic, properties)
    }

    pub fn source_type(&self) -> DataSourceType {
        self.source_type
    }

    pub fn properties(&self) -> &BTreeMap<String, PropertyValue> {
        &self.properties
    }

    pub fn property(&self, key: &str) -> Option<&PropertyValue> {
        self.properties.get(key)
    }

    /// Checks the required/forbidden property rules for this source type.
    pub fn validate(&self) -> Result<(), ValidationError> {
        for rule in PROPERTY_RULES {
            let value = self.properties.get(rule.name);
            if rule.required_for == self.source_type {
                match value {
                    None => {
                        return Err(ValidationError::invariant(format!(
                            "'{}' is required for {} data source",
                            rule.name, self.source_type
                        )))
                    }
                    Some(PropertyValue::String(s)) if s.trim().is_empty() => {
                        return Err(ValidationError::invariant(format!(
                            "'{}' must not be empty for {} data source",
                            rule.name, self.source_type
                        )))
                    }
                    Some(PropertyValue::String(_)) => {}
                    Some(_) => {
                        return Err(ValidationError::TypeMismatch(format!(
                            "'{}' must be a string",
                            rule.name
                        )))
                    }
                }
            } else if value.is_some() {
                return Err(ValidationError::invariant(format!(
                    "'{}' is not allowed for {} data source",
                    rule.name, self.source_type
                )));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_human_source() {
        let source = DataSource::human("alice").unwrap();
        assert_eq!(source.source_type(), DataSourceType::Human);
        assert_eq!(source.property("created_by").and_then(|v| v.as_str()), Some("alice"));
    }

    #[test]
    fn test_human_source_requires_creator() {
        let err = DataSource::new(DataSourceType::Human, BTreeMap::new()).unwrap_err();
        assert!(err.to_string().contains("'created_by' is required"));

        let err = DataSource::human("  ").unwrap_err();
        assert!(err.to_string().contains("must not be empty"));
    }

    #[test]
    fn test_synthetic_source() {
        let source = DataSource::synthetic("chat", "gpt_4o", "openai", "simple_prompt_builder").unwrap();
        assert_eq!(source.source_type(), DataSourceType::Synthetic);
        assert_eq!(source.properties().len(), 4);
    }

    #[test]
    fn test_synthetic_source_missing_keys() {
        let mut properties = BTreeMap::new();
        properties.insert("adapter_name".to_string(), PropertyValue::from("chat"));
        properties.insert("model_name".to_string(), PropertyValue::from("gpt_4o"));
        let err = DataSource::new(DataSourceType::Synthetic, properties).unwrap_err();
        assert!(matches!(err, ValidationError::InvariantViolation(_)));
    }

    #[test]
    fn test_forbidden_cross_type_keys() {
        let mut properties = BTreeMap::new();
        properties.insert("created_by".to_string(), PropertyValue::from("alice"));
        properties.insert("model_name".to_string(), PropertyValue::from("gpt_4o"));
        let err = DataSource::new(DataSourceType::Human, properties).unwrap_err();
        assert!(err.to_string().contains("'model_name' is not allowed"));
    }

    #[test]
    fn test_non_string_required_value() {
        let mut properties = BTreeMap::new();
        properties.insert("created_by".to_string(), PropertyValue::Int(7));
        let err = DataSource::new(DataSourceType::Human, properties).unwrap_err();
        assert!(matches!(err, ValidationError::TypeMismatch(_)));
    }

    #[test]
    fn test_scalar_properties_only() {
        let json = r#"{"type": "human", "properties": {"created_by": "bob", "batch": 3, "score": 0.5}}"#;
        let source: DataSource = serde_json::from_str(json).unwrap();
        assert_eq!(source.property("batch"), Some(&PropertyValue::Int(3)));
        assert_eq!(source.property("score"), Some(&PropertyValue::Float(0.5)));

        let nested = r#"{"type": "human", "properties": {"created_by": {"name": "bob"}}}"#;
        assert!(serde_json::from_str::<DataSource>(nested).is_err());
    }
}
