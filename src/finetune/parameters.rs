//! Hyperparameter declarations and strict validation.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::datamodel::ParameterValue;
use crate::error::FinetuneError;

/// Declared type of a fine-tune parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ParameterType {
    String,
    Int,
    Float,
    Bool,
}

impl ParameterType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ParameterType::String => "string",
            ParameterType::Int => "int",
            ParameterType::Float => "float",
            ParameterType::Bool => "bool",
        }
    }

    /// Exact match only: an int never satisfies a float declaration, and a
    /// bool never satisfies anything but a bool.
    pub fn accepts(&self, value: &ParameterValue) -> bool {
        matches!(
            (self, value),
            (ParameterType::String, ParameterValue::String(_))
                | (ParameterType::Int, ParameterValue::Int(_))
                | (ParameterType::Float, ParameterValue::Float(_))
                | (ParameterType::Bool, ParameterValue::Bool(_))
        )
    }
}

impl fmt::Display for ParameterType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A parameter a fine-tune provider accepts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FinetuneParameter {
    pub name: String,
    #[serde(rename = "type")]
    pub parameter_type: ParameterType,
    pub description: String,
    #[serde(default = "default_optional")]
    pub optional: bool,
}

fn default_optional() -> bool {
    true
}

impl FinetuneParameter {
    /// An optional parameter.
    pub fn new(
        name: impl Into<String>,
        parameter_type: ParameterType,
        description: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            parameter_type,
            description: description.into(),
            optional: true,
        }
    }

    pub fn required(mut self) -> Self {
        self.optional = false;
        self
    }
}

/// Checks supplied parameters against the declared set.
///
/// Declared parameters are checked first, in declaration order (missing
/// required, then type), followed by undeclared keys.
pub fn validate_parameters(
    declared: &[FinetuneParameter],
    supplied: &BTreeMap<String, ParameterValue>,
) -> Result<(), FinetuneError> {
    for parameter in declared {
        match supplied.get(&parameter.name) {
            None if !parameter.optional => {
                return Err(FinetuneError::MissingParameter(parameter.name.clone()));
            }
            None => {}
            Some(value) if !parameter.parameter_type.accepts(value) => {
                return Err(FinetuneError::TypeMismatch {
                    name: parameter.name.clone(),
                    expected: parameter.parameter_type.as_str(),
                    actual: value.type_name(),
                });
            }
            Some(_) => {}
        }
    }

    if let Some(unknown) = supplied
        .keys()
        .find(|key| !declared.iter().any(|p| &p.name == *key))
    {
        return Err(FinetuneError::UnknownParameter(unknown.clone()));
    }

    Ok(())
}

/// Parameters accepted by the providers this crate knows about.
/// Unknown providers accept none.
pub fn builtin_parameters(provider: &str) -> Vec<FinetuneParameter> {
    use ParameterType::{Float, Int};

    let mut params = vec![FinetuneParameter::new(
        "epochs",
        Int,
        "Number of passes over the training data",
    )];
    match provider {
        "openai" => params.extend([
            FinetuneParameter::new(
                "learning_rate_multiplier",
                Float,
                "Scaling factor for the learning rate",
            ),
            FinetuneParameter::new("batch_size", Int, "Examples per batch"),
            FinetuneParameter::new("seed", Int, "Random seed for reproducibility"),
        ]),
        "fireworks_ai" => params.extend([
            FinetuneParameter::new("learning_rate", Float, "Learning rate"),
            FinetuneParameter::new("batch_size", Int, "Examples per batch"),
            FinetuneParameter::new("lora_rank", Int, "Rank of the LoRA adapter"),
        ]),
        "together_ai" => params.extend([
            FinetuneParameter::new("learning_rate", Float, "Learning rate"),
            FinetuneParameter::new("batch_size", Int, "Examples per batch"),
            FinetuneParameter::new("num_checkpoints", Int, "Checkpoints saved during training"),
        ]),
        _ => return Vec::new(),
    }
    params
}

#[cfg(test)]
mod tests {
    use super::*;

    fn declared() -> Vec<FinetuneParameter> {
        vec![
            FinetuneParameter::new("epochs", ParameterType::Int, "").required(),
            FinetuneParameter::new("learning_rate", ParameterType::Float, ""),
            FinetuneParameter::new("shuffle", ParameterType::Bool, ""),
            FinetuneParameter::new("suffix", ParameterType::String, ""),
        ]
    }

    fn supplied(json: &str) -> BTreeMap<String, ParameterValue> {
        serde_json::from_str(json).unwrap()
    }

    #[test]
    fn test_valid_parameters() {
        let params = supplied(r#"{"epochs": 3, "learning_rate": 0.5, "shuffle": false, "suffix": "v1"}"#);
        assert!(validate_parameters(&declared(), &params).is_ok());
        assert!(validate_parameters(&declared(), &supplied(r#"{"epochs": 1}"#)).is_ok());
    }

    #[test]
    fn test_float_rejects_integer_literal() {
        let err = validate_parameters(&declared(), &supplied(r#"{"epochs": 1, "learning_rate": 3}"#))
            .unwrap_err();
        assert!(matches!(
            err,
            FinetuneError::TypeMismatch { expected: "float", actual: "int", .. }
        ));
        assert!(
            validate_parameters(&declared(), &supplied(r#"{"epochs": 1, "learning_rate": 3.0}"#))
                .is_ok()
        );
    }

    #[test]
    fn test_int_rejects_float_and_bool() {
        let err = validate_parameters(&declared(), &supplied(r#"{"epochs": 2.0}"#)).unwrap_err();
        assert!(matches!(err, FinetuneError::TypeMismatch { actual: "float", .. }));

        let err = validate_parameters(&declared(), &supplied(r#"{"epochs": true}"#)).unwrap_err();
        assert!(matches!(err, FinetuneError::TypeMismatch { actual: "bool", .. }));
    }

    #[test]
    fn test_bool_rejects_integer() {
        let err = validate_parameters(&declared(), &supplied(r#"{"epochs": 1, "shuffle": 1}"#))
            .unwrap_err();
        assert!(matches!(
            err,
            FinetuneError::TypeMismatch { expected: "bool", actual: "int", .. }
        ));
    }

    #[test]
    fn test_missing_and_unknown() {
        let err = validate_parameters(&declared(), &BTreeMap::new()).unwrap_err();
        assert_eq!(err.to_string(), "Parameter epochs is required");

        let err = validate_parameters(&declared(), &supplied(r#"{"epochs": 1, "momentum": 0.9}"#))
            .unwrap_err();
        assert_eq!(err.to_string(), "Parameter momentum is not available");

        // nothing declared, anything supplied is unknown
        let err = validate_parameters(&[], &supplied(r#"{"epochs": 1}"#)).unwrap_err();
        assert!(matches!(err, FinetuneError::UnknownParameter(name) if name == "epochs"));
    }

    #[test]
    fn test_builtin_parameters() {
        let openai = builtin_parameters("openai");
        let names: Vec<&str> = openai.iter().map(|p| p.name.as_str()).collect();
        assert_eq!(names, vec!["epochs", "learning_rate_multiplier", "batch_size", "seed"]);
        assert!(openai.iter().all(|p| p.optional));

        assert!(builtin_parameters("fireworks_ai").iter().any(|p| p.name == "lora_rank"));
        assert!(builtin_parameters("together_ai")
            .iter()
            .any(|p| p.name == "num_checkpoints"));
        assert!(builtin_parameters("ollama").is_empty());
    }

    #[test]
    fn test_declaration_serde() {
        let param: FinetuneParameter =
            serde_json::from_str(r#"{"name": "epochs", "type": "int", "description": "n"}"#).unwrap();
        assert_eq!(param.parameter_type, ParameterType::Int);
        assert!(param.optional);
    }
}
