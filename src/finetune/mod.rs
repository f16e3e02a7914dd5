//! Fine-tune configuration and job launch.
//!
//! Parameters are validated strictly against the provider's declarations
//! before any external job is created:
//!
//! ```
//! use std::collections::BTreeMap;
//! use task_forge::datamodel::ParameterValue;
//! use task_forge::finetune::{builtin_parameters, validate_parameters};
//!
//! let declared = builtin_parameters("openai");
//! let mut params = BTreeMap::new();
//! params.insert("learning_rate_multiplier".to_string(), ParameterValue::Int(2));
//! assert!(validate_parameters(&declared, &params).is_err());
//!
//! params.insert("learning_rate_multiplier".to_string(), ParameterValue::Float(2.0));
//! assert!(validate_parameters(&declared, &params).is_ok());
//! ```

pub mod lifecycle;
pub mod parameters;

pub use lifecycle::{
    check_valid_provider_model, create_and_start, generate_memorable_name, FinetuneAdapter,
    FinetuneRequest, FinetuneStatus,
};
pub use parameters::{builtin_parameters, validate_parameters, FinetuneParameter, ParameterType};
