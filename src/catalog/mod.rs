//! Model and provider catalog.
//!
//! The catalog answers two read-only questions for the rest of the crate:
//! which provider entry (and therefore which capability flags) serves a given
//! model, and whether a provider/base-model pair can be fine-tuned.
//!
//! # Example
//!
//! ```
//! use task_forge::catalog::{ProviderCatalog, StaticCatalog};
//!
//! let catalog = StaticCatalog::builtin();
//! let provider = catalog.find_provider("gpt_4o_mini", "openai").expect("built in");
//! assert!(!provider.reasoning_capable);
//! assert!(catalog.is_valid_finetune_pair("openai", "gpt-4o-mini-2024-07-18"));
//! ```

mod builtin;

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::CatalogError;

/// How a provider is asked for structured output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StructuredOutputMode {
    #[default]
    Default,
    JsonSchema,
    FunctionCalling,
    JsonMode,
    JsonInstructions,
    JsonInstructionAndObject,
}

impl StructuredOutputMode {
    /// Whether the schema must be spelled out in the prompt text.
    pub fn needs_json_instructions(&self) -> bool {
        matches!(
            self,
            StructuredOutputMode::JsonInstructions | StructuredOutputMode::JsonInstructionAndObject
        )
    }
}

/// Which output parser handles a provider's raw responses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ParserId {
    #[default]
    Default,
    R1Thinking,
}

/// One provider serving a model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelProvider {
    pub name: String,
    /// Model id at the provider, if it differs from the catalog name.
    #[serde(default)]
    pub model_id: Option<String>,
    /// Base model id accepted by the provider's fine-tune API.
    #[serde(default)]
    pub provider_finetune_id: Option<String>,
    #[serde(default)]
    pub reasoning_capable: bool,
    #[serde(default)]
    pub structured_output_mode: StructuredOutputMode,
    #[serde(default)]
    pub parser: ParserId,
}

impl ModelProvider {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            model_id: None,
            provider_finetune_id: None,
            reasoning_capable: false,
            structured_output_mode: StructuredOutputMode::default(),
            parser: ParserId::default(),
        }
    }

    pub fn with_model_id(mut self, model_id: impl Into<String>) -> Self {
        self.model_id = Some(model_id.into());
        self
    }

    pub fn with_finetune_id(mut self, finetune_id: impl Into<String>) -> Self {
        self.provider_finetune_id = Some(finetune_id.into());
        self
    }

    pub fn with_reasoning(mut self, reasoning_capable: bool) -> Self {
        self.reasoning_capable = reasoning_capable;
        self
    }

    pub fn with_structured_output_mode(mut self, mode: StructuredOutputMode) -> Self {
        self.structured_output_mode = mode;
        self
    }

    pub fn with_parser(mut self, parser: ParserId) -> Self {
        self.parser = parser;
        self
    }
}

/// A model and every provider that serves it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CatalogModel {
    pub name: String,
    #[serde(default)]
    pub friendly_name: Option<String>,
    #[serde(default)]
    pub providers: Vec<ModelProvider>,
}

/// Read-only lookup over known models and providers.
pub trait ProviderCatalog: Send + Sync {
    /// Provider entry for `provider_name` serving `model_name`.
    fn find_provider(&self, model_name: &str, provider_name: &str) -> Option<ModelProvider>;

    /// Whether `provider_name` can fine-tune `base_model_id`.
    fn is_valid_finetune_pair(&self, provider_name: &str, base_model_id: &str) -> bool;
}

/// A catalog held in memory.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StaticCatalog {
    models: Vec<CatalogModel>,
}

impl StaticCatalog {
    pub fn new(models: Vec<CatalogModel>) -> Result<Self, CatalogError> {
        for (i, model) in models.iter().enumerate() {
            if models[..i].iter().any(|m| m.name == model.name) {
                return Err(CatalogError::DuplicateModel(model.name.clone()));
            }
        }
        Ok(Self { models })
    }

    /// The models shipped with the crate.
    pub fn builtin() -> Self {
        Self {
            models: builtin::models(),
        }
    }

    /// Parses a catalog from YAML: a top-level `models` list.
    pub fn from_yaml_str(content: &str) -> Result<Self, CatalogError> {
        let catalog: StaticCatalog =
            serde_yaml::from_str(content).map_err(|e| CatalogError::ParseError {
                path: "<inline>".to_string(),
                message: e.to_string(),
            })?;
        Self::new(catalog.models)
    }

    /// Loads a YAML catalog file.
    pub fn load_file<P: AsRef<Path>>(path: P) -> Result<Self, CatalogError> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)?;
        let catalog: StaticCatalog =
            serde_yaml::from_str(&content).map_err(|e| CatalogError::ParseError {
                path: path.display().to_string(),
                message: e.to_string(),
            })?;
        Self::new(catalog.models)
    }

    pub fn models(&self) -> &[CatalogModel] {
        &self.models
    }

    pub fn model(&self, name: &str) -> Option<&CatalogModel> {
        self.models.iter().find(|m| m.name == name)
    }
}

impl ProviderCatalog for StaticCatalog {
    fn find_provider(&self, model_name: &str, provider_name: &str) -> Option<ModelProvider> {
        self.model(model_name)?
            .providers
            .iter()
            .find(|p| p.name == provider_name)
            .cloned()
    }

    fn is_valid_finetune_pair(&self, provider_name: &str, base_model_id: &str) -> bool {
        self.models
            .iter()
            .flat_map(|m| m.providers.iter())
            .any(|p| {
                p.name == provider_name
                    && p.provider_finetune_id.as_deref() == Some(base_model_id)
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const CATALOG_YAML: &str = r#"
models:
  - name: local_reasoner
    friendly_name: Local Reasoner
    providers:
      - name: ollama
        model_id: reasoner:7b
        reasoning_capable: true
        structured_output_mode: json_instructions
        parser: r1_thinking
  - name: local_tuner
    providers:
      - name: fireworks_ai
        provider_finetune_id: accounts/fireworks/models/tuner
"#;

    #[test]
    fn test_yaml_catalog() {
        let catalog = StaticCatalog::from_yaml_str(CATALOG_YAML).unwrap();
        let provider = catalog.find_provider("local_reasoner", "ollama").unwrap();

        assert!(provider.reasoning_capable);
        assert_eq!(provider.parser, ParserId::R1Thinking);
        assert!(provider.structured_output_mode.needs_json_instructions());
        assert_eq!(provider.model_id.as_deref(), Some("reasoner:7b"));

        let tuner = catalog.find_provider("local_tuner", "fireworks_ai").unwrap();
        assert_eq!(tuner.structured_output_mode, StructuredOutputMode::Default);
        assert!(catalog.is_valid_finetune_pair("fireworks_ai", "accounts/fireworks/models/tuner"));
        assert!(!catalog.is_valid_finetune_pair("openai", "accounts/fireworks/models/tuner"));
    }

    #[test]
    fn test_missing_lookups() {
        let catalog = StaticCatalog::builtin();
        assert!(catalog.find_provider("no_such_model", "openai").is_none());
        assert!(catalog.find_provider("gpt_4o_mini", "no_such_provider").is_none());
        assert!(!catalog.is_valid_finetune_pair("openai", "not-a-model"));
    }

    #[test]
    fn test_duplicate_models_rejected() {
        let yaml = "models:\n  - name: a\n  - name: a\n";
        assert!(matches!(
            StaticCatalog::from_yaml_str(yaml),
            Err(CatalogError::DuplicateModel(_))
        ));
    }

    #[test]
    fn test_invalid_yaml() {
        assert!(matches!(
            StaticCatalog::from_yaml_str("models: [unterminated"),
            Err(CatalogError::ParseError { .. })
        ));
    }

    #[test]
    fn test_load_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("catalog.yaml");
        std::fs::write(&path, CATALOG_YAML).unwrap();
        let catalog = StaticCatalog::load_file(&path).unwrap();
        assert_eq!(catalog.models().len(), 2);
    }

    #[test]
    fn test_json_instruction_modes() {
        assert!(StructuredOutputMode::JsonInstructionAndObject.needs_json_instructions());
        assert!(!StructuredOutputMode::JsonSchema.needs_json_instructions());
        assert!(!StructuredOutputMode::Default.needs_json_instructions());
    }
}
