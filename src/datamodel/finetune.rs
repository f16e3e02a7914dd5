//! Fine-tune records and the dataset splits they train on.

use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A hyperparameter value. The variant is the value's type; no coercion happens.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ParameterValue {
    Bool(bool),
    Int(i64),
    Float(f64),
    String(String),
}

impl ParameterValue {
    pub fn type_name(&self) -> &'static str {
        match self {
            ParameterValue::Bool(_) => "bool",
            ParameterValue::Int(_) => "int",
            ParameterValue::Float(_) => "float",
            ParameterValue::String(_) => "string",
        }
    }
}

impl fmt::Display for ParameterValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParameterValue::Bool(v) => write!(f, "{}", v),
            ParameterValue::Int(v) => write!(f, "{}", v),
            ParameterValue::Float(v) => write!(f, "{:?}", v),
            ParameterValue::String(v) => write!(f, "{}", v),
        }
    }
}

/// Which parts of a run are used as training targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FinetuneDataStrategy {
    #[default]
    FinalOnly,
    FinalAndIntermediate,
}

/// Lifecycle state of an external fine-tune job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FinetuneStatusType {
    #[default]
    Unknown,
    Pending,
    Running,
    Completed,
    Failed,
}

impl fmt::Display for FinetuneStatusType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            FinetuneStatusType::Unknown => "unknown",
            FinetuneStatusType::Pending => "pending",
            FinetuneStatusType::Running => "running",
            FinetuneStatusType::Completed => "completed",
            FinetuneStatusType::Failed => "failed",
        };
        write!(f, "{}", name)
    }
}

/// A fine-tune of a base model, owned by a task.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Finetune {
    pub id: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub provider: String,
    pub base_model_id: String,
    /// Job id assigned by the provider once the job is started.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub provider_job_id: Option<String>,
    pub dataset_split_id: String,
    pub train_split_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub validation_split_name: Option<String>,
    #[serde(default)]
    pub parameters: BTreeMap<String, ParameterValue>,
    pub system_message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub thinking_instructions: Option<String>,
    #[serde(default)]
    pub data_strategy: FinetuneDataStrategy,
    #[serde(default)]
    pub status: FinetuneStatusType,
    pub created_at: DateTime<Utc>,
}

/// A frozen split of task runs used as fine-tune training data.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DatasetSplit {
    #[serde(default)]
    pub id: Option<String>,
    pub name: String,
    /// Split name to the run ids in that split.
    #[serde(default)]
    pub split_contents: BTreeMap<String, Vec<String>>,
}

impl DatasetSplit {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: Some(super::task::new_id()),
            name: name.into(),
            split_contents: BTreeMap::new(),
        }
    }

    pub fn with_split(mut self, split: impl Into<String>, run_ids: Vec<String>) -> Self {
        self.split_contents.insert(split.into(), run_ids);
        self
    }

    pub fn has_split(&self, split: &str) -> bool {
        self.split_contents.contains_key(split)
    }
}
