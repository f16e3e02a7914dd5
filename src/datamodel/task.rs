//! Task definitions: instruction, requirements, schemas and owned history.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::ValidationError;

use super::finetune::Finetune;
use super::json_schema::parse_schema;
use super::rating::RatingType;
use super::run::TaskRun;

pub(crate) fn new_id() -> String {
    Uuid::new_v4().simple().to_string()[..12].to_string()
}

/// A named sub-instruction a model's output is judged against.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskRequirement {
    pub id: String,
    pub name: String,
    pub instruction: String,
    /// 0 is highest priority.
    #[serde(default = "default_priority")]
    pub priority: u8,
    #[serde(rename = "type", default)]
    pub rating_type: RatingType,
}

fn default_priority() -> u8 {
    1
}

impl TaskRequirement {
    pub fn new(name: impl Into<String>, instruction: impl Into<String>) -> Self {
        Self {
            id: new_id(),
            name: name.into(),
            instruction: instruction.into(),
            priority: default_priority(),
            rating_type: RatingType::default(),
        }
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = id.into();
        self
    }

    pub fn with_priority(mut self, priority: u8) -> Self {
        self.priority = priority.min(3);
        self
    }

    pub fn with_rating_type(mut self, rating_type: RatingType) -> Self {
        self.rating_type = rating_type;
        self
    }
}

/// A previously saved, static prompt.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Prompt {
    pub id: String,
    pub name: String,
    pub prompt: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub chain_of_thought_instructions: Option<String>,
}

impl Prompt {
    pub fn new(name: impl Into<String>, prompt: impl Into<String>) -> Self {
        Self {
            id: new_id(),
            name: name.into(),
            prompt: prompt.into(),
            chain_of_thought_instructions: None,
        }
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = id.into();
        self
    }

    pub fn with_chain_of_thought(mut self, instructions: impl Into<String>) -> Self {
        self.chain_of_thought_instructions = Some(instructions.into());
        self
    }
}

/// A declarative unit of work.
///
/// The task is the validation authority for its schemas: both must compile
/// when set, and every run it owns is validated against them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Task {
    id: String,
    name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    description: Option<String>,
    instruction: String,
    #[serde(default)]
    requirements: Vec<TaskRequirement>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    input_json_schema: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    output_json_schema: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    thinking_instruction: Option<String>,
    #[serde(default)]
    runs: Vec<TaskRun>,
    #[serde(default)]
    prompts: Vec<Prompt>,
    #[serde(default)]
    finetunes: Vec<Finetune>,
    /// Durable location (the task's directory). Not serialized.
    #[serde(skip)]
    path: Option<PathBuf>,
}

impl Task {
    pub fn new(name: impl Into<String>, instruction: impl Into<String>) -> Self {
        Self {
            id: new_id(),
            name: name.into(),
            description: None,
            instruction: instruction.into(),
            requirements: Vec::new(),
            input_json_schema: None,
            output_json_schema: None,
            thinking_instruction: None,
            runs: Vec::new(),
            prompts: Vec::new(),
            finetunes: Vec::new(),
            path: None,
        }
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = id.into();
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn with_thinking_instruction(mut self, instruction: impl Into<String>) -> Self {
        self.thinking_instruction = Some(instruction.into());
        self
    }

    /// Sets the directory records are saved under. Not serialized.
    pub fn with_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.path = Some(path.into());
        self
    }

    /// Adds a requirement; ids must be unique within the task.
    pub fn with_requirement(mut self, requirement: TaskRequirement) -> Result<Self, ValidationError> {
        if self.requirement(&requirement.id).is_some() {
            return Err(ValidationError::invariant(format!(
                "Duplicate requirement ID '{}'",
                requirement.id
            )));
        }
        self.requirements.push(requirement);
        Ok(self)
    }

    pub fn with_input_schema(mut self, schema: impl Into<String>) -> Result<Self, ValidationError> {
        let schema = schema.into();
        parse_schema(&schema)?;
        self.input_json_schema = Some(schema);
        Ok(self)
    }

    pub fn with_output_schema(mut self, schema: impl Into<String>) -> Result<Self, ValidationError> {
        let schema = schema.into();
        parse_schema(&schema)?;
        self.output_json_schema = Some(schema);
        Ok(self)
    }

    /// Adds a saved prompt, addressable as `id::<prompt id>`.
    pub fn with_prompt(mut self, prompt: Prompt) -> Self {
        self.prompts.push(prompt);
        self
    }

    pub fn with_finetune(mut self, finetune: Finetune) -> Self {
        self.finetunes.push(finetune);
        self
    }

    /// Appends a run to the task history after validating it.
    pub fn add_run(&mut self, run: TaskRun) -> Result<(), ValidationError> {
        run.validate(self)?;
        self.runs.push(run);
        Ok(())
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    pub fn instruction(&self) -> &str {
        &self.instruction
    }

    pub fn requirements(&self) -> &[TaskRequirement] {
        &self.requirements
    }

    /// Looks up a requirement by id.
    pub fn requirement(&self, id: &str) -> Option<&TaskRequirement> {
        self.requirements.iter().find(|r| r.id == id)
    }

    /// Input JSON schema as stored; `None` for plaintext input.
    pub fn input_schema(&self) -> Option<&str> {
        self.input_json_schema.as_deref()
    }

    /// Output JSON schema as stored; `None` for plaintext output.
    pub fn output_schema(&self) -> Option<&str> {
        self.output_json_schema.as_deref()
    }

    pub fn thinking_instruction(&self) -> Option<&str> {
        self.thinking_instruction.as_deref()
    }

    /// `None` until the task is given a location with [`Task::with_path`].
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Run history in insertion order.
    pub fn runs(&self) -> &[TaskRun] {
        &self.runs
    }

    pub fn prompts(&self) -> &[Prompt] {
        &self.prompts
    }

    pub fn finetunes(&self) -> &[Finetune] {
        &self.finetunes
    }

    /// Looks up a saved prompt by its bare id, without the `id::` prefix.
    pub fn find_prompt(&self, id: &str) -> Option<&Prompt> {
        self.prompts.iter().find(|p| p.id == id)
    }

    /// Looks up a fine-tune by id.
    pub fn find_finetune(&self, id: &str) -> Option<&Finetune> {
        self.finetunes.iter().find(|f| f.id == id)
    }

    /// Re-checks everything a deserialized task could violate: schemas compile,
    /// requirement ids are unique, and every owned run is valid.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if let Some(schema) = &self.input_json_schema {
            parse_schema(schema)?;
        }
        if let Some(schema) = &self.output_json_schema {
            parse_schema(schema)?;
        }

        for (i, requirement) in self.requirements.iter().enumerate() {
            if self.requirements[..i].iter().any(|r| r.id == requirement.id) {
                return Err(ValidationError::invariant(format!(
                    "Duplicate requirement ID '{}'",
                    requirement.id
                )));
            }
        }

        for run in &self.runs {
            run.validate(self)?;
        }

        Ok(())
    }
}
