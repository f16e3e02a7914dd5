//! Prompt identifier grammar.
//!
//! A prompt identifier selects how a prompt is built. It takes one of four shapes:
//!
//! - a generator name such as `simple_prompt_builder`
//! - `id::<prompt_id>` for a saved prompt
//! - `fine_tune_prompt::<project_id>::<task_id>::<fine_tune_id>` for a fine-tune's prompt
//! - `eval_prompt::<project_id>::<task_id>::<eval_id>::<eval_config_id>`
//!
//! Parsing is pure: a string either parses into a [`PromptId`] or fails with
//! [`PromptError::InvalidIdentifier`].

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::PromptError;

/// Segment delimiter inside prompt identifiers.
pub const SEGMENT_DELIMITER: &str = "::";

const SAVED_PREFIX: &str = "id::";
const FINE_TUNE_PREFIX: &str = "fine_tune_prompt::";
const EVAL_PREFIX: &str = "eval_prompt::";

const SAVED_FORMAT: &str = "'id::[prompt_id]'";
const FINE_TUNE_FORMAT: &str = "'fine_tune_prompt::[fine_tune_id]'";
const EVAL_FORMAT: &str = "'eval_prompt::[project_id]::[task_id]::[eval_id]::[eval_config_id]'";
const ANY_FORMAT: &str =
    "a prompt generator name, 'id::[prompt_id]', 'fine_tune_prompt::[fine_tune_id]' or 'eval_prompt::[...]'";

/// Generators that can build a prompt for any task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PromptGenerator {
    Simple,
    MultiShot,
    FewShot,
    Repairs,
    SimpleChainOfThought,
    FewShotChainOfThought,
    MultiShotChainOfThought,
}

impl PromptGenerator {
    pub const ALL: [PromptGenerator; 7] = [
        PromptGenerator::Simple,
        PromptGenerator::MultiShot,
        PromptGenerator::FewShot,
        PromptGenerator::Repairs,
        PromptGenerator::SimpleChainOfThought,
        PromptGenerator::FewShotChainOfThought,
        PromptGenerator::MultiShotChainOfThought,
    ];

    /// Persisted name of the generator.
    pub fn as_str(&self) -> &'static str {
        match self {
            PromptGenerator::Simple => "simple_prompt_builder",
            PromptGenerator::MultiShot => "multi_shot_prompt_builder",
            PromptGenerator::FewShot => "few_shot_prompt_builder",
            PromptGenerator::Repairs => "repairs_prompt_builder",
            PromptGenerator::SimpleChainOfThought => "simple_chain_of_thought_prompt_builder",
            PromptGenerator::FewShotChainOfThought => "few_shot_chain_of_thought_prompt_builder",
            PromptGenerator::MultiShotChainOfThought => {
                "multi_shot_chain_of_thought_prompt_builder"
            }
        }
    }
}

impl fmt::Display for PromptGenerator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PromptGenerator {
    type Err = PromptError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|g| g.as_str() == s)
            .ok_or_else(|| PromptError::UnknownGenerator(s.to_string()))
    }
}

/// A parsed prompt identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum PromptId {
    Generator(PromptGenerator),
    /// Id of a prompt saved on the task.
    Saved(String),
    /// Composite fine-tune id, kept opaque at this level.
    FineTune(String),
    Eval {
        project_id: String,
        task_id: String,
        eval_id: String,
        eval_config_id: String,
    },
}

impl PromptId {
    pub fn parse(id: &str) -> Result<Self, PromptError> {
        if let Ok(generator) = id.parse::<PromptGenerator>() {
            return Ok(PromptId::Generator(generator));
        }

        if id.starts_with(SAVED_PREFIX) {
            let parts: Vec<&str> = id.split(SEGMENT_DELIMITER).collect();
            if parts.len() != 2 || parts[1].is_empty() {
                return Err(PromptError::invalid(id, SAVED_FORMAT));
            }
            return Ok(PromptId::Saved(parts[1].to_string()));
        }

        if id.starts_with(EVAL_PREFIX) {
            let parts: Vec<&str> = id.split(SEGMENT_DELIMITER).collect();
            if parts.len() != 5 || parts.iter().any(|p| p.is_empty()) {
                return Err(PromptError::invalid(id, EVAL_FORMAT));
            }
            return Ok(PromptId::Eval {
                project_id: parts[1].to_string(),
                task_id: parts[2].to_string(),
                eval_id: parts[3].to_string(),
                eval_config_id: parts[4].to_string(),
            });
        }

        if let Some(fine_tune_id) = id.strip_prefix(FINE_TUNE_PREFIX) {
            if fine_tune_id.is_empty() {
                return Err(PromptError::invalid(id, FINE_TUNE_FORMAT));
            }
            return Ok(PromptId::FineTune(fine_tune_id.to_string()));
        }

        Err(PromptError::invalid(id, ANY_FORMAT))
    }
}

impl FromStr for PromptId {
    type Err = PromptError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for PromptId {
    type Error = PromptError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<PromptId> for String {
    fn from(value: PromptId) -> Self {
        value.to_string()
    }
}

impl From<PromptGenerator> for PromptId {
    fn from(value: PromptGenerator) -> Self {
        PromptId::Generator(value)
    }
}

impl fmt::Display for PromptId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PromptId::Generator(generator) => write!(f, "{}", generator),
            PromptId::Saved(id) => write!(f, "{}{}", SAVED_PREFIX, id),
            PromptId::FineTune(id) => write!(f, "{}{}", FINE_TUNE_PREFIX, id),
            PromptId::Eval {
                project_id,
                task_id,
                eval_id,
                eval_config_id,
            } => write!(
                f,
                "{}{}::{}::{}::{}",
                EVAL_PREFIX, project_id, task_id, eval_id, eval_config_id
            ),
        }
    }
}

/// Whether `id` starts with one of the prefixed identifier shapes.
pub(crate) fn has_reserved_prefix(id: &str) -> bool {
    [SAVED_PREFIX, FINE_TUNE_PREFIX, EVAL_PREFIX]
        .iter()
        .any(|prefix| id.starts_with(prefix))
}

/// Checks that `id` is a well-formed prompt identifier and returns it unchanged.
pub fn validate_prompt_id(id: &str) -> Result<&str, PromptError> {
    PromptId::parse(id)?;
    Ok(id)
}
