//! Model output before and after parsing.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Intermediate output key for a two-call reasoning trace.
pub const CHAIN_OF_THOUGHT_KEY: &str = "chain_of_thought";

/// Intermediate output key for native model reasoning.
pub const REASONING_KEY: &str = "reasoning";

/// The final answer of a run plus named intermediate fragments.
///
/// `output` is a string for unstructured tasks and a JSON object once a
/// structured response has been parsed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunOutput {
    pub output: Value,
    #[serde(default)]
    pub intermediate_outputs: BTreeMap<String, String>,
}

impl RunOutput {
    pub fn text(output: impl Into<String>) -> Self {
        Self {
            output: Value::String(output.into()),
            intermediate_outputs: BTreeMap::new(),
        }
    }

    pub fn with_intermediate(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.intermediate_outputs.insert(key.into(), value.into());
        self
    }

    pub fn as_text(&self) -> Option<&str> {
        self.output.as_str()
    }
}

/// Output as returned by the invoker.
pub type RawOutput = RunOutput;

/// Output after the parser has extracted the final answer.
pub type ParsedOutput = RunOutput;
