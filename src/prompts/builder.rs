//! Prompt builders.
//!
//! A [`PromptBuilder`] turns a task, and for the multi-shot strategies its run
//! history, into the system prompt text and an optional chain-of-thought
//! instruction. Builders are resolved from a prompt identifier with
//! [`prompt_builder_from_id`].

use std::sync::Arc;

use crate::datamodel::{Prompt, Task, TaskInput};
use crate::error::PromptError;

use super::examples::{
    collect_examples, render_example, render_repair_example, FEW_SHOT_EXAMPLE_COUNT,
    MULTI_SHOT_EXAMPLE_COUNT,
};
use super::prompt_id::{has_reserved_prefix, PromptGenerator, PromptId, SEGMENT_DELIMITER};

/// Reasoning instruction used when the task defines none.
pub const DEFAULT_COT_INSTRUCTION: &str = "Think step by step, explaining your reasoning.";

const REQUIREMENTS_PREAMBLE: &str = "Your response should respect the following requirements:\n";

/// How the base prompt text is produced.
#[derive(Debug, Clone, PartialEq)]
pub enum PromptStrategy {
    /// Instruction plus a numbered requirement list.
    Simple,
    /// Instruction, requirements and up to `example_count` examples from history.
    MultiShot { example_count: usize, repairs: bool },
    /// A prompt saved on the task, used verbatim.
    Saved(Prompt),
    /// The system message and thinking instructions a fine-tune was trained with.
    FineTune {
        full_id: String,
        system_message: String,
        thinking_instructions: Option<String>,
    },
}

/// Builds prompt text for one task.
#[derive(Debug, Clone)]
pub struct PromptBuilder {
    task: Arc<Task>,
    strategy: PromptStrategy,
    generator: Option<PromptGenerator>,
    chain_of_thought: bool,
}

impl PromptBuilder {
    /// Builder for one of the generic generators.
    pub fn from_generator(generator: PromptGenerator, task: Arc<Task>) -> Self {
        let (strategy, chain_of_thought) = match generator {
            PromptGenerator::Simple => (PromptStrategy::Simple, false),
            PromptGenerator::MultiShot => (multi_shot(MULTI_SHOT_EXAMPLE_COUNT, false), false),
            PromptGenerator::FewShot => (multi_shot(FEW_SHOT_EXAMPLE_COUNT, false), false),
            PromptGenerator::Repairs => (multi_shot(MULTI_SHOT_EXAMPLE_COUNT, true), false),
            PromptGenerator::SimpleChainOfThought => (PromptStrategy::Simple, true),
            PromptGenerator::FewShotChainOfThought => {
                (multi_shot(FEW_SHOT_EXAMPLE_COUNT, false), true)
            }
            PromptGenerator::MultiShotChainOfThought => {
                (multi_shot(MULTI_SHOT_EXAMPLE_COUNT, false), true)
            }
        };

        Self {
            task,
            strategy,
            generator: Some(generator),
            chain_of_thought,
        }
    }

    /// Builder for a prompt saved on the task.
    pub fn saved(task: Arc<Task>, prompt_id: &str) -> Result<Self, PromptError> {
        let prompt = task
            .find_prompt(prompt_id)
            .cloned()
            .ok_or_else(|| PromptError::NotFound {
                kind: "Prompt",
                id: prompt_id.to_string(),
            })?;

        Ok(Self {
            task,
            strategy: PromptStrategy::Saved(prompt),
            generator: None,
            chain_of_thought: false,
        })
    }

    /// Builder for a fine-tune's prompt. `full_id` is `project_id::task_id::fine_tune_id`.
    pub fn fine_tune(task: Arc<Task>, full_id: &str) -> Result<Self, PromptError> {
        let parts: Vec<&str> = full_id.split(SEGMENT_DELIMITER).collect();
        if parts.len() != 3 {
            return Err(PromptError::invalid(
                full_id,
                "'project_id::task_id::fine_tune_id'",
            ));
        }

        let finetune = task.find_finetune(parts[2]).ok_or_else(|| PromptError::NotFound {
            kind: "Fine-tune",
            id: parts[2].to_string(),
        })?;
        let strategy = PromptStrategy::FineTune {
            full_id: full_id.to_string(),
            system_message: finetune.system_message.clone(),
            thinking_instructions: finetune.thinking_instructions.clone(),
        };

        Ok(Self {
            task,
            strategy,
            generator: None,
            chain_of_thought: false,
        })
    }

    /// Resolves a parsed identifier. Eval identifiers are not buildable here.
    pub fn from_prompt_id(prompt_id: &PromptId, task: Arc<Task>) -> Result<Self, PromptError> {
        match prompt_id {
            PromptId::Generator(generator) => Ok(Self::from_generator(*generator, task)),
            PromptId::Saved(id) => Self::saved(task, id),
            PromptId::FineTune(full_id) => Self::fine_tune(task, full_id),
            PromptId::Eval { .. } => Err(PromptError::UnknownGenerator(prompt_id.to_string())),
        }
    }

    pub fn task(&self) -> &Task {
        &self.task
    }

    pub fn strategy(&self) -> &PromptStrategy {
        &self.strategy
    }

    /// Persisted name of the builder.
    pub fn name(&self) -> &'static str {
        match (&self.strategy, self.generator) {
            (_, Some(generator)) => generator.as_str(),
            (PromptStrategy::Saved(_), None) => "saved_prompt_builder",
            (_, None) => "fine_tune_prompt_builder",
        }
    }

    /// Id of the stored prompt this builder reads, if any.
    pub fn prompt_id(&self) -> Option<&str> {
        match &self.strategy {
            PromptStrategy::Saved(prompt) => Some(&prompt.id),
            PromptStrategy::FineTune { full_id, .. } => Some(full_id),
            _ => None,
        }
    }

    /// Strategy-specific core prompt text.
    pub fn build_base_prompt(&self) -> String {
        match &self.strategy {
            PromptStrategy::Simple => self.simple_prompt(),
            PromptStrategy::MultiShot {
                example_count,
                repairs,
            } => self.multi_shot_prompt(*example_count, *repairs),
            PromptStrategy::Saved(prompt) => prompt.prompt.clone(),
            PromptStrategy::FineTune { system_message, .. } => system_message.clone(),
        }
    }

    /// Base prompt, plus format instructions carrying the output schema when
    /// requested and the task is structured.
    pub fn build_prompt(&self, include_json_instructions: bool) -> String {
        let mut prompt = self.build_base_prompt();

        if include_json_instructions {
            if let Some(schema) = self.task.output_schema() {
                prompt.push_str(&format!(
                    "\n\n# Format Instructions\n\nReturn a JSON object conforming to the following schema:\n```\n{}\n```",
                    schema
                ));
            }
        }

        prompt
    }

    /// Reasoning instruction, if this builder asks for one.
    pub fn chain_of_thought_prompt(&self) -> Option<&str> {
        match &self.strategy {
            PromptStrategy::Saved(prompt) => prompt.chain_of_thought_instructions.as_deref(),
            PromptStrategy::FineTune {
                thinking_instructions,
                ..
            } => thinking_instructions.as_deref(),
            _ if self.chain_of_thought => Some(
                self.task
                    .thinking_instruction()
                    .filter(|s| !s.is_empty())
                    .unwrap_or(DEFAULT_COT_INSTRUCTION),
            ),
            _ => None,
        }
    }

    /// User message carrying the task input.
    pub fn build_user_message(&self, input: &TaskInput) -> String {
        match input {
            TaskInput::Text(text) => format!("The input is:\n{}", text),
            TaskInput::Structured(map) => {
                let pretty = serde_json::to_string_pretty(map)
                    .unwrap_or_else(|_| input.to_stored_string());
                format!("The input is:\n{}", pretty)
            }
        }
    }

    /// Prompt shown to people: includes the thinking instructions even when the
    /// model receives them as a separate message.
    pub fn build_prompt_for_ui(&self) -> String {
        let mut prompt = self.build_prompt(false);
        if let Some(cot) = self.chain_of_thought_prompt().filter(|c| !c.is_empty()) {
            prompt.push_str("\n# Thinking Instructions\n\n");
            prompt.push_str(cot);
        }
        prompt
    }

    fn simple_prompt(&self) -> String {
        let mut prompt = self.task.instruction().to_string();
        if !self.task.requirements().is_empty() {
            prompt.push_str("\n\n");
            prompt.push_str(REQUIREMENTS_PREAMBLE);
            self.push_requirements(&mut prompt);
        }
        prompt
    }

    fn multi_shot_prompt(&self, example_count: usize, repairs: bool) -> String {
        let mut prompt = format!("# Instruction\n\n{}\n\n", self.task.instruction());

        if !self.task.requirements().is_empty() {
            prompt.push_str("# Requirements\n\n");
            prompt.push_str(REQUIREMENTS_PREAMBLE);
            self.push_requirements(&mut prompt);
            prompt.push('\n');
        }

        let examples = collect_examples(self.task.runs(), example_count);
        if examples.is_empty() {
            return prompt;
        }

        prompt.push_str("# Example Outputs\n\n");
        for (i, example) in examples.into_iter().enumerate() {
            let section = if repairs {
                render_repair_example(i, example)
            } else {
                render_example(i, example)
            };
            prompt.push_str(&section);
        }
        prompt
    }

    fn push_requirements(&self, prompt: &mut String) {
        for (i, requirement) in self.task.requirements().iter().enumerate() {
            prompt.push_str(&format!("{}) {}\n", i + 1, requirement.instruction));
        }
    }
}

fn multi_shot(example_count: usize, repairs: bool) -> PromptStrategy {
    PromptStrategy::MultiShot {
        example_count,
        repairs,
    }
}

/// Resolves a prompt identifier string to a builder for `task`.
///
/// Prefixed identifiers are checked against the identifier grammar first, so a
/// malformed id never reaches a builder. Anything else must be a generator name.
pub fn prompt_builder_from_id(id: &str, task: Arc<Task>) -> Result<PromptBuilder, PromptError> {
    if !has_reserved_prefix(id) {
        let generator: PromptGenerator = id.parse()?;
        return Ok(PromptBuilder::from_generator(generator, task));
    }

    let prompt_id = PromptId::parse(id)?;
    PromptBuilder::from_prompt_id(&prompt_id, task)
}
