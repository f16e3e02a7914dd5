//! Prompt construction for task runs.
//!
//! # Architecture
//!
//! - [`prompt_id`] - The identifier grammar selecting a prompt source
//! - [`builder`] - Prompt builders and the identifier-to-builder factory
//! - [`examples`] - Example selection from run history for multi-shot prompts
//!
//! # Usage
//!
//! ```
//! use std::sync::Arc;
//! use task_forge::datamodel::{Task, TaskRequirement};
//! use task_forge::prompts::prompt_builder_from_id;
//!
//! let task = Task::new("Jokes", "Tell a joke about the subject.")
//!     .with_requirement(TaskRequirement::new("Clean", "Keep it clean"))
//!     .unwrap();
//!
//! let builder = prompt_builder_from_id("simple_chain_of_thought_prompt_builder", Arc::new(task))
//!     .expect("known generator");
//! assert!(builder.build_prompt(false).contains("1) Keep it clean"));
//! assert!(builder.chain_of_thought_prompt().is_some());
//! ```

pub mod builder;
pub mod examples;
pub mod prompt_id;

pub use builder::{prompt_builder_from_id, PromptBuilder, PromptStrategy, DEFAULT_COT_INSTRUCTION};
pub use examples::{collect_examples, FEW_SHOT_EXAMPLE_COUNT, MULTI_SHOT_EXAMPLE_COUNT};
pub use prompt_id::{validate_prompt_id, PromptGenerator, PromptId};
