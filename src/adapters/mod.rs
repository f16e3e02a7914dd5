//! Task execution.
//!
//! A [`TaskAdapter`] ties a task, a prompt builder and a catalog provider
//! entry together and runs inputs through them:
//!
//! - [`RunStrategy`] decides how chain-of-thought is handled
//! - [`ModelInvoker`] performs the model calls ([`ChatInvoker`] over any
//!   [`crate::llm::LlmProvider`])
//! - [`OutputParser`] extracts the final answer
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use task_forge::adapters::{ChatInvoker, RunConfig, TaskAdapter};
//! use task_forge::catalog::StaticCatalog;
//! use task_forge::config::RuntimeConfig;
//! use task_forge::datamodel::{Task, TaskInput};
//! use task_forge::llm::LlmProvider;
//! use task_forge::prompts::PromptGenerator;
//!
//! async fn run<P: LlmProvider + 'static>(provider: Arc<P>) -> anyhow::Result<()> {
//!     let task = Arc::new(Task::new("Jokes", "Tell a joke about the input."));
//!     let config = RunConfig::new(task, "gpt_4o_mini", "openai", PromptGenerator::Simple.into());
//!     let adapter = TaskAdapter::new(
//!         config,
//!         Arc::new(ChatInvoker::new(provider)),
//!         &StaticCatalog::builtin(),
//!         RuntimeConfig::from_env()?,
//!     )?;
//!     let run = adapter.invoke(TaskInput::from("penguins"), None).await?;
//!     println!("{}", run.output().output);
//!     Ok(())
//! }
//! ```

pub mod invoker;
pub mod parsers;
pub mod run_output;
pub mod run_strategy;
pub mod task_adapter;

pub use invoker::{ChatInvoker, InvocationRequest, ModelInvoker, CHAT_ADAPTER_NAME};
pub use parsers::{parser_for, DefaultParser, OutputParser, R1ThinkingParser};
pub use run_output::{ParsedOutput, RawOutput, RunOutput, CHAIN_OF_THOUGHT_KEY, REASONING_KEY};
pub use run_strategy::{RunStrategy, COT_FINAL_ANSWER_PROMPT};
pub use task_adapter::{RunConfig, TaskAdapter};
