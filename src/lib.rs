//! task-forge: prompt construction and task execution for LLM-backed tasks.
//!
//! A [`datamodel::Task`] describes what a model should do and keeps the
//! history of its runs. This library builds prompts for a task
//! ([`prompts`]), runs inputs through a model provider and validates the
//! result ([`adapters`]), records provenance for every run
//! ([`datamodel`]), and checks fine-tune configurations before a job is
//! launched ([`finetune`]).

pub mod adapters;
pub mod catalog;
pub mod cli;
pub mod config;
pub mod datamodel;
pub mod error;
pub mod finetune;
pub mod llm;
pub mod prompts;
pub mod storage;
pub mod utils;

// Re-export commonly used error types
pub use error::{
    AdapterError, AdapterResult, CatalogError, FinetuneError, LlmError, ParseError, PromptError,
    ValidationError,
};
