//! LLM provider seam.
//!
//! [`LlmProvider`] performs a single chat completion. Everything above it
//! (run strategies, parsing, validation) lives in [`crate::adapters`]; concrete
//! providers are supplied by the embedding application.

pub mod chat;

pub use chat::{
    Choice, GenerationRequest, GenerationResponse, LlmProvider, Message, OutputFormat, Usage,
};
