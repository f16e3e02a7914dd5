//! Error types for task-forge operations.
//!
//! Defines the error taxonomy for every stage of a task run:
//! - Prompt identifier parsing and prompt builder resolution
//! - Data model validation (schemas, ratings, repair pairing)
//! - Output parsing
//! - Model catalog loading
//! - Fine-tune parameter and provider checks
//! - LLM provider failures
//! - The execution pipeline that ties them together

use thiserror::Error;

use crate::storage::StorageError;

/// Errors raised while resolving a prompt identifier into a prompt builder.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum PromptError {
    #[error("Invalid prompt ID '{id}'. Expected format: {expected}")]
    InvalidIdentifier { id: String, expected: String },

    #[error("Unknown prompt generator: {0}")]
    UnknownGenerator(String),

    #[error("{kind} not found: {id}")]
    NotFound { kind: &'static str, id: String },
}

impl PromptError {
    pub(crate) fn invalid(id: impl Into<String>, expected: impl Into<String>) -> Self {
        Self::InvalidIdentifier {
            id: id.into(),
            expected: expected.into(),
        }
    }
}

/// Errors raised when a record breaks a data model rule.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ValidationError {
    #[error("Type mismatch: {0}")]
    TypeMismatch(String),

    #[error("{context} does not match schema: {message}")]
    SchemaViolation { context: String, message: String },

    #[error("Invalid JSON schema: {0}")]
    InvalidSchema(String),

    #[error("Invariant violation: {0}")]
    InvariantViolation(String),
}

impl ValidationError {
    pub(crate) fn invariant(message: impl Into<String>) -> Self {
        Self::InvariantViolation(message.into())
    }
}

/// Errors raised by output parsers while extracting the final answer.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ParseError {
    #[error("Missing thinking tags in model output")]
    MissingThinking,

    #[error("Model output contained no answer after the reasoning section")]
    EmptyAnswer,

    #[error("Structured output is not valid JSON: {0}")]
    InvalidJson(String),
}

/// Errors that can occur while loading a model catalog.
#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("Failed to read catalog: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse catalog {path}: {message}")]
    ParseError { path: String, message: String },

    #[error("Duplicate model in catalog: {0}")]
    DuplicateModel(String),
}

/// Errors raised while validating or launching a fine-tune.
#[derive(Debug, Error)]
pub enum FinetuneError {
    #[error("Parameter {0} is required")]
    MissingParameter(String),

    #[error("Parameter {0} is not available")]
    UnknownParameter(String),

    #[error("Parameter {name} must be {expected}, got {actual}")]
    TypeMismatch {
        name: String,
        expected: &'static str,
        actual: &'static str,
    },

    #[error("Provider {provider} with base model {base_model} is not available")]
    UnknownModel { provider: String, base_model: String },

    #[error("Invalid fine-tune request: {0}")]
    InvalidRequest(String),

    #[error("Fine-tune provider error: {0}")]
    Provider(String),

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),
}

/// Errors returned by [`crate::llm::LlmProvider`] and
/// [`crate::adapters::ModelInvoker`] implementations.
///
/// The crate ships no concrete provider; this is the taxonomy implementors
/// map their transport failures onto. The pipeline only constructs
/// [`LlmError::EmptyResponse`] itself and passes every variant through
/// [`AdapterError::Invocation`] unchanged, without retrying.
#[derive(Debug, Error)]
pub enum LlmError {
    /// The request never produced a response (connection, TLS, DNS).
    #[error("HTTP request failed: {0}")]
    RequestFailed(String),

    /// The provider asked the caller to back off.
    #[error("Rate limited: {0}")]
    RateLimited(String),

    /// The provider does not serve the requested model id.
    #[error("Invalid model: {0}")]
    InvalidModel(String),

    /// The prompt does not fit the model's context window.
    #[error("Context length exceeded: {limit} tokens")]
    ContextLengthExceeded { limit: u32 },

    /// Any other non-success status reported by the provider.
    #[error("API error ({code}): {message}")]
    ApiError { code: u16, message: String },

    /// Raised by the provider's own timeout; the pipeline sets none.
    #[error("Request timed out after {seconds} seconds")]
    Timeout { seconds: u64 },

    /// No choices, or an empty reasoning turn in a two-call run.
    #[error("LLM returned no choices")]
    EmptyResponse,
}

/// Errors surfaced by the task execution pipeline.
///
/// Each stage's error is carried through unchanged so callers can match on the
/// original taxonomy; none of them are retried.
#[derive(Debug, Error)]
pub enum AdapterError {
    #[error(transparent)]
    Prompt(#[from] PromptError),

    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Parse(#[from] ParseError),

    #[error(transparent)]
    Invocation(#[from] LlmError),

    #[error("Model provider '{provider}' not found for model '{model}'")]
    UnknownProvider { model: String, provider: String },

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),
}

/// Result type alias for pipeline operations.
pub type AdapterResult<T> = Result<T, AdapterError>;
