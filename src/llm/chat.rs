//! Chat completion types and the provider trait.
//!
//! These types are provider-neutral: a concrete [`LlmProvider`] maps them onto
//! whatever wire format its service speaks.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::catalog::StructuredOutputMode;
use crate::error::LlmError;

/// One chat turn.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    /// `system`, `user` or `assistant`.
    pub role: String,
    pub content: String,
    /// Native reasoning returned by reasoning-capable models.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reasoning_content: Option<String>,
}

impl Message {
    fn with_role(role: &str, content: impl Into<String>) -> Self {
        Self {
            role: role.to_string(),
            content: content.into(),
            reasoning_content: None,
        }
    }

    pub fn system(content: impl Into<String>) -> Self {
        Self::with_role("system", content)
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self::with_role("user", content)
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self::with_role("assistant", content)
    }

    pub fn with_reasoning(mut self, reasoning: impl Into<String>) -> Self {
        self.reasoning_content = Some(reasoning.into());
        self
    }
}

/// Structured output constraint attached to a request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutputFormat {
    pub mode: StructuredOutputMode,
    /// Parsed output JSON schema.
    pub schema: Value,
}

/// A single chat completion call.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerationRequest {
    /// Provider-side model id.
    pub model: String,
    pub messages: Vec<Message>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,
    /// Structured output constraint; `None` requests free-form text.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output_format: Option<OutputFormat>,
    /// Alternatives to report per output token, when the provider supports logprobs.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub top_logprobs: Option<u32>,
}

impl GenerationRequest {
    /// Request with provider defaults for every sampling option.
    pub fn new(model: impl Into<String>, messages: Vec<Message>) -> Self {
        Self {
            model: model.into(),
            messages,
            temperature: None,
            max_tokens: None,
            output_format: None,
            top_logprobs: None,
        }
    }

    pub fn with_temperature(mut self, temperature: f64) -> Self {
        self.temperature = Some(temperature);
        self
    }

    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = Some(max_tokens);
        self
    }

    pub fn with_output_format(mut self, format: Option<OutputFormat>) -> Self {
        self.output_format = format;
        self
    }

    pub fn with_top_logprobs(mut self, top_logprobs: Option<u32>) -> Self {
        self.top_logprobs = top_logprobs;
        self
    }
}

/// What a provider returned for a [`GenerationRequest`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerationResponse {
    pub id: String,
    /// Model that actually served the call.
    pub model: String,
    pub choices: Vec<Choice>,
    pub usage: Usage,
}

impl GenerationResponse {
    pub fn first_message(&self) -> Option<&Message> {
        self.choices.first().map(|c| &c.message)
    }

    pub fn first_content(&self) -> Option<&str> {
        self.first_message().map(|m| m.content.as_str())
    }
}

/// One completion candidate.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Choice {
    pub index: u32,
    pub message: Message,
    /// `stop`, `length`, or a provider-specific reason.
    pub finish_reason: String,
}

/// Token counts reported by the provider.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Usage {
    pub prompt_tokens: u32,
    pub completion_tokens: u32,
    pub total_tokens: u32,
}

/// A chat-completion backend.
///
/// Implementations own transport, authentication and retries; errors are
/// surfaced to the caller unchanged.
#[async_trait]
pub trait LlmProvider: Send + Sync {
    async fn generate(&self, request: GenerationRequest) -> Result<GenerationResponse, LlmError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_message_creation() {
        let system = Message::system("You are helpful");
        assert_eq!(system.role, "system");
        assert_eq!(system.content, "You are helpful");
        assert!(system.reasoning_content.is_none());

        let assistant = Message::assistant("42").with_reasoning("6 * 7");
        assert_eq!(assistant.role, "assistant");
        assert_eq!(assistant.reasoning_content.as_deref(), Some("6 * 7"));
    }

    #[test]
    fn test_generation_request_builder() {
        let request = GenerationRequest::new("gpt-4o", vec![Message::user("Hello")])
            .with_temperature(0.7)
            .with_max_tokens(100)
            .with_top_logprobs(Some(5));

        assert_eq!(request.model, "gpt-4o");
        assert_eq!(request.messages.len(), 1);
        assert_eq!(request.temperature, Some(0.7));
        assert_eq!(request.max_tokens, Some(100));
        assert_eq!(request.top_logprobs, Some(5));
        assert!(request.output_format.is_none());
    }

    #[test]
    fn test_request_serialization_skips_unset_fields() {
        let request = GenerationRequest::new("m", vec![Message::user("hi")]);
        let json = serde_json::to_string(&request).unwrap();
        assert!(!json.contains("temperature"));
        assert!(!json.contains("output_format"));
        assert!(!json.contains("reasoning_content"));
    }

    #[test]
    fn test_first_content() {
        let response = GenerationResponse {
            id: "r1".into(),
            model: "m".into(),
            choices: vec![Choice {
                index: 0,
                message: Message::assistant("Hello!"),
                finish_reason: "stop".into(),
            }],
            usage: Usage::default(),
        };
        assert_eq!(response.first_content(), Some("Hello!"));

        let empty = GenerationResponse {
            choices: vec![],
            ..response
        };
        assert!(empty.first_content().is_none());
    }
}
