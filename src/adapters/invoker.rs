//! Model invocation for a chosen run strategy.

use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;
use tracing::debug;

use crate::error::LlmError;
use crate::llm::{GenerationRequest, LlmProvider, Message, OutputFormat};

use super::run_output::{RawOutput, CHAIN_OF_THOUGHT_KEY, REASONING_KEY};
use super::run_strategy::{RunStrategy, COT_FINAL_ANSWER_PROMPT};

/// Default adapter name recorded on synthetic outputs.
pub const CHAT_ADAPTER_NAME: &str = "task_forge_chat_adapter";

/// Everything a model call needs, fixed before invocation.
#[derive(Debug, Clone)]
pub struct InvocationRequest {
    /// Provider-side model id.
    pub model_id: String,
    /// System prompt followed by the user message.
    pub messages: Vec<Message>,
    pub strategy: RunStrategy,
    /// Structured output constraint for the final answer.
    pub output_format: Option<OutputFormat>,
    pub top_logprobs: Option<u32>,
}

/// Runs a prompt against a model under a run strategy.
///
/// Errors are provider errors and are passed through to the caller unchanged.
#[async_trait]
pub trait ModelInvoker: Send + Sync {
    /// Name recorded as the `adapter_name` of synthetic outputs.
    fn adapter_name(&self) -> &str;

    async fn invoke(&self, request: InvocationRequest) -> Result<RawOutput, LlmError>;
}

/// [`ModelInvoker`] built on a chat-completion [`LlmProvider`].
pub struct ChatInvoker<P: LlmProvider> {
    provider: Arc<P>,
    adapter_name: String,
}

impl<P: LlmProvider> ChatInvoker<P> {
    pub fn new(provider: Arc<P>) -> Self {
        Self {
            provider,
            adapter_name: CHAT_ADAPTER_NAME.to_string(),
        }
    }

    pub fn with_adapter_name(mut self, name: impl Into<String>) -> Self {
        self.adapter_name = name.into();
        self
    }

    async fn complete(
        &self,
        request: &InvocationRequest,
        messages: Vec<Message>,
        output_format: Option<OutputFormat>,
    ) -> Result<Message, LlmError> {
        let generation = GenerationRequest::new(request.model_id.clone(), messages)
            .with_output_format(output_format)
            .with_top_logprobs(request.top_logprobs);

        let response = self.provider.generate(generation).await?;
        debug!(
            model = %response.model,
            prompt_tokens = response.usage.prompt_tokens,
            completion_tokens = response.usage.completion_tokens,
            "Model call complete"
        );

        response
            .choices
            .into_iter()
            .next()
            .map(|choice| choice.message)
            .ok_or(LlmError::EmptyResponse)
    }
}

#[async_trait]
impl<P: LlmProvider> ModelInvoker for ChatInvoker<P> {
    fn adapter_name(&self) -> &str {
        &self.adapter_name
    }

    async fn invoke(&self, request: InvocationRequest) -> Result<RawOutput, LlmError> {
        let mut messages = request.messages.clone();
        let mut intermediate_outputs = BTreeMap::new();

        match &request.strategy {
            RunStrategy::Basic => {}
            RunStrategy::CotAsMessage(cot) => messages.push(Message::system(cot.clone())),
            RunStrategy::CotTwoCall(cot) => {
                messages.push(Message::system(cot.clone()));
                // call 1: free-form reasoning, no output constraint
                let reasoning = self.complete(&request, messages.clone(), None).await?;
                if reasoning.content.trim().is_empty() {
                    return Err(LlmError::EmptyResponse);
                }
                intermediate_outputs
                    .insert(CHAIN_OF_THOUGHT_KEY.to_string(), reasoning.content.clone());
                messages.push(Message::assistant(reasoning.content));
                messages.push(Message::user(COT_FINAL_ANSWER_PROMPT));
            }
        }

        let answer = self
            .complete(&request, messages, request.output_format.clone())
            .await?;
        if let Some(reasoning) = answer.reasoning_content.filter(|r| !r.trim().is_empty()) {
            intermediate_outputs.insert(REASONING_KEY.to_string(), reasoning);
        }

        Ok(RawOutput {
            output: Value::String(answer.content),
            intermediate_outputs,
        })
    }
}
