//! Built-in catalog entries.

use super::{CatalogModel, ModelProvider, ParserId, StructuredOutputMode};

fn model(name: &str, friendly_name: &str, providers: Vec<ModelProvider>) -> CatalogModel {
    CatalogModel {
        name: name.to_string(),
        friendly_name: Some(friendly_name.to_string()),
        providers,
    }
}

pub(super) fn models() -> Vec<CatalogModel> {
    vec![
        model(
            "gpt_4o_mini",
            "GPT 4o Mini",
            vec![
                ModelProvider::new("openai")
                    .with_model_id("gpt-4o-mini")
                    .with_finetune_id("gpt-4o-mini-2024-07-18")
                    .with_structured_output_mode(StructuredOutputMode::JsonSchema),
                ModelProvider::new("openrouter")
                    .with_model_id("openai/gpt-4o-mini")
                    .with_structured_output_mode(StructuredOutputMode::JsonSchema),
            ],
        ),
        model(
            "gpt_4o",
            "GPT 4o",
            vec![
                ModelProvider::new("openai")
                    .with_model_id("gpt-4o")
                    .with_finetune_id("gpt-4o-2024-08-06")
                    .with_structured_output_mode(StructuredOutputMode::JsonSchema),
                ModelProvider::new("openrouter")
                    .with_model_id("openai/gpt-4o")
                    .with_structured_output_mode(StructuredOutputMode::JsonSchema),
            ],
        ),
        model(
            "llama_3_1_8b",
            "Llama 3.1 8B",
            vec![
                ModelProvider::new("fireworks_ai")
                    .with_model_id("accounts/fireworks/models/llama-v3p1-8b-instruct")
                    .with_finetune_id("accounts/fireworks/models/llama-v3p1-8b-instruct")
                    .with_structured_output_mode(StructuredOutputMode::JsonMode),
                ModelProvider::new("together_ai")
                    .with_model_id("meta-llama/Meta-Llama-3.1-8B-Instruct-Turbo")
                    .with_finetune_id("meta-llama/Meta-Llama-3.1-8B-Instruct-Reference")
                    .with_structured_output_mode(StructuredOutputMode::JsonInstructionAndObject),
                ModelProvider::new("ollama")
                    .with_model_id("llama3.1:8b")
                    .with_structured_output_mode(StructuredOutputMode::JsonSchema),
            ],
        ),
        model(
            "deepseek_r1",
            "DeepSeek R1",
            vec![
                ModelProvider::new("openrouter")
                    .with_model_id("deepseek/deepseek-r1")
                    .with_reasoning(true)
                    .with_structured_output_mode(StructuredOutputMode::JsonInstructions),
                ModelProvider::new("fireworks_ai")
                    .with_model_id("accounts/fireworks/models/deepseek-r1")
                    .with_reasoning(true)
                    .with_structured_output_mode(StructuredOutputMode::JsonInstructions)
                    .with_parser(ParserId::R1Thinking),
                ModelProvider::new("ollama")
                    .with_model_id("deepseek-r1:32b")
                    .with_reasoning(true)
                    .with_structured_output_mode(StructuredOutputMode::JsonInstructions)
                    .with_parser(ParserId::R1Thinking),
            ],
        ),
        model(
            "claude_3_5_sonnet",
            "Claude 3.5 Sonnet",
            vec![ModelProvider::new("openrouter")
                .with_model_id("anthropic/claude-3.5-sonnet")
                .with_structured_output_mode(StructuredOutputMode::FunctionCalling)],
        ),
    ]
}
