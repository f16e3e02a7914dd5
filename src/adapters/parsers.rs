//! Output parsers, selected by the provider's [`ParserId`].

use serde_json::Value;

use crate::catalog::ParserId;
use crate::error::ParseError;
use crate::utils::json_extraction::extract_json_object;

use super::run_output::{ParsedOutput, RawOutput, REASONING_KEY};

const THINK_OPEN: &str = "<think>";
const THINK_CLOSE: &str = "</think>";

/// Extracts the final answer from a raw model output.
pub trait OutputParser: Send + Sync {
    fn parse(&self, raw: RawOutput, structured: bool) -> Result<ParsedOutput, ParseError>;
}

/// Passes text through; for structured runs, extracts and parses the JSON object.
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultParser;

impl OutputParser for DefaultParser {
    fn parse(&self, raw: RawOutput, structured: bool) -> Result<ParsedOutput, ParseError> {
        if !structured {
            return Ok(raw);
        }
        let output = parse_structured(raw.output)?;
        Ok(ParsedOutput {
            output,
            intermediate_outputs: raw.intermediate_outputs,
        })
    }
}

/// Splits `<think>...</think>` reasoning from the answer that follows it.
///
/// The reasoning lands in the `reasoning` intermediate output. The opening tag
/// is optional since some providers strip it.
#[derive(Debug, Clone, Copy, Default)]
pub struct R1ThinkingParser;

impl OutputParser for R1ThinkingParser {
    fn parse(&self, raw: RawOutput, structured: bool) -> Result<ParsedOutput, ParseError> {
        let mut intermediate_outputs = raw.intermediate_outputs;

        let text = match raw.output {
            Value::String(text) => text,
            // already parsed upstream; nothing to split
            other => {
                return DefaultParser.parse(
                    ParsedOutput {
                        output: other,
                        intermediate_outputs,
                    },
                    structured,
                )
            }
        };

        let body = text.trim();
        let body = body.strip_prefix(THINK_OPEN).unwrap_or(body);
        let (thinking, answer) = body
            .split_once(THINK_CLOSE)
            .ok_or(ParseError::MissingThinking)?;

        let answer = answer.trim();
        if answer.is_empty() {
            return Err(ParseError::EmptyAnswer);
        }
        intermediate_outputs.insert(REASONING_KEY.to_string(), thinking.trim().to_string());

        DefaultParser.parse(
            ParsedOutput {
                output: Value::String(answer.to_string()),
                intermediate_outputs,
            },
            structured,
        )
    }
}

/// Parser registry keyed by the catalog's parser id.
pub fn parser_for(id: ParserId) -> Box<dyn OutputParser> {
    match id {
        ParserId::Default => Box::new(DefaultParser),
        ParserId::R1Thinking => Box::new(R1ThinkingParser),
    }
}

fn parse_structured(output: Value) -> Result<Value, ParseError> {
    match output {
        Value::Object(_) => Ok(output),
        Value::String(text) => extract_json_object(&text)
            .map(Value::Object)
            .map_err(|e| ParseError::InvalidJson(e.to_string())),
        other => Err(ParseError::InvalidJson(other.to_string())),
    }
}
