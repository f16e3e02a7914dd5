//! JSON object extraction from model responses.
//!
//! Models asked for structured output often wrap the object in a markdown
//! fence or surround it with prose. Extraction tries, in order:
//! 1. The whole response as JSON
//! 2. The first fenced code block (```json or bare ```)
//! 3. The largest balanced `{...}` object in the text, later wins on ties
//!
//! # Example
//!
//! ```
//! use task_forge::utils::json_extraction::extract_json_object;
//!
//! let response = "Sure! Here you go:\n```json\n{\"name\": \"example\"}\n```";
//! let object = extract_json_object(response).unwrap();
//! assert_eq!(object["name"], "example");
//! ```

use regex::Regex;
use serde_json::{Map, Value};
use thiserror::Error;

/// Error type for JSON extraction failures
#[derive(Debug, Clone, Error, PartialEq)]
pub enum JsonExtractionError {
    #[error("JSON appears truncated: {unclosed_braces} unclosed braces")]
    Truncated { unclosed_braces: usize },

    #[error("No JSON object found in response. Content starts with: '{content_preview}'")]
    NotFound { content_preview: String },
}

/// Extracts a JSON object from a model response.
pub fn extract_json_object(content: &str) -> Result<Map<String, Value>, JsonExtractionError> {
    let trimmed = content.trim();

    if let Some(object) = parse_object(trimmed) {
        return Ok(object);
    }

    if let Some(object) = extract_from_code_block(trimmed).and_then(|block| parse_object(&block)) {
        return Ok(object);
    }

    if let Some(object) = extract_largest_object(trimmed) {
        return Ok(object);
    }

    if let Some(start) = trimmed.find('{') {
        let unclosed_braces = unclosed_braces(&trimmed[start..]);
        if unclosed_braces > 0 {
            return Err(JsonExtractionError::Truncated { unclosed_braces });
        }
    }

    Err(JsonExtractionError::NotFound {
        content_preview: trimmed.chars().take(50).collect(),
    })
}

fn parse_object(candidate: &str) -> Option<Map<String, Value>> {
    match serde_json::from_str::<Value>(candidate) {
        Ok(Value::Object(map)) => Some(map),
        _ => None,
    }
}

/// Contents of the first fenced code block.
pub fn extract_from_code_block(content: &str) -> Option<String> {
    let re = Regex::new(r"```(?:\w+)?\s*\n?([\s\S]*?)\n?```").ok()?;
    let caps = re.captures(content)?;
    Some(caps.get(1)?.as_str().trim().to_string())
}

/// Finds the closing brace matching the `{` that `s` starts with.
///
/// Braces inside string literals, including escaped quotes, are ignored.
pub fn find_matching_brace(s: &str) -> Option<usize> {
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escape_next = false;

    for (i, c) in s.char_indices() {
        if escape_next {
            escape_next = false;
            continue;
        }

        match c {
            '\\' if in_string => escape_next = true,
            '"' => in_string = !in_string,
            '{' if !in_string => depth += 1,
            '}' if !in_string => {
                depth = depth.saturating_sub(1);
                if depth == 0 {
                    return Some(i);
                }
            }
            _ => {}
        }
    }

    None
}

fn unclosed_braces(s: &str) -> usize {
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escape_next = false;

    for c in s.chars() {
        if escape_next {
            escape_next = false;
            continue;
        }
        match c {
            '\\' if in_string => escape_next = true,
            '"' => in_string = !in_string,
            '{' if !in_string => depth += 1,
            '}' if !in_string => depth = depth.saturating_sub(1),
            _ => {}
        }
    }

    depth
}

fn extract_largest_object(content: &str) -> Option<Map<String, Value>> {
    content
        .char_indices()
        .filter(|&(_, c)| c == '{')
        .filter_map(|(start, _)| {
            let end = find_matching_brace(&content[start..])?;
            let candidate = &content[start..=start + end];
            parse_object(candidate).map(|object| (start, candidate.len(), object))
        })
        .max_by(|a, b| a.1.cmp(&b.1).then(a.0.cmp(&b.0)))
        .map(|(_, _, object)| object)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_direct_object() {
        let object = extract_json_object(r#"  {"a": 1}  "#).unwrap();
        assert_eq!(object["a"], 1);
    }

    #[test]
    fn test_fenced_blocks() {
        let object = extract_json_object("```json\n{\"a\": \"b\"}\n```").unwrap();
        assert_eq!(object["a"], "b");

        let object = extract_json_object("Result:\n```\n{\"n\": 2}\n```\nDone.").unwrap();
        assert_eq!(object["n"], 2);
    }

    #[test]
    fn test_object_inside_prose() {
        let object =
            extract_json_object(r#"I thought about {"x": 1} but the answer is {"x": 1, "y": [2, 3]}."#)
                .unwrap();
        assert_eq!(object["y"][1], 3);
    }

    #[test]
    fn test_braces_in_strings() {
        assert_eq!(find_matching_brace(r#"{"a": "}{"}"#), Some(10));
        assert_eq!(find_matching_brace(r#"{"a": "\"}"}"#), Some(11));
        assert_eq!(find_matching_brace("{"), None);
    }

    #[test]
    fn test_arrays_are_not_objects() {
        assert!(matches!(
            extract_json_object("[1, 2, 3]"),
            Err(JsonExtractionError::NotFound { .. })
        ));
    }

    #[test]
    fn test_truncated() {
        assert_eq!(
            extract_json_object(r#"{"a": {"b": 1"#),
            Err(JsonExtractionError::Truncated { unclosed_braces: 2 })
        );
    }

    #[test]
    fn test_not_found() {
        assert!(matches!(
            extract_json_object("no json here"),
            Err(JsonExtractionError::NotFound { .. })
        ));
    }
}
