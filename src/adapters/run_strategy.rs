//! Chain-of-thought execution strategy.

use std::fmt;

/// Follow-up prompt asking for the final answer after a reasoning call.
pub const COT_FINAL_ANSWER_PROMPT: &str = "Considering the above, return a final result.";

/// How a run handles chain-of-thought, fixed before the model is called.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunStrategy {
    /// One call; the reasoning instruction is sent as an extra message and
    /// the model reasons natively.
    CotAsMessage(String),
    /// Two calls: free-form reasoning first, then the final (structured) answer.
    CotTwoCall(String),
    /// One call, no reasoning step.
    Basic,
}

impl RunStrategy {
    /// Picks the strategy from the builder's reasoning instruction and the
    /// model's capability. An empty instruction counts as none.
    pub fn select(cot_prompt: Option<&str>, reasoning_capable: bool) -> Self {
        match cot_prompt.filter(|p| !p.is_empty()) {
            Some(prompt) if reasoning_capable => RunStrategy::CotAsMessage(prompt.to_string()),
            Some(prompt) => RunStrategy::CotTwoCall(prompt.to_string()),
            None => RunStrategy::Basic,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            RunStrategy::CotAsMessage(_) => "cot_as_message",
            RunStrategy::CotTwoCall(_) => "cot_two_call",
            RunStrategy::Basic => "basic",
        }
    }

    pub fn cot_prompt(&self) -> Option<&str> {
        match self {
            RunStrategy::CotAsMessage(prompt) | RunStrategy::CotTwoCall(prompt) => Some(prompt),
            RunStrategy::Basic => None,
        }
    }
}

impl fmt::Display for RunStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_selection_table() {
        assert_eq!(
            RunStrategy::select(Some("think"), true),
            RunStrategy::CotAsMessage("think".into())
        );
        assert_eq!(
            RunStrategy::select(Some("think"), false),
            RunStrategy::CotTwoCall("think".into())
        );
        assert_eq!(RunStrategy::select(None, true), RunStrategy::Basic);
        assert_eq!(RunStrategy::select(None, false), RunStrategy::Basic);
    }

    #[test]
    fn test_empty_instruction_is_basic() {
        assert_eq!(RunStrategy::select(Some(""), true), RunStrategy::Basic);
        assert_eq!(RunStrategy::select(Some(""), false), RunStrategy::Basic);
    }

    #[test]
    fn test_names() {
        assert_eq!(RunStrategy::Basic.to_string(), "basic");
        assert_eq!(RunStrategy::CotTwoCall("x".into()).name(), "cot_two_call");
        assert_eq!(RunStrategy::CotAsMessage("x".into()).cot_prompt(), Some("x"));
    }
}
