//! Step events — one unit of agent progress.
//!
//! A step is one provider response plus the execution of every tool call it
//! requested. The step engine produces exactly one [`StepEvent`] per step and
//! hands it to its observer; events are never persisted.

use crate::provider::Usage;
use crate::tool::{ToolCall, ToolOutcome};

/// The result paired with one tool call of a step.
#[derive(Debug, Clone)]
pub struct StepToolResult {
    /// The call this result answers
    pub call_id: String,

    /// The tool that produced it
    pub tool_name: String,

    /// What happened
    pub outcome: ToolOutcome,
}

/// A completed step.
#[derive(Debug, Clone)]
pub struct StepEvent {
    /// 1-based step index within the run
    pub index: u32,

    /// Text the model generated in this step
    pub text: String,

    /// Tool calls in the order the model issued them
    pub tool_calls: Vec<ToolCall>,

    /// Tool results in execution order
    pub tool_results: Vec<StepToolResult>,

    /// Token usage reported for this step
    pub usage: Usage,
}

impl StepEvent {
    /// Find the result paired with `call_id`, if any.
    pub fn result_for(&self, call_id: &str) -> Option<&StepToolResult> {
        self.tool_results.iter().find(|r| r.call_id == call_id)
    }

    /// Prompt tokens consumed by this step.
    pub fn prompt_tokens(&self) -> u64 {
        u64::from(self.usage.prompt_tokens)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tool::ToolResult;

    fn event() -> StepEvent {
        StepEvent {
            index: 1,
            text: "checking".into(),
            tool_calls: vec![
                ToolCall {
                    id: "a".into(),
                    name: "wait".into(),
                    arguments: serde_json::json!({"duration": 1}),
                },
                ToolCall {
                    id: "b".into(),
                    name: "say".into(),
                    arguments: serde_json::json!({"text": "hi"}),
                },
            ],
            tool_results: vec![StepToolResult {
                call_id: "b".into(),
                tool_name: "say".into(),
                outcome: ToolOutcome::Reported(ToolResult::text("ok")),
            }],
            usage: Usage {
                prompt_tokens: 120,
                completion_tokens: 30,
                total_tokens: 150,
            },
        }
    }

    #[test]
    fn result_lookup_by_call_id() {
        let event = event();
        assert_eq!(event.result_for("b").map(|r| r.tool_name.as_str()), Some("say"));
        assert!(event.result_for("a").is_none());
    }

    #[test]
    fn prompt_tokens_come_from_usage() {
        assert_eq!(event().prompt_tokens(), 120);
    }
}
