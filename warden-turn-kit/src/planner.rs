//! Decide what a ReAct loop does next given the latest provider response.

use thiserror::Error;
use warden_turn::{ContentPart, ProviderResponse, StopReason};

/// A single tool call extracted from a provider response, in the order
/// the model emitted it.
#[derive(Debug, Clone, PartialEq)]
pub struct PlannedToolCall {
    /// The provider-assigned id for this tool use block.
    pub id: String,
    /// Tool name.
    pub name: String,
    /// Tool input, still untyped — argument validation happens in the
    /// tool runtime, not here.
    pub input: serde_json::Value,
}

/// What the loop should do next.
#[derive(Debug, Clone, PartialEq)]
pub enum TurnPlan {
    /// Execute these tool calls, then call the provider again.
    ToolCalls(Vec<PlannedToolCall>),
    /// The model produced its final answer. The loop ends.
    Terminal(String),
}

/// Errors from planning the next loop step.
#[non_exhaustive]
#[derive(Debug, Error, PartialEq)]
pub enum PlanError {
    /// The response claimed `StopReason::ToolUse` but carried no tool_use
    /// content blocks.
    #[error("stop_reason was tool_use but response carried no tool calls")]
    EmptyToolUse,
}

/// Turn a [`ProviderResponse`] into a [`TurnPlan`].
///
/// `StopReason::ToolUse` plans a batch of tool calls in emission order.
/// Any other stop reason is terminal: the text content parts are
/// concatenated to form the closing message (a non-text stop reason like
/// `ContentFilter` or `MaxTokens` still yields whatever text, if any, the
/// model produced before stopping).
pub fn plan(response: &ProviderResponse) -> Result<TurnPlan, PlanError> {
    match response.stop_reason {
        StopReason::ToolUse => {
            let calls: Vec<PlannedToolCall> = response
                .content
                .iter()
                .filter_map(|part| match part {
                    ContentPart::ToolUse { id, name, input } => Some(PlannedToolCall {
                        id: id.clone(),
                        name: name.clone(),
                        input: input.clone(),
                    }),
                    _ => None,
                })
                .collect();
            if calls.is_empty() {
                return Err(PlanError::EmptyToolUse);
            }
            Ok(TurnPlan::ToolCalls(calls))
        }
        StopReason::EndTurn | StopReason::MaxTokens | StopReason::ContentFilter => {
            let text = response
                .content
                .iter()
                .filter_map(|part| match part {
                    ContentPart::Text { text } => Some(text.as_str()),
                    _ => None,
                })
                .collect::<Vec<_>>()
                .join("");
            Ok(TurnPlan::Terminal(text))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use warden_turn::TokenUsage;

    fn response(stop_reason: StopReason, content: Vec<ContentPart>) -> ProviderResponse {
        ProviderResponse {
            content,
            stop_reason,
            usage: TokenUsage::default(),
            model: "test-model".into(),
        }
    }

    #[test]
    fn terminal_joins_text_parts() {
        let resp = response(
            StopReason::EndTurn,
            vec![
                ContentPart::Text { text: "hello ".into() },
                ContentPart::Text { text: "world".into() },
            ],
        );
        assert_eq!(plan(&resp).unwrap(), TurnPlan::Terminal("hello world".into()));
    }

    #[test]
    fn tool_use_extracts_calls_in_order() {
        let resp = response(
            StopReason::ToolUse,
            vec![
                ContentPart::ToolUse {
                    id: "call_1".into(),
                    name: "search".into(),
                    input: serde_json::json!({"q": "rust"}),
                },
                ContentPart::ToolUse {
                    id: "call_2".into(),
                    name: "read_file".into(),
                    input: serde_json::json!({"path": "/tmp/x"}),
                },
            ],
        );
        let plan = plan(&resp).unwrap();
        match plan {
            TurnPlan::ToolCalls(calls) => {
                assert_eq!(calls.len(), 2);
                assert_eq!(calls[0].id, "call_1");
                assert_eq!(calls[1].name, "read_file");
            }
            TurnPlan::Terminal(_) => panic!("expected tool calls"),
        }
    }

    #[test]
    fn tool_use_without_calls_errors() {
        let resp = response(StopReason::ToolUse, vec![ContentPart::Text { text: "oops".into() }]);
        assert_eq!(plan(&resp).unwrap_err(), PlanError::EmptyToolUse);
    }

    #[test]
    fn max_tokens_is_terminal_with_partial_text() {
        let resp = response(
            StopReason::MaxTokens,
            vec![ContentPart::Text { text: "cut off".into() }],
        );
        assert_eq!(plan(&resp).unwrap(), TurnPlan::Terminal("cut off".into()));
    }
}
