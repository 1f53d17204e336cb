//! Demo: a custom [`layer0::operator::Operator`] that fans an input out to
//! several inner operators and barriers on all of them before returning.
//!
//! This is the shape the `Operator` trait was designed to allow:
//! "one method, atomic from the outside" covers *any* internal execution
//! strategy, not just the ReAct loop `warden-turn` implements. Here the
//! inner operators might be distinct agent personas reviewing the same
//! input from different angles — a code-review panel, a multi-model
//! majority vote — and the barrier operator's job is only to wait for all
//! of them and combine the results. No inner operator knows it's being
//! run as part of a barrier.

use async_trait::async_trait;
use layer0::content::{Content, ContentBlock};
use layer0::duration::DurationMs;
use layer0::error::OperatorError;
use layer0::operator::{ExitReason, Operator, OperatorInput, OperatorMetadata, OperatorOutput};
use rust_decimal::Decimal;
use std::sync::Arc;
use std::time::Instant;

/// Runs a fixed set of inner operators concurrently against the same
/// input and merges their outputs into one.
pub struct BarrierOperator {
    members: Vec<Arc<dyn Operator>>,
}

impl BarrierOperator {
    /// Build a barrier over the given inner operators. `members` must be
    /// non-empty — a barrier with nothing to wait on is a bug at the call
    /// site, not a runtime condition to recover from.
    pub fn new(members: Vec<Arc<dyn Operator>>) -> Self {
        assert!(
            !members.is_empty(),
            "BarrierOperator requires at least one member"
        );
        Self { members }
    }
}

#[async_trait]
impl Operator for BarrierOperator {
    async fn execute(&self, input: OperatorInput) -> Result<OperatorOutput, OperatorError> {
        let started = Instant::now();
        let futures = self
            .members
            .iter()
            .map(|member| member.execute(input.clone()));
        let results = futures::future::join_all(futures).await;

        // A single member failing fails the barrier — there is no
        // partial-quorum mode here. Callers that want "best effort"
        // should wrap members that may legitimately fail in their own
        // error-swallowing Operator first.
        let outputs: Vec<OperatorOutput> = results.into_iter().collect::<Result<_, _>>()?;

        let blocks = outputs
            .iter()
            .enumerate()
            .map(|(i, out)| ContentBlock::Text {
                text: format!("[member {i}] {}", content_as_text(&out.message)),
            })
            .collect();

        let metadata = outputs.iter().fold(
            OperatorMetadata {
                tokens_in: 0,
                tokens_out: 0,
                cost: Decimal::ZERO,
                turns_used: 0,
                tools_called: Vec::new(),
                duration: DurationMs::from_millis(started.elapsed().as_millis() as u64),
            },
            |mut acc, out| {
                acc.tokens_in += out.metadata.tokens_in;
                acc.tokens_out += out.metadata.tokens_out;
                acc.cost += out.metadata.cost;
                acc.turns_used = acc.turns_used.max(out.metadata.turns_used);
                acc.tools_called.extend(out.metadata.tools_called.clone());
                acc
            },
        );

        let effects = outputs.into_iter().flat_map(|out| out.effects).collect();

        Ok(OperatorOutput {
            message: Content::Blocks(blocks),
            exit_reason: ExitReason::Complete,
            metadata,
            effects,
        })
    }
}

fn content_as_text(content: &Content) -> String {
    match content {
        Content::Text(text) => text.clone(),
        Content::Blocks(blocks) => blocks
            .iter()
            .filter_map(|block| match block {
                ContentBlock::Text { text } => Some(text.as_str()),
                _ => None,
            })
            .collect::<Vec<_>>()
            .join(""),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use layer0::operator::TriggerType;

    struct EchoOperator {
        label: &'static str,
    }

    #[async_trait]
    impl Operator for EchoOperator {
        async fn execute(&self, input: OperatorInput) -> Result<OperatorOutput, OperatorError> {
            Ok(OperatorOutput {
                message: Content::Text(format!("{}: {}", self.label, content_as_text(&input.message))),
                exit_reason: ExitReason::Complete,
                metadata: OperatorMetadata {
                    tokens_in: 10,
                    tokens_out: 5,
                    cost: Decimal::new(1, 2),
                    turns_used: 1,
                    tools_called: Vec::new(),
                    duration: DurationMs::from_millis(1),
                },
                effects: Vec::new(),
            })
        }
    }

    struct FailingOperator;

    #[async_trait]
    impl Operator for FailingOperator {
        async fn execute(&self, _input: OperatorInput) -> Result<OperatorOutput, OperatorError> {
            Err(OperatorError::Model("member failed".into()))
        }
    }

    fn input(text: &str) -> OperatorInput {
        OperatorInput {
            message: Content::Text(text.into()),
            trigger: TriggerType::User,
            session: None,
            config: None,
            metadata: serde_json::json!({}),
        }
    }

    #[tokio::test]
    async fn merges_all_member_outputs() {
        let barrier = BarrierOperator::new(vec![
            Arc::new(EchoOperator { label: "a" }),
            Arc::new(EchoOperator { label: "b" }),
        ]);
        let out = barrier.execute(input("hi")).await.unwrap();
        let text = content_as_text(&out.message);
        assert!(text.contains("a: hi"));
        assert!(text.contains("b: hi"));
        assert_eq!(out.metadata.tokens_in, 20);
        assert_eq!(out.metadata.tokens_out, 10);
    }

    #[tokio::test]
    async fn one_failing_member_fails_the_barrier() {
        let barrier = BarrierOperator::new(vec![
            Arc::new(EchoOperator { label: "a" }),
            Arc::new(FailingOperator),
        ]);
        let err = barrier.execute(input("hi")).await.unwrap_err();
        assert!(matches!(err, OperatorError::Model(_)));
    }

    #[test]
    #[should_panic(expected = "at least one member")]
    fn empty_members_panics() {
        BarrierOperator::new(vec![]);
    }
}
