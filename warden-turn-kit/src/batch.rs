//! Execute a planned batch of tool calls honoring a [`ConcurrencyMode`].

use crate::decider::ConcurrencyMode;
use crate::planner::PlannedToolCall;
use async_trait::async_trait;
use futures::future::join_all;
use warden_turn::ContentPart;

/// Abstracts over however the caller actually invokes a tool (typically
/// `warden_tool::ToolRuntime::execute`, wrapped by the orchestrator step
/// with its trace/thread context). Keeping this as a narrow trait — not a
/// direct dependency on the tool runtime — lets the batch executor run
/// against a stub in tests without wiring policy, registries, and an
/// event log.
#[async_trait]
pub trait ToolInvoker: Send + Sync {
    /// Invoke a tool by name with the given input and return its result
    /// as a tool-result content part. Errors from the invoker become a
    /// `ToolResult { is_error: true, .. }` rather than a batch failure —
    /// one tool erroring does not abort sibling calls in the same batch.
    async fn invoke(&self, call: &PlannedToolCall) -> ContentPart;
}

/// Result of running one batch of planned tool calls.
#[derive(Debug, Clone, PartialEq)]
pub struct BatchOutcome {
    /// Tool-result content parts, in the same order as the planned calls.
    pub results: Vec<ContentPart>,
}

/// Runs a batch of [`PlannedToolCall`]s against a [`ToolInvoker`].
pub struct BatchExecutor<I> {
    invoker: I,
}

impl<I: ToolInvoker> BatchExecutor<I> {
    /// Build an executor around the given invoker.
    pub fn new(invoker: I) -> Self {
        Self { invoker }
    }

    /// Execute `calls` according to `mode`.
    ///
    /// Concurrent mode runs every call in parallel and then reorders
    /// results back to emission order, so the caller never has to reason
    /// about completion order — only the [`ConcurrencyDecider`] upstream
    /// decides whether that reordering is safe.
    ///
    /// [`ConcurrencyDecider`]: crate::ConcurrencyDecider
    pub async fn execute(&self, calls: &[PlannedToolCall], mode: ConcurrencyMode) -> BatchOutcome {
        let results = match mode {
            ConcurrencyMode::Sequential => {
                let mut results = Vec::with_capacity(calls.len());
                for call in calls {
                    results.push(self.invoker.invoke(call).await);
                }
                results
            }
            ConcurrencyMode::Concurrent => {
                join_all(calls.iter().map(|call| self.invoker.invoke(call))).await
            }
        };
        BatchOutcome { results }
    }
}
