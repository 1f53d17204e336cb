//! The two seam traits every provider and context strategy implements:
//! [`Provider`] (a model backend) and [`ContextStrategy`] (a compaction
//! policy). Both are plain `async fn` traits — no `async_trait` boxing —
//! so callers pay no extra allocation on the hot path.

use std::future::Future;

use crate::error::{ContextError, ProviderError};
use crate::stream::StreamHandle;
use crate::types::{CompletionRequest, CompletionResponse, Message};
use crate::wasm::WasmCompatSend;

/// A language-model backend. Implementations wrap a concrete vendor API
/// (Anthropic, OpenAI, Ollama) behind one shape: take a request, return
/// either a complete response or a live event stream.
pub trait Provider: WasmCompatSend + Sync {
    /// Run one non-streaming completion.
    async fn complete(&self, request: CompletionRequest) -> Result<CompletionResponse, ProviderError>;

    /// Run one completion, returning incremental events as they arrive.
    /// Implementations that don't support streaming return
    /// `ProviderError::Other` rather than silently falling back to a
    /// single buffered event.
    async fn complete_stream(&self, request: CompletionRequest) -> Result<StreamHandle, ProviderError>;
}

/// A context-compaction policy: decide when a message tail has grown too
/// large and produce a shorter, semantically equivalent replacement.
pub trait ContextStrategy: WasmCompatSend + Sync {
    /// Whether `messages` should be compacted given an already-computed
    /// token count (callers own token counting so strategies can be
    /// mixed with different counters).
    fn should_compact(&self, messages: &[Message], token_count: usize) -> bool;

    /// Produce a compacted replacement for `messages`.
    fn compact(
        &self,
        messages: Vec<Message>,
    ) -> impl Future<Output = Result<Vec<Message>, ContextError>> + WasmCompatSend;

    /// A cheap, approximate token count for `messages`, used to decide
    /// whether `should_compact` needs to be consulted at all.
    fn token_estimate(&self, messages: &[Message]) -> usize;
}
