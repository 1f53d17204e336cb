//! Streaming completion types: incremental events and the channel that
//! carries them from a provider's transport layer up to callers.

use std::pin::Pin;

use futures::Stream;
use serde::{Deserialize, Serialize};

use crate::types::{Message, TokenUsage};

/// A transport-level error observed while consuming a stream. Carries
/// enough information for the caller to decide whether to retry the
/// whole request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StreamError {
    /// Human-readable description of what went wrong.
    pub message: String,
    /// Whether retrying the request (not just resuming the stream) might
    /// succeed.
    pub is_retryable: bool,
}

impl StreamError {
    /// Build a retryable stream error (transport hiccup, disconnect).
    pub fn retryable(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            is_retryable: true,
        }
    }

    /// Build a non-retryable stream error (malformed payload, protocol
    /// violation).
    pub fn non_retryable(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            is_retryable: false,
        }
    }
}

impl std::fmt::Display for StreamError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for StreamError {}

/// One incremental unit of a streaming completion. Providers map their
/// wire format (SSE, NDJSON) onto this shape; callers fold a sequence of
/// these into a [`crate::types::CompletionResponse`] or render deltas live.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum StreamEvent {
    /// Incremental assistant text.
    TextDelta(String),
    /// Incremental extended-thinking text.
    ThinkingDelta(String),
    /// Incremental thinking-block cryptographic signature.
    SignatureDelta(String),
    /// A tool-use content block has begun.
    ToolUseStart {
        /// The tool call's id, referenced by later deltas and by the end event.
        id: String,
        /// The tool being called.
        name: String,
    },
    /// Incremental JSON-fragment input for an in-progress tool call.
    ToolUseInputDelta {
        /// The tool call id this fragment belongs to.
        id: String,
        /// The raw JSON fragment.
        delta: String,
    },
    /// A tool-use content block has finished accumulating input.
    ToolUseEnd {
        /// The tool call id that finished.
        id: String,
    },
    /// Final token usage for the completion.
    Usage(TokenUsage),
    /// The fully assembled message, emitted once the stream is complete.
    MessageComplete(Message),
    /// A transport or protocol error occurred while consuming the stream.
    Error(StreamError),
}

/// A live stream of [`StreamEvent`]s returned by [`crate::traits::Provider::complete_stream`].
pub struct StreamHandle {
    /// The underlying event stream. Boxed and pinned so different
    /// providers' concrete stream types erase to one handle shape.
    pub receiver: Pin<Box<dyn Stream<Item = StreamEvent> + Send>>,
}

impl Stream for StreamHandle {
    type Item = StreamEvent;

    fn poll_next(
        mut self: Pin<&mut Self>,
        cx: &mut std::task::Context<'_>,
    ) -> std::task::Poll<Option<Self::Item>> {
        self.receiver.as_mut().poll_next(cx)
    }
}
