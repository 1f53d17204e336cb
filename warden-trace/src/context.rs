//! Trace context — carried across every suspension point (§4.1, §5).

use warden_domain::{SpanId, TraceId};

/// The trace context a task or turn carries through every suspension
/// point. A task enqueued inside span `S` carries `(trace_id, parent = S)`
/// to its handler, which opens a fresh child span on entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TraceContext {
    /// The trace this operation belongs to.
    pub trace_id: TraceId,
    /// This operation's own span.
    pub span_id: SpanId,
    /// The span that caused this one to open, if any.
    pub parent_span_id: Option<SpanId>,
}

impl TraceContext {
    /// Start a brand-new trace with a single root span.
    pub fn root() -> Self {
        Self {
            trace_id: TraceId::generate(),
            span_id: SpanId::generate(),
            parent_span_id: None,
        }
    }

    /// Start a new trace rooted at a caller-supplied id (e.g. an inbound
    /// delivery wants its trace_id to be deterministic for idempotent
    /// replays). The first span is still freshly minted.
    pub fn root_with_id(trace_id: TraceId) -> Self {
        Self {
            trace_id,
            span_id: SpanId::generate(),
            parent_span_id: None,
        }
    }

    /// Open a child span that inherits this context's trace_id and is
    /// parented to this context's span.
    pub fn child(&self) -> Self {
        Self {
            trace_id: self.trace_id.clone(),
            span_id: SpanId::generate(),
            parent_span_id: Some(self.span_id.clone()),
        }
    }
}
