//! The `Event` entity — the sole source of truth for post-hoc reasoning.

use crate::redact::redact_payload;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use warden_domain::{EventId, SpanId, ThreadId, TraceId};

/// What kind of principal performed the action an event records.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActorKind {
    /// A human user.
    User,
    /// An agent acting autonomously.
    Agent,
    /// The system itself (scheduler, self-update, runtime).
    System,
}

/// An append-only audit record. Events are never modified after emission.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Event {
    /// Unique event id.
    pub id: EventId,
    /// Trace this event belongs to.
    pub trace_id: TraceId,
    /// Span this event was emitted within.
    pub span_id: SpanId,
    /// The span that caused this span to open, if any.
    pub parent_span_id: Option<SpanId>,
    /// Dot-separated event type name, e.g. `tool.call.end`.
    pub event_type: String,
    /// The component that emitted this event.
    pub component: String,
    /// What kind of principal performed the recorded action.
    pub actor_kind: ActorKind,
    /// The principal's id.
    pub actor_id: String,
    /// The thread this event concerns, if any.
    pub thread_id: Option<ThreadId>,
    /// When this event was recorded (writer-assigned, monotonic per trace).
    pub created_at: DateTime<Utc>,
    /// The full, unredacted payload. Retained only when the event log's
    /// full-retention configuration flag permits it.
    pub payload_json: Option<serde_json::Value>,
    /// The payload with denylisted keys and secret-shaped values masked.
    /// Always present — this is what `search` returns by default.
    pub payload_redacted_json: serde_json::Value,
}

impl Event {
    /// Build an event from a raw payload, computing the redacted twin.
    /// `retain_full` controls whether `payload_json` is kept at all.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        id: EventId,
        trace_id: TraceId,
        span_id: SpanId,
        parent_span_id: Option<SpanId>,
        event_type: impl Into<String>,
        component: impl Into<String>,
        actor_kind: ActorKind,
        actor_id: impl Into<String>,
        thread_id: Option<ThreadId>,
        created_at: DateTime<Utc>,
        raw_payload: serde_json::Value,
        retain_full: bool,
    ) -> Self {
        let payload_redacted_json = redact_payload(&raw_payload);
        Self {
            id,
            trace_id,
            span_id,
            parent_span_id,
            event_type: event_type.into(),
            component: component.into(),
            actor_kind,
            actor_id: actor_id.into(),
            thread_id,
            created_at,
            payload_json: retain_full.then_some(raw_payload),
            payload_redacted_json,
        }
    }

    /// Ordering key used by `search`: `(created_at, id)` ascending.
    pub fn order_key(&self) -> (DateTime<Utc>, &str) {
        (self.created_at, self.id.as_str())
    }
}
