//! The event log: `emit` / `search`, with per-trace monotonic ordering.

use crate::context::TraceContext;
use crate::event::{ActorKind, Event};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::Mutex;
use thiserror::Error;
use warden_domain::{EventId, ThreadId, TraceId};

/// Errors from event log operations.
#[non_exhaustive]
#[derive(Debug, Error)]
pub enum EventLogError {
    /// The underlying storage backend failed.
    #[error("storage failed: {0}")]
    StorageFailed(String),
}

/// Filter predicate for [`EventLog::search`].
#[derive(Debug, Clone, Default)]
pub struct EventFilter {
    /// Restrict to a single trace.
    pub trace_id: Option<TraceId>,
    /// Restrict to a single thread.
    pub thread_id: Option<ThreadId>,
    /// Restrict to event types starting with this dot-separated prefix,
    /// e.g. `"tool.call"` matches `tool.call.start` and `tool.call.end`.
    pub event_type_prefix: Option<String>,
    /// Restrict to a single emitting component.
    pub component: Option<String>,
}

impl EventFilter {
    fn matches(&self, event: &Event) -> bool {
        if let Some(ref t) = self.trace_id {
            if &event.trace_id != t {
                return false;
            }
        }
        if let Some(ref t) = self.thread_id {
            if event.thread_id.as_ref() != Some(t) {
                return false;
            }
        }
        if let Some(ref prefix) = self.event_type_prefix {
            if !event.event_type.starts_with(prefix.as_str()) {
                return false;
            }
        }
        if let Some(ref c) = self.component {
            if &event.component != c {
                return false;
            }
        }
        true
    }
}

/// Time/count bounds for [`EventLog::search`].
#[derive(Debug, Clone, Default)]
pub struct EventBounds {
    /// Only events at or after this instant.
    pub since: Option<DateTime<Utc>>,
    /// Only events strictly before this instant.
    pub until: Option<DateTime<Utc>>,
    /// Cap on the number of results returned.
    pub limit: Option<usize>,
}

/// Append-only audit trail. `emit` writes atomically and returns the new
/// event's id; `search` returns events ordered by `(created_at, id)`
/// ascending (invariant 5 relies on this to reconstruct the span tree).
#[async_trait]
pub trait EventLog: Send + Sync {
    /// Record one event. The span recorded is `ctx.span_id`, parented to
    /// `ctx.parent_span_id`.
    #[allow(clippy::too_many_arguments)]
    async fn emit(
        &self,
        ctx: &TraceContext,
        event_type: &str,
        component: &str,
        actor_kind: ActorKind,
        actor_id: &str,
        thread_id: Option<ThreadId>,
        payload: serde_json::Value,
    ) -> Result<EventId, EventLogError>;

    /// Ordered, filtered read of the log.
    async fn search(
        &self,
        filter: &EventFilter,
        bounds: &EventBounds,
    ) -> Result<Vec<Event>, EventLogError>;
}

/// In-process event log backed by a `Mutex<Vec<Event>>`. Suitable for
/// development, testing, and as the reference implementation that
/// persistent backends (sqlite/postgres-backed `StateStore` adapters)
/// are checked against.
pub struct InMemoryEventLog {
    events: Mutex<Vec<Event>>,
    /// Last `created_at` assigned per trace, for monotonic-clock enforcement.
    last_created_at: Mutex<HashMap<TraceId, DateTime<Utc>>>,
    /// Whether `payload_json` (the unredacted copy) is retained.
    full_retention: bool,
}

impl InMemoryEventLog {
    /// Create a new, empty event log.
    pub fn new(full_retention: bool) -> Self {
        Self {
            events: Mutex::new(Vec::new()),
            last_created_at: Mutex::new(HashMap::new()),
            full_retention,
        }
    }

    /// Monotonic `created_at` for this trace: `max(previous + 1ns, now)`.
    /// Returns the assigned timestamp and whether a regression occurred.
    fn next_created_at(&self, trace_id: &TraceId) -> (DateTime<Utc>, bool) {
        let now = Utc::now();
        let mut last = self.last_created_at.lock().expect("lock poisoned");
        let assigned = match last.get(trace_id) {
            Some(prev) if *prev >= now => (
                *prev + chrono::Duration::nanoseconds(1),
                true,
            ),
            _ => (now, false),
        };
        last.insert(trace_id.clone(), assigned.0);
        assigned
    }

    fn push(&self, event: Event) {
        self.events.lock().expect("lock poisoned").push(event);
    }
}

impl Default for InMemoryEventLog {
    fn default() -> Self {
        Self::new(false)
    }
}

#[async_trait]
impl EventLog for InMemoryEventLog {
    async fn emit(
        &self,
        ctx: &TraceContext,
        event_type: &str,
        component: &str,
        actor_kind: ActorKind,
        actor_id: &str,
        thread_id: Option<ThreadId>,
        payload: serde_json::Value,
    ) -> Result<EventId, EventLogError> {
        let (created_at, regressed) = self.next_created_at(&ctx.trace_id);

        if regressed {
            let clock_event = Event::new(
                EventId::generate(),
                ctx.trace_id.clone(),
                ctx.span_id.clone(),
                ctx.parent_span_id.clone(),
                "clock.regression",
                component,
                ActorKind::System,
                "runtime",
                thread_id.clone(),
                created_at,
                serde_json::json!({"observed_event_type": event_type}),
                self.full_retention,
            );
            self.push(clock_event);
        }

        let id = EventId::generate();
        let event = Event::new(
            id.clone(),
            ctx.trace_id.clone(),
            ctx.span_id.clone(),
            ctx.parent_span_id.clone(),
            event_type,
            component,
            actor_kind,
            actor_id,
            thread_id,
            created_at,
            payload,
            self.full_retention,
        );
        self.push(event);
        Ok(id)
    }

    async fn search(
        &self,
        filter: &EventFilter,
        bounds: &EventBounds,
    ) -> Result<Vec<Event>, EventLogError> {
        let events = self.events.lock().expect("lock poisoned");
        let mut matched: Vec<Event> = events
            .iter()
            .filter(|e| filter.matches(e))
            .filter(|e| bounds.since.is_none_or(|since| e.created_at >= since))
            .filter(|e| bounds.until.is_none_or(|until| e.created_at < until))
            .cloned()
            .collect();
        matched.sort_by(|a, b| a.order_key().cmp(&b.order_key()));
        if let Some(limit) = bounds.limit {
            matched.truncate(limit);
        }
        Ok(matched)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn emit_then_search_round_trips() {
        let log = InMemoryEventLog::new(true);
        let ctx = TraceContext::root();
        log.emit(
            &ctx,
            "agent.step.start",
            "orchestrator",
            ActorKind::System,
            "orch",
            None,
            serde_json::json!({"n": 1}),
        )
        .await
        .unwrap();

        let results = log
            .search(&EventFilter::default(), &EventBounds::default())
            .await
            .unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].event_type, "agent.step.start");
    }

    #[tokio::test]
    async fn search_orders_by_created_at_then_id() {
        let log = InMemoryEventLog::new(false);
        let ctx = TraceContext::root();
        for i in 0..5 {
            log.emit(
                &ctx,
                "tool.call.start",
                "runtime",
                ActorKind::Agent,
                "agent-1",
                None,
                serde_json::json!({"i": i}),
            )
            .await
            .unwrap();
        }
        let results = log
            .search(&EventFilter::default(), &EventBounds::default())
            .await
            .unwrap();
        let mut sorted = results.clone();
        sorted.sort_by(|a, b| a.order_key().cmp(&b.order_key()));
        assert_eq!(
            results.iter().map(|e| e.id.as_str()).collect::<Vec<_>>(),
            sorted.iter().map(|e| e.id.as_str()).collect::<Vec<_>>()
        );
    }

    #[tokio::test]
    async fn event_type_prefix_filters() {
        let log = InMemoryEventLog::new(false);
        let ctx = TraceContext::root();
        log.emit(&ctx, "tool.call.start", "runtime", ActorKind::Agent, "a", None, serde_json::json!({}))
            .await
            .unwrap();
        log.emit(&ctx, "model.run.start", "orchestrator", ActorKind::System, "orch", None, serde_json::json!({}))
            .await
            .unwrap();

        let filter = EventFilter {
            event_type_prefix: Some("tool.call".into()),
            ..Default::default()
        };
        let results = log.search(&filter, &EventBounds::default()).await.unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].event_type, "tool.call.start");
    }

    #[tokio::test]
    async fn full_retention_flag_controls_payload_json() {
        let retained = InMemoryEventLog::new(true);
        let dropped = InMemoryEventLog::new(false);
        let ctx = TraceContext::root();
        for log in [&retained, &dropped] {
            log.emit(&ctx, "t", "c", ActorKind::System, "s", None, serde_json::json!({"x": 1}))
                .await
                .unwrap();
        }
        let a = retained.search(&EventFilter::default(), &EventBounds::default()).await.unwrap();
        let b = dropped.search(&EventFilter::default(), &EventBounds::default()).await.unwrap();
        assert!(a[0].payload_json.is_some());
        assert!(b[0].payload_json.is_none());
    }
}
