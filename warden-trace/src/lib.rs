#![deny(missing_docs)]
//! Trace context propagation and the append-only, redacted event log
//! (spec §4.1).
//!
//! Every externally triggered execution root creates a new [`TraceContext`].
//! Inside a trace, each logical operation opens a child span inheriting the
//! current parent. The [`EventLog`] is the system's sole source of
//! post-hoc truth: every policy decision, tool call, model run, and
//! self-update transition is recorded here before it is considered to
//! have happened.

pub mod context;
pub mod event;
pub mod log;
pub mod redact;

pub use context::TraceContext;
pub use event::{ActorKind, Event};
pub use log::{EventBounds, EventFilter, EventLog, EventLogError, InMemoryEventLog};
pub use redact::redact_payload;

/// Canonical dot-separated event type names (§6), grouped by family.
/// Non-exhaustive by convention — new leaf event types are added as
/// plain `&str` literals at the call site, not as enum variants.
pub mod event_types {
    /// One inbound message accepted by ingestion.
    pub const CHANNEL_INBOUND: &str = "channel.inbound";
    /// A batch of inbound messages accepted together.
    pub const CHANNEL_INBOUND_BATCH: &str = "channel.inbound.batch";
    /// An outbound message sent to a channel adapter.
    pub const CHANNEL_OUTBOUND: &str = "channel.outbound";
    /// An outbound send exhausted its retries.
    pub const CHANNEL_OUTBOUND_FAILED: &str = "channel.outbound.failed";
    /// An orchestrator step began.
    pub const AGENT_STEP_START: &str = "agent.step.start";
    /// An orchestrator step ended.
    pub const AGENT_STEP_END: &str = "agent.step.end";
    /// A step was cancelled before producing an assistant message.
    pub const AGENT_STEP_CANCELLED: &str = "agent.step.cancelled";
    /// A turn's output asked the orchestrator to delegate to another agent.
    pub const AGENT_DELEGATE: &str = "agent.delegate";
    /// A tool invocation began.
    pub const TOOL_CALL_START: &str = "tool.call.start";
    /// A tool invocation ended.
    pub const TOOL_CALL_END: &str = "tool.call.end";
    /// A provider call began.
    pub const MODEL_RUN_START: &str = "model.run.start";
    /// A provider call ended (successfully).
    pub const MODEL_RUN_END: &str = "model.run.end";
    /// The router fell back from primary to fallback provider.
    pub const MODEL_FALLBACK: &str = "model.fallback";
    /// A provider call errored.
    pub const MODEL_RUN_ERROR: &str = "model.run.error";
    /// A schedule fired for a due instant.
    pub const SCHEDULE_TRIGGER: &str = "schedule.trigger";
    /// A schedule tick encountered a recoverable error for one schedule.
    pub const SCHEDULE_ERROR: &str = "schedule.error";
    /// A policy decision (allow or deny) was recorded.
    pub const POLICY_DECISION: &str = "policy.decision";
    /// Memory subsystem degraded (stale summary, empty retrieval).
    pub const MEMORY_DEGRADED: &str = "memory.degraded";
    /// A memory write was redacted before persistence.
    pub const MEMORY_POLICY_REDACTION: &str = "memory.policy.redaction";
    /// A memory operation was denied by policy.
    pub const MEMORY_POLICY_DENIAL: &str = "memory.policy.denial";
    /// A task exhausted its retries and was dead-lettered.
    pub const TASK_DEAD_LETTER: &str = "task.dead_letter";
    /// A task was dropped because the pool was already shutting down.
    pub const TASK_DROPPED_ON_SHUTDOWN: &str = "task.dropped_on_shutdown";
    /// Lockdown was triggered.
    pub const LOCKDOWN_TRIGGERED: &str = "lockdown.triggered";
    /// Lockdown was cleared.
    pub const LOCKDOWN_CLEARED: &str = "lockdown.cleared";
    /// Writer detected and corrected a clock regression.
    pub const CLOCK_REGRESSION: &str = "clock.regression";
    /// A self-update patch was proposed.
    pub const SELFUPDATE_PROPOSED: &str = "selfupdate.proposed";
    /// A proposed patch passed evidence-contract and diff validation.
    pub const SELFUPDATE_VALIDATED: &str = "selfupdate.validated";
    /// A validated patch passed the test gate.
    pub const SELFUPDATE_TESTED: &str = "selfupdate.tested";
    /// A tested patch was approved (auto in dev, explicit in prod).
    pub const SELFUPDATE_APPROVED: &str = "selfupdate.approved";
    /// An approved patch was applied to the working tree.
    pub const SELFUPDATE_APPLIED: &str = "selfupdate.applied";
    /// An applied patch passed its post-apply readiness check.
    pub const SELFUPDATE_VERIFIED: &str = "selfupdate.verified";
    /// A patch was rejected before being applied.
    pub const SELFUPDATE_REJECTED: &str = "selfupdate.rejected";
    /// A patch failed at some stage of the pipeline.
    pub const SELFUPDATE_FAILED: &str = "selfupdate.failed";
    /// An applied patch failed verification and was rolled back.
    pub const SELFUPDATE_ROLLED_BACK: &str = "selfupdate.rolled_back";
    /// A guardrail (rate limit, risk score, governance key) tripped.
    pub const SELFUPDATE_GUARDRAIL_TRIPPED: &str = "selfupdate.guardrail_tripped";
    /// Repeated rollbacks in the lookback window triggered lockdown.
    pub const SELFUPDATE_LOCKDOWN: &str = "selfupdate.lockdown";
}
