#![deny(missing_docs)]
//! Core data model for warden's conversational agent runtime.
//!
//! This crate holds the entities every other warden crate reasons about:
//! threads and messages, the external-delivery dedup ledger, agent bundle
//! governance fields, tool permissions, schedules, the self-update patch
//! record, and the system-state singleton. It has no behavior of its own —
//! `warden-trace`, `warden-policy`, `warden-scheduler`, and `warden-selfupdate`
//! each own one slice of the state machines these types participate in.

pub mod agent_bundle;
pub mod id;
pub mod patch;
pub mod permission;
pub mod schedule;
pub mod system_state;
pub mod thread;

pub use agent_bundle::{AgentBundle, AgentGovernance, RiskTier};
pub use id::{EventId, MessageId, ScheduleId, SpanId, TaskId, ThreadId, TraceId, UserId};
pub use patch::{EvidencePacket, InvalidTransition, PatchFailureCode, PatchRecord, PatchState};
pub use permission::{ToolPermission, WILDCARD_TOOL};
pub use schedule::{Schedule, ScheduleDispatch};
pub use system_state::{SystemState, UnlockCode};
pub use thread::{ChannelType, ExternalDeliveryRecord, MediaRef, Message, MessageRole, Thread};
