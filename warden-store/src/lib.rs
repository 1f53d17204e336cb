#![deny(missing_docs)]
//! Typed persistence for threads, messages, schedules, permissions, and
//! self-update patch records (spec §3 DATA MODEL).
//!
//! The event log itself (`warden-trace::EventLog`) is the sole source of
//! truth for audit history; this crate owns the entities a trace alone
//! can't reconstruct — thread ownership, the external-delivery dedup
//! ledger, schedule due-instant uniqueness, and the patch state machine's
//! durable mirror.

pub mod memory;

pub use memory::InMemoryStore;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use thiserror::Error;
use warden_domain::{
    ChannelType, ExternalDeliveryRecord, Message, MessageId, PatchRecord, Schedule, ScheduleId,
    SystemState, Thread, ThreadId, ToolPermission,
};

/// Errors from store operations.
#[non_exhaustive]
#[derive(Debug, Error)]
pub enum StoreError {
    /// The requested entity does not exist.
    #[error("not found: {0}")]
    NotFound(String),
    /// The underlying backend failed.
    #[error("backend error: {0}")]
    Backend(String),
}

/// The outcome of inserting an external-delivery record (invariant 2).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeliveryInsertOutcome {
    /// This delivery had not been seen before; processing should continue.
    Inserted,
    /// `(channel, external_id)` already existed; the caller should
    /// short-circuit to a no-op.
    Duplicate,
}

/// The outcome of inserting a schedule-dispatch row (invariant 3).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchInsertOutcome {
    /// This `(schedule_id, due_at)` pair had not been dispatched before.
    Inserted,
    /// Already dispatched — another tick or actor got there first.
    AlreadyDispatched,
}

/// Typed persistence for every entity in spec §3 outside the event log.
#[async_trait]
pub trait Store: Send + Sync {
    // --- threads & messages --------------------------------------------

    /// Look up the thread currently open for a `(channel, external sender)`
    /// pair, if one exists and is not closed.
    async fn find_open_thread(
        &self,
        channel: &ChannelType,
        external_sender: &str,
    ) -> Result<Option<Thread>, StoreError>;

    /// Record that `thread_id` is the open thread for a
    /// `(channel, external sender)` pair, superseding any previous
    /// mapping (used when a closed thread routes new messages elsewhere).
    async fn bind_open_thread(
        &self,
        channel: &ChannelType,
        external_sender: &str,
        thread_id: &ThreadId,
    ) -> Result<(), StoreError>;

    /// Fetch a thread by id.
    async fn get_thread(&self, id: &ThreadId) -> Result<Option<Thread>, StoreError>;

    /// Insert a brand-new thread.
    async fn insert_thread(&self, thread: Thread) -> Result<(), StoreError>;

    /// Persist an updated thread. Thread ownership (invariant 4) is the
    /// caller's responsibility to preserve — this simply overwrites the
    /// row by id.
    async fn update_thread(&self, thread: Thread) -> Result<(), StoreError>;

    /// Insert an immutable message.
    async fn insert_message(&self, message: Message) -> Result<(), StoreError>;

    /// List a thread's messages in `(created_at, id)` order, most recent
    /// `limit` (or all, if `None`).
    async fn list_messages(
        &self,
        thread_id: &ThreadId,
        limit: Option<usize>,
    ) -> Result<Vec<Message>, StoreError>;

    /// Count inbound (user-role) messages recorded for a thread. Used to
    /// decide when the per-thread compaction threshold has been crossed.
    async fn count_inbound_messages(&self, thread_id: &ThreadId) -> Result<u64, StoreError>;

    // --- external-delivery dedup ledger ---------------------------------

    /// Insert a `(channel, external_id)` delivery record. Returns
    /// [`DeliveryInsertOutcome::Duplicate`] without modifying anything if
    /// the pair already exists (invariant 2).
    async fn insert_delivery(
        &self,
        record: ExternalDeliveryRecord,
    ) -> Result<DeliveryInsertOutcome, StoreError>;

    /// Look up a previously recorded delivery, e.g. to find the message
    /// id a duplicate submission would have produced.
    async fn get_delivery(
        &self,
        channel: &ChannelType,
        external_id: &str,
    ) -> Result<Option<ExternalDeliveryRecord>, StoreError>;

    // --- schedules --------------------------------------------------------

    /// All enabled schedules, in no particular order.
    async fn list_enabled_schedules(&self) -> Result<Vec<Schedule>, StoreError>;

    /// Fetch a schedule by id.
    async fn get_schedule(&self, id: &ScheduleId) -> Result<Option<Schedule>, StoreError>;

    /// Insert or overwrite a schedule.
    async fn upsert_schedule(&self, schedule: Schedule) -> Result<(), StoreError>;

    /// Attempt to claim a due instant for a schedule. Insertion success
    /// IS the idempotency marker (invariant 3, §5 locking discipline):
    /// the uniqueness constraint on `(schedule_id, due_at)` is the only
    /// lock this operation needs.
    async fn try_insert_dispatch(
        &self,
        schedule_id: &ScheduleId,
        due_at: DateTime<Utc>,
    ) -> Result<DispatchInsertOutcome, StoreError>;

    /// Advance a schedule's `last_dispatched_at` watermark.
    async fn set_last_dispatched_at(
        &self,
        schedule_id: &ScheduleId,
        at: DateTime<Utc>,
    ) -> Result<(), StoreError>;

    // --- tool permissions --------------------------------------------------

    /// All permission rows for a given principal.
    async fn list_permissions(&self, principal_id: &str) -> Result<Vec<ToolPermission>, StoreError>;

    /// Grant a permission row. Idempotent: granting an already-granted
    /// permission is a no-op.
    async fn grant_permission(&self, permission: ToolPermission) -> Result<(), StoreError>;

    /// Revoke a permission row, if present.
    async fn revoke_permission(&self, principal_id: &str, tool_name: &str) -> Result<(), StoreError>;

    // --- self-update patch records ------------------------------------------

    /// Fetch a patch record by its trace_id primary key.
    async fn get_patch(&self, trace_id: &str) -> Result<Option<PatchRecord>, StoreError>;

    /// Insert or overwrite a patch record. The disk mirror
    /// (`state.json`) is the recovery source of truth per spec §6; this
    /// in-process store and any durable backend should be written in the
    /// same order as that mirror to keep the two consistent.
    async fn put_patch(&self, record: PatchRecord) -> Result<(), StoreError>;

    /// List every patch record, most-recently-transitioned first. Used
    /// by guardrails that count recent apply attempts.
    async fn list_patches(&self) -> Result<Vec<PatchRecord>, StoreError>;

    // --- system state singleton ---------------------------------------------

    /// Read the current system-state snapshot.
    async fn get_system_state(&self) -> Result<SystemState, StoreError>;

    /// Compare-and-swap the system-state singleton: succeeds only if the
    /// stored `version` still equals `expected_version`, mirroring the
    /// read-through-cache-with-version-counter discipline of §5. Returns
    /// the new state on success.
    async fn cas_system_state(
        &self,
        expected_version: u64,
        new_state: SystemState,
    ) -> Result<SystemState, StoreError>;

    /// Fetch the thread-message id produced by a past delivery, or
    /// `None` if the delivery is unseen. Convenience wrapper so ingestion
    /// doesn't need to destructure `get_delivery`'s result twice.
    async fn message_id_for_delivery(
        &self,
        channel: &ChannelType,
        external_id: &str,
    ) -> Result<Option<MessageId>, StoreError> {
        Ok(self
            .get_delivery(channel, external_id)
            .await?
            .map(|d| d.message_id))
    }
}
