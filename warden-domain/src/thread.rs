//! Thread and message entities (§3 DATA MODEL).

use crate::id::{MessageId, ThreadId, UserId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Which external channel a thread or message originated from.
#[non_exhaustive]
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChannelType {
    /// WhatsApp via the Evolution API bridge.
    WhatsApp,
    /// Plain HTTP webhook.
    Http,
    /// Local CLI invocation.
    Cli,
    /// A channel type not yet promoted to a named variant.
    Custom(String),
}

/// Anchors a conversation. Created on first inbound message for a
/// `(channel, external sender)` pair and never deleted — see invariant 4
/// (message thread ownership never changes).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Thread {
    /// Unique thread id.
    pub id: ThreadId,
    /// The human or service that owns this thread.
    pub owner_user_id: UserId,
    /// Channel this thread communicates over.
    pub channel: ChannelType,
    /// Agents currently active in this thread.
    pub active_agents: BTreeSet<String>,
    /// Number of inbound messages between automatic compaction passes.
    pub compaction_threshold: u32,
    /// Whether the thread is closed — new inbound messages for the same
    /// (channel, external sender) route into a freshly created thread.
    pub closed: bool,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
    /// Last update timestamp.
    pub updated_at: DateTime<Utc>,
}

impl Thread {
    /// Create a new, open thread with the default compaction threshold.
    pub fn new(owner_user_id: UserId, channel: ChannelType) -> Self {
        let now = Utc::now();
        Self {
            id: ThreadId::generate(),
            owner_user_id,
            channel,
            active_agents: BTreeSet::new(),
            compaction_threshold: 20,
            closed: false,
            created_at: now,
            updated_at: now,
        }
    }
}

/// Who authored a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MessageRole {
    /// A human participant.
    User,
    /// The agent's reply.
    Assistant,
    /// A tool's result, inserted into the provider-message tail.
    Tool,
}

/// Reference to non-text media attached to a message.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MediaRef {
    /// Opaque storage reference (path, blob id, or URL).
    pub reference: String,
    /// MIME type of the referenced media.
    pub mime_type: String,
}

/// An immutable message belonging to exactly one thread.
///
/// Order within a thread is defined by `(created_at, id)` lexicographic
/// (invariant — see Thread entity doc in the spec).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    /// Unique message id.
    pub id: MessageId,
    /// Owning thread. Never changes after creation.
    pub thread_id: ThreadId,
    /// Who authored this message.
    pub role: MessageRole,
    /// Immutable content.
    pub content: String,
    /// Optional attached media.
    pub media: Option<MediaRef>,
    /// The external delivery that produced this message, if inbound.
    pub external_delivery_id: Option<String>,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
}

impl Message {
    /// The lexicographic ordering key used to sort a thread's messages.
    pub fn order_key(&self) -> (DateTime<Utc>, &str) {
        (self.created_at, self.id.as_str())
    }
}

/// `(channel, external_id)` dedup record. Persisted before any processing;
/// a duplicate insert is a no-op that returns success but enqueues no work.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExternalDeliveryRecord {
    /// Channel the delivery arrived on.
    pub channel: ChannelType,
    /// The channel-native delivery id (e.g. WhatsApp message id).
    pub external_id: String,
    /// The message this delivery produced, once processed.
    pub message_id: MessageId,
    /// When this delivery was first recorded.
    pub recorded_at: DateTime<Utc>,
}
