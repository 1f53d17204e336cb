#![deny(missing_docs)]
//! Webhook ingestion core (spec §6 INBOUND CHANNEL ADAPTER CONTRACT).
//!
//! A [`ChannelAdapter`] turns one raw inbound payload into either a
//! routable [`Routable`] tuple or a recognized [`AdapterOutcome::NoOp`]
//! (receipt, reaction, status). [`Ingestor::ingest`] then performs the
//! same five steps for every channel: insert the external-delivery dedup
//! record (short-circuiting on conflict per invariant 2), ensure the
//! thread exists, persist the inbound message, emit `channel.inbound`,
//! and enqueue `agent_step` onto `warden-task`'s `agent_default` lane.
//!
//! Grounded on `layer0::operator::OperatorInput`/`TriggerType`'s
//! `(message, trigger)` shape, generalized one layer out to "raw payload
//! in, routable tuple or no-op out" so channel-specific wire formats
//! (WhatsApp/Evolution, a real HTTP surface) stay external collaborators
//! that implement this trait rather than core additions.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use thiserror::Error;

use warden_domain::thread::{ChannelType, ExternalDeliveryRecord, MediaRef, Message, MessageRole};
use warden_domain::{MessageId, ThreadId, UserId};
use warden_store::{DeliveryInsertOutcome, Store, StoreError};
use warden_task::{Runner, RunnerError};
use warden_trace::{event_types, ActorKind, EventLog, EventLogError, TraceContext};

/// The fields a [`ChannelAdapter`] extracts from a raw payload that
/// should be routed into the conversation pipeline.
#[derive(Debug, Clone)]
pub struct Routable {
    /// The channel-native delivery id, e.g. a WhatsApp message id.
    pub external_id: String,
    /// The channel-native sender identifier.
    pub sender: String,
    /// The key identifying which thread this message belongs to —
    /// typically the same as `sender`, but adapters may widen it (e.g.
    /// group-chat ids) without changing this contract.
    pub thread_key: String,
    /// The message's text content.
    pub content: String,
    /// Optional attached media.
    pub media: Option<MediaRef>,
}

/// What a [`ChannelAdapter`] decided about one raw payload.
#[derive(Debug, Clone)]
pub enum AdapterOutcome {
    /// A message that should be routed into the pipeline.
    Routable(Routable),
    /// A recognized non-message event (receipt, reaction, status) —
    /// acknowledged but not routed.
    NoOp {
        /// Human-readable reason, recorded for observability only.
        reason: String,
    },
}

/// Errors an adapter can raise while parsing a raw payload.
#[derive(Debug, Error)]
pub enum AdapterError {
    /// The payload did not match this adapter's expected shape.
    #[error("malformed payload: {0}")]
    Malformed(String),
}

/// Accepts one raw, channel-specific payload and classifies it.
#[async_trait]
pub trait ChannelAdapter: Send + Sync {
    /// The [`ChannelType`] this adapter parses payloads for.
    fn channel(&self) -> ChannelType;

    /// Parse a raw payload into a [`AdapterOutcome`].
    async fn parse(&self, raw: &serde_json::Value) -> Result<AdapterOutcome, AdapterError>;
}

/// A JSON webhook adapter for the common shape
/// `{"id": "...", "from": "...", "text": "...", "media": {...}?}`, with
/// a `"type"` field of `"message"` (default) or a recognized no-op kind
/// (`"receipt"`, `"reaction"`, `"status"`).
pub struct GenericWebhookAdapter {
    channel: ChannelType,
}

impl GenericWebhookAdapter {
    /// Build an adapter for the given channel.
    pub fn new(channel: ChannelType) -> Self {
        Self { channel }
    }
}

#[async_trait]
impl ChannelAdapter for GenericWebhookAdapter {
    fn channel(&self) -> ChannelType {
        self.channel.clone()
    }

    async fn parse(&self, raw: &serde_json::Value) -> Result<AdapterOutcome, AdapterError> {
        let kind = raw.get("type").and_then(|v| v.as_str()).unwrap_or("message");
        if kind != "message" {
            return Ok(AdapterOutcome::NoOp {
                reason: format!("non-routable event type: {kind}"),
            });
        }

        let external_id = raw
            .get("id")
            .and_then(|v| v.as_str())
            .ok_or_else(|| AdapterError::Malformed("missing \"id\"".into()))?
            .to_string();
        let sender = raw
            .get("from")
            .and_then(|v| v.as_str())
            .ok_or_else(|| AdapterError::Malformed("missing \"from\"".into()))?
            .to_string();
        let content = raw
            .get("text")
            .and_then(|v| v.as_str())
            .ok_or_else(|| AdapterError::Malformed("missing \"text\"".into()))?
            .to_string();
        let media = raw.get("media").and_then(|m| {
            let reference = m.get("reference")?.as_str()?.to_string();
            let mime_type = m.get("mime_type")?.as_str()?.to_string();
            Some(MediaRef { reference, mime_type })
        });
        let thread_key = raw
            .get("thread_key")
            .and_then(|v| v.as_str())
            .map(str::to_string)
            .unwrap_or_else(|| sender.clone());

        Ok(AdapterOutcome::Routable(Routable {
            external_id,
            sender,
            thread_key,
            content,
            media,
        }))
    }
}

/// What [`Ingestor::ingest`] decided and did.
#[derive(Debug, Clone)]
pub enum IngestResult {
    /// A new message was persisted, `channel.inbound` was emitted, and
    /// an `agent_step` task was enqueued.
    Accepted {
        /// The persisted message's id.
        message_id: MessageId,
        /// The thread the message landed in.
        thread_id: ThreadId,
    },
    /// `(channel, external_id)` had already been recorded; nothing new
    /// was persisted or enqueued (invariant 2).
    Duplicate {
        /// The message id the original delivery produced.
        message_id: MessageId,
    },
    /// The adapter recognized this payload as a non-routable event.
    NoOp {
        /// The adapter's reason string.
        reason: String,
    },
}

/// Errors surfaced by [`Ingestor::ingest`].
#[derive(Debug, Error)]
pub enum IngestError {
    /// The adapter rejected the raw payload.
    #[error(transparent)]
    Adapter(#[from] AdapterError),
    /// The store failed.
    #[error(transparent)]
    Store(#[from] StoreError),
    /// The event log failed.
    #[error(transparent)]
    EventLog(#[from] EventLogError),
    /// The task runner could not accept the `agent_step` enqueue.
    #[error(transparent)]
    Runner(#[from] RunnerError),
}

/// Deterministically derives an owning [`UserId`] from a channel-native
/// sender identifier, so the same sender always maps to the same user
/// across restarts without requiring a separate identity lookup.
fn derive_user_id(sender: &str) -> UserId {
    UserId::new(format!("{}{}", UserId::PREFIX, sender))
}

/// Turns parsed, routable payloads into persisted threads/messages and
/// `agent_step` task submissions.
pub struct Ingestor {
    store: Arc<dyn Store>,
    event_log: Arc<dyn EventLog>,
    runner: Arc<Runner>,
    component: &'static str,
}

impl Ingestor {
    /// Build an ingestor from its dependencies.
    pub fn new(store: Arc<dyn Store>, event_log: Arc<dyn EventLog>, runner: Arc<Runner>) -> Self {
        Self {
            store,
            event_log,
            runner,
            component: "warden-ingest",
        }
    }

    /// Parse `raw` with `adapter` and route it if applicable. Safe to
    /// call repeatedly with an identical payload: duplicate external
    /// deliveries always return [`IngestResult::Duplicate`] without side
    /// effects beyond the read.
    pub async fn ingest(
        &self,
        adapter: &dyn ChannelAdapter,
        raw: &serde_json::Value,
    ) -> Result<IngestResult, IngestError> {
        let routable = match adapter.parse(raw).await? {
            AdapterOutcome::NoOp { reason } => return Ok(IngestResult::NoOp { reason }),
            AdapterOutcome::Routable(r) => r,
        };
        let channel = adapter.channel();

        if let Some(existing) = self.store.get_delivery(&channel, &routable.external_id).await? {
            return Ok(IngestResult::Duplicate {
                message_id: existing.message_id,
            });
        }

        let thread = self.ensure_thread(&channel, &routable.thread_key).await?;
        let message_id = MessageId::generate();
        let now = Utc::now();

        let delivery = ExternalDeliveryRecord {
            channel: channel.clone(),
            external_id: routable.external_id.clone(),
            message_id: message_id.clone(),
            recorded_at: now,
        };
        // Insert the dedup record before persisting anything else: a
        // crash between here and the message insert leaves at worst an
        // orphaned delivery record, never a duplicate message.
        if matches!(
            self.store.insert_delivery(delivery).await?,
            DeliveryInsertOutcome::Duplicate
        ) {
            // Lost a race with a concurrent identical delivery.
            let existing = self
                .store
                .get_delivery(&channel, &routable.external_id)
                .await?
                .ok_or_else(|| StoreError::NotFound("delivery vanished after duplicate race".into()))?;
            return Ok(IngestResult::Duplicate {
                message_id: existing.message_id,
            });
        }

        let message = Message {
            id: message_id.clone(),
            thread_id: thread.id.clone(),
            role: MessageRole::User,
            content: routable.content.clone(),
            media: routable.media,
            external_delivery_id: Some(routable.external_id.clone()),
            created_at: now,
        };
        self.store.insert_message(message).await?;

        let ctx = TraceContext::root();
        self.event_log
            .emit(
                &ctx,
                event_types::CHANNEL_INBOUND,
                self.component,
                ActorKind::System,
                "ingestor",
                Some(thread.id.clone()),
                serde_json::json!({
                    "channel": channel_label(&channel),
                    "external_id": routable.external_id,
                    "message_id": message_id.as_str(),
                }),
            )
            .await?;

        let payload = serde_json::json!({ "message_id": message_id.as_str() });
        self.runner
            .enqueue("agent_default", "agent_step", payload, &ctx, Some(thread.id.clone()))
            .await?;

        Ok(IngestResult::Accepted {
            message_id,
            thread_id: thread.id,
        })
    }

    async fn ensure_thread(
        &self,
        channel: &ChannelType,
        external_sender: &str,
    ) -> Result<warden_domain::Thread, StoreError> {
        if let Some(thread) = self.store.find_open_thread(channel, external_sender).await? {
            return Ok(thread);
        }
        let thread = warden_domain::Thread::new(derive_user_id(external_sender), channel.clone());
        self.store.insert_thread(thread.clone()).await?;
        self.store
            .bind_open_thread(channel, external_sender, &thread.id)
            .await?;
        Ok(thread)
    }
}

fn channel_label(channel: &ChannelType) -> String {
    match channel {
        ChannelType::WhatsApp => "whatsapp".to_string(),
        ChannelType::Http => "http".to_string(),
        ChannelType::Cli => "cli".to_string(),
        ChannelType::Custom(name) => name.clone(),
    }
}
