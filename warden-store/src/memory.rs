//! In-process reference implementation of [`crate::Store`].
//!
//! Backed by `tokio::sync::RwLock`-protected `HashMap`s. Suitable for
//! development, testing, and as the backend every durable implementation
//! is checked against for identical semantics.

use crate::{DeliveryInsertOutcome, DispatchInsertOutcome, Store, StoreError};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use tokio::sync::RwLock;
use warden_domain::{
    ChannelType, ExternalDeliveryRecord, Message, MessageId, PatchRecord, Schedule, ScheduleId,
    SystemState, Thread, ThreadId, ToolPermission,
};

type OpenThreadKey = (ChannelType, String);
type DeliveryKey = (ChannelType, String);

/// In-memory [`Store`] implementation.
pub struct InMemoryStore {
    threads: RwLock<HashMap<ThreadId, Thread>>,
    open_threads: RwLock<HashMap<OpenThreadKey, ThreadId>>,
    messages: RwLock<HashMap<ThreadId, Vec<Message>>>,
    deliveries: RwLock<HashMap<DeliveryKey, ExternalDeliveryRecord>>,
    schedules: RwLock<HashMap<ScheduleId, Schedule>>,
    dispatches: RwLock<std::collections::HashSet<(ScheduleId, DateTime<Utc>)>>,
    permissions: RwLock<Vec<ToolPermission>>,
    patches: RwLock<HashMap<String, PatchRecord>>,
    system_state: RwLock<SystemState>,
}

impl Default for InMemoryStore {
    fn default() -> Self {
        Self {
            threads: RwLock::new(HashMap::new()),
            open_threads: RwLock::new(HashMap::new()),
            messages: RwLock::new(HashMap::new()),
            deliveries: RwLock::new(HashMap::new()),
            schedules: RwLock::new(HashMap::new()),
            dispatches: RwLock::new(std::collections::HashSet::new()),
            permissions: RwLock::new(Vec::new()),
            patches: RwLock::new(HashMap::new()),
            system_state: RwLock::new(SystemState::nominal()),
        }
    }
}

impl InMemoryStore {
    /// Build an empty store with a nominal system state.
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl Store for InMemoryStore {
    async fn find_open_thread(
        &self,
        channel: &ChannelType,
        external_sender: &str,
    ) -> Result<Option<Thread>, StoreError> {
        let key = (channel.clone(), external_sender.to_string());
        let Some(thread_id) = self.open_threads.read().await.get(&key).cloned() else {
            return Ok(None);
        };
        Ok(self.threads.read().await.get(&thread_id).cloned())
    }

    async fn bind_open_thread(
        &self,
        channel: &ChannelType,
        external_sender: &str,
        thread_id: &ThreadId,
    ) -> Result<(), StoreError> {
        let key = (channel.clone(), external_sender.to_string());
        self.open_threads.write().await.insert(key, thread_id.clone());
        Ok(())
    }

    async fn get_thread(&self, id: &ThreadId) -> Result<Option<Thread>, StoreError> {
        Ok(self.threads.read().await.get(id).cloned())
    }

    async fn insert_thread(&self, thread: Thread) -> Result<(), StoreError> {
        self.threads.write().await.insert(thread.id.clone(), thread);
        Ok(())
    }

    async fn update_thread(&self, thread: Thread) -> Result<(), StoreError> {
        let mut threads = self.threads.write().await;
        if !threads.contains_key(&thread.id) {
            return Err(StoreError::NotFound(format!("thread {}", thread.id)));
        }
        threads.insert(thread.id.clone(), thread);
        Ok(())
    }

    async fn insert_message(&self, message: Message) -> Result<(), StoreError> {
        let mut messages = self.messages.write().await;
        let bucket = messages.entry(message.thread_id.clone()).or_default();
        bucket.push(message);
        bucket.sort_by(|a, b| a.order_key().cmp(&b.order_key()));
        Ok(())
    }

    async fn list_messages(
        &self,
        thread_id: &ThreadId,
        limit: Option<usize>,
    ) -> Result<Vec<Message>, StoreError> {
        let messages = self.messages.read().await;
        let Some(bucket) = messages.get(thread_id) else {
            return Ok(Vec::new());
        };
        match limit {
            Some(n) if bucket.len() > n => Ok(bucket[bucket.len() - n..].to_vec()),
            _ => Ok(bucket.clone()),
        }
    }

    async fn count_inbound_messages(&self, thread_id: &ThreadId) -> Result<u64, StoreError> {
        let messages = self.messages.read().await;
        Ok(messages
            .get(thread_id)
            .map(|bucket| {
                bucket
                    .iter()
                    .filter(|m| m.role == warden_domain::MessageRole::User)
                    .count() as u64
            })
            .unwrap_or(0))
    }

    async fn insert_delivery(
        &self,
        record: ExternalDeliveryRecord,
    ) -> Result<DeliveryInsertOutcome, StoreError> {
        let key = (record.channel.clone(), record.external_id.clone());
        let mut deliveries = self.deliveries.write().await;
        if deliveries.contains_key(&key) {
            return Ok(DeliveryInsertOutcome::Duplicate);
        }
        deliveries.insert(key, record);
        Ok(DeliveryInsertOutcome::Inserted)
    }

    async fn get_delivery(
        &self,
        channel: &ChannelType,
        external_id: &str,
    ) -> Result<Option<ExternalDeliveryRecord>, StoreError> {
        let key = (channel.clone(), external_id.to_string());
        Ok(self.deliveries.read().await.get(&key).cloned())
    }

    async fn list_enabled_schedules(&self) -> Result<Vec<Schedule>, StoreError> {
        Ok(self
            .schedules
            .read()
            .await
            .values()
            .filter(|s| s.enabled)
            .cloned()
            .collect())
    }

    async fn get_schedule(&self, id: &ScheduleId) -> Result<Option<Schedule>, StoreError> {
        Ok(self.schedules.read().await.get(id).cloned())
    }

    async fn upsert_schedule(&self, schedule: Schedule) -> Result<(), StoreError> {
        self.schedules.write().await.insert(schedule.id.clone(), schedule);
        Ok(())
    }

    async fn try_insert_dispatch(
        &self,
        schedule_id: &ScheduleId,
        due_at: DateTime<Utc>,
    ) -> Result<DispatchInsertOutcome, StoreError> {
        let mut dispatches = self.dispatches.write().await;
        let key = (schedule_id.clone(), due_at);
        if dispatches.contains(&key) {
            return Ok(DispatchInsertOutcome::AlreadyDispatched);
        }
        dispatches.insert(key);
        Ok(DispatchInsertOutcome::Inserted)
    }

    async fn set_last_dispatched_at(
        &self,
        schedule_id: &ScheduleId,
        at: DateTime<Utc>,
    ) -> Result<(), StoreError> {
        let mut schedules = self.schedules.write().await;
        let schedule = schedules
            .get_mut(schedule_id)
            .ok_or_else(|| StoreError::NotFound(format!("schedule {schedule_id}")))?;
        schedule.last_dispatched_at = Some(at);
        Ok(())
    }

    async fn list_permissions(&self, principal_id: &str) -> Result<Vec<ToolPermission>, StoreError> {
        Ok(self
            .permissions
            .read()
            .await
            .iter()
            .filter(|p| p.principal_id == principal_id)
            .cloned()
            .collect())
    }

    async fn grant_permission(&self, permission: ToolPermission) -> Result<(), StoreError> {
        let mut permissions = self.permissions.write().await;
        if !permissions.contains(&permission) {
            permissions.push(permission);
        }
        Ok(())
    }

    async fn revoke_permission(&self, principal_id: &str, tool_name: &str) -> Result<(), StoreError> {
        let mut permissions = self.permissions.write().await;
        permissions.retain(|p| !(p.principal_id == principal_id && p.tool_name == tool_name));
        Ok(())
    }

    async fn get_patch(&self, trace_id: &str) -> Result<Option<PatchRecord>, StoreError> {
        Ok(self.patches.read().await.get(trace_id).cloned())
    }

    async fn put_patch(&self, record: PatchRecord) -> Result<(), StoreError> {
        self.patches
            .write()
            .await
            .insert(record.trace_id.as_str().to_string(), record);
        Ok(())
    }

    async fn list_patches(&self) -> Result<Vec<PatchRecord>, StoreError> {
        let mut records: Vec<PatchRecord> = self.patches.read().await.values().cloned().collect();
        records.sort_by(|a, b| {
            let a_last = a.transitions.last().map(|(_, t)| *t);
            let b_last = b.transitions.last().map(|(_, t)| *t);
            b_last.cmp(&a_last)
        });
        Ok(records)
    }

    async fn get_system_state(&self) -> Result<SystemState, StoreError> {
        Ok(self.system_state.read().await.clone())
    }

    async fn cas_system_state(
        &self,
        expected_version: u64,
        new_state: SystemState,
    ) -> Result<SystemState, StoreError> {
        let mut state = self.system_state.write().await;
        if state.version != expected_version {
            return Err(StoreError::Backend(format!(
                "system_state version mismatch: expected {expected_version}, found {}",
                state.version
            )));
        }
        *state = new_state.clone();
        Ok(new_state)
    }
}
