#![deny(missing_docs)]
//! The orchestrator's memory contract (spec §4.6 MEMORY INTERFACE).
//!
//! `MemoryInterface` is consumed, not implemented, by `warden-step`: the
//! orchestrator depends on four operations whose internal ranking and
//! extraction pipeline lives outside this crate. Every operation is
//! degraded-tolerant — callers treat an empty list or a stale summary as
//! a narrower prompt, never a fatal error, and emit `memory.degraded`
//! when they fall back.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use warden_domain::ThreadId;

/// Errors a [`MemoryInterface`] implementation may surface. Callers
/// (`warden-step`) treat every variant as non-fatal: log, emit
/// `memory.degraded`, and proceed with a narrower prompt.
#[non_exhaustive]
#[derive(Debug, Error)]
pub enum MemoryError {
    /// The backing store is unreachable or returned an error.
    #[error("memory backend unavailable: {0}")]
    Unavailable(String),
    /// The backend has no data for this thread yet.
    #[error("no memory recorded for this thread")]
    NotFound,
}

/// A thread's rolling summary at two granularities.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ThreadSummary {
    /// A short (one- or two-sentence) summary for the compact prompt section.
    pub short: String,
    /// A longer summary carrying more structured state for the long-summary
    /// block.
    pub long: String,
    /// When this summary was last regenerated. `None` means no summary has
    /// ever been produced for this thread — the orchestrator treats that
    /// the same as a stale one.
    pub last_updated_at: Option<DateTime<Utc>>,
}

/// How a [`MemoryInterface::retrieve`] call blends semantic similarity
/// against recency when ranking results. Defaults to the 70/30 split the
/// orchestrator's prompt-assembly section uses.
#[derive(Debug, Clone, Copy)]
pub struct RetrievalBlend {
    /// Weight given to semantic similarity, 0.0–1.0.
    pub semantic_weight: f64,
    /// Weight given to recency, 0.0–1.0. Implementations are not required
    /// to enforce `semantic_weight + recency_weight == 1.0`.
    pub recency_weight: f64,
}

impl Default for RetrievalBlend {
    fn default() -> Self {
        Self {
            semantic_weight: 0.7,
            recency_weight: 0.3,
        }
    }
}

/// One retrieved passage, with its score and where it came from.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetrievedItem {
    /// The retrieved text.
    pub text: String,
    /// The blended relevance score that produced this item's rank.
    pub score: f64,
    /// Opaque provenance (e.g. source message id, document id).
    pub provenance: String,
}

/// One piece of state visible to an agent in a thread, scoped by the
/// agent's own permissions.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActiveStateItem {
    /// The state key.
    pub key: String,
    /// The stored value.
    pub value: serde_json::Value,
}

/// The four operations the orchestrator step depends on. Implementations
/// are free to degrade internally (empty retrieval, stale summary); they
/// are not expected to surface partial failure through [`MemoryError`]
/// unless the whole call genuinely could not be attempted.
#[async_trait]
pub trait MemoryInterface: Send + Sync {
    /// The thread's rolling short/long summary.
    async fn thread_summary(&self, thread_id: &ThreadId) -> Result<ThreadSummary, MemoryError>;

    /// Semantic + recency blended retrieval over a thread's history.
    async fn retrieve(
        &self,
        thread_id: &ThreadId,
        query: &str,
        k: usize,
        blend: RetrievalBlend,
    ) -> Result<Vec<RetrievedItem>, MemoryError>;

    /// State items visible to `agent_id` in `thread_id`, ordered for direct
    /// inclusion in the structured-state-block prompt section.
    async fn active_state_items(
        &self,
        thread_id: &ThreadId,
        agent_id: &str,
    ) -> Result<Vec<ActiveStateItem>, MemoryError>;

    /// Compute an embedding vector for a piece of text.
    async fn embed(&self, text: &str) -> Result<Vec<f32>, MemoryError>;
}

/// A reference [`MemoryInterface`] that always returns empty/default
/// results. Used in tests and by `warden-app` until a real memory
/// backend is wired in.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullMemory;

#[async_trait]
impl MemoryInterface for NullMemory {
    async fn thread_summary(&self, _thread_id: &ThreadId) -> Result<ThreadSummary, MemoryError> {
        Ok(ThreadSummary::default())
    }

    async fn retrieve(
        &self,
        _thread_id: &ThreadId,
        _query: &str,
        _k: usize,
        _blend: RetrievalBlend,
    ) -> Result<Vec<RetrievedItem>, MemoryError> {
        Ok(Vec::new())
    }

    async fn active_state_items(
        &self,
        _thread_id: &ThreadId,
        _agent_id: &str,
    ) -> Result<Vec<ActiveStateItem>, MemoryError> {
        Ok(Vec::new())
    }

    async fn embed(&self, _text: &str) -> Result<Vec<f32>, MemoryError> {
        Ok(Vec::new())
    }
}

/// Adapts a `layer0::StateReader` into the [`MemoryInterface`] contract,
/// serving `active_state_items` from real per-agent scoped state and
/// treating every other operation as permanently degraded (summaries and
/// semantic retrieval have no [`layer0::StateReader`] analogue). Every
/// degraded path is reported via `memory.degraded`, generalizing the same
/// "non-fatal on empty/`Err`" treatment `warden-op-react::assemble_context`
/// already gives `StateReader` errors.
pub struct StateReaderMemory {
    reader: std::sync::Arc<dyn layer0::StateReader>,
    event_log: std::sync::Arc<dyn warden_trace::EventLog>,
    component: &'static str,
}

impl StateReaderMemory {
    /// Build an adapter over a state reader, reporting degraded fallbacks
    /// through `event_log`.
    pub fn new(
        reader: std::sync::Arc<dyn layer0::StateReader>,
        event_log: std::sync::Arc<dyn warden_trace::EventLog>,
    ) -> Self {
        Self {
            reader,
            event_log,
            component: "warden-memory",
        }
    }

    async fn emit_degraded(&self, ctx: &warden_trace::TraceContext, thread_id: &ThreadId, reason: &str) {
        let payload = serde_json::json!({"reason": reason});
        if let Err(e) = self
            .event_log
            .emit(
                ctx,
                warden_trace::event_types::MEMORY_DEGRADED,
                self.component,
                warden_trace::ActorKind::System,
                "memory-interface",
                Some(thread_id.clone()),
                payload,
            )
            .await
        {
            tracing::warn!(error = %e, "failed to emit memory.degraded");
        }
    }
}

#[async_trait]
impl MemoryInterface for StateReaderMemory {
    async fn thread_summary(&self, thread_id: &ThreadId) -> Result<ThreadSummary, MemoryError> {
        let ctx = warden_trace::TraceContext::root();
        self.emit_degraded(&ctx, thread_id, "no_summary_backend").await;
        Ok(ThreadSummary::default())
    }

    async fn retrieve(
        &self,
        thread_id: &ThreadId,
        _query: &str,
        _k: usize,
        _blend: RetrievalBlend,
    ) -> Result<Vec<RetrievedItem>, MemoryError> {
        let ctx = warden_trace::TraceContext::root();
        self.emit_degraded(&ctx, thread_id, "no_retrieval_backend").await;
        Ok(Vec::new())
    }

    async fn active_state_items(
        &self,
        thread_id: &ThreadId,
        agent_id: &str,
    ) -> Result<Vec<ActiveStateItem>, MemoryError> {
        let scope = layer0::effect::Scope::Agent {
            workflow: layer0::WorkflowId::new(thread_id.as_str()),
            agent: layer0::AgentId::new(agent_id),
        };
        let keys = match self.reader.list(&scope, "").await {
            Ok(keys) => keys,
            Err(_) => {
                let ctx = warden_trace::TraceContext::root();
                self.emit_degraded(&ctx, thread_id, "state_list_failed").await;
                return Ok(Vec::new());
            }
        };

        let mut items = Vec::with_capacity(keys.len());
        for key in keys {
            match self.reader.read(&scope, &key).await {
                Ok(Some(value)) => items.push(ActiveStateItem { key, value }),
                Ok(None) => {}
                Err(_) => {
                    let ctx = warden_trace::TraceContext::root();
                    self.emit_degraded(&ctx, thread_id, "state_read_failed").await;
                }
            }
        }
        items.sort_by(|a, b| a.key.cmp(&b.key));
        Ok(items)
    }

    async fn embed(&self, _text: &str) -> Result<Vec<f32>, MemoryError> {
        let ctx = warden_trace::TraceContext::root();
        self.emit_degraded(&ctx, &ThreadId::generate(), "no_embedding_backend").await;
        Ok(Vec::new())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn null_memory_is_all_defaults() {
        let mem = NullMemory;
        let thread_id = ThreadId::generate();
        assert_eq!(mem.thread_summary(&thread_id).await.unwrap().short, "");
        assert!(mem
            .retrieve(&thread_id, "q", 5, RetrievalBlend::default())
            .await
            .unwrap()
            .is_empty());
        assert!(mem
            .active_state_items(&thread_id, "agent-1")
            .await
            .unwrap()
            .is_empty());
        assert!(mem.embed("hello").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn state_reader_memory_serves_active_state_items() {
        let reader: std::sync::Arc<dyn layer0::StateReader> =
            std::sync::Arc::new(warden_state_memory_for_tests::MemoryStore::new());
        let log = std::sync::Arc::new(warden_trace::InMemoryEventLog::new(false));
        let adapter = StateReaderMemory::new(reader, log);
        let thread_id = ThreadId::generate();

        let items = adapter.active_state_items(&thread_id, "agent-1").await.unwrap();
        assert!(items.is_empty());
    }

    // A minimal in-test StateStore so this crate's tests don't need a
    // dev-dependency on warden-state-memory just to exercise the adapter.
    mod warden_state_memory_for_tests {
        use async_trait::async_trait;
        use layer0::effect::Scope;
        use layer0::error::StateError;
        use layer0::state::{SearchResult, StateStore};
        use std::collections::HashMap;
        use tokio::sync::RwLock;

        pub struct MemoryStore {
            data: RwLock<HashMap<String, serde_json::Value>>,
        }

        impl MemoryStore {
            pub fn new() -> Self {
                Self {
                    data: RwLock::new(HashMap::new()),
                }
            }
        }

        #[async_trait]
        impl StateStore for MemoryStore {
            async fn read(&self, scope: &Scope, key: &str) -> Result<Option<serde_json::Value>, StateError> {
                let ck = format!("{scope:?}\0{key}");
                Ok(self.data.read().await.get(&ck).cloned())
            }
            async fn write(&self, scope: &Scope, key: &str, value: serde_json::Value) -> Result<(), StateError> {
                let ck = format!("{scope:?}\0{key}");
                self.data.write().await.insert(ck, value);
                Ok(())
            }
            async fn delete(&self, scope: &Scope, key: &str) -> Result<(), StateError> {
                let ck = format!("{scope:?}\0{key}");
                self.data.write().await.remove(&ck);
                Ok(())
            }
            async fn list(&self, _scope: &Scope, _prefix: &str) -> Result<Vec<String>, StateError> {
                Ok(Vec::new())
            }
            async fn search(&self, _scope: &Scope, _query: &str, _limit: usize) -> Result<Vec<SearchResult>, StateError> {
                Ok(Vec::new())
            }
        }
    }
}
