#![deny(missing_docs)]
//! Lane-based worker pool: retries, per-key serialization, and periodic
//! dispatch (spec §4.8 TASK RUNNER).
//!
//! Grounded on `warden-orch-local::LocalOrch::dispatch_many`'s
//! `tokio::spawn` + `JoinHandle` concurrent-dispatch shape, scaled from
//! "one task per call" to durable per-lane worker pools reading off
//! bounded `tokio::sync::mpsc` channels. Per-`(thread_id, handler_name)`
//! serialization uses a `DashMap` of per-key mutexes.

mod periodic;
mod retry;
mod runner;

pub use periodic::{spawn_supervisor, PeriodicEntry};
pub use retry::backoff_delay;
pub use runner::{LaneConfig, Runner, RunnerConfig};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;
use warden_domain::{SpanId, TaskId, ThreadId, TraceId};

/// One unit of work drawn from a lane queue.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Task {
    /// Unique task id, minted at enqueue time.
    pub id: TaskId,
    /// The lane this task was submitted to.
    pub lane: String,
    /// Which registered handler processes this task.
    pub handler_name: String,
    /// Opaque handler input.
    pub payload: serde_json::Value,
    /// The trace this task's processing belongs to.
    pub trace_id: TraceId,
    /// The span that caused this task to be enqueued, if any.
    pub parent_span_id: Option<SpanId>,
    /// The thread this task concerns, used to compute a handler's
    /// serialization key when one is declared.
    pub thread_id: Option<ThreadId>,
    /// 1-based attempt counter; incremented on each retry.
    pub attempt: u32,
    /// When this task was placed on its lane queue.
    pub enqueued_at: DateTime<Utc>,
}

/// A handler's classification of a failure: whether retrying could help.
#[derive(Debug, Error)]
pub enum TaskError {
    /// Worth retrying (network blip, rate limit, lock contention).
    #[error("transient: {0}")]
    Transient(String),
    /// Retrying would reproduce the same failure (validation, not found).
    #[error("permanent: {0}")]
    Permanent(String),
}

impl TaskError {
    /// Whether the runner should attempt this task again.
    pub fn is_retryable(&self) -> bool {
        matches!(self, TaskError::Transient(_))
    }
}

/// Per-handler retry policy.
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    /// Maximum number of attempts, including the first.
    pub max_attempts: u32,
    /// Base delay for exponential backoff.
    pub base_delay: Duration,
    /// Upper bound on computed delay, before jitter.
    pub max_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_secs(2),
            max_delay: Duration::from_secs(32),
        }
    }
}

/// A registered unit of work. Implementations are looked up by
/// [`TaskHandler::name`] when a task is dequeued.
#[async_trait]
pub trait TaskHandler: Send + Sync {
    /// The name tasks reference via [`Task::handler_name`].
    fn name(&self) -> &str;

    /// This handler's retry policy. Defaults to the spec's baseline:
    /// 3 attempts, 2s base, 32s cap.
    fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::default()
    }

    /// The serialization key for a task, if this handler must run at
    /// most one instance at a time per key. `agent_step` returns
    /// `Some(format!("{handler}:{thread_id}"))` so a thread never has two
    /// concurrent steps in flight.
    fn serialization_key(&self, task: &Task) -> Option<String> {
        let _ = task;
        None
    }

    /// Run one attempt. `task.attempt` tells the handler which retry this
    /// is, for logging; handlers should not branch behavior on it.
    async fn handle(&self, task: &Task) -> Result<(), TaskError>;
}
