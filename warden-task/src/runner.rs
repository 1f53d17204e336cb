//! The worker pool: one bounded `tokio::sync::mpsc` channel per lane,
//! drained by a configurable number of workers that share a single
//! receiver behind a `tokio::sync::Mutex`.

use crate::retry::backoff_delay;
use crate::{Task, TaskError, TaskHandler};
use chrono::Utc;
use dashmap::DashMap;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicI64, Ordering};
use std::sync::{Arc, Mutex as StdMutex};
use std::time::Duration;
use thiserror::Error;
use tokio::sync::{mpsc, Mutex as TokioMutex};
use tokio::task::JoinHandle;
use tracing::warn;
use warden_domain::{TaskId, ThreadId};
use warden_trace::{event_types, ActorKind, EventLog, TraceContext};

/// Per-lane queue depth and worker count.
#[derive(Debug, Clone, Copy)]
pub struct LaneConfig {
    /// Bounded queue capacity. `enqueue` awaits a free slot once full.
    pub capacity: usize,
    /// Number of workers draining this lane concurrently.
    pub workers: usize,
}

impl Default for LaneConfig {
    fn default() -> Self {
        Self {
            capacity: 256,
            workers: 4,
        }
    }
}

/// Runner-wide configuration: lanes and shutdown behavior.
#[derive(Debug, Clone)]
pub struct RunnerConfig {
    /// Lane name to its queue/worker configuration. The spec requires at
    /// minimum `agent_priority`, `agent_default`, `tools_io`, `local_llm`.
    pub lanes: HashMap<String, LaneConfig>,
    /// How long `shutdown` waits for in-flight tasks before aborting
    /// remaining workers.
    pub drain_timeout: Duration,
}

impl Default for RunnerConfig {
    fn default() -> Self {
        let mut lanes = HashMap::new();
        lanes.insert(
            "agent_priority".to_string(),
            LaneConfig {
                capacity: 64,
                workers: 2,
            },
        );
        lanes.insert("agent_default".to_string(), LaneConfig::default());
        lanes.insert(
            "tools_io".to_string(),
            LaneConfig {
                capacity: 512,
                workers: 8,
            },
        );
        lanes.insert(
            "local_llm".to_string(),
            LaneConfig {
                capacity: 32,
                workers: 1,
            },
        );
        Self {
            lanes,
            drain_timeout: Duration::from_secs(30),
        }
    }
}

/// Errors raised by [`Runner::enqueue`].
#[non_exhaustive]
#[derive(Debug, Error)]
pub enum RunnerError {
    /// No lane with this name was configured.
    #[error("unknown lane: {0}")]
    UnknownLane(String),
    /// The runner has stopped accepting new work (shutdown in progress
    /// or complete). The caller's attempt was logged as
    /// `task.dropped_on_shutdown` rather than propagated as a hard error.
    #[error("runner is shutting down")]
    ShuttingDown,
}

/// The task runner: owns every lane's queue and worker pool.
pub struct Runner {
    component: String,
    event_log: Arc<dyn EventLog>,
    handlers: DashMap<String, Arc<dyn TaskHandler>>,
    senders: HashMap<String, mpsc::Sender<Task>>,
    serialization_locks: DashMap<String, Arc<TokioMutex<()>>>,
    shutting_down: AtomicBool,
    active_count: AtomicI64,
    drain_timeout: Duration,
    workers: StdMutex<Vec<JoinHandle<()>>>,
}

impl Runner {
    /// Build a runner with its lane workers already spawned.
    pub fn new(
        config: RunnerConfig,
        event_log: Arc<dyn EventLog>,
        component: impl Into<String>,
    ) -> Arc<Self> {
        let mut senders = HashMap::new();
        let mut receivers = HashMap::new();
        for (lane, lane_cfg) in &config.lanes {
            let (tx, rx) = mpsc::channel(lane_cfg.capacity.max(1));
            senders.insert(lane.clone(), tx);
            receivers.insert(lane.clone(), (rx, lane_cfg.workers.max(1)));
        }

        let runner = Arc::new(Self {
            component: component.into(),
            event_log,
            handlers: DashMap::new(),
            senders,
            serialization_locks: DashMap::new(),
            shutting_down: AtomicBool::new(false),
            active_count: AtomicI64::new(0),
            drain_timeout: config.drain_timeout,
            workers: StdMutex::new(Vec::new()),
        });
        runner.spawn_lane_workers(receivers);
        runner
    }

    /// Register a handler. Replaces any previously registered handler
    /// with the same name.
    pub fn register(&self, handler: Arc<dyn TaskHandler>) {
        self.handlers.insert(handler.name().to_string(), handler);
    }

    /// Submit a task. `ctx` supplies the trace this task's processing
    /// joins; the task's own span opens fresh on dequeue, parented to
    /// `ctx.span_id`.
    pub async fn enqueue(
        &self,
        lane: &str,
        handler_name: &str,
        payload: serde_json::Value,
        ctx: &TraceContext,
        thread_id: Option<ThreadId>,
    ) -> Result<TaskId, RunnerError> {
        if self.shutting_down.load(Ordering::SeqCst) {
            self.emit_dropped_on_shutdown(handler_name, ctx).await;
            return Err(RunnerError::ShuttingDown);
        }
        let sender = self
            .senders
            .get(lane)
            .ok_or_else(|| RunnerError::UnknownLane(lane.to_string()))?;

        let task = Task {
            id: TaskId::generate(),
            lane: lane.to_string(),
            handler_name: handler_name.to_string(),
            payload,
            trace_id: ctx.trace_id.clone(),
            parent_span_id: Some(ctx.span_id.clone()),
            thread_id,
            attempt: 1,
            enqueued_at: Utc::now(),
        };
        let task_id = task.id.clone();

        if sender.send(task).await.is_err() {
            // Channel closed mid-send: the known benign shutdown race.
            self.emit_dropped_on_shutdown(handler_name, ctx).await;
            return Err(RunnerError::ShuttingDown);
        }
        Ok(task_id)
    }

    /// Whether shutdown has been requested. Consulted by the periodic
    /// supervisor to stop scheduling new dispatches.
    pub fn is_shutting_down(&self) -> bool {
        self.shutting_down.load(Ordering::SeqCst)
    }

    /// Stop accepting new work, wait up to the configured drain timeout
    /// for in-flight tasks, then abort whatever workers remain.
    pub async fn shutdown(&self) {
        self.shutting_down.store(true, Ordering::SeqCst);
        let deadline = tokio::time::Instant::now() + self.drain_timeout;
        while self.active_count.load(Ordering::SeqCst) > 0 && tokio::time::Instant::now() < deadline {
            tokio::time::sleep(Duration::from_millis(50)).await;
        }
        let mut workers = self.workers.lock().expect("workers lock poisoned");
        for handle in workers.drain(..) {
            handle.abort();
        }
    }

    fn spawn_lane_workers(
        self: &Arc<Self>,
        receivers: HashMap<String, (mpsc::Receiver<Task>, usize)>,
    ) {
        let mut workers = self.workers.lock().expect("workers lock poisoned");
        for (lane, (rx, worker_count)) in receivers {
            let shared_rx = Arc::new(TokioMutex::new(rx));
            for _ in 0..worker_count {
                let runner = Arc::clone(self);
                let shared_rx = Arc::clone(&shared_rx);
                let lane = lane.clone();
                workers.push(tokio::spawn(async move {
                    loop {
                        let next = {
                            let mut guard = shared_rx.lock().await;
                            guard.recv().await
                        };
                        match next {
                            Some(task) => runner.process_task(task).await,
                            None => break,
                        }
                    }
                    tracing::debug!(lane = %lane, "lane worker exiting");
                }));
            }
        }
    }

    async fn process_task(&self, mut task: Task) {
        let Some(handler) = self.handlers.get(&task.handler_name).map(|h| h.value().clone()) else {
            warn!(handler = %task.handler_name, "no handler registered for task; dropping");
            return;
        };

        self.active_count.fetch_add(1, Ordering::SeqCst);

        let key = handler.serialization_key(&task);
        let _key_guard = match key {
            Some(key) => {
                let lock = self
                    .serialization_locks
                    .entry(key)
                    .or_insert_with(|| Arc::new(TokioMutex::new(())))
                    .clone();
                Some(lock.lock_owned().await)
            }
            None => None,
        };

        let policy = handler.retry_policy();
        let mut last_error: Option<TaskError> = None;
        for attempt in 1..=policy.max_attempts {
            task.attempt = attempt;
            match handler.handle(&task).await {
                Ok(()) => {
                    last_error = None;
                    break;
                }
                Err(error) => {
                    let retryable = error.is_retryable();
                    last_error = Some(error);
                    if retryable && attempt < policy.max_attempts {
                        tokio::time::sleep(backoff_delay(&policy, attempt + 1)).await;
                        continue;
                    }
                    break;
                }
            }
        }

        if let Some(error) = last_error {
            self.emit_dead_letter(&task, &error).await;
        }

        self.active_count.fetch_sub(1, Ordering::SeqCst);
    }

    async fn emit_dead_letter(&self, task: &Task, error: &TaskError) {
        let ctx = TraceContext {
            trace_id: task.trace_id.clone(),
            span_id: warden_domain::SpanId::generate(),
            parent_span_id: task.parent_span_id.clone(),
        };
        let payload = serde_json::json!({
            "task_id": task.id.as_str(),
            "lane": task.lane,
            "handler_name": task.handler_name,
            "attempts": task.attempt,
            "error_chain": error.to_string(),
        });
        if let Err(e) = self
            .event_log
            .emit(
                &ctx,
                event_types::TASK_DEAD_LETTER,
                &self.component,
                ActorKind::System,
                "task-runner",
                task.thread_id.clone(),
                payload,
            )
            .await
        {
            warn!(error = %e, "failed to emit task.dead_letter");
        }
    }

    async fn emit_dropped_on_shutdown(&self, handler_name: &str, ctx: &TraceContext) {
        let payload = serde_json::json!({ "handler_name": handler_name });
        if let Err(e) = self
            .event_log
            .emit(
                ctx,
                event_types::TASK_DROPPED_ON_SHUTDOWN,
                &self.component,
                ActorKind::System,
                "task-runner",
                None,
                payload,
            )
            .await
        {
            warn!(error = %e, "failed to emit task.dropped_on_shutdown");
        }
    }
}
