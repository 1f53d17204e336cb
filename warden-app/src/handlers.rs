//! `warden-task::TaskHandler` implementations that wrap the crates with
//! no runner of their own (§4.4, §4.9): the orchestrator step, the
//! periodic compaction pass, and each self-update pipeline stage.

use std::sync::Arc;

use async_trait::async_trait;
use warden_domain::{AgentBundle, MessageId, ScheduleId, SpanId};
use warden_step::{OrchestratorStep, StepInput, StepTrigger};
use warden_store::Store;
use warden_task::{RetryPolicy, Task, TaskError, TaskHandler};
use warden_trace::{event_types, ActorKind, EventLog, TraceContext};

fn trace_from_task(task: &Task) -> TraceContext {
    TraceContext {
        trace_id: task.trace_id.clone(),
        span_id: SpanId::generate(),
        parent_span_id: task.parent_span_id.clone(),
    }
}

/// Runs one [`OrchestratorStep`] per task, triggered either by a fresh
/// inbound message (`{"message_id": ...}`, from `warden-ingest`) or a
/// fired schedule (`{"schedule_id": ..., "due_at": ..., "payload": ...}`,
/// from `warden-cron`).
pub struct AgentStepHandler {
    store: Arc<dyn Store>,
    step: Arc<OrchestratorStep>,
    agent: AgentBundle,
}

impl AgentStepHandler {
    /// Build the handler over a fixed agent bundle — this process runs a
    /// single built-in agent (§3's multi-agent roster is an Open Question
    /// this deployment resolves in favor of one primary agent per
    /// thread; see `DESIGN.md`).
    pub fn new(store: Arc<dyn Store>, step: Arc<OrchestratorStep>, agent: AgentBundle) -> Self {
        Self { store, step, agent }
    }

    async fn trigger_text(&self, task: &Task, thread_id: &warden_domain::ThreadId) -> Result<(StepTrigger, String), TaskError> {
        if let Some(message_id) = task.payload.get("message_id").and_then(|v| v.as_str()) {
            let recent = self
                .store
                .list_messages(thread_id, Some(1))
                .await
                .map_err(|e| TaskError::Failed(e.to_string()))?;
            let text = recent.into_iter().next().map(|m| m.content).unwrap_or_default();
            return Ok((StepTrigger::Message(MessageId::new(message_id.to_string())), text));
        }
        if let Some(schedule_id) = task.payload.get("schedule_id").and_then(|v| v.as_str()) {
            let text = task
                .payload
                .get("payload")
                .map(|v| v.to_string())
                .unwrap_or_default();
            return Ok((StepTrigger::Schedule(ScheduleId::new(schedule_id.to_string())), text));
        }
        Err(TaskError::Failed("agent_step payload has neither message_id nor schedule_id".to_string()))
    }
}

#[async_trait]
impl TaskHandler for AgentStepHandler {
    fn name(&self) -> &str {
        "agent_step"
    }

    fn serialization_key(&self, task: &Task) -> Option<String> {
        task.thread_id.as_ref().map(|id| format!("{}:{}", self.name(), id))
    }

    async fn handle(&self, task: &Task) -> Result<(), TaskError> {
        let thread_id = task
            .thread_id
            .clone()
            .ok_or_else(|| TaskError::Failed("agent_step task carries no thread_id".to_string()))?;

        let (trigger, trigger_text) = self.trigger_text(task, &thread_id).await?;

        let permissions = self
            .store
            .list_permissions(&self.agent.agent_id)
            .await
            .map_err(|e| TaskError::Failed(e.to_string()))?;

        let input = StepInput {
            thread_id,
            trigger,
            trace: trace_from_task(task),
            agent: self.agent.clone(),
            pinned_skills: Vec::new(),
            trigger_text,
            permissions,
        };

        self.step
            .execute(input)
            .await
            .map_err(|e| TaskError::Failed(e.to_string()))?;
        Ok(())
    }
}

/// Produces an updated rolling summary for a thread once its inbound
/// count crosses the compaction threshold (§4.4 "Compaction").
///
/// The reference [`warden_memory::MemoryInterface`] exposes no write
/// path for a thread's summary — only `warden-memory`'s own backing
/// store would. Until a durable summary sink is wired in, this handler
/// only emits the audit trail a real compaction pass would; it does not
/// yet persist the summary it would produce.
pub struct CompactionHandler {
    event_log: Arc<dyn EventLog>,
    component: &'static str,
}

impl CompactionHandler {
    /// Build the handler.
    pub fn new(event_log: Arc<dyn EventLog>) -> Self {
        Self { event_log, component: "warden-app" }
    }
}

#[async_trait]
impl TaskHandler for CompactionHandler {
    fn name(&self) -> &str {
        "thread_compaction"
    }

    fn serialization_key(&self, task: &Task) -> Option<String> {
        task.thread_id.as_ref().map(|id| format!("{}:{}", self.name(), id))
    }

    async fn handle(&self, task: &Task) -> Result<(), TaskError> {
        let ctx = trace_from_task(task);
        self.event_log
            .emit(
                &ctx,
                event_types::MEMORY_DEGRADED,
                self.component,
                ActorKind::System,
                "thread-compaction",
                task.thread_id.clone(),
                serde_json::json!({"reason": "no durable summary sink configured"}),
            )
            .await
            .map_err(|e| TaskError::Failed(e.to_string()))?;
        Ok(())
    }
}

/// Runs one stage of the self-update pipeline (`validate`, `test`, or
/// `apply`) for the patch named by the task's `trace_id` payload field.
/// `propose` and `approve` are driven synchronously by their own
/// entrypoints (an inbound proposal, an operator's approval action) and
/// so are not task handlers; `verify` runs after `apply`'s restart and is
/// out of this process's task runner by construction.
pub struct SelfUpdateStageHandler {
    stage: SelfUpdateStage,
    pipeline: Arc<warden_selfupdate::Pipeline>,
}

/// Which self-update stage a [`SelfUpdateStageHandler`] drives.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SelfUpdateStage {
    /// `Pipeline::validate`.
    Validate,
    /// `Pipeline::test`.
    Test,
    /// `Pipeline::apply`.
    Apply,
}

impl SelfUpdateStage {
    fn task_name(self) -> &'static str {
        match self {
            SelfUpdateStage::Validate => "selfupdate_validate",
            SelfUpdateStage::Test => "selfupdate_test",
            SelfUpdateStage::Apply => "selfupdate_apply",
        }
    }
}

impl SelfUpdateStageHandler {
    /// Build a handler for one stage.
    pub fn new(stage: SelfUpdateStage, pipeline: Arc<warden_selfupdate::Pipeline>) -> Self {
        Self { stage, pipeline }
    }
}

#[async_trait]
impl TaskHandler for SelfUpdateStageHandler {
    fn name(&self) -> &str {
        self.stage.task_name()
    }

    fn retry_policy(&self) -> RetryPolicy {
        // Self-update stages are not safely re-attempted blind: a failed
        // `test` or `apply` already recorded its own terminal state.
        RetryPolicy {
            max_attempts: 1,
            ..RetryPolicy::default()
        }
    }

    async fn handle(&self, task: &Task) -> Result<(), TaskError> {
        let trace_id = task
            .payload
            .get("trace_id")
            .and_then(|v| v.as_str())
            .ok_or_else(|| TaskError::Failed(format!("{} payload missing trace_id", self.name())))?;

        match self.stage {
            SelfUpdateStage::Validate => self.pipeline.validate(trace_id).await,
            SelfUpdateStage::Test => self.pipeline.test(trace_id).await,
            SelfUpdateStage::Apply => self.pipeline.apply(trace_id, Default::default()).await.map(|_| ()),
        }
        .map_err(|e| TaskError::Failed(e.to_string()))
    }
}
