//! Per-tick dispatch: load enabled schedules, compute due instants, and
//! claim each exactly once via `warden-store`'s dispatch uniqueness
//! insert (§4.7).

use crate::expr::CronExpr;
use chrono::{DateTime, Duration, Utc};
use std::sync::Arc;
use tracing::warn;
use warden_domain::{Schedule, ScheduleId};
use warden_store::{DispatchInsertOutcome, Store};
use warden_task::Runner;
use warden_trace::{event_types, ActorKind, EventLog, TraceContext};

/// Compute the due instants for a schedule strictly after `after` and at
/// or before `now`, capped at `cap` entries.
pub fn due_instants(expr: &CronExpr, after: DateTime<Utc>, now: DateTime<Utc>, cap: usize) -> Vec<DateTime<Utc>> {
    let mut result = Vec::new();
    let mut cursor = after;
    while result.len() < cap {
        match expr.next_after(cursor) {
            Some(due) if due <= now => {
                cursor = due;
                result.push(due);
            }
            _ => break,
        }
    }
    result
}

/// Drives one tick across every enabled schedule.
pub struct CronDriver {
    store: Arc<dyn Store>,
    runner: Arc<Runner>,
    event_log: Arc<dyn EventLog>,
    component: String,
    /// How far back to look for missed due instants when a schedule has
    /// never dispatched (or its watermark predates the window).
    pub catchup_window: Duration,
    /// Hard ceiling on catch-up instants dispatched for any one schedule
    /// in a single tick, regardless of the schedule's own cap.
    pub global_catchup_cap: usize,
}

impl CronDriver {
    /// Build a driver. `component` names this emitter in audit events
    /// (e.g. `"warden-cron"`).
    pub fn new(
        store: Arc<dyn Store>,
        runner: Arc<Runner>,
        event_log: Arc<dyn EventLog>,
        component: impl Into<String>,
    ) -> Self {
        Self {
            store,
            runner,
            event_log,
            component: component.into(),
            catchup_window: Duration::hours(1),
            global_catchup_cap: 10,
        }
    }

    /// Run one tick. Each schedule's failure is isolated — one bad
    /// schedule cannot prevent the others from running.
    pub async fn run_tick(&self) {
        let schedules = match self.store.list_enabled_schedules().await {
            Ok(s) => s,
            Err(e) => {
                warn!(error = %e, "failed to load enabled schedules; skipping tick");
                return;
            }
        };

        let now = Utc::now();
        for schedule in schedules {
            self.process_schedule(&schedule, now).await;
        }
    }

    async fn process_schedule(&self, schedule: &Schedule, now: DateTime<Utc>) {
        let Some(thread_id) = schedule.thread_id.clone() else {
            self.emit_schedule_error(&schedule.id, "schedule has no thread_id").await;
            return;
        };

        let expr = match CronExpr::parse(&schedule.cron_expr) {
            Ok(expr) => expr,
            Err(e) => {
                self.emit_schedule_error(&schedule.id, &format!("invalid cron expression: {e}")).await;
                return;
            }
        };

        let window_start = now - self.catchup_window;
        let earliest = schedule.last_dispatched_at.unwrap_or(window_start).max(window_start);
        let cap = (schedule.per_schedule_catchup_cap as usize).min(self.global_catchup_cap);
        let due = due_instants(&expr, earliest, now, cap);

        for due_at in due {
            match self.store.try_insert_dispatch(&schedule.id, due_at).await {
                Ok(DispatchInsertOutcome::Inserted) => {
                    self.emit_trigger(schedule, due_at).await;
                    self.dispatch_agent_step(schedule, &thread_id, due_at).await;
                    if let Err(e) = self.store.set_last_dispatched_at(&schedule.id, due_at).await {
                        warn!(schedule_id = %schedule.id, error = %e, "failed to advance last_dispatched_at");
                    }
                }
                Ok(DispatchInsertOutcome::AlreadyDispatched) => {
                    // Another actor or a prior tick already handled this instant.
                    continue;
                }
                Err(e) => {
                    warn!(schedule_id = %schedule.id, error = %e, "failed to claim dispatch instant");
                }
            }
        }
    }

    async fn dispatch_agent_step(
        &self,
        schedule: &Schedule,
        thread_id: &warden_domain::ThreadId,
        due_at: DateTime<Utc>,
    ) {
        let ctx = TraceContext::root();
        let payload = serde_json::json!({
            "schedule_id": schedule.id.as_str(),
            "due_at": due_at.to_rfc3339(),
            "payload": schedule.payload,
        });
        if let Err(e) = self
            .runner
            .enqueue("agent_default", "agent_step", payload, &ctx, Some(thread_id.clone()))
            .await
        {
            warn!(schedule_id = %schedule.id, error = %e, "failed to enqueue agent_step for schedule");
        }
    }

    async fn emit_trigger(&self, schedule: &Schedule, due_at: DateTime<Utc>) {
        let ctx = TraceContext::root();
        let payload = serde_json::json!({
            "schedule_id": schedule.id.as_str(),
            "due_at": due_at.to_rfc3339(),
        });
        if let Err(e) = self
            .event_log
            .emit(
                &ctx,
                event_types::SCHEDULE_TRIGGER,
                &self.component,
                ActorKind::System,
                "cron-driver",
                schedule.thread_id.clone(),
                payload,
            )
            .await
        {
            warn!(error = %e, "failed to emit schedule.trigger");
        }
    }

    async fn emit_schedule_error(&self, schedule_id: &ScheduleId, message: &str) {
        let ctx = TraceContext::root();
        let payload = serde_json::json!({
            "schedule_id": schedule_id.as_str(),
            "message": message,
        });
        if let Err(e) = self
            .event_log
            .emit(
                &ctx,
                event_types::SCHEDULE_ERROR,
                &self.component,
                ActorKind::System,
                "cron-driver",
                None,
                payload,
            )
            .await
        {
            warn!(error = %e, "failed to emit schedule.error");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use warden_domain::UserId;
    use warden_store::InMemoryStore;
    use warden_task::{Runner, RunnerConfig};
    use warden_trace::InMemoryEventLog;

    fn minimal_schedule(thread_id: Option<warden_domain::ThreadId>) -> Schedule {
        Schedule {
            id: ScheduleId::generate(),
            cron_expr: "@every:60".to_string(),
            thread_id,
            enabled: true,
            per_schedule_catchup_cap: 5,
            last_dispatched_at: None,
            payload: serde_json::json!({}),
        }
    }

    #[tokio::test]
    async fn schedule_without_thread_emits_error() {
        let store: Arc<dyn Store> = Arc::new(InMemoryStore::new());
        let log = Arc::new(InMemoryEventLog::new(false));
        let runner = Runner::new(RunnerConfig::default(), Arc::clone(&log) as Arc<dyn EventLog>, "cron");
        let driver = CronDriver::new(Arc::clone(&store), runner, Arc::clone(&log) as Arc<dyn EventLog>, "cron");

        let schedule = minimal_schedule(None);
        store.upsert_schedule(schedule.clone()).await.unwrap();
        driver.run_tick().await;

        let events = log
            .search(
                &warden_trace::EventFilter {
                    event_type_prefix: Some(event_types::SCHEDULE_ERROR.to_string()),
                    ..Default::default()
                },
                &warden_trace::EventBounds::default(),
            )
            .await
            .unwrap();
        assert_eq!(events.len(), 1);
    }

    #[tokio::test]
    async fn due_schedule_dispatches_agent_step() {
        let store: Arc<dyn Store> = Arc::new(InMemoryStore::new());
        let log = Arc::new(InMemoryEventLog::new(false));
        let runner = Runner::new(RunnerConfig::default(), Arc::clone(&log) as Arc<dyn EventLog>, "cron");

        let thread = warden_domain::Thread::new(UserId::generate(), warden_domain::ChannelType::Cli);
        store.insert_thread(thread.clone()).await.unwrap();

        let mut schedule = minimal_schedule(Some(thread.id.clone()));
        schedule.last_dispatched_at = Some(Utc::now() - Duration::seconds(120));
        store.upsert_schedule(schedule.clone()).await.unwrap();

        let driver = CronDriver::new(Arc::clone(&store), Arc::clone(&runner), Arc::clone(&log) as Arc<dyn EventLog>, "cron");
        driver.run_tick().await;
        driver.run_tick().await;

        let triggers = log
            .search(
                &warden_trace::EventFilter {
                    event_type_prefix: Some(event_types::SCHEDULE_TRIGGER.to_string()),
                    ..Default::default()
                },
                &warden_trace::EventBounds::default(),
            )
            .await
            .unwrap();
        assert!(!triggers.is_empty());
    }
}
