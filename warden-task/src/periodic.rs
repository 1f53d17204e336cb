//! Supervisor fiber that enqueues handlers on a fixed interval —
//! `scheduler_tick` (30s) and the fitness check (1800s) are both plain
//! entries here.

use crate::runner::Runner;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::warn;
use warden_trace::TraceContext;

/// One handler to dispatch on a fixed interval.
#[derive(Debug, Clone)]
pub struct PeriodicEntry {
    /// The lane to enqueue onto.
    pub lane: String,
    /// The handler name to invoke.
    pub handler_name: String,
    /// How often to enqueue this handler. Values below 60s are expected
    /// (e.g. the 30s scheduler tick) — the supervisor's own wake
    /// granularity, not this interval, is the floor.
    pub interval: Duration,
    /// Payload passed on every dispatch.
    pub payload: serde_json::Value,
}

/// Spawn the periodic-dispatch supervisor. Wakes at `granularity` (1s by
/// default is plenty for intervals specified in whole seconds) and
/// enqueues every entry whose interval has elapsed since its last fire.
pub fn spawn_supervisor(
    runner: Arc<Runner>,
    entries: Vec<PeriodicEntry>,
    granularity: Duration,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut last_fired: HashMap<usize, tokio::time::Instant> = HashMap::new();
        let mut ticker = tokio::time::interval(granularity);
        loop {
            ticker.tick().await;
            if runner.is_shutting_down() {
                break;
            }
            let now = tokio::time::Instant::now();
            for (idx, entry) in entries.iter().enumerate() {
                let due = last_fired
                    .get(&idx)
                    .map(|last| now.duration_since(*last) >= entry.interval)
                    .unwrap_or(true);
                if !due {
                    continue;
                }
                last_fired.insert(idx, now);
                let ctx = TraceContext::root();
                if let Err(e) = runner
                    .enqueue(
                        &entry.lane,
                        &entry.handler_name,
                        entry.payload.clone(),
                        &ctx,
                        None,
                    )
                    .await
                {
                    warn!(handler = %entry.handler_name, error = %e, "periodic dispatch failed to enqueue");
                }
            }
        }
    })
}
