//! Schedule and schedule-dispatch entities (§3, §4.7).

use crate::id::{ScheduleId, ThreadId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A recurring (or `@every:<N>`) unit of scheduled work.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Schedule {
    /// Unique schedule id.
    pub id: ScheduleId,
    /// The cron expression: five-field standard or `@every:<seconds>`.
    pub cron_expr: String,
    /// Thread this schedule fires into. `None` schedules are skipped with
    /// a `schedule.error` event rather than crashing the tick.
    pub thread_id: Option<ThreadId>,
    /// Whether this schedule currently fires.
    pub enabled: bool,
    /// Maximum number of catch-up instants a single tick may dispatch
    /// for this schedule.
    pub per_schedule_catchup_cap: u32,
    /// The last due instant this schedule successfully dispatched.
    pub last_dispatched_at: Option<DateTime<Utc>>,
    /// Opaque scheduled payload forwarded to the enqueued `agent_step`.
    pub payload: serde_json::Value,
}

/// The uniqueness token `(schedule_id, due_at)` that makes scheduler
/// firing exactly-once per due instant (invariant 3). Insertion of this
/// row into the dispatch table IS the idempotency marker — see §5
/// locking discipline.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScheduleDispatch {
    /// The schedule that fired.
    pub schedule_id: ScheduleId,
    /// The due instant this dispatch corresponds to.
    pub due_at: DateTime<Utc>,
}
