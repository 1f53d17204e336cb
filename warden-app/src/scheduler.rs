//! Wraps `warden-cron`'s [`CronDriver`] as a `warden-task::TaskHandler`
//! so it can ride the same periodic-dispatch supervisor as every other
//! fixed-interval entry, instead of owning its own tick loop.

use std::sync::Arc;

use async_trait::async_trait;
use warden_cron::CronDriver;
use warden_task::{Task, TaskError, TaskHandler};

/// Runs one `CronDriver::run_tick` per dispatch. Carries no
/// `serialization_key`: overlapping ticks are harmless since
/// `try_insert_dispatch` is the actual uniqueness guard.
pub struct SchedulerTickHandler {
    driver: Arc<CronDriver>,
}

impl SchedulerTickHandler {
    /// Build the handler over a driver.
    pub fn new(driver: Arc<CronDriver>) -> Self {
        Self { driver }
    }
}

#[async_trait]
impl TaskHandler for SchedulerTickHandler {
    fn name(&self) -> &str {
        "scheduler_tick"
    }

    async fn handle(&self, _task: &Task) -> Result<(), TaskError> {
        self.driver.run_tick().await;
        Ok(())
    }
}
