//! Post-restart readiness watchdog (the `verify` stage of §4.9).

use crate::config::SelfUpdateConfig;
use std::time::Instant;

/// The readiness endpoint never reported enough consecutive healthy
/// checks before the configured timeout elapsed.
#[derive(Debug, thiserror::Error)]
#[error("readiness watchdog timed out after {elapsed_secs}s ({consecutive_healthy} consecutive healthy checks observed)")]
pub struct ReadinessTimeout {
    /// Seconds actually spent polling before giving up.
    pub elapsed_secs: u64,
    /// The best consecutive-healthy streak observed.
    pub consecutive_healthy: u32,
}

/// Polls `cfg.readiness_url` every `cfg.readiness_poll_interval` until
/// `cfg.readiness_required_consecutive` consecutive 2xx responses are
/// observed, or `cfg.readiness_timeout` elapses.
pub async fn wait_for_healthy(cfg: &SelfUpdateConfig) -> Result<(), ReadinessTimeout> {
    let client = reqwest::Client::new();
    let deadline = Instant::now() + cfg.readiness_timeout;
    let mut consecutive = 0u32;
    let started = Instant::now();

    loop {
        let healthy = client
            .get(&cfg.readiness_url)
            .send()
            .await
            .map(|resp| resp.status().is_success())
            .unwrap_or(false);

        consecutive = if healthy { consecutive + 1 } else { 0 };
        if consecutive >= cfg.readiness_required_consecutive {
            return Ok(());
        }
        if Instant::now() >= deadline {
            return Err(ReadinessTimeout {
                elapsed_secs: started.elapsed().as_secs(),
                consecutive_healthy: consecutive,
            });
        }
        tokio::time::sleep(cfg.readiness_poll_interval).await;
    }
}
