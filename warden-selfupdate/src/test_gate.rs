//! The `test` stage: runs the configured smoke suite in a scratch
//! worktree under warn or enforce mode (§4.9).

use crate::config::SelfUpdateConfig;
use std::path::Path;
use tokio::process::Command;
use warden_domain::PatchFailureCode;

/// Whether a failing smoke suite blocks `apply`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TestGateMode {
    /// Failures are recorded but do not block apply.
    Warn,
    /// Failures transition the patch to `failed(test_failure)`.
    Enforce,
}

/// Result of running the configured smoke suite once.
pub struct SmokeResult {
    /// Whether the suite exited successfully.
    pub passed: bool,
    /// Combined stdout/stderr, truncated for the evidence log.
    pub output: String,
}

/// Runs `cfg.smoke_suite_command` inside `worktree`.
pub async fn run_smoke_suite(cfg: &SelfUpdateConfig, worktree: &Path) -> SmokeResult {
    let Some((program, rest)) = cfg.smoke_suite_command.split_first() else {
        return SmokeResult {
            passed: true,
            output: "no smoke suite configured".to_string(),
        };
    };
    match Command::new(program).args(rest).current_dir(worktree).output().await {
        Ok(output) => {
            let mut combined = String::from_utf8_lossy(&output.stdout).into_owned();
            combined.push_str(&String::from_utf8_lossy(&output.stderr));
            SmokeResult {
                passed: output.status.success(),
                output: combined,
            }
        }
        Err(e) => SmokeResult {
            passed: false,
            output: format!("failed to spawn smoke suite: {e}"),
        },
    }
}

/// Applies the test-gate mode to a smoke result. `Ok(())` means the
/// pipeline may proceed to `approved`; `Err` carries the typed failure
/// code for a `failed` transition.
pub fn gate(mode: TestGateMode, result: &SmokeResult) -> Result<(), PatchFailureCode> {
    if result.passed || mode == TestGateMode::Warn {
        Ok(())
    } else {
        Err(PatchFailureCode::TestFailure)
    }
}
