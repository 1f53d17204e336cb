//! Runtime configuration for the self-update pipeline.

use crate::test_gate::TestGateMode;
use std::path::PathBuf;
use std::time::Duration;

/// Who may approve a `tested` patch for `apply`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApprovalProfile {
    /// Auto-approves once prior states are terminal-good.
    Development,
    /// Requires an explicit, persisted admin approval record.
    Production,
}

/// Everything the pipeline needs that is not carried on the patch itself.
#[derive(Debug, Clone)]
pub struct SelfUpdateConfig {
    /// Working copy the patch is validated and applied against.
    pub repo_root: PathBuf,
    /// Path prefixes (relative to `repo_root`) a patch is allowed to touch.
    pub path_allowlist: Vec<String>,
    /// Identity-file path prefixes the governance guardrail scans.
    pub identity_path_prefixes: Vec<String>,
    /// warn: failures do not block apply. enforce: they do.
    pub test_gate_mode: TestGateMode,
    /// Argv of the smoke suite (lint + typecheck + focused tests + migration
    /// dry-run), run from the temp worktree.
    pub smoke_suite_command: Vec<String>,
    /// Argv used to trigger a process restart after `apply`.
    pub restart_command: Vec<String>,
    /// Name of the `git` binary to shell out to.
    pub git_binary: String,
    /// Maximum distinct files one patch may touch.
    pub max_files_per_patch: usize,
    /// Maximum declared risk score (0.0-1.0) one patch may carry.
    pub max_risk_score: f64,
    /// Maximum `apply` attempts per rolling day across all patches.
    pub max_patch_attempts_per_day: u32,
    /// Maximum applied branches per rolling day.
    pub max_prs_per_day: u32,
    /// Dev auto-approves; prod requires an explicit approval record.
    pub approval_profile: ApprovalProfile,
    /// Readiness endpoint polled after restart.
    pub readiness_url: String,
    /// Consecutive healthy polls required before `verified`.
    pub readiness_required_consecutive: u32,
    /// Delay between readiness polls.
    pub readiness_poll_interval: Duration,
    /// Ceiling on total time spent polling readiness before `rolled_back`.
    pub readiness_timeout: Duration,
    /// Rolling window rollbacks are counted over for the lockdown trigger.
    pub rollback_window: Duration,
    /// Rollbacks within `rollback_window` that trigger automatic lockdown.
    pub rollback_lockdown_threshold: u32,
    /// Directory the per-trace `state.json`/`log.jsonl` mirror is written to.
    pub disk_root: PathBuf,
}

impl Default for SelfUpdateConfig {
    fn default() -> Self {
        Self {
            repo_root: PathBuf::from("."),
            path_allowlist: vec!["src/".to_string()],
            identity_path_prefixes: vec!["agents/".to_string()],
            test_gate_mode: TestGateMode::Enforce,
            smoke_suite_command: vec!["true".to_string()],
            restart_command: vec!["true".to_string()],
            git_binary: "git".to_string(),
            max_files_per_patch: 25,
            max_risk_score: 0.7,
            max_patch_attempts_per_day: 10,
            max_prs_per_day: 5,
            approval_profile: ApprovalProfile::Development,
            readiness_url: "http://127.0.0.1:8080/healthz".to_string(),
            readiness_required_consecutive: 3,
            readiness_poll_interval: Duration::from_secs(2),
            readiness_timeout: Duration::from_secs(120),
            rollback_window: Duration::from_secs(24 * 3600),
            rollback_lockdown_threshold: 2,
            disk_root: PathBuf::from("./selfupdate-state"),
        }
    }
}
