//! Governance and apply-phase guardrails (§4.9).

use crate::config::SelfUpdateConfig;
use warden_domain::{AgentGovernance, PatchFailureCode};

/// Whether `diff` touches a configured identity path and modifies one of
/// `AgentGovernance::IMMUTABLE_KEYS`. A conservative textual scan: any
/// added or removed line under an identity-prefixed file that starts with
/// one of the immutable keys (as a YAML-style `key:` mapping) trips the
/// guardrail, regardless of the value on either side.
pub fn touches_governance_identity(diff: &str, cfg: &SelfUpdateConfig) -> bool {
    let mut in_identity_file = false;
    for line in diff.lines() {
        if let Some(path) = file_header_path(line) {
            in_identity_file = cfg
                .identity_path_prefixes
                .iter()
                .any(|prefix| path.starts_with(prefix.as_str()));
            continue;
        }
        if !in_identity_file {
            continue;
        }
        let Some(body) = line.strip_prefix('+').or_else(|| line.strip_prefix('-')) else {
            continue;
        };
        // Exclude the `+++`/`---` file header lines themselves.
        if body.starts_with('+') || body.starts_with('-') {
            continue;
        }
        let trimmed = body.trim_start();
        if AgentGovernance::IMMUTABLE_KEYS
            .iter()
            .any(|key| trimmed.starts_with(&format!("{key}:")))
        {
            return true;
        }
    }
    false
}

/// Extracts the `b/...` path from a `+++ b/path` diff header line.
fn file_header_path(line: &str) -> Option<&str> {
    let rest = line.strip_prefix("+++ ")?;
    let rest = rest.strip_prefix("b/").unwrap_or(rest);
    Some(rest.trim())
}

/// Counters the caller gathers from the store before invoking `apply`.
#[derive(Debug, Clone, Copy, Default)]
pub struct ApplyPhaseCounters {
    /// Distinct files this patch touches.
    pub touched_files: usize,
    /// The patch's declared or computed risk score, 0.0-1.0.
    pub risk_score: f64,
    /// Apply attempts already made today, across all patches.
    pub attempts_today: u32,
    /// Branches already created (applied) today, across all patches.
    pub prs_today: u32,
}

/// Checks the bounded apply-phase guardrail set. Returns the first
/// guardrail that trips, if any.
pub fn check_apply_guardrails(
    cfg: &SelfUpdateConfig,
    counters: ApplyPhaseCounters,
) -> Option<PatchFailureCode> {
    if counters.touched_files > cfg.max_files_per_patch {
        return Some(PatchFailureCode::GuardrailTripped);
    }
    if counters.risk_score > cfg.max_risk_score {
        return Some(PatchFailureCode::GuardrailTripped);
    }
    if counters.attempts_today >= cfg.max_patch_attempts_per_day {
        return Some(PatchFailureCode::GuardrailTripped);
    }
    if counters.prs_today >= cfg.max_prs_per_day {
        return Some(PatchFailureCode::GuardrailTripped);
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cfg() -> SelfUpdateConfig {
        SelfUpdateConfig {
            identity_path_prefixes: vec!["agents/".to_string()],
            ..SelfUpdateConfig::default()
        }
    }

    #[test]
    fn identity_edit_to_non_immutable_key_is_allowed() {
        let diff = "--- a/agents/triage.md\n+++ b/agents/triage.md\n@@ -1,2 +1,2 @@\n-persona: terse\n+persona: verbose\n";
        assert!(!touches_governance_identity(diff, &cfg()));
    }

    #[test]
    fn identity_edit_to_immutable_key_trips() {
        let diff = "--- a/agents/triage.md\n+++ b/agents/triage.md\n@@ -1,2 +1,2 @@\n-risk_tier: low\n+risk_tier: high\n";
        assert!(touches_governance_identity(diff, &cfg()));
    }

    #[test]
    fn edit_outside_identity_path_is_ignored() {
        let diff = "--- a/src/lib.rs\n+++ b/src/lib.rs\n@@ -1,2 +1,2 @@\n-risk_tier: low\n+risk_tier: high\n";
        assert!(!touches_governance_identity(diff, &cfg()));
    }

    #[test]
    fn guardrail_trips_on_file_count() {
        let code = check_apply_guardrails(
            &SelfUpdateConfig::default(),
            ApplyPhaseCounters {
                touched_files: 999,
                ..Default::default()
            },
        );
        assert_eq!(code, Some(PatchFailureCode::GuardrailTripped));
    }

    #[test]
    fn guardrail_allows_within_bounds() {
        let code = check_apply_guardrails(
            &SelfUpdateConfig::default(),
            ApplyPhaseCounters {
                touched_files: 2,
                risk_score: 0.1,
                attempts_today: 1,
                prs_today: 1,
            },
        );
        assert_eq!(code, None);
    }
}
