//! Self-update patch record and its state machine (§3, §4.9).

use crate::id::TraceId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// A patch's position in the self-update state machine. Transitions are
/// constrained to the graph in spec §4.9; any other transition is a
/// `fatal.invariant` bug (invariant 6).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PatchState {
    /// Just ingested; evidence contract not yet checked.
    Proposed,
    /// Evidence contract satisfied, diff parses, dry-apply succeeded.
    Validated,
    /// Smoke suite ran under the configured test-gate mode.
    Tested,
    /// Approved (auto in dev profile, explicit in production).
    Approved,
    /// Committed to a branch and restart triggered.
    Applied,
    /// Readiness watchdog observed K consecutive healthy checks.
    Verified,
    /// Evidence contract or governance guardrail rejected the proposal.
    Rejected,
    /// Validate/test/apply-phase check failed.
    Failed,
    /// Verify-phase readiness check failed; reverted to known-good.
    RolledBack,
}

impl PatchState {
    /// Whether this state is terminal — no further transitions expected.
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            PatchState::Verified
                | PatchState::Rejected
                | PatchState::Failed
                | PatchState::RolledBack
        )
    }

    /// The states this state may transition to directly, per §4.9's graph.
    pub fn allowed_next(self) -> &'static [PatchState] {
        use PatchState::*;
        match self {
            Proposed => &[Validated, Rejected],
            Validated => &[Tested, Failed],
            Tested => &[Approved, Failed],
            Approved => &[Applied, Failed],
            Applied => &[Verified, RolledBack],
            Verified | Rejected | Failed | RolledBack => &[],
        }
    }

    /// Whether `self -> next` is a legal edge in the state machine.
    pub fn can_transition_to(self, next: PatchState) -> bool {
        self.allowed_next().contains(&next)
    }
}

/// Typed failure codes surfaced on terminal `rejected`/`failed` states.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PatchFailureCode {
    /// One or more evidence-contract fields were missing or empty.
    EvidenceMissing,
    /// The patch touches a governance-immutable identity key.
    GovernanceIdentityEdits,
    /// The diff did not parse as a unified diff.
    PatchParse,
    /// A touched path resolved outside the repository root or allowlist.
    PathDenied,
    /// Dry-apply to the temp worktree failed.
    ApplyConflict,
    /// Deterministic replay produced different touched-file hashes.
    ReplayMismatch,
    /// The smoke suite failed under enforce mode.
    TestFailure,
    /// An apply-phase guardrail (file count, risk score, daily caps) tripped.
    GuardrailTripped,
    /// The readiness watchdog never reported K consecutive healthy checks.
    ReadinessTimeout,
}

/// The mandatory evidence packet enforced at `proposed` ingestion.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EvidencePacket {
    /// Files touched by the patch.
    pub file_refs: Vec<String>,
    /// Specific line ranges touched, keyed by file.
    pub line_refs: BTreeMap<String, Vec<(u32, u32)>>,
    /// Governance rules proven satisfied (free-form identifiers).
    pub policy_refs: Vec<String>,
    /// Invariant names verified against this patch.
    pub invariant_checks: Vec<String>,
}

impl EvidencePacket {
    /// The evidence contract requires every field to be non-empty.
    pub fn satisfies_contract(&self) -> bool {
        !self.file_refs.is_empty()
            && !self.line_refs.is_empty()
            && !self.policy_refs.is_empty()
            && !self.invariant_checks.is_empty()
    }
}

/// A single patch proposal tracked through the self-update pipeline.
/// Keyed by `trace_id` — the same trace that will cover every event the
/// patch's processing emits.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PatchRecord {
    /// Primary key: the trace covering this patch's lifecycle.
    pub trace_id: TraceId,
    /// Current state machine position.
    pub state: PatchState,
    /// Opaque code version identifier captured at propose time.
    pub baseline_ref: String,
    /// The evidence packet submitted with the proposal.
    pub evidence: EvidencePacket,
    /// Schema version of the evidence/artifact format, for forward compat.
    pub artifact_schema_version: u32,
    /// Timestamps recorded per state transition, in order.
    pub transitions: Vec<(PatchState, DateTime<Utc>)>,
    /// Typed failure code, set only once a terminal failure state is reached.
    pub failure_code: Option<PatchFailureCode>,
    /// The unified diff itself.
    pub diff: String,
}

impl PatchRecord {
    /// Create a freshly proposed patch record.
    pub fn propose(trace_id: TraceId, baseline_ref: String, evidence: EvidencePacket, diff: String) -> Self {
        Self {
            trace_id,
            state: PatchState::Proposed,
            baseline_ref,
            evidence,
            artifact_schema_version: 1,
            transitions: vec![(PatchState::Proposed, Utc::now())],
            failure_code: None,
            diff,
        }
    }

    /// Attempt to move to `next`. Fails if the edge isn't in the allowed
    /// graph — callers should treat that as `fatal.invariant`.
    pub fn transition(&mut self, next: PatchState) -> Result<(), InvalidTransition> {
        if !self.state.can_transition_to(next) {
            return Err(InvalidTransition {
                from: self.state,
                to: next,
            });
        }
        self.state = next;
        self.transitions.push((next, Utc::now()));
        Ok(())
    }
}

/// Raised when code attempts an illegal patch-state transition.
#[derive(Debug, Clone, thiserror::Error)]
#[error("illegal patch transition {from:?} -> {to:?}")]
pub struct InvalidTransition {
    /// The state the patch was in.
    pub from: PatchState,
    /// The state the transition attempted to reach.
    pub to: PatchState,
}
