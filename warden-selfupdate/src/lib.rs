#![deny(missing_docs)]
//! The self-update state machine: propose, validate, test, approve,
//! apply, verify (§4.9 SELF-UPDATE PIPELINE).
//!
//! [`Pipeline`] drives one [`warden_domain::PatchRecord`] through the
//! graph in [`warden_domain::PatchState::allowed_next`], writing the
//! disk mirror (`state.json`/`log.jsonl`, via [`disk`]) before the
//! corresponding `selfupdate.{state}` event is considered committed, as
//! the spec's crash-recovery contract requires. Each stage is exposed as
//! its own method so `warden-app` can wire them as four separate
//! `warden-task` handlers invoked in order, matching the spec's "four
//! tasks invoked in order" framing.

pub mod config;
pub mod disk;
pub mod git;
pub mod guardrails;
pub mod readiness;
pub mod test_gate;
pub mod validate;

pub use config::{ApprovalProfile, SelfUpdateConfig};
pub use guardrails::ApplyPhaseCounters;
pub use test_gate::TestGateMode;

use std::sync::Arc;

use chrono::Utc;
use thiserror::Error;
use uuid::Uuid;

use warden_domain::{EvidencePacket, PatchFailureCode, PatchRecord, PatchState, TraceId};
use warden_store::{Store, StoreError};
use warden_trace::{event_types, ActorKind, EventLog, EventLogError, TraceContext};

/// Errors raised while driving a patch through the pipeline. Distinct
/// from [`PatchFailureCode`]: this enum covers plumbing failures
/// (storage, event log, illegal caller sequencing); `PatchFailureCode`
/// is the typed reason recorded *on the patch* for a `rejected`/`failed`
/// terminal transition.
#[derive(Debug, Error)]
pub enum SelfUpdateError {
    /// No patch record exists for this trace_id.
    #[error("no patch record for trace {0}")]
    NotFound(String),
    /// The caller invoked a stage out of order (e.g. `test` before
    /// `validate` succeeded) — the patch is not in a state this stage
    /// can act on. A fatal bug per invariant 6; the event is still
    /// emitted so operators can see it, but callers should treat this as
    /// non-retryable.
    #[error("patch {trace_id} is in state {state:?}, not ready for this stage")]
    WrongState {
        /// The offending patch.
        trace_id: String,
        /// Its actual current state.
        state: PatchState,
    },
    /// Production profile requires an explicit approval record this call
    /// did not supply.
    #[error("production profile requires an explicit approval actor")]
    ApprovalRequired,
    /// The store failed.
    #[error(transparent)]
    Store(#[from] StoreError),
    /// The event log failed.
    #[error(transparent)]
    EventLog(#[from] EventLogError),
    /// The disk mirror failed.
    #[error(transparent)]
    Disk(#[from] disk::DiskError),
}

/// Drives the self-update state machine for one patch at a time.
pub struct Pipeline {
    store: Arc<dyn Store>,
    event_log: Arc<dyn EventLog>,
    cfg: SelfUpdateConfig,
    component: &'static str,
}

impl Pipeline {
    /// Build a pipeline from its dependencies and configuration.
    pub fn new(store: Arc<dyn Store>, event_log: Arc<dyn EventLog>, cfg: SelfUpdateConfig) -> Self {
        Self {
            store,
            event_log,
            cfg,
            component: "warden-selfupdate",
        }
    }

    async fn persist(&self, record: &PatchRecord) -> Result<(), SelfUpdateError> {
        // Disk mirror first — it is the crash-recovery source of truth —
        // then the in-process store, then (by the caller) the event.
        disk::write_state(&self.cfg.disk_root, record).await?;
        if let Some((state, at)) = record.transitions.last().copied() {
            disk::append_log(&self.cfg.disk_root, record.trace_id.as_str(), state, at).await?;
        }
        self.store.put_patch(record.clone()).await?;
        Ok(())
    }

    async fn emit(&self, trace_id: &TraceId, event_type: &str, payload: serde_json::Value) {
        let ctx = TraceContext::root_with_id(trace_id.clone());
        let _ = self
            .event_log
            .emit(&ctx, event_type, self.component, ActorKind::System, "selfupdate-pipeline", None, payload)
            .await;
    }

    async fn load(&self, trace_id: &str) -> Result<PatchRecord, SelfUpdateError> {
        self.store
            .get_patch(trace_id)
            .await?
            .ok_or_else(|| SelfUpdateError::NotFound(trace_id.to_string()))
    }

    /// Ingest a proposal. Enforces the evidence contract and the
    /// governance guardrail (§4.9) before the record is even considered
    /// `proposed` for the caller's purposes — a contract or guardrail
    /// failure mints the record directly in a terminal `rejected` state
    /// so no further stage can act on it.
    pub async fn propose(
        &self,
        trace_id: TraceId,
        baseline_ref: String,
        evidence: EvidencePacket,
        diff: String,
    ) -> Result<PatchRecord, SelfUpdateError> {
        let mut record = PatchRecord::propose(trace_id.clone(), baseline_ref, evidence, diff);

        if !record.evidence.satisfies_contract() {
            return self.reject(record, PatchFailureCode::EvidenceMissing).await;
        }
        if guardrails::touches_governance_identity(&record.diff, &self.cfg) {
            return self.reject(record, PatchFailureCode::GovernanceIdentityEdits).await;
        }

        self.persist(&record).await?;
        self.emit(
            &trace_id,
            event_types::SELFUPDATE_PROPOSED,
            serde_json::json!({"trace_id": trace_id.as_str()}),
        )
        .await;
        Ok(record)
    }

    async fn reject(&self, mut record: PatchRecord, code: PatchFailureCode) -> Result<PatchRecord, SelfUpdateError> {
        record.transition(PatchState::Rejected).expect("proposed -> rejected is always legal");
        record.failure_code = Some(code.clone());
        self.persist(&record).await?;
        self.emit(
            &record.trace_id,
            event_types::SELFUPDATE_REJECTED,
            serde_json::json!({"trace_id": record.trace_id.as_str(), "code": code}),
        )
        .await;
        Ok(record)
    }

    async fn fail(&self, mut record: PatchRecord, code: PatchFailureCode) -> Result<(), SelfUpdateError> {
        record.transition(PatchState::Failed).expect("pre-apply states always allow -> failed");
        record.failure_code = Some(code.clone());
        self.persist(&record).await?;
        self.emit(
            &record.trace_id,
            event_types::SELFUPDATE_FAILED,
            serde_json::json!({"trace_id": record.trace_id.as_str(), "code": code}),
        )
        .await;
        Ok(())
    }

    /// Validate stage: diff parses, paths allowlisted, dry-apply + replay.
    pub async fn validate(&self, trace_id: &str) -> Result<(), SelfUpdateError> {
        let record = self.load(trace_id).await?;
        if record.state != PatchState::Proposed {
            return Err(SelfUpdateError::WrongState {
                trace_id: trace_id.to_string(),
                state: record.state,
            });
        }

        let unique = Uuid::new_v4().to_string();
        match validate::validate_patch(&self.cfg, &record.baseline_ref, &record.diff, &unique).await {
            Ok(_outcome) => {
                let mut record = record;
                record.transition(PatchState::Validated).expect("proposed -> validated is legal");
                self.persist(&record).await?;
                self.emit(
                    &record.trace_id,
                    event_types::SELFUPDATE_VALIDATED,
                    serde_json::json!({"trace_id": trace_id}),
                )
                .await;
                Ok(())
            }
            Err(code) => self.fail(record, code).await,
        }
    }

    /// Test stage: run the configured smoke suite under the configured
    /// test-gate mode in a scratch worktree with the diff applied.
    pub async fn test(&self, trace_id: &str) -> Result<(), SelfUpdateError> {
        let record = self.load(trace_id).await?;
        if record.state != PatchState::Validated {
            return Err(SelfUpdateError::WrongState {
                trace_id: trace_id.to_string(),
                state: record.state,
            });
        }

        let unique = format!("test-{}", Uuid::new_v4());
        let worktree = match git::ScratchWorktree::checkout(&self.cfg, &record.baseline_ref, &unique).await {
            Ok(w) => w,
            Err(_) => return self.fail(record, PatchFailureCode::ApplyConflict).await,
        };
        if git::apply(&self.cfg, &worktree.path, &record.diff).await.is_err() {
            let _ = worktree.cleanup(&self.cfg).await;
            return self.fail(record, PatchFailureCode::ApplyConflict).await;
        }
        let result = test_gate::run_smoke_suite(&self.cfg, &worktree.path).await;
        let _ = worktree.cleanup(&self.cfg).await;

        match test_gate::gate(self.cfg.test_gate_mode, &result) {
            Ok(()) => {
                let mut record = record;
                record.transition(PatchState::Tested).expect("validated -> tested is legal");
                self.persist(&record).await?;
                self.emit(
                    &record.trace_id,
                    event_types::SELFUPDATE_TESTED,
                    serde_json::json!({"trace_id": trace_id, "smoke_passed": result.passed}),
                )
                .await;
                Ok(())
            }
            Err(code) => self.fail(record, code).await,
        }
    }

    /// Approval stage. `approver` must be `Some(actor_id)` under
    /// [`ApprovalProfile::Production`]; development auto-approves.
    pub async fn approve(&self, trace_id: &str, approver: Option<&str>) -> Result<(), SelfUpdateError> {
        let mut record = self.load(trace_id).await?;
        if record.state != PatchState::Tested {
            return Err(SelfUpdateError::WrongState {
                trace_id: trace_id.to_string(),
                state: record.state,
            });
        }
        if self.cfg.approval_profile == ApprovalProfile::Production && approver.is_none() {
            return Err(SelfUpdateError::ApprovalRequired);
        }

        record.transition(PatchState::Approved).expect("tested -> approved is legal");
        self.persist(&record).await?;
        self.emit(
            &record.trace_id,
            event_types::SELFUPDATE_APPROVED,
            serde_json::json!({"trace_id": trace_id, "approver": approver}),
        )
        .await;
        Ok(())
    }

    /// Apply stage: enforce the bounded guardrail set, commit the patch
    /// to a new `auto/<timestamp>` branch, and trigger a restart. Returns
    /// the branch name on success.
    pub async fn apply(&self, trace_id: &str, counters: ApplyPhaseCounters) -> Result<String, SelfUpdateError> {
        let record = self.load(trace_id).await?;
        if record.state != PatchState::Approved {
            return Err(SelfUpdateError::WrongState {
                trace_id: trace_id.to_string(),
                state: record.state,
            });
        }
        if let Some(code) = guardrails::check_apply_guardrails(&self.cfg, counters) {
            return self.fail(record, code).await.map(|_| String::new());
        }

        if git::apply(&self.cfg, &self.cfg.repo_root, &record.diff).await.is_err() {
            return self.fail(record, PatchFailureCode::ApplyConflict).await.map(|_| String::new());
        }

        let timestamp = Utc::now().format("%Y%m%dT%H%M%SZ").to_string();
        let branch = match git::create_branch_and_commit(&self.cfg, trace_id, &timestamp).await {
            Ok(b) => b,
            Err(_) => return self.fail(record, PatchFailureCode::ApplyConflict).await.map(|_| String::new()),
        };

        let mut record = record;
        record.transition(PatchState::Applied).expect("approved -> applied is legal");
        self.persist(&record).await?;
        self.emit(
            &record.trace_id,
            event_types::SELFUPDATE_APPLIED,
            serde_json::json!({"trace_id": trace_id, "branch": branch}),
        )
        .await;

        let _ = git::restart(&self.cfg).await;
        Ok(branch)
    }

    /// Verify stage: poll the readiness endpoint after restart. On
    /// success, transitions to `verified`. On timeout, reverts to
    /// `known_good_ref`, restarts again, transitions to `rolled_back`,
    /// and triggers system-wide lockdown if this is the second rollback
    /// within the configured window.
    pub async fn verify(&self, trace_id: &str, known_good_ref: &str) -> Result<(), SelfUpdateError> {
        let record = self.load(trace_id).await?;
        if record.state != PatchState::Applied {
            return Err(SelfUpdateError::WrongState {
                trace_id: trace_id.to_string(),
                state: record.state,
            });
        }

        if readiness::wait_for_healthy(&self.cfg).await.is_ok() {
            let mut record = record;
            record.transition(PatchState::Verified).expect("applied -> verified is legal");
            self.persist(&record).await?;
            self.emit(
                &record.trace_id,
                event_types::SELFUPDATE_VERIFIED,
                serde_json::json!({"trace_id": trace_id}),
            )
            .await;
            return Ok(());
        }

        let _ = git::revert_to(&self.cfg, known_good_ref).await;
        let _ = git::restart(&self.cfg).await;

        let mut record = record;
        record.transition(PatchState::RolledBack).expect("applied -> rolled_back is legal");
        record.failure_code = Some(PatchFailureCode::ReadinessTimeout);
        self.persist(&record).await?;
        self.emit(
            &record.trace_id,
            event_types::SELFUPDATE_ROLLED_BACK,
            serde_json::json!({"trace_id": trace_id, "known_good_ref": known_good_ref}),
        )
        .await;

        self.maybe_trigger_lockdown().await?;
        Ok(())
    }

    /// Counts rollbacks within `cfg.rollback_window` across every patch
    /// and, if the configured threshold is met or exceeded, flips
    /// `system_state.lockdown`.
    async fn maybe_trigger_lockdown(&self) -> Result<(), SelfUpdateError> {
        let cutoff = Utc::now() - self.cfg.rollback_window;
        let patches = self.store.list_patches().await?;
        let recent_rollbacks = patches
            .iter()
            .filter(|p| p.state == PatchState::RolledBack)
            .filter(|p| p.transitions.iter().any(|(s, at)| *s == PatchState::RolledBack && *at >= cutoff))
            .count() as u32;

        if recent_rollbacks < self.cfg.rollback_lockdown_threshold {
            return Ok(());
        }

        let state = self.store.get_system_state().await?;
        if state.lockdown {
            return Ok(());
        }
        let mut next = state.clone();
        next.trigger_lockdown(Uuid::new_v4().to_string(), chrono::Duration::hours(1));
        self.store.cas_system_state(state.version, next).await?;
        self.emit(
            &TraceId::generate(),
            event_types::SELFUPDATE_LOCKDOWN,
            serde_json::json!({"recent_rollbacks": recent_rollbacks}),
        )
        .await;
        self.emit(
            &TraceId::generate(),
            event_types::LOCKDOWN_TRIGGERED,
            serde_json::json!({"reason": "repeated_selfupdate_rollback", "recent_rollbacks": recent_rollbacks}),
        )
        .await;
        Ok(())
    }
}
