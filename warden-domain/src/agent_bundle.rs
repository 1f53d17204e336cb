//! Agent bundle: identity/persona/heartbeat plus governance metadata (§3).

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// The risk tier an agent is trusted to operate at. Tools declare a
/// minimum tier; R6 denies a call when the tool's tier exceeds the
/// agent's.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RiskTier {
    /// Read-only, low-blast-radius operations.
    Low,
    /// State-mutating operations scoped to the agent's own thread/data.
    Medium,
    /// Host-level or cross-thread operations.
    High,
}

/// Governance fields parsed from an agent's identity frontmatter.
/// Immutable by the agent itself — see the self-update governance
/// guardrail in `warden-selfupdate`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentGovernance {
    /// Tool names this agent may invoke (before the permission table is
    /// even consulted — R3 still applies on top of this).
    pub allowed_tools: BTreeSet<String>,
    /// The agent's declared risk tier.
    pub risk_tier: RiskTier,
    /// Hard cap on `tool.call.start` events per orchestrator step (R8).
    pub max_actions_per_step: u32,
    /// Path prefixes this agent's filesystem-touching tools may resolve
    /// arguments under (R7).
    pub allowed_paths: Vec<String>,
    /// Whether this agent may originate a self-update proposal.
    pub can_request_privileged_change: bool,
}

impl AgentGovernance {
    /// The set of identity-frontmatter keys that the self-update
    /// governance guardrail refuses to let a patch modify.
    pub const IMMUTABLE_KEYS: &'static [&'static str] = &[
        "allowed_tools",
        "risk_tier",
        "max_actions_per_step",
        "allowed_paths",
        "can_request_privileged_change",
    ];
}

/// The three textual artifacts plus governance metadata that make up an
/// agent bundle.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentBundle {
    /// Stable agent id (matches `layer0::AgentId`'s inner string).
    pub agent_id: String,
    /// Identity document (name, role, governance frontmatter source).
    pub identity: String,
    /// Persona document (voice, tone, behavioral guidance).
    pub persona: String,
    /// Heartbeat document (current status, last-known state).
    pub heartbeat: String,
    /// Parsed governance fields.
    pub governance: AgentGovernance,
    /// Whether this agent is the thread's designated primary —
    /// session-management tools are scoped to the primary only (R5).
    pub is_primary: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn risk_tier_orders_low_below_high() {
        assert!(RiskTier::Low < RiskTier::Medium);
        assert!(RiskTier::Medium < RiskTier::High);
    }
}
