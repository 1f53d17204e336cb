#![deny(missing_docs)]
//! Deny-by-default policy engine.
//!
//! [`decide`] is the single entry point: a pure, synchronous function from
//! a [`PolicyContext`] snapshot to a [`PolicyDecision`]. It holds no state
//! and performs no I/O — callers (the tool runtime) are responsible for
//! gathering the context, invoking `decide`, and emitting the resulting
//! `policy.decision` event.
//!
//! Rules are evaluated top to bottom; the first rule that matches decides
//! the outcome. Absence of an explicit permit denies by default (R3).

pub mod catalog;

use warden_domain::{AgentGovernance, RiskTier, SystemState, ToolPermission, WILDCARD_TOOL};

pub use catalog::{ToolCatalog, ToolRegistration, SAFE_TOOLS};

/// The rule that produced a [`PolicyDecision`], for audit events.
#[non_exhaustive]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchedRule {
    /// R1: system is in lockdown and the tool is not in [`SAFE_TOOLS`].
    Lockdown,
    /// R2: system is restarting.
    Restarting,
    /// R3: no explicit or wildcard permission row for this principal/tool.
    NotPermitted,
    /// R3: an explicit or wildcard permission row allowed the call to proceed.
    Permitted,
    /// R4: the tool name is not registered in the catalog.
    UnknownTool,
    /// R5: a session-scoped tool was called by a non-primary agent.
    AgentScope,
    /// R6: the tool's minimum risk tier exceeds the agent's risk tier.
    RiskTier,
    /// R7: a path argument resolved outside the agent's allowed prefixes.
    PathDenied,
    /// R8: the trace has already reached its action cap.
    MaxActionsPerStep,
}

impl MatchedRule {
    /// The stable reason code recorded on a [`PolicyDecision::Deny`] and
    /// carried in the `policy.decision` event payload.
    pub fn reason_code(self) -> &'static str {
        match self {
            MatchedRule::Lockdown => "lockdown",
            MatchedRule::Restarting => "restarting",
            MatchedRule::NotPermitted => "not_permitted",
            MatchedRule::Permitted => "permitted",
            MatchedRule::UnknownTool => "unknown_tool",
            MatchedRule::AgentScope => "agent_scope",
            MatchedRule::RiskTier => "governance.risk_tier",
            MatchedRule::PathDenied => "path_denied",
            MatchedRule::MaxActionsPerStep => "max_actions_per_step",
        }
    }
}

/// The outcome of a policy decision.
#[non_exhaustive]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PolicyDecision {
    /// The call may proceed.
    Allow {
        /// The rule that allowed it (always [`MatchedRule::Permitted`]).
        rule: MatchedRule,
    },
    /// The call is denied.
    Deny {
        /// The rule that denied it.
        rule: MatchedRule,
    },
}

impl PolicyDecision {
    /// Whether this decision allows the call to proceed.
    pub fn is_allow(&self) -> bool {
        matches!(self, PolicyDecision::Allow { .. })
    }

    /// The reason code to attach to the `policy.decision` event and,
    /// on denial, to the caller-visible error.
    pub fn reason_code(&self) -> &'static str {
        match self {
            PolicyDecision::Allow { rule } | PolicyDecision::Deny { rule } => rule.reason_code(),
        }
    }
}

/// Everything a single policy decision is computed from. Built fresh by
/// the caller for every `execute()` invocation; `decide` never mutates or
/// retains it.
#[derive(Debug, Clone)]
pub struct PolicyContext<'a> {
    /// The agent or user id attempting the call.
    pub principal_id: &'a str,
    /// The tool being called.
    pub tool_name: &'a str,
    /// Resolved absolute paths extracted from the tool's path-bearing
    /// arguments (per [`ToolRegistration::path_arg_pointers`]), already
    /// canonicalized by the caller. Empty if the tool takes no path
    /// arguments or none were present in this invocation.
    pub resolved_arg_paths: &'a [String],
    /// Whether `principal_id` is the thread's designated primary agent
    /// (R5).
    pub is_primary_agent: bool,
    /// Current system-state snapshot.
    pub system_state: &'a SystemState,
    /// The calling agent's governance fields.
    pub governance: &'a AgentGovernance,
    /// Explicit permission rows for this principal. `decide` looks for an
    /// exact `(principal_id, tool_name)` match or a `(principal_id, "*")`
    /// wildcard; absence of both denies (R3).
    pub permissions: &'a [ToolPermission],
    /// The tool catalog (R4, R5, R6, R7).
    pub catalog: &'a ToolCatalog,
    /// Count of `tool.call.start` events already observed for this
    /// trace_id, prior to this call (R8).
    pub actions_so_far_this_trace: u32,
}

fn has_permission(permissions: &[ToolPermission], principal_id: &str, tool_name: &str) -> bool {
    permissions
        .iter()
        .any(|p| p.principal_id == principal_id && (p.tool_name == tool_name || p.tool_name == WILDCARD_TOOL))
}

fn path_allowed(allowed_paths: &[String], path: &str) -> bool {
    allowed_paths.iter().any(|prefix| path.starts_with(prefix.as_str()))
}

/// Evaluate R1 through R8, in order, against `ctx`. Returns the decision
/// from the first rule that matches. Pure and synchronous: does not
/// emit the `policy.decision` event itself, that is the caller's job.
pub fn decide(ctx: &PolicyContext<'_>) -> PolicyDecision {
    // R1: lockdown.
    if ctx.system_state.lockdown && !SAFE_TOOLS.contains(&ctx.tool_name) {
        return PolicyDecision::Deny {
            rule: MatchedRule::Lockdown,
        };
    }

    // R2: restarting.
    if ctx.system_state.restarting {
        return PolicyDecision::Deny {
            rule: MatchedRule::Restarting,
        };
    }

    // R3: wildcard/explicit permit. Deny-by-default if absent.
    if !has_permission(ctx.permissions, ctx.principal_id, ctx.tool_name) {
        return PolicyDecision::Deny {
            rule: MatchedRule::NotPermitted,
        };
    }

    // R4: unknown tool.
    let Some(registration) = ctx.catalog.get(ctx.tool_name) else {
        return PolicyDecision::Deny {
            rule: MatchedRule::UnknownTool,
        };
    };

    // R5: session-scoped tools restricted to the primary agent.
    if registration.session_scoped && !ctx.is_primary_agent {
        return PolicyDecision::Deny {
            rule: MatchedRule::AgentScope,
        };
    }

    // R6: risk tier.
    if registration.min_risk_tier > ctx.governance.risk_tier {
        return PolicyDecision::Deny {
            rule: MatchedRule::RiskTier,
        };
    }

    // R7: path allowlist.
    if !registration.path_arg_pointers.is_empty()
        && !ctx
            .resolved_arg_paths
            .iter()
            .all(|path| path_allowed(&ctx.governance.allowed_paths, path))
    {
        return PolicyDecision::Deny {
            rule: MatchedRule::PathDenied,
        };
    }

    // R8: action cap.
    if ctx.actions_so_far_this_trace >= ctx.governance.max_actions_per_step {
        return PolicyDecision::Deny {
            rule: MatchedRule::MaxActionsPerStep,
        };
    }

    PolicyDecision::Allow {
        rule: MatchedRule::Permitted,
    }
}

/// Convenience builder for tests and callers that want to start from a
/// nominal, fully-permitted context and override one field at a time.
#[derive(Debug, Clone, Default)]
pub struct PolicyContextOwned {
    /// See [`PolicyContext::principal_id`].
    pub principal_id: String,
    /// See [`PolicyContext::tool_name`].
    pub tool_name: String,
    /// See [`PolicyContext::resolved_arg_paths`].
    pub resolved_arg_paths: Vec<String>,
    /// See [`PolicyContext::is_primary_agent`].
    pub is_primary_agent: bool,
    /// See [`PolicyContext::system_state`].
    pub system_state: SystemState,
    /// See [`PolicyContext::governance`].
    pub governance: AgentGovernance,
    /// See [`PolicyContext::permissions`].
    pub permissions: Vec<ToolPermission>,
    /// See [`PolicyContext::catalog`].
    pub catalog: ToolCatalog,
    /// See [`PolicyContext::actions_so_far_this_trace`].
    pub actions_so_far_this_trace: u32,
}

impl PolicyContextOwned {
    /// Borrow this owned context as a [`PolicyContext`] for `decide`.
    pub fn as_context(&self) -> PolicyContext<'_> {
        PolicyContext {
            principal_id: &self.principal_id,
            tool_name: &self.tool_name,
            resolved_arg_paths: &self.resolved_arg_paths,
            is_primary_agent: self.is_primary_agent,
            system_state: &self.system_state,
            governance: &self.governance,
            permissions: &self.permissions,
            catalog: &self.catalog,
            actions_so_far_this_trace: self.actions_so_far_this_trace,
        }
    }
}

/// Build a nominal context: no lockdown, not restarting, wildcard
/// permission, a single registered tool `"noop"` at `Low` risk tier,
/// generous action cap. Tests override fields from here.
#[cfg(any(test, feature = "test-utils"))]
pub fn nominal_context(principal_id: &str, tool_name: &str) -> PolicyContextOwned {
    PolicyContextOwned {
        principal_id: principal_id.to_string(),
        tool_name: tool_name.to_string(),
        resolved_arg_paths: Vec::new(),
        is_primary_agent: true,
        system_state: SystemState::nominal(),
        governance: AgentGovernance {
            allowed_tools: std::collections::BTreeSet::new(),
            risk_tier: RiskTier::High,
            max_actions_per_step: 100,
            allowed_paths: Vec::new(),
            can_request_privileged_change: false,
        },
        permissions: vec![ToolPermission::wildcard(principal_id)],
        catalog: ToolCatalog::new(vec![ToolRegistration::simple(tool_name, RiskTier::Low)]),
        actions_so_far_this_trace: 0,
    }
}
