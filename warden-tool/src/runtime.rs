//! Policy-gated, audited tool execution.
//!
//! [`ToolRuntime`] wraps a [`ToolRegistry`] with the `execute()` pipeline:
//! open a span, consult [`warden_policy::decide`], validate the call's
//! arguments against the tool's declared schema, run the handler under a
//! timeout, and close the span with a classified status. Every step but
//! the handler call itself is synchronous and cheap; the handler is the
//! only place latency or failure can come from the outside world.

use crate::schema;
use crate::{ToolDyn, ToolError, ToolRegistry};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use warden_domain::{AgentGovernance, SystemState, ThreadId, ToolPermission};
use warden_policy::{decide, MatchedRule, PolicyContext, PolicyDecision, ToolCatalog};
use warden_trace::{event_types, ActorKind, EventLog, TraceContext};

/// How a tool is expected to behave, for operators reading the audit
/// trail rather than for policy decisions (those consult
/// [`warden_policy::ToolCatalog`] instead).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SideEffectClass {
    /// Never mutates state outside the call itself.
    ReadOnly,
    /// Mutates agent-owned state (memory, thread, schedule).
    Mutating,
    /// Reaches outside the process (network, filesystem, subprocess).
    External,
}

/// Execution-time facts about a registered tool: the handler plus
/// everything `execute()` needs that isn't a policy concern.
#[derive(Clone)]
pub struct ToolRegistration {
    /// The handler.
    pub tool: Arc<dyn ToolDyn>,
    /// Tool-declared timeout, capped by [`ToolRuntime`]'s runtime maximum.
    pub timeout: Duration,
    /// What kind of side effects this tool has.
    pub side_effect_class: SideEffectClass,
    /// Whether the full (untruncated) result should be persisted to a
    /// per-event file rather than only the truncated summary kept in the
    /// event payload. `ToolRuntime` records the intent; actual
    /// persistence is a concern of whatever `EventLog` is wired in.
    pub captures_output: bool,
}

impl ToolRegistration {
    /// Register a read-only tool with a default timeout.
    pub fn read_only(tool: Arc<dyn ToolDyn>) -> Self {
        Self {
            tool,
            timeout: Duration::from_secs(10),
            side_effect_class: SideEffectClass::ReadOnly,
            captures_output: false,
        }
    }

    /// Override the declared timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Mark the side-effect class.
    pub fn with_side_effect_class(mut self, class: SideEffectClass) -> Self {
        self.side_effect_class = class;
        self
    }

    /// Opt into full-output persistence.
    pub fn capture_output(mut self) -> Self {
        self.captures_output = true;
        self
    }
}

/// Everything one `execute()` call needs: the invocation itself plus the
/// policy snapshot to decide it against. Built fresh by the caller (the
/// orchestrator step) for every call; `ToolRuntime` does not retain it.
pub struct ExecuteRequest<'a> {
    /// Tool name.
    pub tool_name: &'a str,
    /// Tool arguments.
    pub args: Value,
    /// The agent or user id attempting the call.
    pub principal_id: &'a str,
    /// The trace/span this call happens within; `execute` opens a child
    /// span for the call itself.
    pub trace: &'a TraceContext,
    /// The thread this call concerns, if any.
    pub thread_id: Option<ThreadId>,
    /// Whether `principal_id` is the thread's primary agent (R5).
    pub is_primary_agent: bool,
    /// Current system-state snapshot.
    pub system_state: &'a SystemState,
    /// The calling agent's governance fields.
    pub governance: &'a AgentGovernance,
    /// Explicit permission rows for this principal.
    pub permissions: &'a [ToolPermission],
    /// Resolved absolute paths extracted from path-bearing arguments.
    pub resolved_arg_paths: Vec<String>,
    /// Count of `tool.call.start` events already observed for this trace
    /// (R8). The caller (not `ToolRuntime`) owns this count, typically
    /// by querying the event log.
    pub actions_so_far_this_trace: u32,
}

/// The classified outcome of one `execute()` call.
#[derive(Debug)]
pub enum ExecuteOutcome {
    /// The tool ran and returned a result.
    Ok {
        /// The tool's full, untruncated result.
        result: Value,
    },
    /// Denied by policy.
    Denied {
        /// The matched deny rule's reason code.
        reason_code: &'static str,
    },
    /// The arguments failed schema validation.
    InvalidArgs {
        /// Human-readable violation description.
        message: String,
    },
    /// The handler did not complete within its timeout.
    Timeout,
    /// The handler returned an error.
    Error {
        /// A short classification of the failure (matches the
        /// [`ToolError`] variant name).
        kind: &'static str,
        /// The error's message.
        message: String,
    },
}

const MAX_SUMMARY_BYTES: usize = 4096;

fn truncate_for_event(value: &Value) -> Value {
    let rendered = value.to_string();
    if rendered.len() <= MAX_SUMMARY_BYTES {
        return value.clone();
    }
    let mut truncated = rendered
        .char_indices()
        .take_while(|(i, _)| *i < MAX_SUMMARY_BYTES)
        .map(|(_, c)| c)
        .collect::<String>();
    truncated.push_str("...[truncated]");
    Value::String(truncated)
}

fn error_kind(err: &ToolError) -> &'static str {
    match err {
        ToolError::NotFound(_) => "not_found",
        ToolError::ExecutionFailed(_) => "execution_failed",
        ToolError::InvalidInput(_) => "invalid_input",
        ToolError::Other(_) => "other",
    }
}

/// Policy-gated, audited execution over a [`ToolRegistry`].
pub struct ToolRuntime {
    registrations: HashMap<String, ToolRegistration>,
    policy_catalog: ToolCatalog,
    event_log: Arc<dyn EventLog>,
    max_timeout: Duration,
    component: &'static str,
}

impl ToolRuntime {
    /// Build a runtime from a policy catalog (for `decide`), a matching
    /// set of execution-time registrations, and an event log to audit
    /// against. `max_timeout` is the hard runtime ceiling no tool's
    /// declared timeout may exceed.
    pub fn new(
        policy_catalog: ToolCatalog,
        registrations: HashMap<String, ToolRegistration>,
        event_log: Arc<dyn EventLog>,
        max_timeout: Duration,
    ) -> Self {
        Self {
            registrations,
            policy_catalog,
            event_log,
            max_timeout,
            component: "warden-tool",
        }
    }

    /// Build a runtime from a [`ToolRegistry`], wrapping every tool in a
    /// default (read-only, 10s) registration. Callers that need custom
    /// timeouts or side-effect classes should use [`ToolRuntime::new`]
    /// directly instead.
    pub fn from_registry(
        policy_catalog: ToolCatalog,
        registry: &ToolRegistry,
        event_log: Arc<dyn EventLog>,
        max_timeout: Duration,
    ) -> Self {
        let registrations = registry
            .iter()
            .map(|tool| {
                (
                    tool.name().to_string(),
                    ToolRegistration::read_only(Arc::clone(tool)),
                )
            })
            .collect();
        Self::new(policy_catalog, registrations, event_log, max_timeout)
    }

    /// Run one tool invocation through the full policy-gated, audited
    /// pipeline.
    pub async fn execute(&self, req: ExecuteRequest<'_>) -> ExecuteOutcome {
        let span = req.trace.child();

        self.event_log
            .emit(
                &span,
                event_types::TOOL_CALL_START,
                self.component,
                ActorKind::Agent,
                req.principal_id,
                req.thread_id.clone(),
                serde_json::json!({"tool": req.tool_name, "args": req.args}),
            )
            .await
            .ok();

        let policy_ctx = PolicyContext {
            principal_id: req.principal_id,
            tool_name: req.tool_name,
            resolved_arg_paths: &req.resolved_arg_paths,
            is_primary_agent: req.is_primary_agent,
            system_state: req.system_state,
            governance: req.governance,
            permissions: req.permissions,
            catalog: &self.policy_catalog,
            actions_so_far_this_trace: req.actions_so_far_this_trace,
        };
        let decision = decide(&policy_ctx);

        if let PolicyDecision::Deny { rule } = decision {
            self.end(
                &span,
                req.principal_id,
                req.thread_id.clone(),
                "denied",
                Some(rule.reason_code()),
            )
            .await;
            return ExecuteOutcome::Denied {
                reason_code: rule.reason_code(),
            };
        }

        let Some(registration) = self.registrations.get(req.tool_name) else {
            self.end(
                &span,
                req.principal_id,
                req.thread_id.clone(),
                "error",
                Some("tool_missing_handler"),
            )
            .await;
            return ExecuteOutcome::Error {
                kind: "not_found",
                message: format!("no registered handler for `{}`", req.tool_name),
            };
        };

        if let Err(violation) = schema::validate(&registration.tool.input_schema(), &req.args) {
            self.end(
                &span,
                req.principal_id,
                req.thread_id.clone(),
                "invalid_args",
                None,
            )
            .await;
            return ExecuteOutcome::InvalidArgs {
                message: violation.0,
            };
        }

        let effective_timeout = registration.timeout.min(self.max_timeout);
        match tokio::time::timeout(effective_timeout, registration.tool.call(req.args)).await {
            Ok(Ok(result)) => {
                self.emit_end_with_result(
                    &span,
                    req.principal_id,
                    req.thread_id,
                    "ok",
                    &result,
                )
                .await;
                ExecuteOutcome::Ok { result }
            }
            Ok(Err(err)) => {
                let kind = error_kind(&err);
                self.end(&span, req.principal_id, req.thread_id, "error", Some(kind))
                    .await;
                ExecuteOutcome::Error {
                    kind,
                    message: err.to_string(),
                }
            }
            Err(_elapsed) => {
                self.end(&span, req.principal_id, req.thread_id, "timeout", None)
                    .await;
                ExecuteOutcome::Timeout
            }
        }
    }

    async fn end(
        &self,
        span: &TraceContext,
        principal_id: &str,
        thread_id: Option<ThreadId>,
        status: &str,
        reason: Option<&str>,
    ) {
        let mut payload = serde_json::json!({"status": status});
        if let Some(reason) = reason {
            payload["reason"] = Value::String(reason.to_string());
        }
        self.event_log
            .emit(
                span,
                event_types::TOOL_CALL_END,
                self.component,
                ActorKind::Agent,
                principal_id,
                thread_id,
                payload,
            )
            .await
            .ok();
    }

    async fn emit_end_with_result(
        &self,
        span: &TraceContext,
        principal_id: &str,
        thread_id: Option<ThreadId>,
        status: &str,
        result: &Value,
    ) {
        let summary = truncate_for_event(result);
        self.event_log
            .emit(
                span,
                event_types::TOOL_CALL_END,
                self.component,
                ActorKind::Agent,
                principal_id,
                thread_id,
                serde_json::json!({"status": status, "result": summary}),
            )
            .await
            .ok();
    }
}
