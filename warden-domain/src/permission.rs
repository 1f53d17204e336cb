//! Tool permission rows consulted by the policy engine's R3.

use serde::{Deserialize, Serialize};

/// Wildcard tool name meaning "this principal may call any tool"
/// (still subject to every other rule in the chain).
pub const WILDCARD_TOOL: &str = "*";

/// A `(principal_id, tool_name)` permit. Absence of a row — and no
/// matching wildcard row — means deny (R3/R9: deny-by-default).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolPermission {
    /// The agent or user id this permission applies to.
    pub principal_id: String,
    /// The tool name, or [`WILDCARD_TOOL`] for "all tools".
    pub tool_name: String,
}

impl ToolPermission {
    /// Create an explicit single-tool permit.
    pub fn new(principal_id: impl Into<String>, tool_name: impl Into<String>) -> Self {
        Self {
            principal_id: principal_id.into(),
            tool_name: tool_name.into(),
        }
    }

    /// Create a wildcard permit for every tool.
    pub fn wildcard(principal_id: impl Into<String>) -> Self {
        Self::new(principal_id, WILDCARD_TOOL)
    }
}
