//! The registered-tool catalog consulted by R4, R5, R6, and R7.

use warden_domain::RiskTier;

/// Tools callable by any principal regardless of lockdown (R1).
pub const SAFE_TOOLS: &[&str] = &["status_query", "log_search", "unlock_command"];

/// Static facts about a registered tool, independent of any particular
/// invocation.
#[derive(Debug, Clone)]
pub struct ToolRegistration {
    /// The tool's unique name.
    pub name: String,
    /// Minimum agent risk tier required to call this tool (R6).
    pub min_risk_tier: RiskTier,
    /// Whether this tool manages session/thread lifecycle and is
    /// therefore restricted to the thread's primary agent (R5).
    pub session_scoped: bool,
    /// JSON-pointer-style argument keys (e.g. `"/path"`, `"/cwd"`) whose
    /// string values are filesystem paths subject to the agent's
    /// `allowed_paths` prefix check (R7). Empty for tools with no
    /// filesystem surface.
    pub path_arg_pointers: Vec<String>,
}

impl ToolRegistration {
    /// Declare a simple, non-path-touching, non-session-scoped tool.
    pub fn simple(name: impl Into<String>, min_risk_tier: RiskTier) -> Self {
        Self {
            name: name.into(),
            min_risk_tier,
            session_scoped: false,
            path_arg_pointers: Vec::new(),
        }
    }

    /// Mark this tool as session-management-scoped (R5).
    pub fn session_scoped(mut self) -> Self {
        self.session_scoped = true;
        self
    }

    /// Declare which argument fields carry filesystem paths (R7).
    pub fn with_path_args(mut self, pointers: impl IntoIterator<Item = &'static str>) -> Self {
        self.path_arg_pointers = pointers.into_iter().map(String::from).collect();
        self
    }
}

/// An immutable, hot-reloadable set of registered tools. Per §5, the
/// registry is loaded once at startup and swapped atomically on
/// hot-reload; this type is the snapshot a single policy decision reads.
#[derive(Debug, Clone, Default)]
pub struct ToolCatalog {
    tools: Vec<ToolRegistration>,
}

impl ToolCatalog {
    /// Build a catalog from a list of registrations.
    pub fn new(tools: Vec<ToolRegistration>) -> Self {
        Self { tools }
    }

    /// Look up a tool's registration by name.
    pub fn get(&self, name: &str) -> Option<&ToolRegistration> {
        self.tools.iter().find(|t| t.name == name)
    }

    /// Whether a tool name is registered at all (R4).
    pub fn is_registered(&self, name: &str) -> bool {
        self.get(name).is_some()
    }
}
