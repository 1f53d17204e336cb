//! TOML-loadable process configuration (§3 ambient stack, configuration).
//!
//! Mirrors the shape of [`warden_selfupdate::SelfUpdateConfig`]: one flat,
//! `Default`-able struct per concern, deserialized with `serde`/`toml`
//! rather than hand-parsed. Fields that the lower-level configs (`Duration`,
//! `PathBuf`) don't implement `Deserialize` for are carried here as plain
//! seconds/strings and converted in [`AppConfig::build`].

use std::collections::BTreeSet;
use std::path::PathBuf;
use std::time::Duration;

use serde::Deserialize;
use warden_domain::{AgentGovernance, RiskTier};
use warden_selfupdate::{ApprovalProfile, SelfUpdateConfig, TestGateMode};
use warden_task::{LaneConfig, RunnerConfig};

/// Errors loading or parsing [`AppConfig`].
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// The config file could not be read.
    #[error("failed to read config file {path}: {source}")]
    Read {
        /// The path that failed to read.
        path: PathBuf,
        /// The underlying I/O error.
        #[source]
        source: std::io::Error,
    },
    /// The config file's contents did not parse as valid TOML for this shape.
    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),
}

/// Top-level process configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// The single built-in agent this process runs as.
    pub agent: AgentSection,
    /// Which model provider to treat as primary vs. fallback, and their keys.
    pub provider: ProviderSection,
    /// Task runner lanes.
    pub task: TaskSection,
    /// Cron scheduler catch-up bounds.
    pub cron: CronSection,
    /// Orchestrator step tunables.
    pub step: StepSection,
    /// Self-update pipeline tunables.
    pub selfupdate: SelfUpdateSection,
    /// Persistence backend selection.
    pub store: StoreSection,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            agent: AgentSection::default(),
            provider: ProviderSection::default(),
            task: TaskSection::default(),
            cron: CronSection::default(),
            step: StepSection::default(),
            selfupdate: SelfUpdateSection::default(),
            store: StoreSection::default(),
        }
    }
}

impl AppConfig {
    /// Load and parse a TOML config file. Missing sections fall back to
    /// their defaults, per `#[serde(default)]` on every section.
    pub fn load(path: &std::path::Path) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(toml::from_str(&raw)?)
    }

    /// Build the agent's governance fields from the config section.
    pub fn governance(&self) -> AgentGovernance {
        AgentGovernance {
            allowed_tools: self.agent.allowed_tools.iter().cloned().collect(),
            risk_tier: self.agent.risk_tier,
            max_actions_per_step: self.agent.max_actions_per_step,
            allowed_paths: self.agent.allowed_paths.clone(),
            can_request_privileged_change: self.agent.can_request_privileged_change,
        }
    }

    /// Build the task runner's lane configuration.
    pub fn runner_config(&self) -> RunnerConfig {
        let mut lanes = std::collections::HashMap::new();
        for lane in &self.task.lanes {
            lanes.insert(
                lane.name.clone(),
                LaneConfig {
                    capacity: lane.capacity,
                    workers: lane.workers,
                },
            );
        }
        if lanes.is_empty() {
            return RunnerConfig::default();
        }
        RunnerConfig {
            lanes,
            drain_timeout: Duration::from_secs(self.task.drain_timeout_secs),
        }
    }

    /// Build the self-update pipeline's configuration.
    pub fn selfupdate_config(&self) -> SelfUpdateConfig {
        let s = &self.selfupdate;
        SelfUpdateConfig {
            repo_root: PathBuf::from(&s.repo_root),
            path_allowlist: s.path_allowlist.clone(),
            identity_path_prefixes: s.identity_path_prefixes.clone(),
            test_gate_mode: if s.enforce_test_gate { TestGateMode::Enforce } else { TestGateMode::Warn },
            smoke_suite_command: s.smoke_suite_command.clone(),
            restart_command: s.restart_command.clone(),
            git_binary: s.git_binary.clone(),
            max_files_per_patch: s.max_files_per_patch,
            max_risk_score: s.max_risk_score,
            max_patch_attempts_per_day: s.max_patch_attempts_per_day,
            max_prs_per_day: s.max_prs_per_day,
            approval_profile: if s.production_approval { ApprovalProfile::Production } else { ApprovalProfile::Development },
            readiness_url: s.readiness_url.clone(),
            readiness_required_consecutive: s.readiness_required_consecutive,
            readiness_poll_interval: Duration::from_secs(s.readiness_poll_interval_secs),
            readiness_timeout: Duration::from_secs(s.readiness_timeout_secs),
            rollback_window: Duration::from_secs(s.rollback_window_secs),
            rollback_lockdown_threshold: s.rollback_lockdown_threshold,
            disk_root: PathBuf::from(&s.disk_root),
        }
    }
}

/// The built-in agent's identity, persona, and governance.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AgentSection {
    /// Stable agent id.
    pub agent_id: String,
    /// Identity document text (or path contents, loaded verbatim).
    pub identity: String,
    /// Persona document text.
    pub persona: String,
    /// Heartbeat document text.
    pub heartbeat: String,
    /// Whether this agent is a thread's primary.
    pub is_primary: bool,
    /// Tool names this agent may invoke before R3's permission check.
    pub allowed_tools: BTreeSet<String>,
    /// Declared risk tier.
    pub risk_tier: RiskTier,
    /// R8 action cap.
    pub max_actions_per_step: u32,
    /// R7 path allowlist.
    pub allowed_paths: Vec<String>,
    /// Whether this agent may originate a self-update proposal.
    pub can_request_privileged_change: bool,
}

impl Default for AgentSection {
    fn default() -> Self {
        Self {
            agent_id: "agt_default".to_string(),
            identity: "# Default Agent\n\nA general-purpose assistant.".to_string(),
            persona: "Helpful, direct, concise.".to_string(),
            heartbeat: "idle".to_string(),
            is_primary: true,
            allowed_tools: BTreeSet::new(),
            risk_tier: RiskTier::Low,
            max_actions_per_step: 8,
            allowed_paths: Vec::new(),
            can_request_privileged_change: false,
        }
    }
}

/// Which model provider backs the primary/fallback router slots.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProviderKind {
    /// Anthropic's Messages API.
    Anthropic,
    /// OpenAI's Chat Completions API.
    OpenAi,
    /// A local Ollama instance.
    Ollama,
}

/// Provider router wiring.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ProviderSection {
    /// The primary provider.
    pub primary: ProviderKind,
    /// The fallback provider, used when the primary is unhealthy, in
    /// cooldown, or fails mid-call.
    pub fallback: ProviderKind,
    /// API key for the Anthropic provider, if selected.
    pub anthropic_api_key: String,
    /// API key for the OpenAI provider, if selected.
    pub openai_api_key: String,
}

impl Default for ProviderSection {
    fn default() -> Self {
        Self {
            primary: ProviderKind::Anthropic,
            fallback: ProviderKind::Ollama,
            anthropic_api_key: String::new(),
            openai_api_key: String::new(),
        }
    }
}

/// One task runner lane's queue depth and worker count.
#[derive(Debug, Clone, Deserialize)]
pub struct LaneSection {
    /// The lane's name, as referenced by `Runner::enqueue`.
    pub name: String,
    /// Bounded queue capacity.
    pub capacity: usize,
    /// Worker count draining this lane.
    pub workers: usize,
}

/// Task runner wiring.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct TaskSection {
    /// Per-lane overrides. Empty means "use `RunnerConfig::default()`'s
    /// four lanes (`agent_priority`, `agent_default`, `tools_io`,
    /// `local_llm`)".
    pub lanes: Vec<LaneSection>,
    /// How long graceful shutdown waits for in-flight tasks.
    pub drain_timeout_secs: u64,
}

impl Default for TaskSection {
    fn default() -> Self {
        Self {
            lanes: Vec::new(),
            drain_timeout_secs: 30,
        }
    }
}

/// Cron scheduler wiring.
#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(default)]
pub struct CronSection {
    /// How often the tick supervisor wakes, in seconds.
    pub tick_interval_secs: u64,
}

impl Default for CronSection {
    fn default() -> Self {
        Self { tick_interval_secs: 30 }
    }
}

/// Orchestrator step wiring.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct StepSection {
    /// Max output tokens requested per provider call.
    pub max_tokens: u32,
    /// Recent tail turns included verbatim.
    pub recent_tail_turns: usize,
    /// Semantic-retrieval result count.
    pub retrieval_k: usize,
    /// Inbound messages between automatic compaction triggers.
    pub default_compaction_interval: u32,
}

impl Default for StepSection {
    fn default() -> Self {
        Self {
            max_tokens: 4096,
            recent_tail_turns: 10,
            retrieval_k: 8,
            default_compaction_interval: 20,
        }
    }
}

/// Self-update pipeline wiring. Field names mirror
/// [`warden_selfupdate::SelfUpdateConfig`] except where the underlying
/// type (`Duration`, `PathBuf`) isn't directly `Deserialize`.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SelfUpdateSection {
    /// See [`SelfUpdateConfig::repo_root`].
    pub repo_root: String,
    /// See [`SelfUpdateConfig::path_allowlist`].
    pub path_allowlist: Vec<String>,
    /// See [`SelfUpdateConfig::identity_path_prefixes`].
    pub identity_path_prefixes: Vec<String>,
    /// `true` selects [`TestGateMode::Enforce`], `false` [`TestGateMode::Warn`].
    pub enforce_test_gate: bool,
    /// See [`SelfUpdateConfig::smoke_suite_command`].
    pub smoke_suite_command: Vec<String>,
    /// See [`SelfUpdateConfig::restart_command`].
    pub restart_command: Vec<String>,
    /// See [`SelfUpdateConfig::git_binary`].
    pub git_binary: String,
    /// See [`SelfUpdateConfig::max_files_per_patch`].
    pub max_files_per_patch: usize,
    /// See [`SelfUpdateConfig::max_risk_score`].
    pub max_risk_score: f64,
    /// See [`SelfUpdateConfig::max_patch_attempts_per_day`].
    pub max_patch_attempts_per_day: u32,
    /// See [`SelfUpdateConfig::max_prs_per_day`].
    pub max_prs_per_day: u32,
    /// `true` selects [`ApprovalProfile::Production`].
    pub production_approval: bool,
    /// See [`SelfUpdateConfig::readiness_url`].
    pub readiness_url: String,
    /// See [`SelfUpdateConfig::readiness_required_consecutive`].
    pub readiness_required_consecutive: u32,
    /// See [`SelfUpdateConfig::readiness_poll_interval`], in seconds.
    pub readiness_poll_interval_secs: u64,
    /// See [`SelfUpdateConfig::readiness_timeout`], in seconds.
    pub readiness_timeout_secs: u64,
    /// See [`SelfUpdateConfig::rollback_window`], in seconds.
    pub rollback_window_secs: u64,
    /// See [`SelfUpdateConfig::rollback_lockdown_threshold`].
    pub rollback_lockdown_threshold: u32,
    /// See [`SelfUpdateConfig::disk_root`].
    pub disk_root: String,
}

impl Default for SelfUpdateSection {
    fn default() -> Self {
        let defaults = SelfUpdateConfig::default();
        Self {
            repo_root: defaults.repo_root.to_string_lossy().into_owned(),
            path_allowlist: defaults.path_allowlist,
            identity_path_prefixes: defaults.identity_path_prefixes,
            enforce_test_gate: true,
            smoke_suite_command: defaults.smoke_suite_command,
            restart_command: defaults.restart_command,
            git_binary: defaults.git_binary,
            max_files_per_patch: defaults.max_files_per_patch,
            max_risk_score: defaults.max_risk_score,
            max_patch_attempts_per_day: defaults.max_patch_attempts_per_day,
            max_prs_per_day: defaults.max_prs_per_day,
            production_approval: false,
            readiness_url: defaults.readiness_url,
            readiness_required_consecutive: defaults.readiness_required_consecutive,
            readiness_poll_interval_secs: defaults.readiness_poll_interval.as_secs(),
            readiness_timeout_secs: defaults.readiness_timeout.as_secs(),
            rollback_window_secs: defaults.rollback_window.as_secs(),
            rollback_lockdown_threshold: defaults.rollback_lockdown_threshold,
            disk_root: defaults.disk_root.to_string_lossy().into_owned(),
        }
    }
}

/// Which [`warden_store::Store`] backend to construct.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct StoreSection {
    /// `"memory"` or `"sqlite"`.
    pub backend: String,
    /// Database file path, used only when `backend = "sqlite"`.
    pub sqlite_path: String,
}

impl Default for StoreSection {
    fn default() -> Self {
        Self {
            backend: "memory".to_string(),
            sqlite_path: "./warden.sqlite3".to_string(),
        }
    }
}
