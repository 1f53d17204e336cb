#![deny(missing_docs)]
//! # warden — umbrella crate
//!
//! Provides a single import surface for the Warden redesign (`redesign/v2`).
//! Re-exports protocol and key implementations behind feature flags, plus a
//! `prelude` for the happy path.

#[cfg(feature = "core")]
pub use layer0;
#[cfg(feature = "core")]
pub use warden_context;
#[cfg(feature = "env-local")]
pub use warden_env_local;
#[cfg(feature = "hooks")]
pub use warden_hooks;
#[cfg(feature = "mcp")]
pub use warden_mcp;
#[cfg(feature = "op-react")]
pub use warden_op_react;
#[cfg(feature = "op-single-shot")]
pub use warden_op_single_shot;
#[cfg(feature = "orch-kit")]
pub use warden_orch_kit;
#[cfg(feature = "orch-local")]
pub use warden_orch_local;
#[cfg(feature = "provider-anthropic")]
pub use warden_provider_anthropic;
#[cfg(feature = "provider-ollama")]
pub use warden_provider_ollama;
#[cfg(feature = "provider-openai")]
pub use warden_provider_openai;
#[cfg(feature = "state-fs")]
pub use warden_state_fs;
#[cfg(feature = "state-memory")]
pub use warden_state_memory;
#[cfg(feature = "core")]
pub use warden_tool;
#[cfg(feature = "core")]
pub use warden_turn;

/// Happy-path imports for composing Warden systems.
pub mod prelude {
    #[cfg(feature = "core")]
    pub use layer0::{
        AgentId, Content, ContentBlock, Effect, Environment, ExitReason, Hook, HookAction,
        HookContext, HookPoint, Operator, OperatorConfig, OperatorInput, OperatorOutput, Scope,
        SessionId, StateReader, StateStore, WorkflowId,
    };

    #[cfg(feature = "hooks")]
    pub use warden_hooks::HookRegistry;

    #[cfg(feature = "core")]
    pub use warden_tool::{ToolDyn, ToolError, ToolRegistry};

    #[cfg(feature = "core")]
    pub use warden_turn::provider::{Provider, ProviderError};

    #[cfg(feature = "op-react")]
    pub use warden_op_react::{ReactConfig, ReactOperator};

    #[cfg(feature = "op-single-shot")]
    pub use warden_op_single_shot::SingleShotOperator;

    #[cfg(feature = "orch-kit")]
    pub use warden_orch_kit::{Kit, OrchestratedRunner};

    #[cfg(feature = "state-memory")]
    pub use warden_state_memory::MemoryStore;

    #[cfg(feature = "state-fs")]
    pub use warden_state_fs::FsStore;
}
