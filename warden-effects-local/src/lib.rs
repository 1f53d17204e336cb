#![deny(missing_docs)]
//! In-process [`EffectExecutor`] backed by a [`StateStore`] and an
//! [`Orchestrator`].
//!
//! This is the executor a single-process deployment wires up: memory
//! effects go straight to the store, signals and delegation go straight to
//! the orchestrator, and logs go to `tracing`. No queueing, no durability —
//! those properties belong to whichever `StateStore`/`Orchestrator`
//! implementation is plugged in underneath.

use async_trait::async_trait;
use layer0::effect::{Effect, LogLevel};
use layer0::orchestrator::Orchestrator;
use layer0::state::StateStore;
use std::sync::Arc;
use warden_effects_core::{EffectError, EffectExecutor};

/// Executes effects against an in-process [`StateStore`] and [`Orchestrator`].
pub struct LocalEffectExecutor {
    state: Arc<dyn StateStore>,
    orchestrator: Arc<dyn Orchestrator>,
}

impl LocalEffectExecutor {
    /// Build an executor over the given state store and orchestrator.
    pub fn new(state: Arc<dyn StateStore>, orchestrator: Arc<dyn Orchestrator>) -> Self {
        Self {
            state,
            orchestrator,
        }
    }
}

#[async_trait]
impl EffectExecutor for LocalEffectExecutor {
    async fn execute(&self, effect: Effect) -> Result<(), EffectError> {
        match effect {
            Effect::WriteMemory { scope, key, value } => {
                self.state.write(&scope, &key, value).await?;
                Ok(())
            }
            Effect::DeleteMemory { scope, key } => {
                self.state.delete(&scope, &key).await?;
                Ok(())
            }
            Effect::Signal { target, payload } => {
                self.orchestrator.signal(&target, payload).await?;
                Ok(())
            }
            Effect::Delegate { agent, input } => {
                self.orchestrator.dispatch(&agent, *input).await?;
                Ok(())
            }
            Effect::Handoff { agent, .. } => {
                // Handoff ends the current turn; the local executor has no
                // conversation-ownership concept of its own to update, so it
                // only records that a handoff to `agent` was requested.
                tracing::info!(target: "warden_effects_local", agent = %agent, "handoff requested");
                Ok(())
            }
            Effect::Log {
                level,
                message,
                data,
            } => {
                log_effect(level, &message, data.as_ref());
                Ok(())
            }
            Effect::Custom { effect_type, .. } => {
                Err(EffectError::Unsupported(effect_type))
            }
        }
    }
}

fn log_effect(level: LogLevel, message: &str, data: Option<&serde_json::Value>) {
    match level {
        LogLevel::Trace => tracing::trace!(data = ?data, "{message}"),
        LogLevel::Debug => tracing::debug!(data = ?data, "{message}"),
        LogLevel::Info => tracing::info!(data = ?data, "{message}"),
        LogLevel::Warn => tracing::warn!(data = ?data, "{message}"),
        LogLevel::Error => tracing::error!(data = ?data, "{message}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use layer0::effect::Scope;
    use layer0::error::{OrchError, StateError};
    use layer0::id::SessionId;
    use layer0::operator::{OperatorInput, OperatorOutput};
    use std::collections::HashMap;
    use std::sync::Mutex;

    #[derive(Default)]
    struct MemStore {
        data: Mutex<HashMap<(String, String), serde_json::Value>>,
    }

    fn scope_key(scope: &Scope) -> String {
        format!("{scope:?}")
    }

    #[async_trait]
    impl StateStore for MemStore {
        async fn read(
            &self,
            scope: &Scope,
            key: &str,
        ) -> Result<Option<serde_json::Value>, StateError> {
            Ok(self
                .data
                .lock()
                .unwrap()
                .get(&(scope_key(scope), key.to_string()))
                .cloned())
        }

        async fn write(
            &self,
            scope: &Scope,
            key: &str,
            value: serde_json::Value,
        ) -> Result<(), StateError> {
            self.data
                .lock()
                .unwrap()
                .insert((scope_key(scope), key.to_string()), value);
            Ok(())
        }

        async fn delete(&self, scope: &Scope, key: &str) -> Result<(), StateError> {
            self.data
                .lock()
                .unwrap()
                .remove(&(scope_key(scope), key.to_string()));
            Ok(())
        }

        async fn list(&self, _scope: &Scope, _prefix: &str) -> Result<Vec<String>, StateError> {
            Ok(Vec::new())
        }

        async fn search(
            &self,
            _scope: &Scope,
            _query: &str,
            _limit: usize,
        ) -> Result<Vec<layer0::state::SearchResult>, StateError> {
            Ok(Vec::new())
        }
    }

    struct NullOrchestrator;

    #[async_trait]
    impl Orchestrator for NullOrchestrator {
        async fn dispatch(
            &self,
            _agent: &layer0::id::AgentId,
            _input: OperatorInput,
        ) -> Result<OperatorOutput, OrchError> {
            Err(OrchError::DispatchFailed("null orchestrator".into()))
        }

        async fn dispatch_many(
            &self,
            _tasks: Vec<(layer0::id::AgentId, OperatorInput)>,
        ) -> Vec<Result<OperatorOutput, OrchError>> {
            Vec::new()
        }

        async fn signal(
            &self,
            _target: &layer0::id::WorkflowId,
            _signal: layer0::effect::SignalPayload,
        ) -> Result<(), OrchError> {
            Ok(())
        }
    }

    fn executor() -> LocalEffectExecutor {
        LocalEffectExecutor::new(Arc::new(MemStore::default()), Arc::new(NullOrchestrator))
    }

    #[tokio::test]
    async fn write_then_read_round_trips() {
        let exec = executor();
        let scope = Scope::Session(SessionId::new("sess_1"));
        exec.execute(Effect::WriteMemory {
            scope: scope.clone(),
            key: "k".into(),
            value: serde_json::json!("v"),
        })
        .await
        .unwrap();

        let stored = exec.state.read(&scope, "k").await.unwrap();
        assert_eq!(stored, Some(serde_json::json!("v")));
    }

    #[tokio::test]
    async fn delete_removes_key() {
        let exec = executor();
        let scope = Scope::Session(SessionId::new("sess_1"));
        exec.execute(Effect::WriteMemory {
            scope: scope.clone(),
            key: "k".into(),
            value: serde_json::json!(1),
        })
        .await
        .unwrap();
        exec.execute(Effect::DeleteMemory {
            scope: scope.clone(),
            key: "k".into(),
        })
        .await
        .unwrap();
        assert_eq!(exec.state.read(&scope, "k").await.unwrap(), None);
    }

    #[tokio::test]
    async fn signal_delegates_to_orchestrator() {
        let exec = executor();
        let result = exec
            .execute(Effect::Signal {
                target: layer0::id::WorkflowId::new("wf_1"),
                payload: layer0::effect::SignalPayload::new("ping", serde_json::json!({})),
            })
            .await;
        assert!(result.is_ok());
    }

    #[tokio::test]
    async fn custom_effect_is_unsupported() {
        let exec = executor();
        let err = exec
            .execute(Effect::Custom {
                effect_type: "future_thing".into(),
                data: serde_json::json!({}),
            })
            .await
            .unwrap_err();
        assert!(matches!(err, EffectError::Unsupported(t) if t == "future_thing"));
    }
}
