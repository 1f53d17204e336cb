#![deny(missing_docs)]
//! Core effect execution traits and errors.
//!
//! [`layer0::effect::Effect`] is a *declaration* — a turn hands one back to
//! say "please do this," it never performs the side effect itself. Something
//! on the other side of the boundary has to turn that declaration into an
//! actual write, signal, delegation, or log line. This crate is that
//! boundary: the [`EffectExecutor`] trait and the error type its
//! implementations return.
//!
//! Concrete executors (in-process, Temporal-backed, HTTP-relayed, ...) live
//! in their own crates. [`warden-effects-local`](../warden_effects_local)
//! is the in-process one, composed from a [`layer0::state::StateStore`] and
//! a [`layer0::orchestrator::Orchestrator`].

use async_trait::async_trait;
use layer0::effect::Effect;
use thiserror::Error;

/// Errors raised while executing a declared [`Effect`].
#[non_exhaustive]
#[derive(Debug, Error)]
pub enum EffectError {
    /// The underlying state store rejected the operation.
    #[error("state error: {0}")]
    State(#[from] layer0::error::StateError),

    /// The underlying orchestrator rejected the operation.
    #[error("orchestrator error: {0}")]
    Orchestrator(#[from] layer0::error::OrchError),

    /// This executor has no handling for the given effect variant.
    #[error("unsupported effect: {0}")]
    Unsupported(String),
}

/// Executes declared [`Effect`]s against whatever backs this process —
/// an in-memory map, a database, a workflow engine, a network hop.
///
/// Turns never call this directly; the calling layer (the orchestrator
/// step, a lifecycle hook) owns the decision of when and how effects run.
#[async_trait]
pub trait EffectExecutor: Send + Sync {
    /// Execute a single effect, returning once it has taken place (or
    /// been accepted, for fire-and-forget effects like [`Effect::Signal`]).
    async fn execute(&self, effect: Effect) -> Result<(), EffectError>;

    /// Execute a batch of effects in declaration order.
    ///
    /// The default implementation runs them sequentially and stops at the
    /// first failure — effects often encode a causal order (write, then
    /// signal) that a naive parallel executor would violate. Implementations
    /// that know a batch is independent may override this for concurrency.
    async fn execute_all(&self, effects: Vec<Effect>) -> Result<(), EffectError> {
        for effect in effects {
            self.execute(effect).await?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    struct NullExecutor;

    #[async_trait]
    impl EffectExecutor for NullExecutor {
        async fn execute(&self, _effect: Effect) -> Result<(), EffectError> {
            Ok(())
        }
    }

    fn _assert_send_sync<T: Send + Sync>() {}

    #[test]
    fn object_safety() {
        _assert_send_sync::<Box<dyn EffectExecutor>>();
        _assert_send_sync::<Arc<dyn EffectExecutor>>();
        let _: Arc<dyn EffectExecutor> = Arc::new(NullExecutor);
    }

    #[tokio::test]
    async fn default_execute_all_runs_in_order_and_stops_on_error() {
        struct CountingExecutor {
            seen: std::sync::Mutex<Vec<String>>,
        }

        #[async_trait]
        impl EffectExecutor for CountingExecutor {
            async fn execute(&self, effect: Effect) -> Result<(), EffectError> {
                match &effect {
                    Effect::Log { message, .. } => {
                        self.seen.lock().unwrap().push(message.clone());
                        Ok(())
                    }
                    _ => Err(EffectError::Unsupported("only logs".into())),
                }
            }
        }

        let exec = CountingExecutor {
            seen: std::sync::Mutex::new(Vec::new()),
        };
        let effects = vec![
            Effect::Log {
                level: layer0::effect::LogLevel::Info,
                message: "one".into(),
                data: None,
            },
            Effect::Log {
                level: layer0::effect::LogLevel::Info,
                message: "two".into(),
                data: None,
            },
        ];
        exec.execute_all(effects).await.unwrap();
        assert_eq!(*exec.seen.lock().unwrap(), vec!["one", "two"]);
    }
}
