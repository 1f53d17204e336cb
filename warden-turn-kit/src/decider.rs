//! Decide whether a batch of tool calls planned from one provider
//! response may run concurrently.

use crate::planner::PlannedToolCall;
use warden_tool::SideEffectClass;

/// How a [`crate::BatchExecutor`] should run a batch of planned tool calls.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConcurrencyMode {
    /// Run every call in the batch concurrently.
    Concurrent,
    /// Run calls one at a time, in emission order.
    Sequential,
}

/// Decides [`ConcurrencyMode`] for a batch of tool calls.
pub trait ConcurrencyDecider: Send + Sync {
    /// Inspect the planned batch and return how it should be executed.
    fn decide(&self, calls: &[PlannedToolCall]) -> ConcurrencyMode;
}

/// The default decider: concurrent only if every call in the batch is
/// declared read-only. A single write (`Mutating`) or externally-visible
/// (`External`) call forces the whole batch sequential — two mutating
/// calls from the same model turn may have an implicit ordering
/// dependency (e.g. "create the file, then append to it") that the
/// planner has no way to see.
pub struct SequentialOnWriteDecider<F> {
    side_effect_class: F,
}

impl<F> SequentialOnWriteDecider<F>
where
    F: Fn(&str) -> SideEffectClass + Send + Sync,
{
    /// Build a decider that looks up each call's side-effect class via
    /// `side_effect_class` (typically the tool registry's classification).
    pub fn new(side_effect_class: F) -> Self {
        Self { side_effect_class }
    }
}

impl<F> ConcurrencyDecider for SequentialOnWriteDecider<F>
where
    F: Fn(&str) -> SideEffectClass + Send + Sync,
{
    fn decide(&self, calls: &[PlannedToolCall]) -> ConcurrencyMode {
        let all_read_only = calls
            .iter()
            .all(|call| (self.side_effect_class)(&call.name) == SideEffectClass::ReadOnly);
        if all_read_only {
            ConcurrencyMode::Concurrent
        } else {
            ConcurrencyMode::Sequential
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn call(name: &str) -> PlannedToolCall {
        PlannedToolCall {
            id: format!("call_{name}"),
            name: name.into(),
            input: serde_json::json!({}),
        }
    }

    fn classify(name: &str) -> SideEffectClass {
        match name {
            "search" | "read_file" => SideEffectClass::ReadOnly,
            "write_file" => SideEffectClass::Mutating,
            "exec_host" => SideEffectClass::External,
            _ => SideEffectClass::ReadOnly,
        }
    }

    #[test]
    fn all_read_only_is_concurrent() {
        let decider = SequentialOnWriteDecider::new(classify);
        let calls = vec![call("search"), call("read_file")];
        assert_eq!(decider.decide(&calls), ConcurrencyMode::Concurrent);
    }

    #[test]
    fn any_mutation_forces_sequential() {
        let decider = SequentialOnWriteDecider::new(classify);
        let calls = vec![call("search"), call("write_file")];
        assert_eq!(decider.decide(&calls), ConcurrencyMode::Sequential);
    }

    #[test]
    fn external_call_forces_sequential() {
        let decider = SequentialOnWriteDecider::new(classify);
        let calls = vec![call("exec_host")];
        assert_eq!(decider.decide(&calls), ConcurrencyMode::Sequential);
    }

    #[test]
    fn empty_batch_is_concurrent() {
        let decider = SequentialOnWriteDecider::new(classify);
        assert_eq!(decider.decide(&[]), ConcurrencyMode::Concurrent);
    }
}
