#![deny(missing_docs)]
//! Turn-level planning and execution primitives: planner, concurrency
//! decider, batch executor, steering.
//!
//! [`warden-turn`](../warden_turn) gives you the ReAct loop itself. This
//! crate factors the decisions *inside* that loop into small, independently
//! testable pieces so orchestrators built on top of [`layer0::Turn`] (not
//! just `WardenTurn`) can reuse them:
//!
//! - [`plan`] — given a provider response, decide whether the loop
//!   continues with tool calls or has reached a terminal message.
//! - [`ConcurrencyDecider`] — decide whether a batch of tool calls in one
//!   response may run concurrently or must run one at a time.
//! - [`BatchExecutor`] — execute a batch of tool calls honoring that
//!   decision, in tool_use order.
//! - [`Steering`] — a mid-loop channel for injecting guidance that the
//!   planner folds into the next provider call without restarting the loop.

mod batch;
mod decider;
mod planner;
mod steering;

pub use batch::{BatchExecutor, BatchOutcome, ToolInvoker};
pub use decider::{ConcurrencyDecider, ConcurrencyMode, SequentialOnWriteDecider};
pub use planner::{plan, PlanError, TurnPlan};
pub use steering::{Steering, SteeringMessage};
