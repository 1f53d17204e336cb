#![deny(missing_docs)]
//! Cron expression grammar, due-instant computation, and per-tick
//! dispatch (spec §4.7 CRON SCHEDULER).
//!
//! The tick itself is driven by `warden-task`'s periodic-dispatch
//! supervisor (`CronDriver::run_tick` is the handler body registered
//! against a 30s-default periodic entry) — this crate owns the cron
//! grammar and the due-instant/claim logic, not a competing scheduler
//! loop.

mod expr;
mod tick;

pub use expr::{CronError, CronExpr};
pub use tick::{due_instants, CronDriver};
