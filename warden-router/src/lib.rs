#![deny(missing_docs)]
//! Primary/fallback provider selection, health-check caching, and
//! quota-cooldown tracking (spec §4.5 PROVIDER ROUTER).
//!
//! Wraps two `Arc<dyn ErasedProvider>` — a small object-safe adapter over
//! the non-object-safe `warden-turn::provider::Provider`, the same
//! RPITIT-to-trait-object pattern `warden-context::strategies::
//! BoxedStrategy` already demonstrates for `ContextStrategy`.

mod erased;
mod outage;
mod router;

pub use erased::{ErasedProvider, RoutableProvider};
pub use outage::OutageKind;
pub use router::{Router, RouterConfig, RouterError};
