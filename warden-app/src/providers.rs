//! Adapts the reference [`warden_turn::Provider`] implementations to
//! [`warden_router::RoutableProvider`] so they can sit behind a
//! [`warden_router::Router`] without either side knowing about the other.
//! Grounded on `warden-router`'s own `AlwaysFails`/`AlwaysSucceeds` test
//! fixtures, which show the same delegate-and-probe shape.

use std::future::Future;

use warden_router::RoutableProvider;
use warden_turn::provider::{Provider, ProviderError};
use warden_turn::types::{ProviderRequest, ProviderResponse};

/// Wraps a provider with no natural health endpoint: reports healthy
/// unconditionally and lets `generate`'s own failure classification do
/// the real work, per [`RoutableProvider::health_check`]'s documented
/// fallback.
pub struct AlwaysHealthy<P>(pub P);

impl<P: Provider + Sync> Provider for AlwaysHealthy<P> {
    fn complete(&self, request: ProviderRequest) -> impl Future<Output = Result<ProviderResponse, ProviderError>> + Send {
        self.0.complete(request)
    }
}

impl<P: Provider + Sync> RoutableProvider for AlwaysHealthy<P> {
    fn health_check(&self) -> impl Future<Output = bool> + Send {
        async { true }
    }
}
