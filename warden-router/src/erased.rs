//! Dyn-compatible wrapper over the non-object-safe [`Provider`] trait —
//! the same RPITIT-to-trait-object pattern
//! `warden-context::strategies::ErasedStrategy`/`BoxedStrategy` uses.

use std::future::Future;
use std::pin::Pin;
use warden_turn::provider::{Provider, ProviderError};
use warden_turn::types::{ProviderRequest, ProviderResponse};

type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// A [`Provider`] that also reports liveness, used as the router's unit
/// of work. Providers with no natural health probe can return `true`
/// unconditionally.
pub trait RoutableProvider: Provider {
    /// A cheap liveness probe. Implementations that have no dedicated
    /// health endpoint may issue a minimal real request or simply report
    /// `true` and rely on `generate`'s own failure classification.
    fn health_check(&self) -> impl Future<Output = bool> + Send;
}

/// Object-safe equivalent of [`RoutableProvider`], boxing both futures.
pub trait ErasedProvider: Send + Sync {
    /// Boxed form of [`Provider::complete`].
    fn erased_complete<'a>(
        &'a self,
        request: ProviderRequest,
    ) -> BoxFuture<'a, Result<ProviderResponse, ProviderError>>;

    /// Boxed form of [`RoutableProvider::health_check`].
    fn erased_health_check(&self) -> BoxFuture<'_, bool>;
}

impl<P: RoutableProvider + Sync> ErasedProvider for P {
    fn erased_complete<'a>(
        &'a self,
        request: ProviderRequest,
    ) -> BoxFuture<'a, Result<ProviderResponse, ProviderError>> {
        Box::pin(self.complete(request))
    }

    fn erased_health_check(&self) -> BoxFuture<'_, bool> {
        Box::pin(self.health_check())
    }
}
