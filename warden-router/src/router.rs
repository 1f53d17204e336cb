//! Primary/fallback selection with health-check caching and
//! quota-cooldown tracking.

use crate::erased::ErasedProvider;
use crate::outage::OutageKind;
use arc_swap::{ArcSwap, ArcSwapOption};
use chrono::{DateTime, Duration, Utc};
use std::sync::Arc;
use thiserror::Error;
use tracing::warn;
use warden_trace::{event_types, ActorKind, EventLog, TraceContext};
use warden_turn::provider::ProviderError;
use warden_turn::types::{ProviderRequest, ProviderResponse};

/// Router-wide tunables.
#[derive(Debug, Clone, Copy)]
pub struct RouterConfig {
    /// How long a cached health-check result stays valid.
    pub health_check_ttl: Duration,
    /// Default cooldown applied when a provider reports quota exhaustion
    /// without a more specific retry-after hint.
    pub default_quota_cooldown: Duration,
}

impl Default for RouterConfig {
    fn default() -> Self {
        Self {
            health_check_ttl: Duration::seconds(30),
            default_quota_cooldown: Duration::seconds(60),
        }
    }
}

/// Every provider failed; carries the best available outage kind.
#[non_exhaustive]
#[derive(Debug, Error)]
#[error("all providers failed; last outage kind: {outage_kind:?} ({message})")]
pub struct RouterError {
    /// The most specific classification available across both failures.
    pub outage_kind: OutageKind,
    /// The fallback's own error message (the more recent failure).
    pub message: String,
}

#[derive(Clone, Copy)]
struct HealthCache {
    checked_at: DateTime<Utc>,
    healthy: bool,
}

/// Routes completions to a primary provider, falling back to a
/// secondary on transient or quota failure.
pub struct Router {
    primary: Arc<dyn ErasedProvider>,
    fallback: Arc<dyn ErasedProvider>,
    event_log: Arc<dyn EventLog>,
    component: String,
    config: RouterConfig,
    primary_health: ArcSwap<HealthCache>,
    primary_cooldown_until: ArcSwapOption<DateTime<Utc>>,
}

impl Router {
    /// Build a router over a primary and fallback provider.
    pub fn new(
        primary: Arc<dyn ErasedProvider>,
        fallback: Arc<dyn ErasedProvider>,
        event_log: Arc<dyn EventLog>,
        component: impl Into<String>,
        config: RouterConfig,
    ) -> Self {
        Self {
            primary,
            fallback,
            event_log,
            component: component.into(),
            config,
            primary_health: ArcSwap::from_pointee(HealthCache {
                checked_at: DateTime::<Utc>::MIN_UTC,
                healthy: true,
            }),
            primary_cooldown_until: ArcSwapOption::new(None),
        }
    }

    /// Whether the primary is currently in a quota-cooldown window.
    fn primary_in_cooldown(&self, now: DateTime<Utc>) -> bool {
        self.primary_cooldown_until
            .load()
            .as_deref()
            .is_some_and(|until| now < *until)
    }

    /// Cached health state for the primary, refreshing if the TTL has
    /// elapsed. Read-through-cache-with-version-counter in spirit: the
    /// `checked_at` timestamp is this cache's version.
    pub async fn primary_healthy(&self) -> bool {
        let now = Utc::now();
        let cached = **self.primary_health.load();
        if now - cached.checked_at < self.config.health_check_ttl {
            return cached.healthy;
        }
        let healthy = self.primary.erased_health_check().await;
        self.primary_health.store(Arc::new(HealthCache {
            checked_at: now,
            healthy,
        }));
        healthy
    }

    /// Run a completion, trying the primary unless it's cooling down
    /// from a prior quota failure, then falling back on any failure.
    pub async fn generate(
        &self,
        request: ProviderRequest,
        ctx: &TraceContext,
    ) -> Result<ProviderResponse, RouterError> {
        let now = Utc::now();

        if !self.primary_in_cooldown(now) {
            match self.primary.erased_complete(request.clone()).await {
                Ok(response) => return Ok(response),
                Err(error) => {
                    let outage_kind = OutageKind::classify(&error);
                    if outage_kind == OutageKind::QuotaExhausted {
                        let until = now + self.config.default_quota_cooldown;
                        self.primary_cooldown_until.store(Some(Arc::new(until)));
                    }
                    self.emit_fallback(ctx, outage_kind, &error).await;
                    return self.try_fallback(request, outage_kind).await;
                }
            }
        }

        self.emit_fallback(ctx, OutageKind::QuotaExhausted, &ProviderError::RateLimited)
            .await;
        self.try_fallback(request, OutageKind::QuotaExhausted).await
    }

    async fn try_fallback(
        &self,
        request: ProviderRequest,
        primary_outage: OutageKind,
    ) -> Result<ProviderResponse, RouterError> {
        match self.fallback.erased_complete(request).await {
            Ok(response) => Ok(response),
            Err(error) => {
                let outage_kind = OutageKind::classify(&error);
                warn!(
                    primary_outage = primary_outage.as_str(),
                    fallback_outage = outage_kind.as_str(),
                    "both providers failed"
                );
                Err(RouterError {
                    outage_kind,
                    message: error.to_string(),
                })
            }
        }
    }

    async fn emit_fallback(&self, ctx: &TraceContext, outage_kind: OutageKind, error: &ProviderError) {
        let payload = serde_json::json!({
            "outage_kind": outage_kind.as_str(),
            "error": error.to_string(),
        });
        if let Err(e) = self
            .event_log
            .emit(
                ctx,
                event_types::MODEL_FALLBACK,
                &self.component,
                ActorKind::System,
                "provider-router",
                None,
                payload,
            )
            .await
        {
            warn!(error = %e, "failed to emit model.fallback");
        }
    }
}
