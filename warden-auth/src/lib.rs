#![deny(missing_docs)]
//! Authentication providers for warden.
//!
//! This crate defines the [`AuthProvider`] trait for obtaining authentication
//! credentials to access secret backends. It also provides [`AuthProviderChain`]
//! for composing multiple providers (try in order until one succeeds, like
//! AWS DefaultCredentialsChain).
//!
//! ## Separation of Concerns
//!
//! Auth providers produce credentials (tokens). Secret resolvers consume them.
//! A `VaultResolver` takes an `Arc<dyn AuthProvider>` and uses it to authenticate
//! before fetching secrets. This separation follows the pattern established by
//! AWS SDK (`ProvideCredentials` vs `SecretsManagerClient`), vaultrs
//! (`auth::*` vs `kv2::*`), and Google Cloud SDK.

use async_trait::async_trait;
use warden_secret::SecretValue;
use std::sync::Arc;
use std::time::SystemTime;
use thiserror::Error;

/// Errors from authentication providers (crate-local, not in layer0).
#[non_exhaustive]
#[derive(Debug, Error)]
pub enum AuthError {
    /// Authentication failed (bad credentials, expired token, etc.).
    #[error("auth failed: {0}")]
    AuthFailed(String),

    /// The requested scope or audience is not available.
    #[error("scope unavailable: {0}")]
    ScopeUnavailable(String),

    /// Backend communication failure.
    #[error("backend error: {0}")]
    BackendError(String),

    /// Catch-all.
    #[error("{0}")]
    Other(#[from] Box<dyn std::error::Error + Send + Sync>),
}

/// Context for an authentication request.
#[non_exhaustive]
#[derive(Debug, Clone, Default)]
pub struct AuthRequest {
    /// Target audience (OIDC audience, API identifier).
    pub audience: Option<String>,
    /// Requested scopes (OIDC scopes, OAuth2 scopes).
    pub scopes: Vec<String>,
    /// Target resource identifier (e.g., Vault path, AWS region).
    pub resource: Option<String>,
    /// Actor identity for audit (workflow ID, agent ID).
    pub actor: Option<String>,
}

impl AuthRequest {
    /// Create an empty auth request (no specific context).
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the target audience.
    pub fn with_audience(mut self, audience: impl Into<String>) -> Self {
        self.audience = Some(audience.into());
        self
    }

    /// Add a scope.
    pub fn with_scope(mut self, scope: impl Into<String>) -> Self {
        self.scopes.push(scope.into());
        self
    }

    /// Set the target resource.
    pub fn with_resource(mut self, resource: impl Into<String>) -> Self {
        self.resource = Some(resource.into());
        self
    }

    /// Set the actor identity.
    pub fn with_actor(mut self, actor: impl Into<String>) -> Self {
        self.actor = Some(actor.into());
        self
    }
}

/// An opaque authentication token with expiry.
/// Uses [`SecretValue`] internally for in-memory protection.
pub struct AuthToken {
    inner: SecretValue,
    expires_at: Option<SystemTime>,
}

impl AuthToken {
    /// Create a new auth token.
    pub fn new(bytes: Vec<u8>, expires_at: Option<SystemTime>) -> Self {
        Self {
            inner: SecretValue::new(bytes),
            expires_at,
        }
    }

    /// Create a token that never expires (for dev/test).
    pub fn permanent(bytes: Vec<u8>) -> Self {
        Self::new(bytes, None)
    }

    /// Scoped exposure of the token bytes.
    pub fn with_bytes<R>(&self, f: impl FnOnce(&[u8]) -> R) -> R {
        self.inner.with_bytes(f)
    }

    /// Check if this token has expired.
    pub fn is_expired(&self) -> bool {
        self.expires_at
            .map(|exp| SystemTime::now() > exp)
            .unwrap_or(false)
    }

    /// Returns when this token expires, if known.
    pub fn expires_at(&self) -> Option<SystemTime> {
        self.expires_at
    }
}

impl std::fmt::Debug for AuthToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthToken")
            .field("value", &"[REDACTED]")
            .field("expires_at", &self.expires_at)
            .finish()
    }
}

/// Provide authentication credentials for accessing a secret backend.
#[async_trait]
pub trait AuthProvider: Send + Sync {
    /// Provide an authentication token for the given request context.
    async fn provide(&self, request: &AuthRequest) -> Result<AuthToken, AuthError>;
}

/// Tries providers in order until one succeeds.
pub struct AuthProviderChain {
    providers: Vec<Arc<dyn AuthProvider>>,
}

impl AuthProviderChain {
    /// Create a new empty chain.
    pub fn new() -> Self {
        Self {
            providers: Vec::new(),
        }
    }

    /// Add a provider to the end of the chain.
    pub fn with_provider(mut self, provider: Arc<dyn AuthProvider>) -> Self {
        self.providers.push(provider);
        self
    }

    /// Add a provider to the end of the chain (mutable).
    pub fn add(&mut self, provider: Arc<dyn AuthProvider>) {
        self.providers.push(provider);
    }
}

impl Default for AuthProviderChain {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl AuthProvider for AuthProviderChain {
    async fn provide(&self, request: &AuthRequest) -> Result<AuthToken, AuthError> {
        let mut last_err = None;
        for provider in &self.providers {
            match provider.provide(request).await {
                Ok(token) => return Ok(token),
                Err(e) => last_err = Some(e),
            }
        }
        Err(last_err.unwrap_or_else(|| AuthError::AuthFailed("no providers configured".into())))
    }
}
