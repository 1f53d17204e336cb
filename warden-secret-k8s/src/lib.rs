#![deny(missing_docs)]
//! Stub secret resolver for Kubernetes Secrets.
//!
//! This crate provides the correct trait impl shape for a Kubernetes Secret
//! resolver. The actual API server integration is not implemented — all
//! resolve calls return `SecretError::BackendError`.

use async_trait::async_trait;
use layer0::secret::SecretSource;
use std::sync::Arc;
use warden_auth::AuthProvider;
use warden_secret::{SecretError, SecretLease, SecretResolver};

/// Stub resolver for Kubernetes Secrets, addressed by namespace/name/key.
pub struct KubernetesResolver {
    _auth: Arc<dyn AuthProvider>,
}

impl KubernetesResolver {
    /// Create a new Kubernetes resolver (stub).
    pub fn new(auth: Arc<dyn AuthProvider>) -> Self {
        Self { _auth: auth }
    }
}

#[async_trait]
impl SecretResolver for KubernetesResolver {
    async fn resolve(&self, source: &SecretSource) -> Result<SecretLease, SecretError> {
        match source {
            SecretSource::Kubernetes {
                namespace,
                name,
                key,
            } => Err(SecretError::BackendError(format!(
                "KubernetesResolver is a stub — would resolve {namespace}/{name}#{key}"
            ))),
            _ => Err(SecretError::NoResolver("kubernetes".into())),
        }
    }
}
