#![deny(missing_docs)]
//! Stub secret resolver for GCP Secret Manager.
//!
//! This crate provides the correct trait impl shape for a GCP Secret Manager resolver.
//! The actual GCP SDK integration is not implemented — all resolve calls return
//! `SecretError::BackendError`.

use async_trait::async_trait;
use layer0::secret::SecretSource;
use warden_auth::AuthProvider;
use warden_secret::{SecretError, SecretLease, SecretResolver};
use std::sync::Arc;

/// Stub resolver for GCP Secret Manager.
pub struct GcpResolver {
    _auth: Arc<dyn AuthProvider>,
}

impl GcpResolver {
    /// Create a new GCP resolver (stub).
    pub fn new(auth: Arc<dyn AuthProvider>) -> Self {
        Self { _auth: auth }
    }
}

#[async_trait]
impl SecretResolver for GcpResolver {
    async fn resolve(&self, source: &SecretSource) -> Result<SecretLease, SecretError> {
        match source {
            SecretSource::GcpSecretManager { project, secret_id } => {
                Err(SecretError::BackendError(format!(
                    "GcpResolver is a stub — would resolve {project}/{secret_id}"
                )))
            }
            _ => Err(SecretError::NoResolver("gcp".into())),
        }
    }
}
