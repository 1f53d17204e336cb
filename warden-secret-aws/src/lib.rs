#![deny(missing_docs)]
//! Stub secret resolver for AWS Secrets Manager.
//!
//! This crate provides the correct trait impl shape for an AWS Secrets Manager resolver.
//! The actual AWS SDK integration is not implemented — all resolve calls return
//! `SecretError::BackendError`.

use async_trait::async_trait;
use layer0::secret::SecretSource;
use warden_auth::AuthProvider;
use warden_secret::{SecretError, SecretLease, SecretResolver};
use std::sync::Arc;

/// Stub resolver for AWS Secrets Manager.
pub struct AwsResolver {
    _auth: Arc<dyn AuthProvider>,
}

impl AwsResolver {
    /// Create a new AWS resolver (stub).
    pub fn new(auth: Arc<dyn AuthProvider>) -> Self {
        Self { _auth: auth }
    }
}

#[async_trait]
impl SecretResolver for AwsResolver {
    async fn resolve(&self, source: &SecretSource) -> Result<SecretLease, SecretError> {
        match source {
            SecretSource::AwsSecretsManager { secret_id, region } => {
                Err(SecretError::BackendError(format!(
                    "AwsResolver is a stub — would resolve {secret_id} in region {region:?}"
                )))
            }
            _ => Err(SecretError::NoResolver("aws".into())),
        }
    }
}
