#![deny(missing_docs)]
//! Stub secret resolver for OS keystore (macOS Keychain, Windows DPAPI, Linux Secret Service).
//!
//! This crate provides the correct trait impl shape for an OS keystore resolver.
//! The actual platform keychain integration is not implemented — all resolve calls
//! return `SecretError::BackendError`.
//!
//! No auth dependency — the OS keystore uses system-level authentication.

use async_trait::async_trait;
use layer0::secret::SecretSource;
use warden_secret::{SecretError, SecretLease, SecretResolver};

/// Stub resolver for OS keystore.
pub struct KeystoreResolver;

impl KeystoreResolver {
    /// Create a new OS keystore resolver (stub).
    pub fn new() -> Self {
        Self
    }
}

impl Default for KeystoreResolver {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl SecretResolver for KeystoreResolver {
    async fn resolve(&self, source: &SecretSource) -> Result<SecretLease, SecretError> {
        match source {
            SecretSource::OsKeystore { service } => Err(SecretError::BackendError(format!(
                "KeystoreResolver is a stub — would resolve service {service:?}"
            ))),
            _ => Err(SecretError::NoResolver("os_keystore".into())),
        }
    }
}
