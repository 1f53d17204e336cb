#![deny(missing_docs)]
//! Cryptographic operations for warden.
//!
//! This crate defines the [`CryptoProvider`] trait for cryptographic operations
//! where private keys never leave the provider boundary (Vault Transit, PKCS#11,
//! HSM, YubiKey, KMS).
//!
//! The consumer sends data in and gets results out. Private keys are never
//! exposed — this is the fundamental security property of hardware security
//! modules and transit encryption engines.

use async_trait::async_trait;
use thiserror::Error;

/// Errors from cryptographic operations (crate-local, not in layer0).
#[non_exhaustive]
#[derive(Debug, Error)]
pub enum CryptoError {
    /// The referenced key was not found.
    #[error("key not found: {0}")]
    KeyNotFound(String),

    /// The operation is not supported for this key type or algorithm.
    #[error("unsupported operation: {0}")]
    UnsupportedOperation(String),

    /// The cryptographic operation failed.
    #[error("crypto operation failed: {0}")]
    OperationFailed(String),

    /// Catch-all.
    #[error("{0}")]
    Other(#[from] Box<dyn std::error::Error + Send + Sync>),
}

/// Cryptographic operations where private keys never leave the provider boundary.
///
/// Implementations:
/// - `VaultTransitProvider`: Vault Transit engine (encrypt, decrypt, sign, verify)
/// - `HardwareProvider`: PKCS#11 / YubiKey PIV (sign, decrypt with on-device keys)
/// - `KmsProvider`: AWS KMS / GCP KMS / Azure Key Vault (envelope encryption)
///
/// The `key_ref` parameter is an opaque identifier meaningful to the implementation:
/// - Vault Transit: the key name in the transit engine
/// - PKCS#11: slot + key label
/// - YubiKey: PIV slot (e.g., "9a", "9c")
/// - KMS: key ARN or resource ID
#[async_trait]
pub trait CryptoProvider: Send + Sync {
    /// Sign data with the referenced key.
    async fn sign(
        &self,
        key_ref: &str,
        algorithm: &str,
        data: &[u8],
    ) -> Result<Vec<u8>, CryptoError>;

    /// Verify a signature against the referenced key.
    async fn verify(
        &self,
        key_ref: &str,
        algorithm: &str,
        data: &[u8],
        signature: &[u8],
    ) -> Result<bool, CryptoError>;

    /// Encrypt data with the referenced key.
    async fn encrypt(&self, key_ref: &str, plaintext: &[u8]) -> Result<Vec<u8>, CryptoError>;

    /// Decrypt data with the referenced key.
    async fn decrypt(&self, key_ref: &str, ciphertext: &[u8]) -> Result<Vec<u8>, CryptoError>;
}
