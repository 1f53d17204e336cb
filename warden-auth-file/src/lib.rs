#![deny(missing_docs)]
//! File-based auth provider that reads a bearer token from disk.
//!
//! Reads the entire file contents as the token bytes. Useful for Kubernetes
//! projected service account tokens or other file-mounted credentials.

use async_trait::async_trait;
use warden_auth::{AuthError, AuthProvider, AuthRequest, AuthToken};
use std::path::PathBuf;

/// Reads a bearer token from a file (e.g., K8s projected service account token).
pub struct FileTokenProvider {
    path: PathBuf,
}

impl FileTokenProvider {
    /// Create with the path to the token file.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

#[async_trait]
impl AuthProvider for FileTokenProvider {
    async fn provide(&self, _request: &AuthRequest) -> Result<AuthToken, AuthError> {
        let bytes = tokio::fs::read(&self.path)
            .await
            .map_err(|e| AuthError::BackendError(format!("failed to read token file: {e}")))?;
        Ok(AuthToken::permanent(bytes))
    }
}
