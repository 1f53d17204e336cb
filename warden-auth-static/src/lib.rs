#![deny(missing_docs)]
//! Static auth provider that always returns the same token.
//!
//! Intended for dev/test use only. Not suitable for production.

use async_trait::async_trait;
use warden_auth::{AuthError, AuthProvider, AuthRequest, AuthToken};

/// A static auth provider that always returns the same token. Dev/test only.
pub struct StaticAuthProvider {
    token: Vec<u8>,
}

impl StaticAuthProvider {
    /// Create with a fixed token.
    pub fn new(token: impl Into<Vec<u8>>) -> Self {
        Self {
            token: token.into(),
        }
    }
}

#[async_trait]
impl AuthProvider for StaticAuthProvider {
    async fn provide(&self, _request: &AuthRequest) -> Result<AuthToken, AuthError> {
        Ok(AuthToken::permanent(self.token.clone()))
    }
}
