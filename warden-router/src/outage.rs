//! Outage classification: maps a provider's failure onto one of the
//! spec's five named outage kinds.

use warden_turn::provider::ProviderError;

/// A classified reason a provider call failed, used both for
/// `model.fallback` payloads and as the best-available explanation
/// surfaced when every provider fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutageKind {
    /// The provider's hostname could not be resolved.
    DnsResolution,
    /// The request exceeded its deadline.
    Timeout,
    /// The network path to the provider was unreachable.
    NetworkUnreachable,
    /// The provider responded but reported it could not serve the request
    /// (5xx, malformed response, auth failure).
    ProviderUnavailable,
    /// The provider reported quota exhaustion (429 / rate limit).
    QuotaExhausted,
}

impl OutageKind {
    /// Classify a [`ProviderError`] into an outage kind, inspecting the
    /// error message for transport-layer failures that `warden-turn`'s
    /// flat `RequestFailed(String)` variant doesn't distinguish.
    pub fn classify(error: &ProviderError) -> Self {
        match error {
            ProviderError::RateLimited => OutageKind::QuotaExhausted,
            ProviderError::RequestFailed(message) => {
                let lower = message.to_lowercase();
                if lower.contains("dns") || lower.contains("name resolution") {
                    OutageKind::DnsResolution
                } else if lower.contains("timeout") || lower.contains("timed out") {
                    OutageKind::Timeout
                } else if lower.contains("unreachable") || lower.contains("connection refused") {
                    OutageKind::NetworkUnreachable
                } else {
                    OutageKind::ProviderUnavailable
                }
            }
            ProviderError::AuthFailed(_) | ProviderError::InvalidResponse(_) | ProviderError::Other(_) => {
                OutageKind::ProviderUnavailable
            }
        }
    }

    /// The dot-case string used in event payloads.
    pub fn as_str(&self) -> &'static str {
        match self {
            OutageKind::DnsResolution => "dns_resolution",
            OutageKind::Timeout => "timeout",
            OutageKind::NetworkUnreachable => "network_unreachable",
            OutageKind::ProviderUnavailable => "provider_unavailable",
            OutageKind::QuotaExhausted => "quota_exhausted",
        }
    }
}
