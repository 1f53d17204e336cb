//! Singleton system-state row (§3): lockdown, restarting, unlock code.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A rotating secret with a time-to-live, used to unlock a lockdown.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UnlockCode {
    /// The current secret value.
    pub code: String,
    /// When this code stops being valid.
    pub expires_at: DateTime<Utc>,
}

impl UnlockCode {
    /// Whether this code is still valid at the given instant.
    pub fn is_valid_at(&self, now: DateTime<Utc>) -> bool {
        now < self.expires_at
    }
}

/// The process-wide singleton row. Read-through cached with a version
/// counter per §5; writers bump `version` on every change so cached
/// readers can detect staleness without re-fetching on every decision.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SystemState {
    /// Denies all non-safe tools when true (R1).
    pub lockdown: bool,
    /// Denies tool execution entirely when true (R2).
    pub restarting: bool,
    /// Current unlock code, if lockdown is active.
    pub unlock_code: Option<UnlockCode>,
    /// Monotonically increasing version, bumped on every mutation.
    pub version: u64,
}

impl SystemState {
    /// The nominal, unlocked, non-restarting state.
    pub fn nominal() -> Self {
        Self {
            lockdown: false,
            restarting: false,
            unlock_code: None,
            version: 0,
        }
    }

    /// Enter lockdown, minting a fresh unlock code.
    pub fn trigger_lockdown(&mut self, code: impl Into<String>, ttl: chrono::Duration) {
        self.lockdown = true;
        self.unlock_code = Some(UnlockCode {
            code: code.into(),
            expires_at: Utc::now() + ttl,
        });
        self.version += 1;
    }

    /// Attempt to clear lockdown with a candidate code.
    pub fn clear_lockdown(&mut self, candidate: &str, now: DateTime<Utc>) -> bool {
        let Some(ref unlock) = self.unlock_code else {
            return false;
        };
        if unlock.code == candidate && unlock.is_valid_at(now) {
            self.lockdown = false;
            self.unlock_code = None;
            self.version += 1;
            true
        } else {
            false
        }
    }
}

impl Default for SystemState {
    fn default() -> Self {
        Self::nominal()
    }
}
