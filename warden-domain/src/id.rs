//! Type-prefixed opaque identifiers.
//!
//! Every entity ID in the system carries its type as a literal prefix
//! (`usr_`, `thr_`, `msg_`, ...). Prefixes are part of the wire contract:
//! consumers may route on prefix alone without looking up the entity.

use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Declares a type-prefixed ID wrapper backed by a plain `String`.
///
/// `new_generated()` mints a fresh id as `<prefix><uuid-v4>`. `new()` wraps
/// an existing string verbatim (used when round-tripping from storage) and
/// does not enforce the prefix — callers that need that guarantee should
/// use [`has_prefix`](PrefixedId::has_prefix) at the boundary.
macro_rules! prefixed_id {
    ($name:ident, $prefix:expr, $doc:expr) => {
        #[doc = $doc]
        #[derive(Debug, Clone, Hash, Eq, PartialEq, Ord, PartialOrd, Serialize, Deserialize)]
        pub struct $name(pub String);

        impl $name {
            /// The literal prefix for this id type, e.g. `"thr_"`.
            pub const PREFIX: &'static str = $prefix;

            /// Wrap an existing id string verbatim.
            pub fn new(id: impl Into<String>) -> Self {
                Self(id.into())
            }

            /// Mint a fresh id: prefix followed by a random UUIDv4.
            pub fn generate() -> Self {
                Self(format!("{}{}", Self::PREFIX, Uuid::new_v4()))
            }

            /// Borrow the inner string.
            pub fn as_str(&self) -> &str {
                &self.0
            }

            /// Whether this id carries the expected type prefix.
            pub fn has_expected_prefix(&self) -> bool {
                self.0.starts_with(Self::PREFIX)
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<&str> for $name {
            fn from(s: &str) -> Self {
                Self(s.to_owned())
            }
        }

        impl From<String> for $name {
            fn from(s: String) -> Self {
                Self(s)
            }
        }
    };
}

prefixed_id!(UserId, "usr_", "Identifies a human or service principal.");
prefixed_id!(ThreadId, "thr_", "Identifies a durable conversation anchor.");
prefixed_id!(MessageId, "msg_", "Identifies a single message within a thread.");
prefixed_id!(TraceId, "trc_", "Identifies a causally related group of spans.");
prefixed_id!(SpanId, "spn_", "Identifies one operation within a trace.");
prefixed_id!(ScheduleId, "sch_", "Identifies a recurring or one-shot schedule.");
prefixed_id!(EventId, "evt_", "Identifies a single append-only audit event.");
prefixed_id!(TaskId, "tsk_", "Identifies a task-runner submission.");

/// Returns the entity-type prefix of an opaque id string, if recognized.
///
/// Used by routing code that only needs to know "is this a thread or a
/// message" without constructing the typed wrapper.
pub fn recognized_prefix(id: &str) -> Option<&'static str> {
    const PREFIXES: &[&str] = &["usr_", "thr_", "msg_", "trc_", "spn_", "sch_", "evt_", "tsk_"];
    PREFIXES.iter().find(|p| id.starts_with(**p)).copied()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generated_ids_carry_prefix() {
        let t = ThreadId::generate();
        assert!(t.as_str().starts_with("thr_"));
        assert!(t.has_expected_prefix());
    }

    #[test]
    fn recognized_prefix_routes_by_type() {
        assert_eq!(recognized_prefix("msg_abc123"), Some("msg_"));
        assert_eq!(recognized_prefix("wa:external-id"), None);
    }
}
