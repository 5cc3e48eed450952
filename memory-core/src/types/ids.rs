//! Opaque identifier newtypes.
//!
//! Spec §3 treats `id`s as opaque strings scoped to `(userId, agentId)` —
//! they may originate from an external adapter (a database row id, a
//! caller-supplied UUID) rather than being minted by this crate. Wrapping
//! them in newtypes keeps `(userId, agentId, memoryId)` triples from being
//! silently transposed at call sites.

use serde::{Deserialize, Serialize};
use std::fmt;

macro_rules! opaque_id {
    ($name:ident, $doc:expr) => {
        #[doc = $doc]
        #[derive(
            Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
        )]
        #[serde(transparent)]
        pub struct $name(pub String);

        impl $name {
            /// Generate a new random id (UUID v4 string form).
            #[must_use]
            pub fn generate() -> Self {
                Self(uuid::Uuid::new_v4().to_string())
            }

            #[must_use]
            pub fn as_str(&self) -> &str {
                &self.0
            }

            #[must_use]
            pub fn is_empty(&self) -> bool {
                self.0.is_empty()
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<String> for $name {
            fn from(s: String) -> Self {
                Self(s)
            }
        }

        impl From<&str> for $name {
            fn from(s: &str) -> Self {
                Self(s.to_string())
            }
        }
    };
}

opaque_id!(UserId, "Caller-supplied tenant/user identifier.");
opaque_id!(AgentId, "Identifier of the agent a memory or message belongs to.");
opaque_id!(MemoryId, "Identifier of a `Memory`, unique within `(userId, agentId)`.");
opaque_id!(RuleId, "Identifier of an `ExtractionRule`.");
opaque_id!(DecayRuleId, "Identifier of a `DecayRule`.");
opaque_id!(BatchId, "Deterministic identifier of a processed batch (§4.1 sampling).");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generate_produces_non_empty_distinct_ids() {
        let a = MemoryId::generate();
        let b = MemoryId::generate();
        assert!(!a.is_empty());
        assert_ne!(a, b);
    }

    #[test]
    fn roundtrips_through_json() {
        let id = UserId::from("user-42");
        let json = serde_json::to_string(&id).unwrap();
        assert_eq!(json, "\"user-42\"");
        let back: UserId = serde_json::from_str(&json).unwrap();
        assert_eq!(back, id);
    }
}
