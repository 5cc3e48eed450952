//! Deterministic content-hash sampling (§4.1, §9 "Randomness avoidance").
//!
//! No PRNG is involved: the same `(userId, agentId, messages)` always
//! produces the same extract/skip decision and the same `batchId`, so
//! replays in tests and across processes agree (§8 "Determinism of
//! sampling").

use crate::types::{AgentId, BatchId, MemoryMessage, UserId};

/// FNV-1a, 32-bit. Chosen over `std::hash::Hasher` so the result is a
/// documented, version-stable algorithm rather than an implementation
/// detail of the standard library's `SipHash`.
fn fnv1a(bytes: &[u8]) -> u32 {
    const OFFSET_BASIS: u32 = 0x811c_9dc5;
    const PRIME: u32 = 0x0100_0193;
    let mut hash = OFFSET_BASIS;
    for &b in bytes {
        hash ^= u32::from(b);
        hash = hash.wrapping_mul(PRIME);
    }
    hash
}

/// Per-message contribution to the batch fingerprint: first three
/// lowercase words, digit count, and length (§4.1).
fn message_fingerprint(msg: &MemoryMessage) -> String {
    let lower = msg.content.to_lowercase();
    let first_three: Vec<&str> = lower.split_whitespace().take(3).collect();
    let digits = msg.content.chars().filter(char::is_ascii_digit).count();
    format!("{}|{}|{}", first_three.join(" "), digits, msg.content.len())
}

/// The full content-aware fingerprint over a batch (§4.1).
#[must_use]
pub fn batch_fingerprint(user_id: &UserId, agent_id: &AgentId, messages: &[MemoryMessage]) -> String {
    let mut parts = vec![user_id.as_str().to_string(), agent_id.as_str().to_string()];
    parts.extend(messages.iter().map(message_fingerprint));
    parts.join("::")
}

/// Hash the fingerprint to a value in `[0,1)`: `hash % 10000 / 10000`.
#[must_use]
pub fn sample_value(fingerprint: &str) -> f64 {
    let hash = fnv1a(fingerprint.as_bytes());
    f64::from(hash % 10_000) / 10_000.0
}

/// Whether a batch with this fingerprint is extracted (`sample_value <
/// extractionRate`, §4.1).
#[must_use]
pub fn should_extract(fingerprint: &str, extraction_rate: f64) -> bool {
    sample_value(fingerprint) < extraction_rate
}

/// The same hash value doubles as `batchId` (§4.1: "reused as `batchId`").
#[must_use]
pub fn derive_batch_id(fingerprint: &str) -> BatchId {
    BatchId::from(format!("{:08x}", fnv1a(fingerprint.as_bytes())))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Role;

    fn msgs(contents: &[&str]) -> Vec<MemoryMessage> {
        contents
            .iter()
            .enumerate()
            .map(|(i, c)| MemoryMessage::new(format!("m{i}"), AgentId::from("a1"), Role::User, *c, i as i64))
            .collect()
    }

    #[test]
    fn same_inputs_always_take_same_decision() {
        let user = UserId::from("u1");
        let agent = AgentId::from("a1");
        let messages = msgs(&["hello there friend", "I prefer dark mode"]);

        let fp1 = batch_fingerprint(&user, &agent, &messages);
        let fp2 = batch_fingerprint(&user, &agent, &messages);
        assert_eq!(fp1, fp2);
        assert_eq!(sample_value(&fp1), sample_value(&fp2));
        assert_eq!(derive_batch_id(&fp1).as_str(), derive_batch_id(&fp2).as_str());
    }

    #[test]
    fn extraction_rate_zero_never_extracts() {
        let fp = batch_fingerprint(&UserId::from("u1"), &AgentId::from("a1"), &msgs(&["anything"]));
        assert!(!should_extract(&fp, 0.0));
    }

    #[test]
    fn extraction_rate_one_always_extracts() {
        let fp = batch_fingerprint(&UserId::from("u1"), &AgentId::from("a1"), &msgs(&["anything"]));
        assert!(should_extract(&fp, 1.0));
    }

    #[test]
    fn different_content_usually_yields_different_batch_ids() {
        let a = batch_fingerprint(&UserId::from("u1"), &AgentId::from("a1"), &msgs(&["hello world"]));
        let b = batch_fingerprint(&UserId::from("u1"), &AgentId::from("a1"), &msgs(&["goodbye moon"]));
        assert_ne!(derive_batch_id(&a).as_str(), derive_batch_id(&b).as_str());
    }
}
