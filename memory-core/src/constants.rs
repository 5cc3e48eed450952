//! Global constants for memory-core.
//!
//! Centralizes magic numbers and default configuration values used across
//! the batch pipeline, decay engine, lifecycle manager, and connection
//! graph, so they are declared once and documented here rather than
//! scattered through the modules that consume them.

/// Default configuration values.
pub mod defaults {
    use std::time::Duration;

    // Batch processing (§4.1)
    pub const DEFAULT_MAX_BATCH_SIZE: usize = 20;
    pub const DEFAULT_MIN_BATCH_SIZE: usize = 1;
    pub const DEFAULT_TIMEOUT_MINUTES: u64 = 15;
    pub const DEFAULT_EXTRACTION_RATE: f64 = 1.0;
    pub const DEFAULT_MIN_MESSAGE_LENGTH: usize = 10;

    // Tier gating (§4.1 extraction pipeline)
    pub const TIER2_MIN_FILTERED_LEN: usize = 3;
    pub const TIER3_MIN_FILTERED_LEN: usize = 5;

    // RuleBasedExtractor (§4.5)
    pub const REGEX_TIMEOUT_MS: u64 = 100;
    pub const REGEX_MAX_CHARS: usize = 10_000;

    // PRIME extractor (§4.3)
    pub const PRIME_FAST_MAX_CHARS: usize = 140;
    pub const PRIME_ACCURATE_MIN_CHARS: usize = 600;
    pub const PRIME_FAST_MAX_RULES: usize = 2;
    pub const PRIME_ACCURATE_MIN_RULES: usize = 6;
    pub const PRIME_DEFAULT_FALLBACK_THRESHOLD: f64 = 0.3;

    // Decay engine (§4.6)
    pub const DEFAULT_DECAY_RATE_PER_DAY: f64 = 0.1;
    pub const DEFAULT_DELETE_THRESHOLD: f64 = 0.1;
    pub const DEFAULT_MIN_IMPORTANCE: f64 = 0.0;

    // Lifecycle manager (§4.7)
    pub const DEFAULT_EPISODIC_TO_SEMANTIC_DAYS: i64 = 7;
    pub const DEFAULT_MIN_IMPORTANCE_FOR_PROMOTION: f64 = 0.6;
    pub const DEFAULT_MIN_ACCESS_COUNT_FOR_PROMOTION: u64 = 3;
    pub const DEFAULT_MAX_MEMORIES_PER_AGENT: usize = 10_000;

    // Scheduler (§4.7 / §5)
    pub const DEFAULT_MAX_CONCURRENT_OPERATIONS: usize = 8;
    pub const DEFAULT_MAX_RETRIES: u32 = 3;
    pub const DEFAULT_RETRY_BASE_DELAY: Duration = Duration::from_millis(100);
    pub const DEFAULT_RETRY_MAX_DELAY: Duration = Duration::from_secs(5);

    // ConnectionGraph (§4.8)
    pub const MAX_BFS_VISITED_NODES: usize = 100;

    // Noise filter LLM fallback (§4.4 / §5)
    pub const DEFAULT_NOISE_LLM_TIMEOUT: Duration = Duration::from_secs(2);
}

/// Canonical storage key templates (§6). `{field}` placeholders are
/// substituted by callers; these constants exist so every component
/// agrees on the exact layout without re-typing it.
pub mod keys {
    pub const MEMORY_PREFIX: &str = "memory";
    pub const EXTRACTION_RULES_PREFIX: &str = "extraction-rules";
    pub const BATCH_METADATA_PREFIX: &str = "batch_metadata";
    pub const ARCHIVE_PREFIX: &str = "archive";
    pub const CONNECTION_PREFIX: &str = "connection";
    pub const DECAY_RULES_PREFIX: &str = "decay-rules";

    #[must_use]
    pub fn memory_key(user_id: &str, agent_id: &str, memory_id: &str) -> String {
        format!("{MEMORY_PREFIX}:{user_id}:{agent_id}:{memory_id}")
    }

    #[must_use]
    pub fn extraction_rules_key(user_id: &str, agent_id: &str) -> String {
        format!("{EXTRACTION_RULES_PREFIX}:{user_id}:{agent_id}")
    }

    #[must_use]
    pub fn batch_metadata_key(batch_id: &str) -> String {
        format!("{BATCH_METADATA_PREFIX}:{batch_id}")
    }

    #[must_use]
    pub fn archive_key(agent_id: &str, memory_id: &str) -> String {
        format!("{ARCHIVE_PREFIX}:{agent_id}:{memory_id}")
    }

    /// Not named in §6's key layout (decay rules are user-configured state
    /// the spec leaves adapter-defined); mirrors `extraction_rules_key` so
    /// the reference adapter and CLI have one canonical place to persist
    /// them.
    #[must_use]
    pub fn decay_rules_key(user_id: &str, agent_id: &str) -> String {
        format!("{DECAY_RULES_PREFIX}:{user_id}:{agent_id}")
    }

    /// Mirrors `decay_rules_key`: one adapter-defined place to persist the
    /// connection list a [`crate::graph::ConnectionGraph`] is built from.
    #[must_use]
    pub fn connections_key(user_id: &str, agent_id: &str) -> String {
        format!("{CONNECTION_PREFIX}:{user_id}:{agent_id}")
    }
}

/// Environment variable names recognised by [`crate::extraction::prime::PrimeConfig`] (§6).
pub mod env_vars {
    pub const PRIME_PROVIDER: &str = "PRIME_PROVIDER";
    pub const PRIME_API_KEY: &str = "PRIME_API_KEY";
    pub const PRIME_DEFAULT_TIER: &str = "PRIME_DEFAULT_TIER";
    pub const PRIME_AUTO_TIER_SELECTION: &str = "PRIME_AUTO_TIER_SELECTION";
    pub const PRIME_FAST_THRESHOLD: &str = "PRIME_FAST_THRESHOLD";
    pub const PRIME_ACCURATE_THRESHOLD: &str = "PRIME_ACCURATE_THRESHOLD";
    pub const PRIME_FAST_MODEL: &str = "PRIME_FAST_MODEL";
    pub const PRIME_BALANCED_MODEL: &str = "PRIME_BALANCED_MODEL";
    pub const PRIME_ACCURATE_MODEL: &str = "PRIME_ACCURATE_MODEL";
    pub const PRIME_MAX_TOKENS: &str = "PRIME_MAX_TOKENS";
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn batch_size_bounds_are_sane() {
        assert!(defaults::DEFAULT_MAX_BATCH_SIZE >= defaults::DEFAULT_MIN_BATCH_SIZE);
    }

    #[test]
    fn tier_gates_increase_with_tier() {
        assert!(defaults::TIER3_MIN_FILTERED_LEN > defaults::TIER2_MIN_FILTERED_LEN);
    }

    #[test]
    fn key_templates_interpolate_expected_layout() {
        assert_eq!(
            keys::memory_key("u1", "a1", "m1"),
            "memory:u1:a1:m1"
        );
        assert_eq!(
            keys::extraction_rules_key("u1", "a1"),
            "extraction-rules:u1:a1"
        );
        assert_eq!(keys::batch_metadata_key("b1"), "batch_metadata:b1");
        assert_eq!(keys::archive_key("a1", "m1"), "archive:a1:m1");
    }
}
