//! [`NoiseFilter`] (§4.4): drops short, pattern-matched, or low-information
//! messages before they reach the extraction tiers.

use crate::error::Result;
use crate::ports::LlmPort;
use regex::Regex;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::timeout;
use tracing::warn;

/// Configuration recognised under `noiseFiltering` (§4.1).
#[derive(Debug, Clone)]
pub struct NoiseFilterConfig {
    pub min_message_length: usize,
    pub custom_patterns: Vec<String>,
    pub heuristic_based: bool,
    pub perplexity_threshold: Option<f64>,
    /// When set, a meaningfulness check runs through this port as a last
    /// resort. Fails open (§4.4): any error or ambiguous answer keeps the
    /// message.
    pub llm_check_enabled: bool,
    pub llm_timeout: Duration,
}

impl Default for NoiseFilterConfig {
    fn default() -> Self {
        Self {
            min_message_length: crate::constants::defaults::DEFAULT_MIN_MESSAGE_LENGTH,
            custom_patterns: Vec::new(),
            heuristic_based: false,
            perplexity_threshold: None,
            llm_check_enabled: false,
            llm_timeout: crate::constants::defaults::DEFAULT_NOISE_LLM_TIMEOUT,
        }
    }
}

pub struct NoiseFilter {
    config: NoiseFilterConfig,
    llm: Option<Arc<dyn LlmPort>>,
}

impl NoiseFilter {
    #[must_use]
    pub fn new(config: NoiseFilterConfig, llm: Option<Arc<dyn LlmPort>>) -> Self {
        Self { config, llm }
    }

    /// Returns `true` when the message survives filtering, in the order
    /// given by §4.4 (first check to fail drops it).
    pub async fn is_meaningful(&self, content: &str) -> bool {
        if content.len() < self.config.min_message_length {
            return false;
        }

        for pattern in &self.config.custom_patterns {
            match Regex::new(pattern) {
                Ok(re) => {
                    if re.is_match(content) {
                        return false;
                    }
                }
                Err(err) => {
                    warn!(pattern, %err, "invalid custom noise pattern, skipping");
                }
            }
        }

        if self.config.heuristic_based {
            if let Some(threshold) = self.config.perplexity_threshold {
                if perplexity(content) > threshold {
                    return false;
                }
            }
        }

        if self.config.llm_check_enabled {
            if let Some(llm) = &self.llm {
                return self.llm_check(llm, content).await;
            }
        }

        true
    }

    /// Filter a batch of message contents, keeping only the meaningful ones
    /// in order.
    pub async fn filter<'a>(&self, contents: &'a [String]) -> Vec<&'a str> {
        let mut kept = Vec::with_capacity(contents.len());
        for content in contents {
            if self.is_meaningful(content).await {
                kept.push(content.as_str());
            }
        }
        kept
    }

    /// Filter a batch of messages, keeping only those whose content is
    /// meaningful, in order. Used directly by [`crate::batch::processor`]
    /// so tiered extraction stays anchored to whole messages rather than
    /// bare strings.
    pub async fn filter_messages<'a>(&self, messages: &'a [crate::types::MemoryMessage]) -> Vec<&'a crate::types::MemoryMessage> {
        let mut kept = Vec::with_capacity(messages.len());
        for message in messages {
            if self.is_meaningful(&message.content).await {
                kept.push(message);
            }
        }
        kept
    }

    async fn llm_check(&self, llm: &Arc<dyn LlmPort>, content: &str) -> bool {
        let prompt = format!(
            "Is the following content meaningful (not noise, filler, or boilerplate)? \
             Answer with exactly YES or NO.\n\nContent: {content}"
        );

        let result = timeout(self.config.llm_timeout, llm.stream_text(&prompt)).await;

        match result {
            Ok(Ok(response)) => {
                let answer = response.text.trim().to_ascii_uppercase();
                // Fail-open: only an explicit NO drops the message.
                answer != "NO"
            }
            Ok(Err(err)) => {
                warn!(%err, "noise-filter LLM check failed, keeping message (fail-open)");
                true
            }
            Err(_) => {
                warn!("noise-filter LLM check timed out, keeping message (fail-open)");
                true
            }
        }
    }
}

/// `words / uniqueWords` heuristic (§4.4). Higher means more repetitive.
#[must_use]
pub fn perplexity(content: &str) -> f64 {
    let words: Vec<&str> = content.split_whitespace().collect();
    if words.is_empty() {
        return 0.0;
    }
    let unique: std::collections::HashSet<&str> = words.iter().copied().collect();
    words.len() as f64 / unique.len() as f64
}

/// Needed by callers that only want the pure regex/length checks without
/// constructing a full filter (e.g. rule validation at config time).
pub fn validate_patterns(patterns: &[String]) -> Result<()> {
    for pattern in patterns {
        Regex::new(pattern)
            .map_err(|err| crate::error::Error::invalid_argument(format!("invalid noise pattern {pattern:?}: {err}")))?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn drops_messages_below_min_length() {
        let filter = NoiseFilter::new(
            NoiseFilterConfig {
                min_message_length: 10,
                ..Default::default()
            },
            None,
        );
        assert!(!filter.is_meaningful("hi").await);
        assert!(filter.is_meaningful("this is long enough").await);
    }

    #[tokio::test]
    async fn drops_on_custom_pattern_match() {
        let filter = NoiseFilter::new(
            NoiseFilterConfig {
                min_message_length: 0,
                custom_patterns: vec!["^ok$".to_string()],
                ..Default::default()
            },
            None,
        );
        assert!(!filter.is_meaningful("ok").await);
        assert!(filter.is_meaningful("ok thanks for the detailed explanation").await);
    }

    #[tokio::test]
    async fn malformed_pattern_is_skipped_not_fatal() {
        let filter = NoiseFilter::new(
            NoiseFilterConfig {
                min_message_length: 0,
                custom_patterns: vec!["(unclosed".to_string()],
                ..Default::default()
            },
            None,
        );
        assert!(filter.is_meaningful("still here").await);
    }

    #[tokio::test]
    async fn perplexity_drops_repetitive_content() {
        let filter = NoiseFilter::new(
            NoiseFilterConfig {
                min_message_length: 0,
                heuristic_based: true,
                perplexity_threshold: Some(2.0),
                ..Default::default()
            },
            None,
        );
        assert!(!filter.is_meaningful("go go go go go go").await);
        assert!(filter.is_meaningful("a fully unique sentence indeed").await);
    }

    #[test]
    fn perplexity_is_ratio_of_words_to_unique_words() {
        assert!((perplexity("a a a a") - 4.0).abs() < 1e-9);
        assert!((perplexity("a b c d") - 1.0).abs() < 1e-9);
        assert_eq!(perplexity(""), 0.0);
    }
}
