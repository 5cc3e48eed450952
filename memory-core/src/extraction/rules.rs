//! [`RuleBasedExtractor`] (§4.5): zero-cost regex extraction with
//! ReDoS-safe wall-clock-bounded execution.

use super::traits::{ExtractionContext, Extractor};
use crate::constants::defaults::{REGEX_MAX_CHARS, REGEX_TIMEOUT_MS};
use crate::error::Result;
use crate::types::{Memory, MemoryId, MemoryMessage};
use async_trait::async_trait;
use regex::Regex;
use std::time::Duration;
use tracing::warn;

/// Applies every active [`crate::types::ExtractionRule`] to a message,
/// bounding each pattern to a 100 ms wall clock and the first 10,000
/// characters of content (§4.5). Never charged against `costBudget` (§9).
#[derive(Debug, Default)]
pub struct RuleBasedExtractor;

impl RuleBasedExtractor {
    #[must_use]
    pub fn new() -> Self {
        Self
    }

    /// Run one compiled pattern against `content`, bounded by the regex
    /// timeout. Patterns run on a blocking thread so a pathological regex
    /// cannot stall the async executor past the timeout window — `regex`
    /// has no native step budget, so wall-clock cancellation is the only
    /// backstop available.
    async fn run_pattern(pattern: Regex, content: String) -> Option<(usize, usize, Option<String>)> {
        let handle = tokio::task::spawn_blocking(move || {
            pattern.captures(&content).map(|caps| {
                let whole = caps.get(0).expect("capture 0 always present");
                let group1 = caps.get(1).map(|m| m.as_str().to_string());
                (whole.start(), whole.end(), group1)
            })
        });

        match tokio::time::timeout(Duration::from_millis(REGEX_TIMEOUT_MS), handle).await {
            Ok(Ok(matched)) => matched,
            Ok(Err(_join_err)) => None,
            Err(_timeout) => {
                warn!("regex pattern exceeded {REGEX_TIMEOUT_MS}ms wall-clock budget, skipping");
                None
            }
        }
    }
}

#[async_trait]
impl Extractor for RuleBasedExtractor {
    async fn extract(&self, message: &MemoryMessage, context: &ExtractionContext<'_>) -> Result<Vec<Memory>> {
        let mut out = Vec::new();
        let truncated: String = message.content.chars().take(REGEX_MAX_CHARS).collect();

        for rule in context.rules.iter().filter(|r| r.is_active) {
            let compiled = match Regex::new(&rule.pattern) {
                Ok(re) => re,
                Err(err) => {
                    warn!(rule_id = %rule.id, %err, "invalid extraction rule pattern, skipping");
                    continue;
                }
            };

            let Some((_start, _end, group1)) = Self::run_pattern(compiled, truncated.clone()).await else {
                continue;
            };

            let raw = group1.unwrap_or_else(|| truncated.clone());
            let cleaned = clean_extracted_content(&raw);
            if cleaned.is_empty() {
                continue;
            }

            let Ok(mut memory) = Memory::new(
                MemoryId::generate(),
                context.user_id.clone(),
                context.agent_id.clone(),
                cleaned,
                rule.memory_type,
                rule.importance,
                message.timestamp,
                context.now_ms,
            ) else {
                continue;
            };
            memory.never_decay = rule.never_decay;
            memory.source_message_ids = vec![message.id.clone()];
            out.push(memory);
        }

        Ok(out)
    }

    fn estimate_cost(&self, _messages: &[MemoryMessage]) -> f64 {
        0.0
    }

    fn extractor_type(&self) -> &'static str {
        "rules"
    }
}

/// Collapse internal whitespace and strip leading/trailing non-alphanumeric
/// characters (§4.5).
fn clean_extracted_content(raw: &str) -> String {
    let collapsed = raw.split_whitespace().collect::<Vec<_>>().join(" ");
    collapsed
        .trim_matches(|c: char| !c.is_alphanumeric())
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{AgentId, ExtractionRule, MemoryType, RuleId, UserId};

    fn msg(content: &str) -> MemoryMessage {
        MemoryMessage::new(
            "m1",
            AgentId::from("a1"),
            crate::types::Role::User,
            content,
            1_000,
        )
    }

    #[tokio::test]
    async fn matches_and_cleans_first_capture_group() {
        let extractor = RuleBasedExtractor::new();
        let rule = ExtractionRule::new(
            RuleId::from("r1"),
            r"I prefer (.+)",
            MemoryType::Semantic,
            0.8,
        );
        let user_id = UserId::from("u1");
        let agent_id = AgentId::from("a1");
        let rules = vec![rule];
        let ctx = ExtractionContext {
            user_id: &user_id,
            agent_id: &agent_id,
            rules: &rules,
            now_ms: 2_000,
        };

        let result = extractor.extract(&msg("I prefer dark mode"), &ctx).await.unwrap();
        assert_eq!(result.len(), 1);
        assert_eq!(result[0].content, "dark mode");
        assert_eq!(result[0].importance, 0.8);
    }

    #[tokio::test]
    async fn no_match_yields_empty() {
        let extractor = RuleBasedExtractor::new();
        let rule = ExtractionRule::new(
            RuleId::from("r1"),
            r"I prefer (.+)",
            MemoryType::Semantic,
            0.8,
        );
        let user_id = UserId::from("u1");
        let agent_id = AgentId::from("a1");
        let rules = vec![rule];
        let ctx = ExtractionContext {
            user_id: &user_id,
            agent_id: &agent_id,
            rules: &rules,
            now_ms: 2_000,
        };

        let result = extractor.extract(&msg("hi"), &ctx).await.unwrap();
        assert!(result.is_empty());
    }

    #[tokio::test]
    async fn invalid_pattern_is_skipped_not_fatal() {
        let extractor = RuleBasedExtractor::new();
        let rule = ExtractionRule::new(
            RuleId::from("r1"),
            r"(unclosed",
            MemoryType::Semantic,
            0.8,
        );
        let user_id = UserId::from("u1");
        let agent_id = AgentId::from("a1");
        let rules = vec![rule];
        let ctx = ExtractionContext {
            user_id: &user_id,
            agent_id: &agent_id,
            rules: &rules,
            now_ms: 2_000,
        };

        let result = extractor.extract(&msg("anything"), &ctx).await.unwrap();
        assert!(result.is_empty());
    }

    #[test]
    fn clean_extracted_content_collapses_and_trims() {
        assert_eq!(clean_extracted_content("  dark   mode!! "), "dark mode");
        assert_eq!(clean_extracted_content("..."), "");
    }

    #[test]
    fn estimate_cost_is_always_zero() {
        assert_eq!(RuleBasedExtractor::new().estimate_cost(&[]), 0.0);
    }
}
