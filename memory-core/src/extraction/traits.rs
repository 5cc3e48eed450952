//! The shared [`Extractor`] contract (§4.2): every tier — rules, small LLM,
//! large LLM, PRIME — implements the same three operations.

use crate::error::Result;
use crate::types::{AgentId, ExtractionRule, Memory, MemoryMessage, UserId};
use async_trait::async_trait;

/// Ambient data every extractor needs but that isn't part of the message
/// itself: ownership, active rules to embed as guidance (§4.2 "up to five
/// user-rule guidance snippets"), and the wall clock for timestamping.
#[derive(Debug, Clone)]
pub struct ExtractionContext<'a> {
    pub user_id: &'a UserId,
    pub agent_id: &'a AgentId,
    pub rules: &'a [ExtractionRule],
    pub now_ms: i64,
}

#[async_trait]
pub trait Extractor: Send + Sync {
    /// Extract zero or more memories from one message. Must never throw for
    /// a parse/provider failure (§4.2 "Failure policy") — return an empty
    /// list and let the caller log it.
    async fn extract(&self, message: &MemoryMessage, context: &ExtractionContext<'_>) -> Result<Vec<Memory>>;

    /// `totalChars/4 × costPerMemory` estimate (§4.2) used by the cost
    /// budget gate before this extractor is invoked.
    fn estimate_cost(&self, messages: &[MemoryMessage]) -> f64;

    /// One of `"rules" | "small-llm" | "large-llm" | "prime"` (§4.2).
    fn extractor_type(&self) -> &'static str;
}
