//! `EmbeddingPort` (§6): optional vector-embedding capability.
//!
//! Nothing in §4 requires embeddings to function — the decay, lifecycle,
//! and graph subsystems are all keyed on ids and scalar fields — but the
//! PRIME extractor's noise filter and future retrieval layers may use one.

use crate::error::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use super::llm::Usage;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmbeddingOutput {
    pub embedding: Vec<f32>,
    pub usage: Usage,
}

#[async_trait]
pub trait EmbeddingPort: Send + Sync {
    /// Embed `text` into a fixed-size vector.
    ///
    /// # Errors
    /// Returns [`crate::error::Error::Transient`] on a retryable provider
    /// failure.
    async fn embed(&self, text: &str) -> Result<EmbeddingOutput>;
}
