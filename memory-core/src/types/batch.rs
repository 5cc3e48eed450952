//! [`BatchMetadata`] — written exactly once per batch decision (§3, §4.1).

use super::ids::BatchId;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchMetadata {
    pub batch_id: BatchId,
    pub source_message_ids: Vec<String>,
    pub start_time: i64,
    pub end_time: i64,
    pub messages_processed: usize,
    pub memories_created: usize,
    pub extraction_methods: Vec<String>,
    #[serde(default)]
    pub error: Option<String>,
}

impl BatchMetadata {
    /// A batch metadata record for a batch that was sampled out entirely
    /// (§4.1, scenario 2: `extractionMethods = ["skipped"]`).
    #[must_use]
    pub fn skipped(batch_id: BatchId, source_message_ids: Vec<String>, start_time: i64, end_time: i64) -> Self {
        let messages_processed = source_message_ids.len();
        Self {
            batch_id,
            source_message_ids,
            start_time,
            end_time,
            messages_processed,
            memories_created: 0,
            extraction_methods: vec!["skipped".to_string()],
            error: None,
        }
    }

    /// A batch metadata record for a batch that raised before completing
    /// (§4.1: "A batch-level exception still writes a `BatchMetadata` with
    /// `extractionMethods = ["error"]`").
    #[must_use]
    pub fn errored(
        batch_id: BatchId,
        source_message_ids: Vec<String>,
        start_time: i64,
        end_time: i64,
        error: impl Into<String>,
    ) -> Self {
        let messages_processed = source_message_ids.len();
        Self {
            batch_id,
            source_message_ids,
            start_time,
            end_time,
            messages_processed,
            memories_created: 0,
            extraction_methods: vec!["error".to_string()],
            error: Some(error.into()),
        }
    }
}
