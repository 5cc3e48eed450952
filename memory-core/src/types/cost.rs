//! [`CostRecord`] — append-only per-extraction cost entry (§3).

use super::ids::AgentId;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CostRecord {
    pub agent_id: AgentId,
    pub extractor_type: String,
    pub cost: f64,
    pub memories_extracted: usize,
    pub messages_processed: usize,
    #[serde(default)]
    pub metadata: HashMap<String, Value>,
    pub recorded_at: i64,
}
