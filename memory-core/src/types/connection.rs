//! [`Connection`] — a directed edge between two memories (§3).
//!
//! Graph traversal (§4.8) treats connections as undirected; storage and
//! wire representation stay directed (`sourceId -> targetId`) so adapters
//! can index either endpoint.

use super::ids::MemoryId;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Connection {
    pub source_id: MemoryId,
    pub target_id: MemoryId,
    #[serde(rename = "type")]
    pub connection_type: String,
    pub strength: f64,
    #[serde(default)]
    pub metadata: HashMap<String, Value>,
}

impl Connection {
    #[must_use]
    pub fn new(source_id: MemoryId, target_id: MemoryId, connection_type: impl Into<String>, strength: f64) -> Self {
        Self {
            source_id,
            target_id,
            connection_type: connection_type.into(),
            strength,
            metadata: HashMap::new(),
        }
    }
}
