//! [`MemoryMessage`] — the immutable inbound conversational unit (§3).

use super::ids::AgentId;
use serde::{Deserialize, Serialize};

/// Speaker role of a [`MemoryMessage`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
    System,
}

/// An inbound conversational unit. Immutable once constructed — the
/// `BatchProcessor` only ever reads these out of its buffer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MemoryMessage {
    pub id: String,
    pub agent_id: AgentId,
    pub role: Role,
    pub content: String,
    /// ms epoch.
    pub timestamp: i64,
}

impl MemoryMessage {
    #[must_use]
    pub fn new(id: impl Into<String>, agent_id: AgentId, role: Role, content: impl Into<String>, timestamp: i64) -> Self {
        Self {
            id: id.into(),
            agent_id,
            role,
            content: content.into(),
            timestamp,
        }
    }
}
