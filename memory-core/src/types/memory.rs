//! The [`Memory`] entity (§3).

use super::ids::{AgentId, BatchId, MemoryId, UserId};
use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::{HashMap, HashSet};

/// The four memory tiers named in §3 and used throughout promotion (§4.7).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MemoryType {
    Working,
    Episodic,
    Semantic,
    Procedural,
}

impl MemoryType {
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            MemoryType::Working => "working",
            MemoryType::Episodic => "episodic",
            MemoryType::Semantic => "semantic",
            MemoryType::Procedural => "procedural",
        }
    }
}

impl std::str::FromStr for MemoryType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "working" => Ok(MemoryType::Working),
            "episodic" => Ok(MemoryType::Episodic),
            "semantic" => Ok(MemoryType::Semantic),
            "procedural" => Ok(MemoryType::Procedural),
            other => Err(Error::invalid_argument(format!(
                "unknown memory type: {other}"
            ))),
        }
    }
}

/// A durable extracted fact (§3).
///
/// Construction goes through [`Memory::new`], which enforces the
/// invariants the rest of the system relies on: non-empty content,
/// `importance`/`resonance` within `[0,1]`, and `createdAt <= updatedAt`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Memory {
    pub id: MemoryId,
    pub user_id: UserId,
    pub agent_id: AgentId,
    pub content: String,
    #[serde(rename = "type")]
    pub memory_type: MemoryType,
    pub importance: f64,
    pub resonance: f64,
    pub access_count: u64,
    pub created_at: i64,
    pub updated_at: i64,
    pub last_accessed_at: i64,
    #[serde(default)]
    pub keywords: HashSet<String>,
    #[serde(default)]
    pub metadata: HashMap<String, Value>,
    #[serde(default)]
    pub source_message_ids: Vec<String>,
    #[serde(default)]
    pub batch_id: Option<BatchId>,
    /// Never decays when true (§3, §4.6).
    #[serde(default)]
    pub never_decay: bool,
}

impl Memory {
    /// Construct a new memory at `resonance = 1.0`, validating the §3
    /// invariants. `now` is passed in rather than read from the clock so
    /// callers (extractors preserving message timestamps, §4.3) control it.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        id: MemoryId,
        user_id: UserId,
        agent_id: AgentId,
        content: impl Into<String>,
        memory_type: MemoryType,
        importance: f64,
        created_at: i64,
        now: i64,
    ) -> Result<Self> {
        let content = content.into();
        if content.trim().is_empty() {
            return Err(Error::invalid_argument("memory content must not be empty"));
        }
        if !(0.0..=1.0).contains(&importance) {
            return Err(Error::invalid_argument(format!(
                "importance {importance} out of range [0,1]"
            )));
        }
        if created_at > now {
            return Err(Error::invalid_argument(
                "createdAt must not be after updatedAt",
            ));
        }

        Ok(Self {
            id,
            user_id,
            agent_id,
            content,
            memory_type,
            importance,
            resonance: 1.0,
            access_count: 0,
            created_at,
            updated_at: now,
            last_accessed_at: created_at,
            keywords: HashSet::new(),
            metadata: HashMap::new(),
            source_message_ids: Vec::new(),
            batch_id: None,
            never_decay: false,
        })
    }

    /// Days elapsed since creation, as used by the decay expression grammar
    /// (`daysSinceCreated()`, §4.6).
    #[must_use]
    pub fn days_since_created(&self, now_ms: i64) -> f64 {
        ms_to_days(now_ms.saturating_sub(self.created_at))
    }

    /// Days elapsed since last access (defaults to `createdAt` when unset,
    /// per §4.6), used both by the decay formula and the grammar's
    /// `daysSinceAccessed()`.
    #[must_use]
    pub fn days_since_accessed(&self, now_ms: i64) -> f64 {
        let anchor = if self.last_accessed_at == 0 {
            self.created_at
        } else {
            self.last_accessed_at
        };
        ms_to_days(now_ms.saturating_sub(anchor))
    }

    /// Reinforce the memory via an access: bump `accessCount`, update
    /// `lastAccessedAt`, and refresh `updatedAt` (§3 "reinforcement").
    pub fn reinforce(&mut self, now_ms: i64) {
        self.access_count += 1;
        self.last_accessed_at = now_ms;
        self.updated_at = now_ms;
    }
}

fn ms_to_days(ms: i64) -> f64 {
    ms as f64 / 86_400_000.0
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ids() -> (MemoryId, UserId, AgentId) {
        (
            MemoryId::from("m1"),
            UserId::from("u1"),
            AgentId::from("a1"),
        )
    }

    #[test]
    fn new_rejects_empty_content() {
        let (id, user, agent) = ids();
        let err = Memory::new(id, user, agent, "   ", MemoryType::Semantic, 0.5, 0, 0)
            .unwrap_err();
        assert!(matches!(err, Error::InvalidArgument(_)));
    }

    #[test]
    fn new_rejects_out_of_range_importance() {
        let (id, user, agent) = ids();
        let err = Memory::new(id, user, agent, "hello", MemoryType::Semantic, 1.5, 0, 0)
            .unwrap_err();
        assert!(matches!(err, Error::InvalidArgument(_)));
    }

    #[test]
    fn new_sets_resonance_to_one() {
        let (id, user, agent) = ids();
        let mem = Memory::new(id, user, agent, "hello", MemoryType::Semantic, 0.5, 100, 200)
            .unwrap();
        assert_eq!(mem.resonance, 1.0);
        assert_eq!(mem.created_at, 100);
        assert_eq!(mem.updated_at, 200);
        assert_eq!(mem.last_accessed_at, 100);
    }

    #[test]
    fn reinforce_bumps_access_and_timestamps() {
        let (id, user, agent) = ids();
        let mut mem = Memory::new(id, user, agent, "hello", MemoryType::Semantic, 0.5, 0, 0)
            .unwrap();
        mem.reinforce(5_000);
        assert_eq!(mem.access_count, 1);
        assert_eq!(mem.last_accessed_at, 5_000);
        assert_eq!(mem.updated_at, 5_000);
    }

    #[test]
    fn days_since_accessed_defaults_to_created_when_unset() {
        let (id, user, agent) = ids();
        let mut mem = Memory::new(id, user, agent, "hello", MemoryType::Semantic, 0.5, 0, 0)
            .unwrap();
        mem.last_accessed_at = 0;
        let ten_days_ms = 10 * 86_400_000;
        assert!((mem.days_since_accessed(ten_days_ms) - 10.0).abs() < 1e-6);
    }

    #[test]
    fn memory_type_round_trips_through_str() {
        for ty in [
            MemoryType::Working,
            MemoryType::Episodic,
            MemoryType::Semantic,
            MemoryType::Procedural,
        ] {
            let parsed: MemoryType = ty.as_str().parse().unwrap();
            assert_eq!(parsed.as_str(), ty.as_str());
        }
        assert!("bogus".parse::<MemoryType>().is_err());
    }
}
