//! [`DecayEngine`] (§4.6): exponential resonance decay driven by the first
//! matching safe-grammar rule, with deletion past a threshold.

use super::expr;
use crate::constants::{defaults, keys};
use crate::error::Result;
use crate::ports::storage::StoragePort;
use crate::types::{AgentId, DecayRule, DecayRuleId, Memory, UserId};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::info;

#[derive(Debug, Clone)]
pub struct DecayConfig {
    pub default_decay_rate: f64,
    pub default_min_importance: f64,
    pub delete_threshold: f64,
}

impl Default for DecayConfig {
    fn default() -> Self {
        Self {
            default_decay_rate: defaults::DEFAULT_DECAY_RATE_PER_DAY,
            default_min_importance: defaults::DEFAULT_MIN_IMPORTANCE,
            delete_threshold: defaults::DEFAULT_DELETE_THRESHOLD,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RuleResult {
    pub rule_id: DecayRuleId,
    pub rule_name: String,
    pub memories_affected: usize,
    pub avg_decay_applied: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DecayReport {
    pub processed: usize,
    pub updated: usize,
    pub deleted: usize,
    pub timestamp: i64,
    pub rule_results: Vec<RuleResult>,
}

pub struct DecayEngine {
    storage: Arc<dyn StoragePort>,
    config: DecayConfig,
}

impl DecayEngine {
    #[must_use]
    pub fn new(storage: Arc<dyn StoragePort>, config: DecayConfig) -> Self {
        Self { storage, config }
    }

    /// Fetch decay rules from the conventional key (§9 "Open questions" —
    /// rules are user state, adapter-defined placement; see
    /// [`keys::decay_rules_key`]).
    ///
    /// # Errors
    /// Returns an error on storage failure or malformed stored rules.
    pub async fn load_rules(&self, user_id: &UserId, agent_id: &AgentId) -> Result<Vec<DecayRule>> {
        let key = keys::decay_rules_key(user_id.as_str(), agent_id.as_str());
        match self.storage.get(&key).await? {
            Some(value) => serde_json::from_value(value).map_err(crate::error::Error::from),
            None => Ok(Vec::new()),
        }
    }

    /// Run one decay cycle over every memory owned by `(userId, agentId)`
    /// (§4.6).
    ///
    /// # Errors
    /// Returns an error on storage failure while listing, writing back, or
    /// deleting memories.
    pub async fn apply_decay(&self, user_id: &UserId, agent_id: &AgentId, rules: &[DecayRule], now_ms: i64) -> Result<DecayReport> {
        let memories = self.storage.memory_list(user_id, agent_id).await?;
        let processed = memories.len();
        let mut updated = 0usize;
        let mut deleted = 0usize;
        let mut per_rule: HashMap<DecayRuleId, (String, usize, f64)> = HashMap::new();

        for mut memory in memories {
            let before = memory.resonance;

            if memory.never_decay {
                continue;
            }

            let matched_rule = rules.iter().filter(|r| r.enabled).find(|r| expr::evaluate(&r.condition, &memory, now_ms));
            let (decay_rate, min_importance, never_decay_rule) = matched_rule
                .map(|r| (r.decay_rate, r.min_importance, r.never_decay))
                .unwrap_or((self.config.default_decay_rate, self.config.default_min_importance, false));

            let days = memory.days_since_accessed(now_ms);
            let new_resonance = if never_decay_rule {
                memory.resonance.max(min_importance)
            } else {
                (memory.resonance * (-decay_rate * days).exp()).max(min_importance)
            };

            if (new_resonance - before).abs() > f64::EPSILON {
                memory.resonance = new_resonance;
                memory.updated_at = now_ms;
                updated += 1;

                if let Some(rule) = matched_rule {
                    let entry = per_rule
                        .entry(rule.id.clone())
                        .or_insert_with(|| (rule.name.clone(), 0, 0.0));
                    entry.1 += 1;
                    entry.2 += before - new_resonance;
                }
            }

            if new_resonance < self.config.delete_threshold {
                self.storage.memory_delete(user_id, agent_id, &memory.id).await?;
                deleted += 1;
            } else if (new_resonance - before).abs() > f64::EPSILON {
                self.storage.memory_store(user_id, agent_id, &memory).await?;
            }
        }

        let rule_results = per_rule
            .into_iter()
            .map(|(rule_id, (rule_name, affected, total_decay))| RuleResult {
                rule_id,
                rule_name,
                memories_affected: affected,
                avg_decay_applied: if affected > 0 { total_decay / affected as f64 } else { 0.0 },
            })
            .collect();

        info!(processed, updated, deleted, "decay cycle complete");

        Ok(DecayReport {
            processed,
            updated,
            deleted,
            timestamp: now_ms,
            rule_results,
        })
    }
}

/// Pure decay formula (§4.6), exposed standalone for unit testing and for
/// [`crate::lifecycle`] previews.
#[must_use]
pub fn decayed_resonance(memory: &Memory, decay_rate: f64, min_importance: f64, now_ms: i64) -> f64 {
    let days = memory.days_since_accessed(now_ms);
    (memory.resonance * (-decay_rate * days).exp()).max(min_importance)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{MemoryId, MemoryType, UserId};
    use async_trait::async_trait;
    use tokio::sync::Mutex;

    #[derive(Default)]
    struct StubStorage {
        memories: Mutex<HashMap<String, Memory>>,
    }

    #[async_trait]
    impl StoragePort for StubStorage {
        async fn get(&self, _key: &str) -> Result<Option<serde_json::Value>> {
            Ok(None)
        }
        async fn set(&self, _key: &str, _value: serde_json::Value, _opts: crate::ports::storage::SetOptions) -> Result<()> {
            Ok(())
        }
        async fn delete(&self, _key: &str) -> Result<bool> {
            Ok(false)
        }
        async fn list(&self, _prefix: &str) -> Result<Vec<String>> {
            Ok(Vec::new())
        }
        async fn memory_store(&self, _user_id: &UserId, _agent_id: &AgentId, memory: &Memory) -> Result<()> {
            self.memories.lock().await.insert(memory.id.as_str().to_string(), memory.clone());
            Ok(())
        }
        async fn memory_get(&self, _user_id: &UserId, _agent_id: &AgentId, id: &MemoryId) -> Result<Option<Memory>> {
            Ok(self.memories.lock().await.get(id.as_str()).cloned())
        }
        async fn memory_delete(&self, _user_id: &UserId, _agent_id: &AgentId, id: &MemoryId) -> Result<bool> {
            Ok(self.memories.lock().await.remove(id.as_str()).is_some())
        }
        async fn memory_list(&self, _user_id: &UserId, _agent_id: &AgentId) -> Result<Vec<Memory>> {
            Ok(self.memories.lock().await.values().cloned().collect())
        }
    }

    fn ten_day_old_memory(resonance: f64) -> Memory {
        let mut m = Memory::new(
            MemoryId::from("m1"),
            UserId::from("u1"),
            AgentId::from("a1"),
            "content",
            MemoryType::Semantic,
            0.5,
            0,
            0,
        )
        .unwrap();
        m.resonance = resonance;
        m.last_accessed_at = 0;
        m
    }

    #[tokio::test]
    async fn scenario_decay_cycle_retains_memory() {
        let storage = Arc::new(StubStorage::default());
        let memory = ten_day_old_memory(1.0);
        storage.memory_store(&UserId::from("u1"), &AgentId::from("a1"), &memory).await.unwrap();

        let engine = DecayEngine::new(storage.clone(), DecayConfig::default());
        let ten_days_ms = 10 * 86_400_000;
        let report = engine
            .apply_decay(&UserId::from("u1"), &AgentId::from("a1"), &[], ten_days_ms)
            .await
            .unwrap();

        assert_eq!(report.processed, 1);
        assert_eq!(report.deleted, 0);
        let stored = storage.memory_get(&UserId::from("u1"), &AgentId::from("a1"), &MemoryId::from("m1")).await.unwrap().unwrap();
        assert!((stored.resonance - 0.3679).abs() < 0.001);
    }

    #[tokio::test]
    async fn scenario_decay_to_delete() {
        let storage = Arc::new(StubStorage::default());
        let memory = ten_day_old_memory(1.0);
        storage.memory_store(&UserId::from("u1"), &AgentId::from("a1"), &memory).await.unwrap();

        let engine = DecayEngine::new(storage.clone(), DecayConfig::default());
        let thirty_days_ms = 30 * 86_400_000;
        let report = engine
            .apply_decay(&UserId::from("u1"), &AgentId::from("a1"), &[], thirty_days_ms)
            .await
            .unwrap();

        assert_eq!(report.deleted, 1);
        assert!(storage.memory_get(&UserId::from("u1"), &AgentId::from("a1"), &MemoryId::from("m1")).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn never_decay_memory_is_untouched() {
        let storage = Arc::new(StubStorage::default());
        let mut memory = ten_day_old_memory(1.0);
        memory.never_decay = true;
        storage.memory_store(&UserId::from("u1"), &AgentId::from("a1"), &memory).await.unwrap();

        let engine = DecayEngine::new(storage.clone(), DecayConfig::default());
        let thirty_days_ms = 30 * 86_400_000;
        engine
            .apply_decay(&UserId::from("u1"), &AgentId::from("a1"), &[], thirty_days_ms)
            .await
            .unwrap();

        let stored = storage.memory_get(&UserId::from("u1"), &AgentId::from("a1"), &MemoryId::from("m1")).await.unwrap().unwrap();
        assert_eq!(stored.resonance, 1.0);
    }
}
