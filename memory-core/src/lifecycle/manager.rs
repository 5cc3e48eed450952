//! [`LifecycleManager`] (§4.7): the ordered decay → promote → cleanup →
//! enforce-limit pipeline.

use crate::constants::{defaults, keys};
use crate::decay::{DecayConfig, DecayEngine, DecayReport};
use crate::error::Result;
use crate::ports::storage::{SetOptions, StoragePort};
use crate::types::{AgentId, DecayRule, Memory, MemoryType, UserId};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::sync::Arc;
use tracing::info;

#[derive(Debug, Clone)]
pub struct LifecycleConfig {
    pub episodic_to_semantic_days: i64,
    pub min_importance_for_promotion: f64,
    pub min_access_count_for_promotion: u64,
    pub preserve_original: bool,
    pub archive_enabled: bool,
    pub archive_ttl_seconds: u64,
    pub max_memories_per_agent: usize,
    pub decay: DecayConfig,
}

impl Default for LifecycleConfig {
    fn default() -> Self {
        Self {
            episodic_to_semantic_days: defaults::DEFAULT_EPISODIC_TO_SEMANTIC_DAYS,
            min_importance_for_promotion: defaults::DEFAULT_MIN_IMPORTANCE_FOR_PROMOTION,
            min_access_count_for_promotion: defaults::DEFAULT_MIN_ACCESS_COUNT_FOR_PROMOTION,
            preserve_original: false,
            archive_enabled: true,
            archive_ttl_seconds: 30 * 24 * 3600,
            max_memories_per_agent: defaults::DEFAULT_MAX_MEMORIES_PER_AGENT,
            decay: DecayConfig::default(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LifecycleReport {
    pub decay: Option<DecayReport>,
    pub promoted: usize,
    pub archived: usize,
    pub cleaned: usize,
    pub limit_enforced: usize,
}

pub struct LifecycleManager {
    storage: Arc<dyn StoragePort>,
    decay_engine: DecayEngine,
    config: LifecycleConfig,
}

impl LifecycleManager {
    #[must_use]
    pub fn new(storage: Arc<dyn StoragePort>, config: LifecycleConfig) -> Self {
        let decay_engine = DecayEngine::new(storage.clone(), config.decay.clone());
        Self {
            storage,
            decay_engine,
            config,
        }
    }

    /// Step 1 (§4.7).
    ///
    /// # Errors
    /// Propagates storage failures.
    pub async fn run_decay(&self, user_id: &UserId, agent_id: &AgentId, rules: &[DecayRule], now_ms: i64) -> Result<DecayReport> {
        self.decay_engine.apply_decay(user_id, agent_id, rules, now_ms).await
    }

    /// Loads the decay rules an unattended scheduler trigger should apply,
    /// so callers don't need to hold their own [`DecayEngine`] just to
    /// prime [`Self::run_lifecycle`].
    ///
    /// # Errors
    /// Propagates storage failures.
    pub async fn load_decay_rules(&self, user_id: &UserId, agent_id: &AgentId) -> Result<Vec<DecayRule>> {
        self.decay_engine.load_rules(user_id, agent_id).await
    }

    /// Step 2 (§4.7): episodic → semantic promotion.
    ///
    /// # Errors
    /// Propagates storage failures.
    pub async fn run_promotion(&self, user_id: &UserId, agent_id: &AgentId, now_ms: i64) -> Result<usize> {
        let memories = self.storage.memory_list(user_id, agent_id).await?;
        let mut promoted = 0usize;

        for memory in memories {
            if memory.memory_type != MemoryType::Episodic {
                continue;
            }
            if memory.days_since_created(now_ms) < self.config.episodic_to_semantic_days as f64 {
                continue;
            }
            if memory.importance < self.config.min_importance_for_promotion {
                continue;
            }
            if memory.access_count < self.config.min_access_count_for_promotion {
                continue;
            }

            self.promote_one(user_id, agent_id, &memory, now_ms).await?;
            promoted += 1;
        }

        info!(promoted, "lifecycle promotion pass complete");
        Ok(promoted)
    }

    async fn promote_one(&self, user_id: &UserId, agent_id: &AgentId, original: &Memory, now_ms: i64) -> Result<()> {
        let mut semantic = Memory::new(
            crate::types::MemoryId::generate(),
            user_id.clone(),
            agent_id.clone(),
            original.content.clone(),
            MemoryType::Semantic,
            original.importance,
            original.created_at,
            now_ms,
        )?;

        // Pinned open question (§9): promoted memories inherit the
        // episodic origin's resonance rather than resetting to 1.0.
        semantic.resonance = original.resonance;
        semantic.keywords = original.keywords.clone();
        semantic.access_count = original.access_count;
        semantic.metadata = original.metadata.clone();
        semantic.metadata.insert("originalType".to_string(), json!("episodic"));
        semantic.metadata.insert("originalId".to_string(), json!(original.id.as_str()));
        semantic.metadata.insert("promotedAt".to_string(), json!(now_ms));
        semantic
            .metadata
            .insert("promotionReason".to_string(), json!("age, importance, and access-count thresholds met"));

        self.storage.memory_store(user_id, agent_id, &semantic).await?;
        info!(original_id = %original.id, new_id = %semantic.id, "promoted episodic memory to semantic");

        if !self.config.preserve_original {
            self.storage.memory_delete(user_id, agent_id, &original.id).await?;
        }

        Ok(())
    }

    /// Step 3 (§4.7): archive-then-delete any memory still under the
    /// decay-engine's delete threshold. In the ordinary pipeline this is a
    /// backstop — `run_decay` already deletes crossed-threshold memories
    /// directly — but catches memories whose resonance was lowered by
    /// means other than this cycle's own decay pass.
    ///
    /// # Errors
    /// Propagates storage failures.
    pub async fn run_cleanup(&self, user_id: &UserId, agent_id: &AgentId, now_ms: i64) -> Result<usize> {
        let memories = self.storage.memory_list(user_id, agent_id).await?;
        let mut cleaned = 0usize;

        for memory in memories {
            if memory.resonance < self.config.decay.delete_threshold {
                self.archive_then_delete(user_id, agent_id, &memory, now_ms).await?;
                cleaned += 1;
            }
        }

        info!(cleaned, "lifecycle cleanup pass complete");
        Ok(cleaned)
    }

    /// Step 4 (§4.7): enforce `maxMemoriesPerAgent`, evicting the weakest
    /// and oldest memories first.
    ///
    /// # Errors
    /// Propagates storage failures.
    pub async fn enforce_limit(&self, user_id: &UserId, agent_id: &AgentId, now_ms: i64) -> Result<usize> {
        let mut memories = self.storage.memory_list(user_id, agent_id).await?;
        if memories.len() <= self.config.max_memories_per_agent {
            return Ok(0);
        }

        memories.sort_by(|a, b| {
            a.resonance
                .partial_cmp(&b.resonance)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then(a.created_at.cmp(&b.created_at))
        });

        let excess = memories.len() - self.config.max_memories_per_agent;
        let mut removed = 0usize;
        for memory in memories.into_iter().take(excess) {
            self.archive_then_delete(user_id, agent_id, &memory, now_ms).await?;
            removed += 1;
        }

        info!(removed, "lifecycle limit enforcement complete");
        Ok(removed)
    }

    async fn archive_then_delete(&self, user_id: &UserId, agent_id: &AgentId, memory: &Memory, _now_ms: i64) -> Result<()> {
        if self.config.archive_enabled {
            let key = keys::archive_key(agent_id.as_str(), memory.id.as_str());
            let value = serde_json::to_value(memory)?;
            self.storage
                .set(
                    &key,
                    value,
                    SetOptions {
                        ttl_seconds: Some(self.config.archive_ttl_seconds),
                    },
                )
                .await?;
        }
        self.storage.memory_delete(user_id, agent_id, &memory.id).await?;
        info!(memory_id = %memory.id, event = "deletion", "memory removed during lifecycle");
        let _ = user_id;
        Ok(())
    }

    /// The full ordered pipeline (§4.7): decay, then promotion, then
    /// cleanup, then limit enforcement.
    ///
    /// # Errors
    /// Propagates storage failures from any stage.
    pub async fn run_lifecycle(&self, user_id: &UserId, agent_id: &AgentId, decay_rules: &[DecayRule], now_ms: i64) -> Result<LifecycleReport> {
        let decay = self.run_decay(user_id, agent_id, decay_rules, now_ms).await?;
        let promoted = self.run_promotion(user_id, agent_id, now_ms).await?;
        let cleaned = self.run_cleanup(user_id, agent_id, now_ms).await?;
        let limit_enforced = self.enforce_limit(user_id, agent_id, now_ms).await?;

        Ok(LifecycleReport {
            decay: Some(decay),
            promoted,
            archived: cleaned,
            cleaned,
            limit_enforced,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{MemoryId, UserId};
    use async_trait::async_trait;
    use std::collections::HashMap;
    use tokio::sync::Mutex;

    #[derive(Default)]
    struct StubStorage {
        memories: Mutex<HashMap<String, Memory>>,
        archive: Mutex<HashMap<String, serde_json::Value>>,
    }

    #[async_trait]
    impl StoragePort for StubStorage {
        async fn get(&self, key: &str) -> Result<Option<serde_json::Value>> {
            Ok(self.archive.lock().await.get(key).cloned())
        }
        async fn set(&self, key: &str, value: serde_json::Value, _opts: SetOptions) -> Result<()> {
            self.archive.lock().await.insert(key.to_string(), value);
            Ok(())
        }
        async fn delete(&self, key: &str) -> Result<bool> {
            Ok(self.archive.lock().await.remove(key).is_some())
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

    #[tokio::test]
    async fn scenario_episodic_promotion() {
        let storage = Arc::new(StubStorage::default());
        let user_id = UserId::from("u1");
        let agent_id = AgentId::from("a1");

        let eight_days_ago = -8 * 86_400_000;
        let mut episodic = Memory::new(
            MemoryId::from("m1"),
            user_id.clone(),
            agent_id.clone(),
            "learned something important",
            MemoryType::Episodic,
            0.7,
            eight_days_ago,
            eight_days_ago,
        )
        .unwrap();
        episodic.access_count = 5;
        storage.memory_store(&user_id, &agent_id, &episodic).await.unwrap();

        let config = LifecycleConfig {
            preserve_original: false,
            ..Default::default()
        };
        let manager = LifecycleManager::new(storage.clone(), config);
        let promoted = manager.run_promotion(&user_id, &agent_id, 0).await.unwrap();

        assert_eq!(promoted, 1);
        let remaining = storage.memory_list(&user_id, &agent_id).await.unwrap();
        assert_eq!(remaining.len(), 1);
        assert_eq!(remaining[0].memory_type, MemoryType::Semantic);
        assert_eq!(remaining[0].content, "learned something important");
        assert_eq!(
            remaining[0].metadata.get("originalId").unwrap().as_str().unwrap(),
            "m1"
        );
    }

    #[tokio::test]
    async fn enforce_limit_evicts_weakest_oldest_first() {
        let storage = Arc::new(StubStorage::default());
        let user_id = UserId::from("u1");
        let agent_id = AgentId::from("a1");

        for i in 0..5 {
            let mut mem = Memory::new(
                MemoryId::from(format!("m{i}")),
                user_id.clone(),
                agent_id.clone(),
                format!("content {i}"),
                MemoryType::Semantic,
                0.5,
                i as i64,
                i as i64,
            )
            .unwrap();
            mem.resonance = 0.5 + (i as f64) * 0.01;
            storage.memory_store(&user_id, &agent_id, &mem).await.unwrap();
        }

        let config = LifecycleConfig {
            max_memories_per_agent: 3,
            archive_enabled: false,
            ..Default::default()
        };
        let manager = LifecycleManager::new(storage.clone(), config);
        let removed = manager.enforce_limit(&user_id, &agent_id, 0).await.unwrap();

        assert_eq!(removed, 2);
        let remaining = storage.memory_list(&user_id, &agent_id).await.unwrap();
        assert_eq!(remaining.len(), 3);
        assert!(remaining.iter().all(|m| m.resonance >= 0.52));
    }
}
