//! [`BatchProcessor`] (§4.1): the orchestrator tying buffering, noise
//! filtering, sampling, tiered extraction, and persistence together.

use super::buffer::MessageBuffer;
use super::config::BatchConfig;
use super::optimizer::CostOptimizer;
use crate::constants::keys;
use crate::cost::CostTracker;
use crate::error::{Error, Result};
use crate::extraction::sampling::{batch_fingerprint, derive_batch_id, should_extract};
use crate::extraction::{ExtractionContext, Extractor, RuleBasedExtractor};
use crate::noise::NoiseFilter;
use crate::ports::storage::{SetOptions, StoragePort};
use crate::types::{AgentId, BatchMetadata, ExtractionRule, Memory, MemoryMessage, UserId};
use std::collections::BTreeSet;
use std::sync::Arc;
use tracing::{error, warn};

pub struct BatchProcessor {
    storage: Arc<dyn StoragePort>,
    cost: Arc<CostTracker>,
    rules_extractor: RuleBasedExtractor,
    small_llm: Option<Arc<dyn Extractor>>,
    large_llm: Option<Arc<dyn Extractor>>,
    noise_filter: NoiseFilter,
    config: BatchConfig,
    buffer: MessageBuffer,
}

impl BatchProcessor {
    #[must_use]
    pub fn new(
        storage: Arc<dyn StoragePort>,
        cost: Arc<CostTracker>,
        config: BatchConfig,
        noise_filter: NoiseFilter,
        small_llm: Option<Arc<dyn Extractor>>,
        large_llm: Option<Arc<dyn Extractor>>,
    ) -> Self {
        Self {
            storage,
            cost,
            rules_extractor: RuleBasedExtractor::new(),
            small_llm,
            large_llm,
            noise_filter,
            config,
            buffer: MessageBuffer::new(),
        }
    }

    /// Append one message and, if the buffer became ripe, process it
    /// (§4.1). `now_ms` is threaded explicitly so callers (and tests)
    /// control the wall clock instead of this reading it internally.
    ///
    /// # Errors
    /// Returns [`Error::InvalidArgument`] if `user_id` is empty.
    pub async fn add_message(&self, user_id: UserId, agent_id: AgentId, msg: MemoryMessage, now_ms: i64) -> Result<Vec<Memory>> {
        if user_id.is_empty() {
            return Err(Error::invalid_argument("userId must not be empty"));
        }

        let drained = self
            .buffer
            .append_and_maybe_drain(user_id.clone(), agent_id.clone(), msg, &self.config, now_ms)
            .await;

        match drained {
            Some(messages) => self.process_batch(&user_id, &agent_id, messages, now_ms).await,
            None => Ok(Vec::new()),
        }
    }

    /// One-shot processing of caller-supplied messages, bypassing the
    /// buffer entirely (§4.1 `process`).
    ///
    /// # Errors
    /// Returns [`Error::InvalidArgument`] if `user_id` is empty.
    pub async fn process(&self, user_id: UserId, agent_id: AgentId, messages: Vec<MemoryMessage>, now_ms: i64) -> Result<Vec<Memory>> {
        if user_id.is_empty() {
            return Err(Error::invalid_argument("userId must not be empty"));
        }
        self.process_batch(&user_id, &agent_id, messages, now_ms).await
    }

    async fn process_batch(&self, user_id: &UserId, agent_id: &AgentId, messages: Vec<MemoryMessage>, now_ms: i64) -> Result<Vec<Memory>> {
        let start_time = messages.first().map_or(now_ms, |m| m.timestamp);
        let source_message_ids: Vec<String> = messages.iter().map(|m| m.id.clone()).collect();
        let messages_processed = messages.len();
        let fingerprint = batch_fingerprint(user_id, agent_id, &messages);
        let batch_id = derive_batch_id(&fingerprint);

        if !should_extract(&fingerprint, self.config.extraction_rate) {
            let meta = BatchMetadata::skipped(batch_id, source_message_ids, start_time, now_ms);
            self.persist_batch_metadata(&meta).await?;
            return Ok(Vec::new());
        }

        match self.run_pipeline(user_id, agent_id, &messages, now_ms).await {
            Ok((memories, methods)) => {
                let meta = BatchMetadata {
                    batch_id,
                    source_message_ids,
                    start_time,
                    end_time: now_ms,
                    messages_processed,
                    memories_created: memories.len(),
                    extraction_methods: methods.into_iter().collect(),
                    error: None,
                };
                self.persist_batch_metadata(&meta).await?;
                Ok(memories)
            }
            Err(err) => {
                let meta = BatchMetadata::errored(batch_id, source_message_ids, start_time, now_ms, err.to_string());
                if let Err(write_err) = self.persist_batch_metadata(&meta).await {
                    error!(%write_err, "failed to persist error BatchMetadata after pipeline failure");
                }
                Err(err)
            }
        }
    }

    /// The extraction pipeline itself (§4.1 steps 1–8), run only once a
    /// batch has been sampled in.
    async fn run_pipeline(
        &self,
        user_id: &UserId,
        agent_id: &AgentId,
        messages: &[MemoryMessage],
        now_ms: i64,
    ) -> Result<(Vec<Memory>, BTreeSet<String>)> {
        let rules = self.fetch_rules(user_id, agent_id).await?;
        let filtered = self.noise_filter.filter_messages(messages).await;
        let eligibility = CostOptimizer::plan(&self.config, &filtered);

        let context = ExtractionContext {
            user_id,
            agent_id,
            rules: &rules,
            now_ms,
        };

        let mut methods = BTreeSet::new();
        let mut produced: Vec<Memory> = Vec::new();

        for message in filtered.iter().copied() {
            let tier1 = self.extract_with(&self.rules_extractor, message, &context).await;
            let tier1_hit = !tier1.is_empty();
            if tier1_hit {
                methods.insert("rules".to_string());
            }
            produced.extend(tier1);

            if tier1_hit {
                // Rule-first short-circuit (§4.1, §8).
                continue;
            }

            // Tier 2 and Tier 3 are independent length-gated steps (§4.1):
            // the only defined short-circuit is Tier-1-hit skips both, so a
            // message with no rule match runs every eligible tier and lets
            // dedup below merge whatever each one produces.
            if eligibility.tier2 {
                if let Some(extractor) = &self.small_llm {
                    if self.budget_allows(agent_id, extractor.as_ref(), message) {
                        let out = self.extract_with(extractor.as_ref(), message, &context).await;
                        if !out.is_empty() {
                            methods.insert("small-llm".to_string());
                        }
                        produced.extend(out);
                    }
                }
            }

            if eligibility.tier3 {
                if let Some(extractor) = &self.large_llm {
                    if self.budget_allows(agent_id, extractor.as_ref(), message) {
                        let out = self.extract_with(extractor.as_ref(), message, &context).await;
                        if !out.is_empty() {
                            methods.insert("large-llm".to_string());
                        }
                        produced.extend(out);
                    }
                }
            }
        }

        let mut deduped = dedupe_by_content(produced);
        for memory in &mut deduped {
            memory.batch_id = Some(derive_batch_id(&batch_fingerprint(user_id, agent_id, messages)));
        }

        for memory in &deduped {
            self.storage.memory_store(user_id, agent_id, memory).await?;
        }

        Ok((deduped, methods))
    }

    async fn extract_with(&self, extractor: &dyn Extractor, message: &MemoryMessage, context: &ExtractionContext<'_>) -> Vec<Memory> {
        match extractor.extract(message, context).await {
            Ok(memories) => memories,
            Err(err) => {
                warn!(extractor_type = extractor.extractor_type(), %err, "extractor failed for message, skipping");
                Vec::new()
            }
        }
    }

    fn budget_allows(&self, agent_id: &AgentId, extractor: &dyn Extractor, message: &MemoryMessage) -> bool {
        let Some(budget) = self.config.cost_budget else {
            return true;
        };
        let spent = self.cost.agent_cost(agent_id);
        let estimated = extractor.estimate_cost(std::slice::from_ref(message));
        CostOptimizer::fits_budget(Some(budget), spent, estimated)
    }

    async fn fetch_rules(&self, user_id: &UserId, agent_id: &AgentId) -> Result<Vec<ExtractionRule>> {
        let key = keys::extraction_rules_key(user_id.as_str(), agent_id.as_str());
        match self.storage.get(&key).await? {
            Some(value) => serde_json::from_value(value).map_err(Error::from),
            None => Ok(Vec::new()),
        }
    }

    async fn persist_batch_metadata(&self, meta: &BatchMetadata) -> Result<()> {
        let key = keys::batch_metadata_key(meta.batch_id.as_str());
        let value = serde_json::to_value(meta)?;
        self.storage.set(&key, value, SetOptions::default()).await
    }
}

/// Dedup by lowercased/trimmed content, keeping the first occurrence
/// (§4.1, §8).
fn dedupe_by_content(memories: Vec<Memory>) -> Vec<Memory> {
    let mut seen = std::collections::HashSet::new();
    memories
        .into_iter()
        .filter(|m| seen.insert(m.content.trim().to_lowercase()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{MemoryId, MemoryType, Role, RuleId};
    use async_trait::async_trait;
    use std::collections::HashMap;
    use tokio::sync::Mutex as AsyncMutex;

    #[derive(Default)]
    struct InMemoryStorage {
        kv: AsyncMutex<HashMap<String, serde_json::Value>>,
        memories: AsyncMutex<HashMap<String, Memory>>,
    }

    #[async_trait]
    impl StoragePort for InMemoryStorage {
        async fn get(&self, key: &str) -> Result<Option<serde_json::Value>> {
            Ok(self.kv.lock().await.get(key).cloned())
        }

        async fn set(&self, key: &str, value: serde_json::Value, _opts: SetOptions) -> Result<()> {
            self.kv.lock().await.insert(key.to_string(), value);
            Ok(())
        }

        async fn delete(&self, key: &str) -> Result<bool> {
            Ok(self.kv.lock().await.remove(key).is_some())
        }

        async fn list(&self, prefix: &str) -> Result<Vec<String>> {
            Ok(self.kv.lock().await.keys().filter(|k| k.starts_with(prefix)).cloned().collect())
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

    fn msg(id: &str, content: &str, ts: i64) -> MemoryMessage {
        MemoryMessage::new(id, AgentId::from("a1"), Role::User, content, ts)
    }

    fn rules_only_config() -> BatchConfig {
        BatchConfig {
            max_batch_size: 3,
            min_batch_size: 1,
            timeout_minutes: 60,
            extraction_rate: 1.0,
            extractors: vec![super::super::config::ExtractorConfig::new("rules", true, 0.0)],
            ..Default::default()
        }
    }

    fn processor(config: BatchConfig, storage: Arc<dyn StoragePort>) -> BatchProcessor {
        let cost = Arc::new(CostTracker::new());
        let noise_filter = NoiseFilter::new(config.noise_filtering.clone(), None);
        BatchProcessor::new(storage, cost, config, noise_filter, None, None)
    }

    /// Always produces exactly one memory, tagged with its own `extractor_type`
    /// in the content so a test can tell which tier(s) actually ran.
    struct StubExtractor(&'static str);

    #[async_trait]
    impl Extractor for StubExtractor {
        async fn extract(&self, message: &MemoryMessage, context: &ExtractionContext<'_>) -> Result<Vec<Memory>> {
            let content = format!("{}:{}", self.0, message.id);
            Ok(vec![Memory::new(
                MemoryId::generate(),
                context.user_id.clone(),
                context.agent_id.clone(),
                content,
                MemoryType::Episodic,
                0.5,
                message.timestamp,
                context.now_ms,
            )?])
        }

        fn estimate_cost(&self, _messages: &[MemoryMessage]) -> f64 {
            0.0
        }

        fn extractor_type(&self) -> &'static str {
            self.0
        }
    }

    /// Tier 2 and Tier 3 are independent length-gated steps (§4.1), not a
    /// "small model ran, so skip the large model" escalation: with both
    /// enabled and enough filtered messages for both gates, a message with
    /// no Tier-1 rule hit must contribute output from *both* tiers.
    #[tokio::test]
    async fn small_and_large_llm_tiers_both_run_for_the_same_message() {
        let storage: Arc<dyn StoragePort> = Arc::new(InMemoryStorage::default());
        let config = BatchConfig {
            max_batch_size: 6,
            min_batch_size: 1,
            extraction_rate: 1.0,
            enable_small_model: true,
            enable_premium_model: true,
            extractors: vec![
                super::super::config::ExtractorConfig::new("rules", true, 0.0),
                super::super::config::ExtractorConfig::new("small-llm", true, 0.0),
                super::super::config::ExtractorConfig::new("large-llm", true, 0.0),
            ],
            ..Default::default()
        };
        let cost = Arc::new(CostTracker::new());
        let noise_filter = NoiseFilter::new(config.noise_filtering.clone(), None);
        let small: Arc<dyn Extractor> = Arc::new(StubExtractor("small-llm"));
        let large: Arc<dyn Extractor> = Arc::new(StubExtractor("large-llm"));
        let proc = BatchProcessor::new(storage.clone(), cost, config, noise_filter, Some(small), Some(large));

        // Six messages with no rule match clears both Tier 2's (>3) and
        // Tier 3's (>5) filtered-length gates.
        let user_id = UserId::from("u1");
        let agent_id = AgentId::from("a1");
        let messages: Vec<MemoryMessage> = (0..6).map(|i| msg(&format!("m{i}"), "a message with no rule match at all", i)).collect();

        let produced = proc.process(user_id, agent_id, messages, 100).await.unwrap();

        assert!(produced.iter().any(|m| m.content.starts_with("small-llm:")), "Tier 2 output missing: {produced:?}");
        assert!(produced.iter().any(|m| m.content.starts_with("large-llm:")), "Tier 3 output missing: {produced:?}");
    }

    #[tokio::test]
    async fn scenario_buffer_ripeness_by_size() {
        let storage: Arc<dyn StoragePort> = Arc::new(InMemoryStorage::default());
        let rule_key = keys::extraction_rules_key("u1", "a1");
        let rule = ExtractionRule::new(RuleId::from("r1"), "I prefer (.+)", MemoryType::Semantic, 0.8);
        storage.set(&rule_key, serde_json::to_value(vec![rule]).unwrap(), SetOptions::default()).await.unwrap();

        let proc = processor(rules_only_config(), storage);
        let user_id = UserId::from("u1");
        let agent_id = AgentId::from("a1");

        let r1 = proc.add_message(user_id.clone(), agent_id.clone(), msg("m1", "hi", 1), 1).await.unwrap();
        assert!(r1.is_empty());
        let r2 = proc.add_message(user_id.clone(), agent_id.clone(), msg("m2", "I prefer dark mode", 2), 2).await.unwrap();
        assert!(r2.is_empty());
        let r3 = proc.add_message(user_id.clone(), agent_id.clone(), msg("m3", "I prefer tea", 3), 3).await.unwrap();

        assert_eq!(r3.len(), 2);
        let mut contents: Vec<&str> = r3.iter().map(|m| m.content.as_str()).collect();
        contents.sort_unstable();
        assert_eq!(contents, vec!["dark mode", "tea"]);
    }

    #[tokio::test]
    async fn scenario_sampling_skip() {
        let storage: Arc<dyn StoragePort> = Arc::new(InMemoryStorage::default());
        let mut config = rules_only_config();
        config.extraction_rate = 0.0;
        let proc = processor(config, storage.clone());

        let user_id = UserId::from("u1");
        let agent_id = AgentId::from("a1");
        let result = proc.process(user_id, agent_id, vec![msg("m1", "I prefer tea", 1)], 1).await.unwrap();
        assert!(result.is_empty());

        let keys_present = storage.list("batch_metadata:").await.unwrap();
        assert_eq!(keys_present.len(), 1);
        let stored: BatchMetadata = serde_json::from_value(storage.get(&keys_present[0]).await.unwrap().unwrap()).unwrap();
        assert_eq!(stored.extraction_methods, vec!["skipped"]);
    }

    #[tokio::test]
    async fn dedup_keeps_first_occurrence() {
        let a = Memory::new(MemoryId::from("1"), UserId::from("u1"), AgentId::from("a1"), "Same Content", MemoryType::Semantic, 0.5, 0, 0).unwrap();
        let mut b = Memory::new(MemoryId::from("2"), UserId::from("u1"), AgentId::from("a1"), "same content", MemoryType::Semantic, 0.9, 0, 0).unwrap();
        b.id = MemoryId::from("2");
        let out = dedupe_by_content(vec![a, b]);
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].id.as_str(), "1");
    }
}
