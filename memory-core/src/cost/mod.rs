//! [`CostTracker`] (§2, §3): per-agent append-only record of extraction
//! spend, tolerant of concurrent writers (§5).

use crate::types::{AgentId, CostRecord};
use parking_lot::Mutex;
use serde_json::Value;
use std::collections::HashMap;
use tracing::debug;

/// Append-only cost ledger. Cheap to clone (wraps an `Arc`-free `Mutex`
/// behind a reference internally) — callers hold it behind their own
/// `Arc` alongside the rest of a component's shared state.
#[derive(Debug, Default)]
pub struct CostTracker {
    records: Mutex<Vec<CostRecord>>,
}

impl CostTracker {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Record one extraction's cost. Never fails and never blocks on I/O —
    /// callers in the hot extraction path must not stall behind a full
    /// persistence round-trip just to log spend.
    pub fn record(
        &self,
        agent_id: AgentId,
        extractor_type: impl Into<String>,
        cost: f64,
        memories_extracted: usize,
        messages_processed: usize,
        metadata: HashMap<String, Value>,
        recorded_at: i64,
    ) {
        let extractor_type = extractor_type.into();
        debug!(
            agent_id = %agent_id,
            extractor_type = %extractor_type,
            cost,
            memories_extracted,
            "recording extraction cost"
        );
        self.records.lock().push(CostRecord {
            agent_id,
            extractor_type,
            cost,
            memories_extracted,
            messages_processed,
            metadata,
            recorded_at,
        });
    }

    /// Total spend across every recorded extraction.
    #[must_use]
    pub fn total_cost(&self) -> f64 {
        self.records.lock().iter().map(|r| r.cost).sum()
    }

    /// Spend attributed to one agent, used by [`crate::batch::BatchProcessor`]
    /// to enforce a per-agent `costBudget` (§4.1).
    #[must_use]
    pub fn agent_cost(&self, agent_id: &AgentId) -> f64 {
        self.records
            .lock()
            .iter()
            .filter(|r| &r.agent_id == agent_id)
            .map(|r| r.cost)
            .sum()
    }

    #[must_use]
    pub fn records_for(&self, agent_id: &AgentId) -> Vec<CostRecord> {
        self.records
            .lock()
            .iter()
            .filter(|r| &r.agent_id == agent_id)
            .cloned()
            .collect()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.records.lock().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// `totalChars/4 × costPerMemory` token approximation shared by every
/// extractor's `estimateCost` (§4.2).
#[must_use]
pub fn estimate_cost(total_chars: usize, cost_per_memory: f64) -> f64 {
    (total_chars as f64 / 4.0) * cost_per_memory
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn records_accumulate_per_agent() {
        let tracker = CostTracker::new();
        let a1 = AgentId::from("a1");
        let a2 = AgentId::from("a2");
        tracker.record(a1.clone(), "small-llm", 0.01, 2, 3, HashMap::new(), 1);
        tracker.record(a1.clone(), "large-llm", 0.05, 1, 1, HashMap::new(), 2);
        tracker.record(a2.clone(), "small-llm", 0.02, 1, 1, HashMap::new(), 3);

        assert!((tracker.agent_cost(&a1) - 0.06).abs() < 1e-9);
        assert!((tracker.agent_cost(&a2) - 0.02).abs() < 1e-9);
        assert!((tracker.total_cost() - 0.08).abs() < 1e-9);
        assert_eq!(tracker.len(), 3);
    }

    #[test]
    fn estimate_cost_uses_char_quarter_approximation() {
        assert!((estimate_cost(400, 0.01) - 1.0).abs() < 1e-9);
    }
}
