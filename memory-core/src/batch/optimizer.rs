//! [`CostOptimizer`] (§2): decides which tiers a batch's messages are
//! eligible for before the pipeline spends money on them.
//!
//! This is a planning pass, not an authority — [`super::processor`] still
//! re-checks live spend against [`crate::cost::CostTracker`] as it goes,
//! since actual extraction cost is only known after each call completes.
//! The plan exists so the pipeline can skip provably-unaffordable tiers
//! without invoking them at all.

use super::config::BatchConfig;
use crate::constants::defaults::{TIER2_MIN_FILTERED_LEN, TIER3_MIN_FILTERED_LEN};
use crate::types::MemoryMessage;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TierEligibility {
    pub tier2: bool,
    pub tier3: bool,
}

pub struct CostOptimizer;

impl CostOptimizer {
    /// Whether Tier 2/Tier 3 are eligible at all for this batch, based on
    /// how many messages survived noise filtering (§4.1 "filtered length")
    /// and whether the corresponding model is enabled.
    #[must_use]
    pub fn plan(config: &BatchConfig, filtered_messages: &[&MemoryMessage]) -> TierEligibility {
        let filtered_len = filtered_messages.len();
        TierEligibility {
            tier2: config.enable_small_model && filtered_len > TIER2_MIN_FILTERED_LEN,
            tier3: config.enable_premium_model && filtered_len > TIER3_MIN_FILTERED_LEN,
        }
    }

    /// Whether a single message still fits under `costBudget` given
    /// `spent` so far and this extractor's estimate for just that message
    /// (§4.1 "Cost budget").
    #[must_use]
    pub fn fits_budget(cost_budget: Option<f64>, spent: f64, estimated: f64) -> bool {
        match cost_budget {
            Some(budget) => spent + estimated <= budget,
            None => true,
        }
    }
}
