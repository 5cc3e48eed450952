//! [`ExtractionRule`] and [`DecayRule`] (§3).

use super::ids::{DecayRuleId, RuleId};
use super::memory::MemoryType;
use serde::{Deserialize, Serialize};

/// A user-defined extraction pattern, owned by the user and independent in
/// lifetime from any memories it spawns (§3).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExtractionRule {
    pub id: RuleId,
    /// Regex source. Compiled lazily by the rule-based extractor.
    pub pattern: String,
    #[serde(rename = "type")]
    pub memory_type: MemoryType,
    pub importance: f64,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default = "default_true")]
    pub is_active: bool,
    #[serde(default)]
    pub never_decay: bool,
    /// Half-life override (days), consulted by the decay engine when set.
    #[serde(default)]
    pub custom_half_life: Option<f64>,
    #[serde(default)]
    pub reinforceable: bool,
}

fn default_true() -> bool {
    true
}

impl ExtractionRule {
    #[must_use]
    pub fn new(id: RuleId, pattern: impl Into<String>, memory_type: MemoryType, importance: f64) -> Self {
        Self {
            id,
            pattern: pattern.into(),
            memory_type,
            importance,
            tags: Vec::new(),
            is_active: true,
            never_decay: false,
            custom_half_life: None,
            reinforceable: false,
        }
    }
}

/// A decay rule: first enabled rule whose `condition` matches a memory wins
/// (§3, §4.6).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DecayRule {
    pub id: DecayRuleId,
    pub name: String,
    /// Safe-grammar condition string, parsed by [`crate::decay::expr`].
    pub condition: String,
    /// Per-day decay rate in `[0,1]`.
    pub decay_rate: f64,
    pub min_importance: f64,
    #[serde(default)]
    pub never_decay: bool,
    #[serde(default = "default_true")]
    pub enabled: bool,
}
