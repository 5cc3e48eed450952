//! Decay engine (§2, §4.6): safe-grammar rule evaluation and exponential
//! resonance decay.

pub mod engine;
pub mod expr;

pub use engine::{decayed_resonance, DecayConfig, DecayEngine, DecayReport, RuleResult};
