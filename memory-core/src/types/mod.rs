//! Core data model (§3): the entities every component reads or writes.
//!
//! Submodules group entities by concern; all public types are re-exported
//! here so callers can `use memory_core::types::*` without knowing the
//! internal split.

pub mod ids;
pub mod memory;
pub mod message;
pub mod rules;
pub mod batch;
pub mod connection;
pub mod cost;

pub use ids::{AgentId, BatchId, DecayRuleId, MemoryId, RuleId, UserId};
pub use memory::{Memory, MemoryType};
pub use message::{MemoryMessage, Role};
pub use rules::{DecayRule, ExtractionRule};
pub use batch::BatchMetadata;
pub use connection::Connection;
pub use cost::CostRecord;
