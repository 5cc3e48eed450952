//! Subcommand definitions and dispatch.
//!
//! One module per operator surface: `ingest` drives the batch pipeline,
//! `decay`/`lifecycle` trigger the respective pipeline stages directly
//! (no scheduler — a single CLI invocation is one trigger), `graph`
//! inspects a caller-supplied connection list, `rules` manages persisted
//! extraction/decay rules, and `config` validates the resolved
//! configuration (§4.1, §4.3, §4.6, §4.7, §4.8).

mod config_check;
mod decay;
mod graph;
mod ingest;
mod lifecycle;
mod rules;

pub use config_check::{handle_config_command, ConfigCommands};
pub use decay::{handle_decay_command, DecayArgs};
pub use graph::{handle_graph_command, GraphCommands};
pub use ingest::{handle_ingest_command, IngestArgs};
pub use lifecycle::{handle_lifecycle_command, LifecycleCommands};
pub use rules::{handle_rules_command, RulesCommands};
