//! `memory-cli lifecycle`: trigger the decay → promote → cleanup →
//! enforce-limit pipeline (§4.7) for a single agent. A CLI invocation
//! plays the role of one scheduler trigger (§4.7's `LifecycleScheduler`)
//! without the timers, concurrency cap, or retry policy — those matter
//! only across repeated, unattended runs.

use crate::output::{Output, OutputFormat};
use clap::{Args, Subcommand};
use do_memory_core::lifecycle::{LifecycleConfig, LifecycleManager, LifecycleReport};
use do_memory_core::types::{AgentId, UserId};
use do_memory_core::StoragePort;
use std::sync::Arc;

#[derive(Debug, Subcommand)]
pub enum LifecycleCommands {
    /// Run the full pipeline: decay, promotion, cleanup, limit enforcement.
    Run(LifecycleArgs),
    /// Run only the promotion step.
    Promote(LifecycleArgs),
    /// Run only the cleanup step.
    Cleanup(LifecycleArgs),
}

#[derive(Debug, Args)]
pub struct LifecycleArgs {
    #[arg(long)]
    pub user_id: String,
    #[arg(long)]
    pub agent_id: String,
    #[arg(long, default_value_t = do_memory_core::constants::defaults::DEFAULT_EPISODIC_TO_SEMANTIC_DAYS)]
    pub episodic_to_semantic_days: i64,
    #[arg(long, default_value_t = do_memory_core::constants::defaults::DEFAULT_MAX_MEMORIES_PER_AGENT)]
    pub max_memories_per_agent: usize,
    #[arg(long)]
    pub preserve_original: bool,
}

impl Output for LifecycleReport {
    fn write_human<W: std::io::Write>(&self, mut writer: W) -> anyhow::Result<()> {
        if let Some(decay) = &self.decay {
            writeln!(
                writer,
                "decay: processed={} updated={} deleted={}",
                decay.processed, decay.updated, decay.deleted
            )?;
        }
        writeln!(
            writer,
            "promoted={} archived={} cleaned={} limit_enforced={}",
            self.promoted, self.archived, self.cleaned, self.limit_enforced
        )?;
        Ok(())
    }
}

fn build_manager(storage: Arc<dyn StoragePort>, args: &LifecycleArgs) -> LifecycleManager {
    let config = LifecycleConfig {
        episodic_to_semantic_days: args.episodic_to_semantic_days,
        max_memories_per_agent: args.max_memories_per_agent,
        preserve_original: args.preserve_original,
        ..LifecycleConfig::default()
    };
    LifecycleManager::new(storage, config)
}

fn now_ms() -> i64 {
    use std::time::{SystemTime, UNIX_EPOCH};
    SystemTime::now().duration_since(UNIX_EPOCH).unwrap_or_default().as_millis() as i64
}

pub async fn handle_lifecycle_command(command: LifecycleCommands, storage: Arc<dyn StoragePort>, format: OutputFormat, dry_run: bool) -> anyhow::Result<()> {
    if dry_run {
        return format.print_message("dry run: no lifecycle operation was run");
    }

    match command {
        LifecycleCommands::Run(args) => {
            let user_id = UserId::from(args.user_id.clone());
            let agent_id = AgentId::from(args.agent_id.clone());
            let manager = build_manager(storage, &args);
            let rules = manager.load_decay_rules(&user_id, &agent_id).await?;
            let report = manager.run_lifecycle(&user_id, &agent_id, &rules, now_ms()).await?;
            format.print_output(&report)
        }
        LifecycleCommands::Promote(args) => {
            let user_id = UserId::from(args.user_id.clone());
            let agent_id = AgentId::from(args.agent_id.clone());
            let manager = build_manager(storage, &args);
            let promoted = manager.run_promotion(&user_id, &agent_id, now_ms()).await?;
            format.print_message(&format!("promoted {promoted} memories"))
        }
        LifecycleCommands::Cleanup(args) => {
            let user_id = UserId::from(args.user_id.clone());
            let agent_id = AgentId::from(args.agent_id.clone());
            let manager = build_manager(storage, &args);
            let cleaned = manager.run_cleanup(&user_id, &agent_id, now_ms()).await?;
            format.print_message(&format!("cleaned up {cleaned} memories"))
        }
    }
}
