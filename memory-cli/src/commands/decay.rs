//! `memory-cli decay`: run one decay cycle for an agent (§4.6).

use crate::output::{Output, OutputFormat};
use clap::Args;
use do_memory_core::constants::keys;
use do_memory_core::decay::{DecayConfig, DecayEngine, DecayReport};
use do_memory_core::types::{AgentId, DecayRule, UserId};
use do_memory_core::StoragePort;
use std::sync::Arc;

#[derive(Debug, Args)]
pub struct DecayArgs {
    #[arg(long)]
    pub user_id: String,
    #[arg(long)]
    pub agent_id: String,
    #[arg(long, default_value_t = do_memory_core::constants::defaults::DEFAULT_DECAY_RATE_PER_DAY)]
    pub decay_rate: f64,
    #[arg(long, default_value_t = do_memory_core::constants::defaults::DEFAULT_DELETE_THRESHOLD)]
    pub delete_threshold: f64,
}

impl Output for DecayReport {
    fn write_human<W: std::io::Write>(&self, mut writer: W) -> anyhow::Result<()> {
        writeln!(writer, "processed={} updated={} deleted={}", self.processed, self.updated, self.deleted)?;
        for rule in &self.rule_results {
            writeln!(
                writer,
                "  rule {} ({}): {} memories, avg decay {:.4}",
                rule.rule_name, rule.rule_id, rule.memories_affected, rule.avg_decay_applied
            )?;
        }
        Ok(())
    }
}

pub async fn handle_decay_command(args: DecayArgs, storage: Arc<dyn StoragePort>, format: OutputFormat, dry_run: bool) -> anyhow::Result<()> {
    if dry_run {
        return format.print_message("dry run: no decay cycle was run");
    }

    let user_id = UserId::from(args.user_id);
    let agent_id = AgentId::from(args.agent_id);

    let config = DecayConfig {
        default_decay_rate: args.decay_rate,
        delete_threshold: args.delete_threshold,
        ..DecayConfig::default()
    };
    let engine = DecayEngine::new(storage.clone(), config);

    let rules_key = keys::decay_rules_key(user_id.as_str(), agent_id.as_str());
    let rules: Vec<DecayRule> = match storage.get(&rules_key).await? {
        Some(value) => serde_json::from_value(value)?,
        None => Vec::new(),
    };

    let now_ms = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as i64;
    let report = engine.apply_decay(&user_id, &agent_id, &rules, now_ms).await?;

    format.print_output(&report)
}
