//! `memory-cli ingest`: run messages through the batch extraction
//! pipeline (§4.1) using the rule-based tier only.
//!
//! The CLI ships no LLM provider adapter (model access is out of this
//! crate's scope, per §1) — `--rule` lets a caller register an ad hoc
//! extraction rule for the run without a separate `rules add` call.

use crate::output::OutputFormat;
use clap::Args;
use do_memory_core::batch::BatchConfig;
use do_memory_core::cost::CostTracker;
use do_memory_core::noise::{NoiseFilter, NoiseFilterConfig};
use do_memory_core::types::{AgentId, ExtractionRule, Memory, MemoryMessage, MemoryType, RuleId, Role, UserId};
use do_memory_core::{BatchProcessor, SetOptions, StoragePort};
use serde::Serialize;
use std::sync::Arc;

#[derive(Debug, Args)]
pub struct IngestArgs {
    #[arg(long)]
    pub user_id: String,
    #[arg(long)]
    pub agent_id: String,
    /// One message per occurrence; role defaults to "user".
    #[arg(long = "message", required = true)]
    pub messages: Vec<String>,
    #[arg(long, value_enum, default_value = "user")]
    pub role: CliRole,
    /// Ad hoc regex rule applied for this run only: "PATTERN=>TYPE:IMPORTANCE".
    #[arg(long = "rule")]
    pub rules: Vec<String>,
    #[arg(long, default_value_t = 1.0)]
    pub extraction_rate: f64,
}

#[derive(Debug, Clone, Copy, clap::ValueEnum)]
pub enum CliRole {
    User,
    Assistant,
    System,
}

impl From<CliRole> for Role {
    fn from(role: CliRole) -> Self {
        match role {
            CliRole::User => Role::User,
            CliRole::Assistant => Role::Assistant,
            CliRole::System => Role::System,
        }
    }
}

#[derive(Debug, Serialize)]
struct IngestOutput {
    memories_created: usize,
    memories: Vec<Memory>,
}

impl crate::output::Output for IngestOutput {
    fn write_human<W: std::io::Write>(&self, mut writer: W) -> anyhow::Result<()> {
        writeln!(writer, "Extracted {} memories:", self.memories_created)?;
        for memory in &self.memories {
            writeln!(writer, "  [{}] {:?} — {}", memory.id, memory.memory_type, memory.content)?;
        }
        Ok(())
    }
}

fn parse_ad_hoc_rule(spec: &str) -> anyhow::Result<ExtractionRule> {
    let (pattern, rest) = spec
        .split_once("=>")
        .ok_or_else(|| anyhow::anyhow!("rule must be of the form PATTERN=>TYPE:IMPORTANCE"))?;
    let (type_str, importance_str) = rest
        .split_once(':')
        .ok_or_else(|| anyhow::anyhow!("rule must be of the form PATTERN=>TYPE:IMPORTANCE"))?;
    let memory_type: MemoryType = type_str
        .parse()
        .map_err(|_| anyhow::anyhow!("unknown memory type: {type_str}"))?;
    let importance: f64 = importance_str.parse().map_err(|_| anyhow::anyhow!("importance must be a number"))?;
    Ok(ExtractionRule::new(RuleId::generate(), pattern, memory_type, importance))
}

pub async fn handle_ingest_command(args: IngestArgs, storage: Arc<dyn StoragePort>, format: OutputFormat, dry_run: bool) -> anyhow::Result<()> {
    let user_id = UserId::from(args.user_id);
    let agent_id = AgentId::from(args.agent_id.clone());

    let mut rules = Vec::new();
    for spec in &args.rules {
        rules.push(parse_ad_hoc_rule(spec)?);
    }
    if !rules.is_empty() {
        let key = do_memory_core::constants::keys::extraction_rules_key(user_id.as_str(), agent_id.as_str());
        storage.set(&key, serde_json::to_value(&rules)?, SetOptions::default()).await?;
    }

    if dry_run {
        return format.print_message("dry run: no messages were processed");
    }

    let cost = Arc::new(CostTracker::new());
    let noise_filter = NoiseFilter::new(NoiseFilterConfig::default(), None);
    let config = BatchConfig {
        extraction_rate: args.extraction_rate,
        ..BatchConfig::default()
    };
    let processor = BatchProcessor::new(storage, cost, config, noise_filter, None, None);

    let now_ms = now_ms();
    let messages = args
        .messages
        .into_iter()
        .enumerate()
        .map(|(i, content)| MemoryMessage::new(format!("cli-{i}"), agent_id.clone(), args.role.into(), content, now_ms))
        .collect();

    let memories = processor.process(user_id, agent_id, messages, now_ms).await?;
    let output = IngestOutput {
        memories_created: memories.len(),
        memories,
    };
    format.print_output(&output)
}

fn now_ms() -> i64 {
    use std::time::{SystemTime, UNIX_EPOCH};
    SystemTime::now().duration_since(UNIX_EPOCH).unwrap_or_default().as_millis() as i64
}
