//! `memory-cli rules`: manage the persisted [`ExtractionRule`]/[`DecayRule`]
//! lists a `(userId, agentId)` owns (§3), stored under the canonical keys
//! from `do_memory_core::constants::keys`.

use crate::output::{Output, OutputFormat};
use clap::{Args, Subcommand};
use do_memory_core::constants::keys;
use do_memory_core::types::{AgentId, DecayRule, DecayRuleId, ExtractionRule, MemoryType, RuleId, UserId};
use do_memory_core::{SetOptions, StoragePort};
use serde::Serialize;
use std::sync::Arc;

#[derive(Debug, Subcommand)]
pub enum RulesCommands {
    /// Add an extraction rule (§3, Tier 1 of §4.1's pipeline).
    AddExtraction(AddExtractionArgs),
    /// Add a decay rule (§3, consulted by `DecayEngine`, §4.6).
    AddDecay(AddDecayArgs),
    /// List both rule sets for an agent.
    List(RuleScopeArgs),
}

#[derive(Debug, Args)]
pub struct RuleScopeArgs {
    #[arg(long)]
    pub user_id: String,
    #[arg(long)]
    pub agent_id: String,
}

#[derive(Debug, Args)]
pub struct AddExtractionArgs {
    #[arg(long)]
    pub user_id: String,
    #[arg(long)]
    pub agent_id: String,
    #[arg(long)]
    pub pattern: String,
    #[arg(long = "type")]
    pub memory_type: String,
    #[arg(long)]
    pub importance: f64,
    #[arg(long)]
    pub never_decay: bool,
    #[arg(long)]
    pub reinforceable: bool,
}

#[derive(Debug, Args)]
pub struct AddDecayArgs {
    #[arg(long)]
    pub user_id: String,
    #[arg(long)]
    pub agent_id: String,
    #[arg(long)]
    pub name: String,
    /// Safe-grammar condition string (§4.6), e.g. `daysSinceAccessed() > 30`.
    #[arg(long)]
    pub condition: String,
    #[arg(long)]
    pub decay_rate: f64,
    #[arg(long)]
    pub min_importance: f64,
    #[arg(long)]
    pub never_decay: bool,
}

#[derive(Debug, Serialize)]
struct RuleListing {
    extraction_rules: Vec<ExtractionRule>,
    decay_rules: Vec<DecayRule>,
}

impl Output for RuleListing {
    fn write_human<W: std::io::Write>(&self, mut writer: W) -> anyhow::Result<()> {
        writeln!(writer, "Extraction rules ({}):", self.extraction_rules.len())?;
        for rule in &self.extraction_rules {
            writeln!(
                writer,
                "  [{}] /{}/ -> {} (importance={:.2}, active={})",
                rule.id,
                rule.pattern,
                rule.memory_type.as_str(),
                rule.importance,
                rule.is_active
            )?;
        }
        writeln!(writer, "Decay rules ({}):", self.decay_rules.len())?;
        for rule in &self.decay_rules {
            writeln!(
                writer,
                "  [{}] {} — \"{}\" rate={:.3}/day min={:.2} enabled={}",
                rule.id, rule.name, rule.condition, rule.decay_rate, rule.min_importance, rule.enabled
            )?;
        }
        Ok(())
    }
}

async fn load_extraction_rules(storage: &dyn StoragePort, user_id: &str, agent_id: &str) -> anyhow::Result<Vec<ExtractionRule>> {
    let key = keys::extraction_rules_key(user_id, agent_id);
    Ok(match storage.get(&key).await? {
        Some(value) => serde_json::from_value(value)?,
        None => Vec::new(),
    })
}

async fn load_decay_rules(storage: &dyn StoragePort, user_id: &str, agent_id: &str) -> anyhow::Result<Vec<DecayRule>> {
    let key = keys::decay_rules_key(user_id, agent_id);
    Ok(match storage.get(&key).await? {
        Some(value) => serde_json::from_value(value)?,
        None => Vec::new(),
    })
}

pub async fn handle_rules_command(command: RulesCommands, storage: Arc<dyn StoragePort>, format: OutputFormat, dry_run: bool) -> anyhow::Result<()> {
    match command {
        RulesCommands::AddExtraction(args) => {
            let memory_type: MemoryType = args
                .memory_type
                .parse()
                .map_err(|_| anyhow::anyhow!("unknown memory type: {}", args.memory_type))?;
            regex::Regex::new(&args.pattern).map_err(|e| anyhow::anyhow!("invalid regex pattern: {e}"))?;

            if dry_run {
                return format.print_message("dry run: no extraction rule was added");
            }

            let mut rule = ExtractionRule::new(RuleId::generate(), args.pattern, memory_type, args.importance);
            rule.never_decay = args.never_decay;
            rule.reinforceable = args.reinforceable;

            let mut rules = load_extraction_rules(storage.as_ref(), &args.user_id, &args.agent_id).await?;
            rules.push(rule);
            let key = keys::extraction_rules_key(&args.user_id, &args.agent_id);
            storage.set(&key, serde_json::to_value(&rules)?, SetOptions::default()).await?;
            format.print_message("extraction rule added")
        }
        RulesCommands::AddDecay(args) => {
            if dry_run {
                return format.print_message("dry run: no decay rule was added");
            }

            let rule = DecayRule {
                id: DecayRuleId::generate(),
                name: args.name,
                condition: args.condition,
                decay_rate: args.decay_rate,
                min_importance: args.min_importance,
                never_decay: args.never_decay,
                enabled: true,
            };

            let mut rules = load_decay_rules(storage.as_ref(), &args.user_id, &args.agent_id).await?;
            rules.push(rule);
            let key = keys::decay_rules_key(&args.user_id, &args.agent_id);
            storage.set(&key, serde_json::to_value(&rules)?, SetOptions::default()).await?;
            format.print_message("decay rule added")
        }
        RulesCommands::List(args) => {
            let _ = UserId::from(args.user_id.clone());
            let _ = AgentId::from(args.agent_id.clone());
            let listing = RuleListing {
                extraction_rules: load_extraction_rules(storage.as_ref(), &args.user_id, &args.agent_id).await?,
                decay_rules: load_decay_rules(storage.as_ref(), &args.user_id, &args.agent_id).await?,
            };
            format.print_output(&listing)
        }
    }
}
