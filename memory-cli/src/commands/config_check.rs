//! `memory-cli config`: validate the resolved file-backed configuration
//! (§4.1/§4.6/§4.7) and, separately, the PRIME extractor's env/override
//! resolution (§4.3, §6).

use crate::config::Config;
use crate::output::{Output, OutputFormat};
use clap::Subcommand;
use serde::Serialize;

#[derive(Debug, Subcommand)]
pub enum ConfigCommands {
    /// Validate batch/decay/lifecycle settings and PRIME resolution.
    Check,
    /// Print the resolved configuration (PRIME api key masked).
    Show,
}

#[derive(Debug, Serialize)]
struct ConfigCheckResult {
    is_valid: bool,
    issues: Vec<String>,
    prime: PrimeResolution,
}

#[derive(Debug, Serialize)]
struct PrimeResolution {
    resolved: bool,
    detail: String,
}

impl Output for ConfigCheckResult {
    fn write_human<W: std::io::Write>(&self, mut writer: W) -> anyhow::Result<()> {
        writeln!(writer, "configuration valid: {}", self.is_valid)?;
        for issue in &self.issues {
            writeln!(writer, "  ! {issue}")?;
        }
        writeln!(writer, "PRIME resolution: {}", self.prime.detail)?;
        Ok(())
    }
}

#[derive(Debug, Serialize)]
struct ConfigShow {
    max_batch_size: usize,
    min_batch_size: usize,
    extraction_rate: f64,
    cost_budget: Option<f64>,
    default_decay_rate: f64,
    delete_threshold: f64,
    episodic_to_semantic_days: i64,
    max_memories_per_agent: usize,
}

impl Output for ConfigShow {
    fn write_human<W: std::io::Write>(&self, mut writer: W) -> anyhow::Result<()> {
        writeln!(writer, "batch.max_batch_size = {}", self.max_batch_size)?;
        writeln!(writer, "batch.min_batch_size = {}", self.min_batch_size)?;
        writeln!(writer, "batch.extraction_rate = {}", self.extraction_rate)?;
        writeln!(writer, "batch.cost_budget = {:?}", self.cost_budget)?;
        writeln!(writer, "decay.default_decay_rate = {}", self.default_decay_rate)?;
        writeln!(writer, "decay.delete_threshold = {}", self.delete_threshold)?;
        writeln!(writer, "lifecycle.episodic_to_semantic_days = {}", self.episodic_to_semantic_days)?;
        writeln!(writer, "lifecycle.max_memories_per_agent = {}", self.max_memories_per_agent)?;
        Ok(())
    }
}

pub async fn handle_config_command(command: ConfigCommands, config: &Config, format: OutputFormat) -> anyhow::Result<()> {
    match command {
        ConfigCommands::Check => {
            let mut issues = Vec::new();
            if let Err(e) = config.validate() {
                issues.push(e.to_string());
            }

            let prime = match crate::config::resolve_prime_config(None, None) {
                Ok(resolved) => PrimeResolution {
                    resolved: true,
                    detail: format!("provider={} tier={}", resolved.provider, resolved.default_tier.as_str()),
                },
                Err(e) => PrimeResolution {
                    resolved: false,
                    detail: format!("not resolved: {e}"),
                },
            };

            let result = ConfigCheckResult {
                is_valid: issues.is_empty(),
                issues,
                prime,
            };
            format.print_output(&result)
        }
        ConfigCommands::Show => {
            let show = ConfigShow {
                max_batch_size: config.batch.max_batch_size,
                min_batch_size: config.batch.min_batch_size,
                extraction_rate: config.batch.extraction_rate,
                cost_budget: config.batch.cost_budget,
                default_decay_rate: config.decay.default_decay_rate,
                delete_threshold: config.decay.delete_threshold,
                episodic_to_semantic_days: config.lifecycle.episodic_to_semantic_days,
                max_memories_per_agent: config.lifecycle.max_memories_per_agent,
            };
            format.print_output(&show)
        }
    }
}
