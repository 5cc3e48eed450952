use clap::{Parser, Subcommand};
use std::path::PathBuf;

mod commands;
mod config;
mod errors;
mod output;

use commands::{
    handle_config_command, handle_decay_command, handle_graph_command, handle_ingest_command, handle_lifecycle_command, handle_rules_command,
    ConfigCommands, DecayArgs, GraphCommands, IngestArgs, LifecycleCommands, RulesCommands,
};
use config::{initialize_storage, Config};
use output::OutputFormat;

/// Operator surface for `do-memory-core`: ingest messages through the
/// batch extraction pipeline, run decay/lifecycle passes, inspect the
/// connection graph, and manage extraction/decay rules — all against the
/// in-process reference storage adapter.
#[derive(Parser)]
#[command(name = "memory-cli")]
#[command(about = "Operator CLI for the agent memory engine")]
#[command(version, long_about = None)]
struct Cli {
    /// Configuration file path (TOML/JSON/YAML).
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Output format.
    #[arg(short, long, value_enum, default_value_t = OutputFormat::Human)]
    format: OutputFormat,

    /// Enable debug-level tracing.
    #[arg(short, long)]
    verbose: bool,

    /// Show what would be done without executing.
    #[arg(long)]
    dry_run: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run messages through the batch extraction pipeline (§4.1).
    Ingest(IngestArgs),
    /// Run one decay cycle for an agent (§4.6).
    Decay(DecayArgs),
    /// Trigger the decay/promote/cleanup/enforce-limit pipeline (§4.7).
    Lifecycle {
        #[command(subcommand)]
        command: LifecycleCommands,
    },
    /// Traverse or cluster the connection graph for an agent (§4.8).
    Graph {
        #[command(subcommand)]
        command: GraphCommands,
    },
    /// Manage persisted extraction and decay rules (§3).
    Rules {
        #[command(subcommand)]
        command: RulesCommands,
    },
    /// Validate or display the resolved configuration.
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let level = if cli.verbose { tracing::Level::DEBUG } else { tracing::Level::INFO };
    tracing_subscriber::fmt().with_max_level(level).init();

    let config = Config::load(cli.config.as_deref())?;
    config.validate()?;
    let storage = initialize_storage();

    match cli.command {
        Commands::Ingest(args) => handle_ingest_command(args, storage, cli.format, cli.dry_run).await,
        Commands::Decay(args) => handle_decay_command(args, storage, cli.format, cli.dry_run).await,
        Commands::Lifecycle { command } => handle_lifecycle_command(command, storage, cli.format, cli.dry_run).await,
        Commands::Graph { command } => handle_graph_command(command, storage, cli.format, cli.dry_run).await,
        Commands::Rules { command } => handle_rules_command(command, storage, cli.format, cli.dry_run).await,
        Commands::Config { command } => handle_config_command(command, &config, cli.format).await,
    }
}
