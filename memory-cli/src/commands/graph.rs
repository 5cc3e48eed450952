//! `memory-cli graph`: run [`ConnectionGraph`] traversal/clustering/insights
//! (§4.8) over a caller-supplied connection list, optionally persisting it
//! under the canonical `connections_key` (§6) for reuse across invocations.

use crate::output::{Output, OutputFormat};
use clap::{Args, Subcommand};
use do_memory_core::constants::keys;
use do_memory_core::types::{Connection, MemoryId};
use do_memory_core::{ConnectionGraph, ExpansionOptions, GraphInsights, StoragePort};
use serde::Serialize;
use std::path::PathBuf;
use std::sync::Arc;

#[derive(Debug, Subcommand)]
pub enum GraphCommands {
    /// BFS expansion from a memory id (§4.8).
    Expand(ExpandArgs),
    /// Shortest undirected path between two memory ids (§4.8).
    Path(PathArgs),
    /// Connected-component clustering (§4.8).
    Clusters(ScopeArgs),
    /// Aggregate graph insights (§4.8).
    Insights(ScopeArgs),
}

#[derive(Debug, Args)]
pub struct ScopeArgs {
    #[arg(long)]
    pub user_id: String,
    #[arg(long)]
    pub agent_id: String,
    /// Path to a JSON array of connections; defaults to the persisted
    /// connection list for this `(userId, agentId)` if omitted.
    #[arg(long)]
    pub connections_file: Option<PathBuf>,
}

#[derive(Debug, Args)]
pub struct ExpandArgs {
    #[command(flatten)]
    pub scope: ScopeArgs,
    #[arg(long)]
    pub start: String,
    #[arg(long, default_value_t = 2)]
    pub max_depth: usize,
    #[arg(long)]
    pub min_strength: Option<f64>,
}

#[derive(Debug, Args)]
pub struct PathArgs {
    #[command(flatten)]
    pub scope: ScopeArgs,
    #[arg(long)]
    pub source: String,
    #[arg(long)]
    pub target: String,
    #[arg(long, default_value_t = 6)]
    pub max_depth: usize,
}

async fn load_connections(storage: &dyn StoragePort, scope: &ScopeArgs) -> anyhow::Result<Vec<Connection>> {
    if let Some(path) = &scope.connections_file {
        let content = std::fs::read_to_string(path)?;
        return Ok(serde_json::from_str(&content)?);
    }
    let key = keys::connections_key(&scope.user_id, &scope.agent_id);
    Ok(match storage.get(&key).await? {
        Some(value) => serde_json::from_value(value)?,
        None => Vec::new(),
    })
}

#[derive(Debug, Serialize)]
struct MemoryIdList(Vec<MemoryId>);

impl Output for MemoryIdList {
    fn write_human<W: std::io::Write>(&self, mut writer: W) -> anyhow::Result<()> {
        for id in &self.0 {
            writeln!(writer, "{id}")?;
        }
        if self.0.is_empty() {
            writeln!(writer, "(none)")?;
        }
        Ok(())
    }
}

/// `Cluster` carries no `Serialize` impl (it's an in-memory computation
/// result, not wire/storage state per §3) so printing goes through a
/// hand-rolled JSON value rather than the `Output` trait's generic path.
fn print_clusters(clusters: &[do_memory_core::Cluster], format: &OutputFormat) -> anyhow::Result<()> {
    match format {
        OutputFormat::Human => {
            if clusters.is_empty() {
                println!("(no clusters)");
            }
            for cluster in clusters {
                println!(
                    "size={} avg_strength={:.3} members={:?}",
                    cluster.size,
                    cluster.avg_strength,
                    cluster.members.iter().map(MemoryId::to_string).collect::<Vec<_>>()
                );
            }
            Ok(())
        }
        OutputFormat::Json | OutputFormat::Yaml => {
            let value: Vec<serde_json::Value> = clusters
                .iter()
                .map(|c| {
                    serde_json::json!({
                        "size": c.size,
                        "avgStrength": c.avg_strength,
                        "members": c.members.iter().map(MemoryId::to_string).collect::<Vec<_>>(),
                    })
                })
                .collect();
            match format {
                OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&value)?),
                OutputFormat::Yaml => print!("{}", serde_yaml::to_string(&value)?),
                OutputFormat::Human => unreachable!(),
            }
            Ok(())
        }
    }
}

pub async fn handle_graph_command(command: GraphCommands, storage: Arc<dyn StoragePort>, format: OutputFormat, _dry_run: bool) -> anyhow::Result<()> {
    match command {
        GraphCommands::Expand(args) => {
            let connections = load_connections(storage.as_ref(), &args.scope).await?;
            let graph = ConnectionGraph::from_connections(&connections);
            let opts = ExpansionOptions {
                max_depth: args.max_depth,
                connection_types: None,
                min_strength: args.min_strength,
            };
            let reached = graph.find_connected_memories(&MemoryId::from(args.start), &opts);
            format.print_output(&MemoryIdList(reached))
        }
        GraphCommands::Path(args) => {
            let connections = load_connections(storage.as_ref(), &args.scope).await?;
            let graph = ConnectionGraph::from_connections(&connections);
            let path = graph.find_path(&MemoryId::from(args.source), &MemoryId::from(args.target), args.max_depth);
            format.print_output(&MemoryIdList(path))
        }
        GraphCommands::Clusters(scope) => {
            let connections = load_connections(storage.as_ref(), &scope).await?;
            let graph = ConnectionGraph::from_connections(&connections);
            print_clusters(&graph.find_clusters(), &format)
        }
        GraphCommands::Insights(scope) => {
            let connections = load_connections(storage.as_ref(), &scope).await?;
            let graph = ConnectionGraph::from_connections(&connections);
            print_insights(&graph.insights(), &format)
        }
    }
}

fn print_insights(insights: &GraphInsights, format: &OutputFormat) -> anyhow::Result<()> {
    match format {
        OutputFormat::Human => {
            println!("edges={} average_degree={:.2}", insights.edge_count, insights.average_degree);
            if let Some((a, b, strength)) = &insights.strongest_edge {
                println!("strongest_edge={a} <-> {b} ({strength:.3})");
            }
            if let Some(id) = &insights.most_connected {
                println!("most_connected={id}");
            }
            println!("clusters={}", insights.clusters.len());
            Ok(())
        }
        OutputFormat::Json | OutputFormat::Yaml => format.print_message(&format!(
            "edges={} average_degree={:.2} clusters={}",
            insights.edge_count,
            insights.average_degree,
            insights.clusters.len()
        )),
    }
}
