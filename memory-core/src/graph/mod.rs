//! [`ConnectionGraph`] (§4.8): BFS expansion, shortest path, and
//! connected-component clustering over [`Connection`] edges.
//!
//! Edges are stored id-indexed (`HashMap<MemoryId, Vec<Edge>>` adjacency,
//! both directions inserted on insert) — the Rust-native answer to §9's
//! "Cyclic memory↔connection graph → id-indexed adjacency" redesign flag,
//! grounded in the teacher's `episode::graph_algorithms` module (DFS/BFS
//! helpers over an adjacency map keyed by id, never by embedded struct).
//! Dangling target ids are simply absent from the adjacency map, so
//! traversal skips them rather than erroring.

use crate::constants::defaults::MAX_BFS_VISITED_NODES;
use crate::types::{Connection, MemoryId};
use std::collections::{HashMap, HashSet, VecDeque};

#[derive(Debug, Clone)]
struct Edge {
    other: MemoryId,
    connection_type: String,
    strength: f64,
}

/// In-memory adjacency index over a set of [`Connection`] edges.
///
/// Holds no reference to storage — callers load the relevant connections
/// (typically all connections touching one agent's memories) and build a
/// graph from them before calling a traversal method.
#[derive(Debug, Default)]
pub struct ConnectionGraph {
    adjacency: HashMap<MemoryId, Vec<Edge>>,
}

/// Options accepted by [`ConnectionGraph::find_connected_memories`].
#[derive(Debug, Clone, Default)]
pub struct ExpansionOptions {
    pub max_depth: usize,
    pub connection_types: Option<Vec<String>>,
    pub min_strength: Option<f64>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Cluster {
    pub members: Vec<MemoryId>,
    pub size: usize,
    pub avg_strength: f64,
}

#[derive(Debug, Clone)]
pub struct GraphInsights {
    pub edge_count: usize,
    pub degree: HashMap<MemoryId, usize>,
    pub average_degree: f64,
    pub strongest_edge: Option<(MemoryId, MemoryId, f64)>,
    pub most_connected: Option<MemoryId>,
    pub clusters: Vec<Cluster>,
}

impl ConnectionGraph {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a graph from a flat connection list, inserting both
    /// directions of every edge (§4.8: "Traversal treats edges as
    /// undirected").
    #[must_use]
    pub fn from_connections(connections: &[Connection]) -> Self {
        let mut graph = Self::new();
        for conn in connections {
            graph.add_connection(conn);
        }
        graph
    }

    pub fn add_connection(&mut self, conn: &Connection) {
        self.adjacency.entry(conn.source_id.clone()).or_default().push(Edge {
            other: conn.target_id.clone(),
            connection_type: conn.connection_type.clone(),
            strength: conn.strength,
        });
        self.adjacency.entry(conn.target_id.clone()).or_default().push(Edge {
            other: conn.source_id.clone(),
            connection_type: conn.connection_type.clone(),
            strength: conn.strength,
        });
    }

    fn neighbors<'a>(&'a self, id: &MemoryId, opts: &'a ExpansionOptions) -> impl Iterator<Item = &'a MemoryId> + 'a {
        self.adjacency.get(id).into_iter().flatten().filter_map(move |edge| {
            if let Some(types) = &opts.connection_types {
                if !types.iter().any(|t| t == &edge.connection_type) {
                    return None;
                }
            }
            if let Some(min) = opts.min_strength {
                if edge.strength < min {
                    return None;
                }
            }
            Some(&edge.other)
        })
    }

    /// BFS expansion from `start` up to `maxDepth` undirected hops,
    /// optionally filtered by connection type and minimum strength
    /// (§4.8). Capped at [`MAX_BFS_VISITED_NODES`] visited nodes as a
    /// safety backstop against runaway expansion on dense graphs.
    ///
    /// Returns every node reached (including `start`), in BFS discovery
    /// order.
    #[must_use]
    pub fn find_connected_memories(&self, start: &MemoryId, opts: &ExpansionOptions) -> Vec<MemoryId> {
        let mut visited = HashSet::new();
        let mut order = Vec::new();
        let mut queue = VecDeque::new();

        visited.insert(start.clone());
        order.push(start.clone());
        queue.push_back((start.clone(), 0usize));

        while let Some((current, depth)) = queue.pop_front() {
            if depth >= opts.max_depth || visited.len() >= MAX_BFS_VISITED_NODES {
                continue;
            }
            for neighbor in self.neighbors(&current, opts) {
                if visited.len() >= MAX_BFS_VISITED_NODES {
                    break;
                }
                if visited.insert(neighbor.clone()) {
                    order.push(neighbor.clone());
                    queue.push_back((neighbor.clone(), depth + 1));
                }
            }
        }

        order
    }

    /// First path found by BFS (§4.8), `[]` if none within `maxDepth`,
    /// `[src]` when `src == tgt`.
    #[must_use]
    pub fn find_path(&self, src: &MemoryId, tgt: &MemoryId, max_depth: usize) -> Vec<MemoryId> {
        if src == tgt {
            return vec![src.clone()];
        }

        let opts = ExpansionOptions {
            max_depth,
            ..Default::default()
        };
        let mut visited = HashSet::new();
        let mut parent: HashMap<MemoryId, MemoryId> = HashMap::new();
        let mut queue = VecDeque::new();

        visited.insert(src.clone());
        queue.push_back((src.clone(), 0usize));

        while let Some((current, depth)) = queue.pop_front() {
            if depth >= max_depth {
                continue;
            }
            for neighbor in self.neighbors(&current, &opts) {
                if visited.insert(neighbor.clone()) {
                    parent.insert(neighbor.clone(), current.clone());
                    if neighbor == tgt {
                        return reconstruct_path(&parent, src, tgt);
                    }
                    queue.push_back((neighbor.clone(), depth + 1));
                }
            }
        }

        Vec::new()
    }

    /// Connected components of size ≥ 2 via iterative DFS (§4.8),
    /// sorted by `size` descending. `avgStrength` is the mean of
    /// incident-edge strengths across every node in the component,
    /// rounded to three decimals.
    #[must_use]
    pub fn find_clusters(&self) -> Vec<Cluster> {
        let mut visited = HashSet::new();
        let mut clusters = Vec::new();

        let mut node_ids: Vec<&MemoryId> = self.adjacency.keys().collect();
        node_ids.sort();

        for start in node_ids {
            if visited.contains(start) {
                continue;
            }

            let mut members = Vec::new();
            let mut stack = vec![start.clone()];
            visited.insert(start.clone());

            while let Some(node) = stack.pop() {
                members.push(node.clone());
                if let Some(edges) = self.adjacency.get(&node) {
                    for edge in edges {
                        if visited.insert(edge.other.clone()) {
                            stack.push(edge.other.clone());
                        }
                    }
                }
            }

            if members.len() < 2 {
                continue;
            }

            members.sort();
            let avg_strength = self.average_incident_strength(&members);
            clusters.push(Cluster {
                size: members.len(),
                members,
                avg_strength,
            });
        }

        clusters.sort_by(|a, b| b.size.cmp(&a.size));
        clusters
    }

    fn average_incident_strength(&self, members: &[MemoryId]) -> f64 {
        let mut total = 0.0;
        let mut count = 0usize;
        for member in members {
            if let Some(edges) = self.adjacency.get(member) {
                for edge in edges {
                    total += edge.strength;
                    count += 1;
                }
            }
        }
        if count == 0 {
            0.0
        } else {
            round3(total / count as f64)
        }
    }

    /// Aggregate insights over the whole graph (§4.8): per-memory degree,
    /// overall edge count, strongest edge, most-connected memory, average
    /// degree, and the cluster list.
    #[must_use]
    pub fn insights(&self) -> GraphInsights {
        let degree: HashMap<MemoryId, usize> = self.adjacency.iter().map(|(id, edges)| (id.clone(), edges.len())).collect();

        // Each undirected edge was inserted twice (once per endpoint), so
        // halve the total degree to get the edge count.
        let edge_count = degree.values().sum::<usize>() / 2;

        let average_degree = if degree.is_empty() {
            0.0
        } else {
            degree.values().sum::<usize>() as f64 / degree.len() as f64
        };

        let mut strongest_edge: Option<(MemoryId, MemoryId, f64)> = None;
        for (id, edges) in &self.adjacency {
            for edge in edges {
                let is_stronger = strongest_edge.as_ref().is_none_or(|(_, _, s)| edge.strength > *s);
                if is_stronger {
                    strongest_edge = Some((id.clone(), edge.other.clone(), edge.strength));
                }
            }
        }

        let most_connected = degree.iter().max_by_key(|(_, count)| **count).map(|(id, _)| id.clone());

        GraphInsights {
            edge_count,
            degree,
            average_degree,
            strongest_edge,
            most_connected,
            clusters: self.find_clusters(),
        }
    }
}

fn reconstruct_path(parent: &HashMap<MemoryId, MemoryId>, src: &MemoryId, tgt: &MemoryId) -> Vec<MemoryId> {
    let mut path = vec![tgt.clone()];
    let mut current = tgt.clone();
    while let Some(prev) = parent.get(&current) {
        path.push(prev.clone());
        if prev == src {
            break;
        }
        current = prev.clone();
    }
    path.reverse();
    path
}

fn round3(value: f64) -> f64 {
    (value * 1000.0).round() / 1000.0
}
