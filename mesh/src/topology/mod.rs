//! Topology Builder
//!
//! Derives a bounded-fan-out neighbor table from cluster membership. Every
//! node runs the same deterministic construction over the same member list,
//! so no topology exchange between nodes is needed.
//!
//! The table is published as an immutable [`Topology`] snapshot through a
//! [`TopologyHandle`]; a rebuild swaps the whole snapshot at once.

mod ring;
mod tree;

use std::{
    collections::{BTreeMap, HashMap, HashSet, VecDeque},
    sync::Arc,
};

use arc_swap::ArcSwap;
use gossip_protocol::NodeId;

use super::{
    config::{MeshConfig, TopologyStrategy},
    directory::ClusterDirectory,
    error::TopologyError,
};

/// Node -> ordered neighbor list.
pub type Adjacency = BTreeMap<NodeId, Vec<NodeId>>;

/// Immutable neighbor table for the whole cluster.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Topology {
    strategy: TopologyStrategy,
    adjacency: Adjacency,
    /// Level (tree depth or ring row) per node, for level-aware forwarding
    levels: BTreeMap<NodeId, usize>,
}

impl Topology {
    fn new(
        strategy: TopologyStrategy,
        adjacency: Adjacency,
        levels: BTreeMap<NodeId, usize>,
    ) -> Self {
        let adjacency = adjacency
            .into_iter()
            .map(|(node, neighbors)| {
                let mut seen = HashSet::new();
                let neighbors = neighbors
                    .into_iter()
                    .filter(|n| *n != node && seen.insert(n.clone()))
                    .collect();
                (node, neighbors)
            })
            .collect();

        Self {
            strategy,
            adjacency,
            levels,
        }
    }

    /// A table with no edges; every node only applies values locally.
    pub fn empty(strategy: TopologyStrategy) -> Self {
        Self {
            strategy,
            ..Default::default()
        }
    }

    pub fn strategy(&self) -> TopologyStrategy {
        self.strategy
    }

    pub fn neighbors(&self, node: &NodeId) -> &[NodeId] {
        self.adjacency
            .get(node)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    pub fn level(&self, node: &NodeId) -> Option<usize> {
        self.levels.get(node).copied()
    }

    pub fn nodes(&self) -> impl Iterator<Item = &NodeId> + '_ {
        self.adjacency.keys()
    }

    pub fn max_out_degree(&self) -> usize {
        self.adjacency.values().map(Vec::len).max().unwrap_or(0)
    }

    /// Neighbors of `self_id` that should receive a value that arrived
    /// from `source`.
    ///
    /// The source and this node are never included. When the source sits
    /// on the same level as this node, same-level neighbors are skipped:
    /// the first node of a level to see a value always got it from another
    /// level and has already fanned it out sideways.
    pub fn forward_set(&self, self_id: &NodeId, source: &NodeId) -> Vec<NodeId> {
        let own_level = self.level(self_id);
        let from_same_level = own_level.is_some() && own_level == self.level(source);

        self.neighbors(self_id)
            .iter()
            .filter(|n| *n != source && *n != self_id)
            .filter(|n| !from_same_level || self.level(n) != own_level)
            .cloned()
            .collect()
    }

    /// Whether the symmetric closure of the neighbor graph connects every
    /// node in `members`.
    pub fn is_connected(&self, members: &[NodeId]) -> bool {
        let Some(start) = members.first() else {
            return true;
        };

        let mut undirected: HashMap<&NodeId, Vec<&NodeId>> = HashMap::new();
        for (node, neighbors) in &self.adjacency {
            for neighbor in neighbors {
                undirected.entry(node).or_default().push(neighbor);
                undirected.entry(neighbor).or_default().push(node);
            }
        }

        let mut visited: HashSet<&NodeId> = HashSet::from([start]);
        let mut queue = VecDeque::from([start]);
        while let Some(node) = queue.pop_front() {
            for &next in undirected.get(node).into_iter().flatten() {
                if visited.insert(next) {
                    queue.push_back(next);
                }
            }
        }

        members.iter().all(|m| visited.contains(m))
    }
}

/// Builds topology snapshots for one strategy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TopologyBuilder {
    strategy: TopologyStrategy,
    include_siblings: bool,
}

impl TopologyBuilder {
    pub fn new(strategy: TopologyStrategy, include_siblings: bool) -> Self {
        Self {
            strategy,
            include_siblings,
        }
    }

    pub fn from_config(config: &MeshConfig) -> Self {
        Self::new(config.strategy, config.include_siblings)
    }

    pub fn strategy(&self) -> TopologyStrategy {
        self.strategy
    }

    /// Derive the topology for the directory's membership.
    ///
    /// The explicit strategy has nothing to pass through until a topology
    /// message arrives, so it starts out with the spanning tree. Members
    /// without ordinals cannot be placed in a tree; those clusters start
    /// with no edges and wait for the assignment.
    pub fn build(&self, directory: &ClusterDirectory) -> Result<Topology, TopologyError> {
        let members = directory.members();
        match self.strategy {
            TopologyStrategy::FullMesh => Ok(full_mesh(members)),
            TopologyStrategy::Ring => Ok(ring::build(&ranked(members)?)),
            TopologyStrategy::Tree => Ok(tree::build(&ranked(members)?, self.include_siblings)),
            TopologyStrategy::Explicit => match ranked(members) {
                Ok(ranked) => Ok(tree::build(&ranked, self.include_siblings)),
                Err(TopologyError::UnparsableNodeId(_)) => {
                    Ok(Topology::empty(TopologyStrategy::Explicit))
                }
                Err(e) => Err(e),
            },
        }
    }

    /// Pass an externally assigned neighbor table through, minus duplicate
    /// entries and self-loops.
    pub fn explicit(&self, assignment: Adjacency) -> Topology {
        Topology::new(TopologyStrategy::Explicit, assignment, BTreeMap::new())
    }
}

/// Members in rank order. Ring and tree positions are derived from node
/// ordinals, so every member needs one.
fn ranked(members: &[NodeId]) -> Result<Vec<NodeId>, TopologyError> {
    if members.is_empty() {
        return Err(TopologyError::EmptyMembership);
    }
    if let Some(bad) = members.iter().find(|m| m.ordinal().is_none()) {
        return Err(TopologyError::UnparsableNodeId(bad.clone()));
    }
    let mut ranked = members.to_vec();
    ranked.sort();
    Ok(ranked)
}

fn full_mesh(members: &[NodeId]) -> Topology {
    let adjacency = members
        .iter()
        .map(|node| {
            let others = members.iter().filter(|m| *m != node).cloned().collect();
            (node.clone(), others)
        })
        .collect();
    Topology::new(TopologyStrategy::FullMesh, adjacency, BTreeMap::new())
}

/// Current topology snapshot, replaced atomically on rebuild.
///
/// Readers take an `Arc` to a complete snapshot and never block the writer.
pub struct TopologyHandle {
    current: ArcSwap<Topology>,
}

impl TopologyHandle {
    pub fn new(initial: Topology) -> Self {
        Self {
            current: ArcSwap::from_pointee(initial),
        }
    }

    pub fn load(&self) -> Arc<Topology> {
        self.current.load_full()
    }

    pub fn publish(&self, topology: Topology) {
        self.current.store(Arc::new(topology));
    }
}
