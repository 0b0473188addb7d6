//! Balanced binary spanning tree.
//!
//! Members are inserted as a balanced search tree keyed by rank: the median
//! becomes the root and each half recursively forms a subtree. A node's
//! neighbors are its parent and its children, so out-degree is at most 3.
//!
//! A second pass records the depth of every node. With siblings enabled a
//! node also links to its immediate left and right neighbors on the same
//! depth, trading two extra sends for fewer hops across the tree.

use std::collections::BTreeMap;

use gossip_protocol::NodeId;

use super::{Adjacency, Topology};
use crate::config::TopologyStrategy;

#[derive(Debug, Clone, Default)]
struct Slot {
    parent: Option<usize>,
    children: Vec<usize>,
    depth: usize,
}

pub(super) fn build(ranked: &[NodeId], include_siblings: bool) -> Topology {
    let mut slots = vec![Slot::default(); ranked.len()];
    place(&mut slots, 0, ranked.len(), None, 0);

    // Ranks ascend within each level, i.e. left to right.
    let mut by_level: BTreeMap<usize, Vec<usize>> = BTreeMap::new();
    for (rank, slot) in slots.iter().enumerate() {
        by_level.entry(slot.depth).or_default().push(rank);
    }

    let mut adjacency = Adjacency::new();
    let mut levels = BTreeMap::new();

    for (rank, slot) in slots.iter().enumerate() {
        let mut neighbors = Vec::with_capacity(5);
        if let Some(parent) = slot.parent {
            neighbors.push(ranked[parent].clone());
        }
        neighbors.extend(slot.children.iter().map(|&child| ranked[child].clone()));

        if include_siblings {
            let row = &by_level[&slot.depth];
            if let Ok(pos) = row.binary_search(&rank) {
                if pos > 0 {
                    neighbors.push(ranked[row[pos - 1]].clone());
                }
                if let Some(&right) = row.get(pos + 1) {
                    neighbors.push(ranked[right].clone());
                }
            }
        }

        adjacency.insert(ranked[rank].clone(), neighbors);
        levels.insert(ranked[rank].clone(), slot.depth);
    }

    Topology::new(TopologyStrategy::Tree, adjacency, levels)
}

/// Root the subtree for ranks `lo..hi` at its median and return it.
fn place(
    slots: &mut [Slot],
    lo: usize,
    hi: usize,
    parent: Option<usize>,
    depth: usize,
) -> Option<usize> {
    if lo >= hi {
        return None;
    }
    let mid = lo + (hi - lo) / 2;
    slots[mid].parent = parent;
    slots[mid].depth = depth;

    if let Some(left) = place(slots, lo, mid, Some(mid), depth + 1) {
        slots[mid].children.push(left);
    }
    if let Some(right) = place(slots, mid + 1, hi, Some(mid), depth + 1) {
        slots[mid].children.push(right);
    }
    Some(mid)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ranked(n: usize) -> Vec<NodeId> {
        (0..n).map(|i| NodeId::new(format!("n{}", i))).collect()
    }

    fn neighbors<'a>(topology: &'a Topology, node: &str) -> Vec<&'a str> {
        topology
            .neighbors(&NodeId::from(node))
            .iter()
            .map(NodeId::as_str)
            .collect()
    }

    #[test]
    fn test_median_is_root() {
        // n3 / (n1 / n0 n2) (n5 / n4 n6)
        let topology = build(&ranked(7), false);
        assert_eq!(neighbors(&topology, "n3"), vec!["n1", "n5"]);
        assert_eq!(neighbors(&topology, "n1"), vec!["n3", "n0", "n2"]);
        assert_eq!(neighbors(&topology, "n6"), vec!["n5"]);
        assert_eq!(topology.level(&NodeId::from("n3")), Some(0));
        assert_eq!(topology.level(&NodeId::from("n4")), Some(2));
    }

    #[test]
    fn test_siblings_link_adjacent_nodes_on_a_level() {
        let topology = build(&ranked(7), true);
        assert_eq!(neighbors(&topology, "n3"), vec!["n1", "n5"]);
        assert_eq!(neighbors(&topology, "n1"), vec!["n3", "n0", "n2", "n5"]);
        assert_eq!(neighbors(&topology, "n2"), vec!["n1", "n0", "n4"]);
        assert_eq!(neighbors(&topology, "n6"), vec!["n5", "n4"]);
    }

    #[test]
    fn test_tree_edges_span_levels() {
        let topology = build(&ranked(31), false);
        for node in topology.nodes() {
            let level = topology.level(node).unwrap();
            for neighbor in topology.neighbors(node) {
                assert_ne!(topology.level(neighbor).unwrap(), level);
            }
        }
    }

    #[test]
    fn test_two_nodes() {
        let topology = build(&ranked(2), true);
        assert_eq!(neighbors(&topology, "n1"), vec!["n0"]);
        assert_eq!(neighbors(&topology, "n0"), vec!["n1"]);
    }
}
