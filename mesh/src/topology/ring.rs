//! Ring/offset topology.
//!
//! Members are laid out by rank in rows of three. A node talks to the
//! other members of its row and to the nodes one row up and one row down
//! in the same column. A missing down hop in the second-to-last row is
//! clamped to the last member so the final partial row stays attached.

use std::collections::BTreeMap;

use gossip_protocol::NodeId;

use super::{Adjacency, Topology};
use crate::config::TopologyStrategy;

const ROW_WIDTH: usize = 3;

pub(super) fn build(ranked: &[NodeId]) -> Topology {
    let n = ranked.len();
    let mut adjacency = Adjacency::new();
    let mut levels = BTreeMap::new();

    for (rank, node) in ranked.iter().enumerate() {
        let row = rank / ROW_WIDTH;
        let row_start = row * ROW_WIDTH;
        let row_end = (row_start + ROW_WIDTH).min(n);

        let mut neighbors: Vec<NodeId> = (row_start..row_end)
            .filter(|&peer| peer != rank)
            .map(|peer| ranked[peer].clone())
            .collect();

        if let Some(up) = rank.checked_sub(ROW_WIDTH) {
            neighbors.push(ranked[up].clone());
        }

        let down = (rank + ROW_WIDTH).min(n - 1);
        if down / ROW_WIDTH > row {
            neighbors.push(ranked[down].clone());
        }

        adjacency.insert(node.clone(), neighbors);
        levels.insert(node.clone(), row);
    }

    Topology::new(TopologyStrategy::Ring, adjacency, levels)
}
