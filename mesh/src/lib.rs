//! Gossip broadcast dissemination
//!
//! Everything a node needs to spread values through a cluster without
//! flooding it:
//! - Topology construction over the member list (ring, balanced tree,
//!   externally assigned, full mesh)
//! - A deduplicating value log
//! - A bounded worker pool that delivers forwarded values with retries
//!
//! The wire transport is supplied by the host through [`Transport`].

pub mod config;
pub mod dedup;
pub mod directory;
pub mod dispatcher;
pub mod engine;
pub mod error;
pub mod metrics;
pub mod topology;
pub mod transport;

#[cfg(test)]
mod tests;

// Re-export commonly used types
pub use config::{DispatchMode, MeshConfig, TopologyStrategy};
pub use dedup::SeenSet;
pub use directory::ClusterDirectory;
pub use dispatcher::{DispatcherSnapshot, OutboundDispatcher, OutboundJob, RetryPolicy};
pub use engine::DisseminationEngine;
pub use error::{MeshError, MeshResult, TopologyError};
pub use topology::{Adjacency, Topology, TopologyBuilder, TopologyHandle};
pub use transport::Transport;
