//! Dissemination engine
//!
//! Owns the local value log, the dedup set and the current topology, and
//! turns every receipt into forwarding jobs for the dispatcher. Each value
//! is applied and forwarded at most once per node: the dedup check decides
//! which arrival is the first, and only that arrival fans out.

use std::{collections::BTreeSet, sync::Arc};

use gossip_protocol::{GossipValue, NodeId, ValueId};
use parking_lot::RwLock;
use tracing::{debug, info, warn};

use super::{
    config::{MeshConfig, TopologyStrategy},
    dedup::SeenSet,
    directory::ClusterDirectory,
    dispatcher::{OutboundDispatcher, OutboundJob},
    error::MeshResult,
    metrics,
    topology::{Adjacency, Topology, TopologyBuilder, TopologyHandle},
};

pub struct DisseminationEngine {
    self_id: NodeId,
    builder: TopologyBuilder,
    directory: RwLock<ClusterDirectory>,
    topology: TopologyHandle,
    seen: SeenSet,
    log: RwLock<Vec<GossipValue>>,
    dispatcher: Arc<OutboundDispatcher>,
}

impl std::fmt::Debug for DisseminationEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DisseminationEngine")
            .field("self_id", &self.self_id)
            .field("strategy", &self.builder.strategy())
            .field("values", &self.log.read().len())
            .finish()
    }
}

impl DisseminationEngine {
    /// Build the initial topology for `directory` and start with an empty log.
    pub fn new(
        directory: ClusterDirectory,
        config: &MeshConfig,
        dispatcher: Arc<OutboundDispatcher>,
    ) -> MeshResult<Self> {
        let builder = TopologyBuilder::from_config(config);
        let topology = builder.build(&directory)?;
        let self_id = directory.self_id().clone();

        let neighbors = topology.neighbors(&self_id).to_vec();
        metrics::record_topology(neighbors.len());
        info!(
            node = %self_id,
            strategy = %builder.strategy(),
            members = directory.len(),
            ?neighbors,
            "Dissemination engine ready"
        );

        Ok(Self {
            self_id,
            builder,
            directory: RwLock::new(directory),
            topology: TopologyHandle::new(topology),
            seen: SeenSet::new(),
            log: RwLock::new(Vec::new()),
            dispatcher,
        })
    }

    pub fn self_id(&self) -> &NodeId {
        &self.self_id
    }

    pub fn dispatcher(&self) -> &Arc<OutboundDispatcher> {
        &self.dispatcher
    }

    pub fn directory(&self) -> ClusterDirectory {
        self.directory.read().clone()
    }

    pub fn topology(&self) -> Arc<Topology> {
        self.topology.load()
    }

    pub fn neighbors(&self) -> Vec<NodeId> {
        self.topology.load().neighbors(&self.self_id).to_vec()
    }

    /// Record every value not seen before and return those, in arrival
    /// order. Duplicates are dropped silently.
    ///
    /// New values reach the log inside the dedup critical section: once a
    /// duplicate is rejected, `read_all` already shows the original.
    pub fn apply(&self, values: Vec<GossipValue>) -> Vec<GossipValue> {
        let received = values.len();
        let fresh = self
            .seen
            .mark_batch_with(values, |fresh| self.log.write().extend_from_slice(fresh));

        let duplicates = received - fresh.len();
        metrics::record_apply(fresh.len(), duplicates);
        if duplicates > 0 {
            debug!(node = %self.self_id, duplicates, "Ignored already-applied values");
        }
        fresh
    }

    /// Queue `fresh` for every neighbor in the forward set of `source`.
    /// Returns the number of jobs handed to the dispatcher.
    pub async fn forward(&self, source: &NodeId, fresh: Vec<GossipValue>) -> usize {
        if fresh.is_empty() {
            return 0;
        }

        let destinations = self.topology.load().forward_set(&self.self_id, source);
        let mut submitted = 0;
        for destination in destinations {
            let job = OutboundJob::new(destination, fresh.clone(), Some(source.clone()));
            match self.dispatcher.submit(job).await {
                Ok(()) => submitted += 1,
                Err(e) => {
                    warn!(node = %self.self_id, "Stopped forwarding: {}", e);
                    break;
                }
            }
        }

        debug!(
            node = %self.self_id,
            %source,
            values = fresh.len(),
            jobs = submitted,
            "Forwarded values"
        );
        submitted
    }

    /// Apply values received from `source` and forward the new ones.
    /// Returns how many were new.
    pub async fn on_receive(&self, source: &NodeId, values: Vec<GossipValue>) -> usize {
        let fresh = self.apply(values);
        let applied = fresh.len();
        self.forward(source, fresh).await;
        applied
    }

    /// Every applied value, ordered by id.
    pub fn read_all(&self) -> Vec<GossipValue> {
        let mut values = self.log.read().clone();
        values.sort_by_key(|v| v.id);
        values
    }

    pub fn read_ids(&self) -> BTreeSet<ValueId> {
        self.log.read().iter().map(|v| v.id).collect()
    }

    pub fn has_seen(&self, id: ValueId) -> bool {
        self.seen.contains(id)
    }

    /// Replace the membership and derive a new topology from it. On failure
    /// the previous directory and topology stay in place.
    pub fn rebuild_topology(&self, members: impl IntoIterator<Item = NodeId>) -> MeshResult<()> {
        let mut directory = self.directory.write();
        let rebuilt = directory
            .with_members(members)
            .and_then(|next| self.builder.build(&next).map(|topology| (next, topology)));

        match rebuilt {
            Ok((next, topology)) => {
                self.publish(topology);
                *directory = next;
                Ok(())
            }
            Err(e) => {
                warn!(
                    node = %self.self_id,
                    "Topology rebuild failed, keeping last good topology: {}",
                    e
                );
                Err(e.into())
            }
        }
    }

    /// Install an externally assigned neighbor table. Only the explicit
    /// strategy accepts one; returns whether it was installed.
    pub fn assign_topology(&self, assignment: Adjacency) -> bool {
        if self.builder.strategy() != TopologyStrategy::Explicit {
            debug!(
                node = %self.self_id,
                strategy = %self.builder.strategy(),
                "Ignoring assigned topology"
            );
            return false;
        }

        let topology = self.builder.explicit(assignment);
        let directory = self.directory.read();
        if !topology.is_connected(directory.members()) {
            warn!(
                node = %self.self_id,
                members = directory.len(),
                "Assigned topology does not connect every member"
            );
        }
        self.publish(topology);
        true
    }

    fn publish(&self, topology: Topology) {
        let neighbors = topology.neighbors(&self.self_id).to_vec();
        metrics::record_topology(neighbors.len());
        info!(
            node = %self.self_id,
            strategy = %topology.strategy(),
            ?neighbors,
            "Published topology"
        );
        self.topology.publish(topology);
    }
}
