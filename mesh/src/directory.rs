//! Cluster directory: this node's identity and the full member list.

use gossip_protocol::NodeId;

use super::error::TopologyError;

/// This node's id plus every member of the cluster, sorted and deduplicated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClusterDirectory {
    self_id: NodeId,
    members: Vec<NodeId>,
}

impl ClusterDirectory {
    pub fn new(
        self_id: NodeId,
        members: impl IntoIterator<Item = NodeId>,
    ) -> Result<Self, TopologyError> {
        let mut members: Vec<NodeId> = members.into_iter().collect();
        members.sort();
        members.dedup();

        if members.is_empty() {
            return Err(TopologyError::EmptyMembership);
        }
        if members.binary_search(&self_id).is_err() {
            return Err(TopologyError::NotAMember(self_id));
        }

        Ok(Self { self_id, members })
    }

    /// Same node, different membership.
    pub fn with_members(
        &self,
        members: impl IntoIterator<Item = NodeId>,
    ) -> Result<Self, TopologyError> {
        Self::new(self.self_id.clone(), members)
    }

    pub fn self_id(&self) -> &NodeId {
        &self.self_id
    }

    pub fn members(&self) -> &[NodeId] {
        &self.members
    }

    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }
}
