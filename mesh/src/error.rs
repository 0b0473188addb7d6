//! Mesh error types.

use std::time::Duration;

use gossip_protocol::{ErrorCode, NodeId};
use thiserror::Error;

pub type MeshResult<T> = Result<T, MeshError>;

#[derive(Debug, Error)]
pub enum MeshError {
    #[error("RPC to {peer} timed out after {timeout:?}")]
    Timeout { peer: NodeId, timeout: Duration },

    #[error("Transport error talking to {peer}: {reason}")]
    Transport { peer: NodeId, reason: String },

    #[error("Peer {peer} rejected request ({code}): {text}")]
    Rejected {
        peer: NodeId,
        code: ErrorCode,
        text: String,
    },

    #[error("Unexpected reply from {peer}: {reply}")]
    UnexpectedReply { peer: NodeId, reply: String },

    #[error("Malformed payload: {0}")]
    Malformed(String),

    #[error("Topology error: {0}")]
    Topology(#[from] TopologyError),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Dispatcher is shut down")]
    DispatcherClosed,
}

impl MeshError {
    /// Transport failures and indefinite rejections are worth another
    /// attempt; everything else fails the same way on retry.
    pub fn is_retryable(&self) -> bool {
        match self {
            MeshError::Timeout { .. } | MeshError::Transport { .. } => true,
            MeshError::Rejected { code, .. } => code.is_indefinite(),
            _ => false,
        }
    }
}

/// Failures while deriving a topology from cluster membership.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TopologyError {
    #[error("Cluster membership is empty")]
    EmptyMembership,

    #[error("Node {0} is not a cluster member")]
    NotAMember(NodeId),

    #[error("Cannot derive an ordinal from node id '{0}'")]
    UnparsableNodeId(NodeId),
}
