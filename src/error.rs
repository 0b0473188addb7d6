//! Runtime error types and their protocol error codes.

use gossip_mesh::MeshError;
use gossip_protocol::{ErrorCode, NodeId};
use thiserror::Error;

pub type NodeResult<T> = Result<T, NodeError>;

#[derive(Debug, Error)]
pub enum NodeError {
    #[error("Node has not been initialized")]
    NotInitialized,

    #[error("Node is already initialized as {0}")]
    AlreadyInitialized(NodeId),

    #[error("Malformed request: {0}")]
    Malformed(String),

    #[error("Unsupported message type: {0}")]
    Unsupported(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Logging setup failed: {0}")]
    Logging(String),

    #[error(transparent)]
    Mesh(#[from] MeshError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl NodeError {
    /// Error code reported to the requester.
    pub fn code(&self) -> ErrorCode {
        match self {
            NodeError::NotInitialized => ErrorCode::TemporarilyUnavailable,
            NodeError::AlreadyInitialized(_) | NodeError::Malformed(_) => {
                ErrorCode::MalformedRequest
            }
            NodeError::Unsupported(_) => ErrorCode::NotSupported,
            NodeError::Mesh(e) => match e {
                MeshError::Topology(_) | MeshError::Malformed(_) | MeshError::Config(_) => {
                    ErrorCode::MalformedRequest
                }
                MeshError::Timeout { .. } => ErrorCode::Timeout,
                MeshError::DispatcherClosed => ErrorCode::TemporarilyUnavailable,
                _ => ErrorCode::Crash,
            },
            NodeError::Config(_) | NodeError::Logging(_) | NodeError::Io(_) | NodeError::Json(_) => {
                ErrorCode::Crash
            }
        }
    }
}
