//! Peer RPC transport used by the dispatcher.

use std::time::Duration;

use async_trait::async_trait;
use gossip_protocol::{NodeId, Payload};

use super::error::MeshResult;

/// Request/response primitive supplied by the surrounding node runtime.
///
/// `call` sends `payload` to `peer` and resolves with the reply payload, or
/// fails with [`MeshError::Timeout`](super::error::MeshError::Timeout) once
/// `timeout` elapses, or with a transport error if the request could not be
/// sent at all. An `error` reply is returned as a payload, not an `Err`.
#[async_trait]
pub trait Transport: Send + Sync + 'static {
    async fn call(&self, peer: &NodeId, payload: Payload, timeout: Duration)
        -> MeshResult<Payload>;
}
