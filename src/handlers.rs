//! Request handlers, one per message type.

use std::{collections::BTreeMap, sync::Arc};

use gossip_mesh::{ClusterDirectory, DisseminationEngine, OutboundDispatcher};
use gossip_protocol::{Envelope, GossipValue, NodeId, Payload};
use tracing::{debug, info};
use uuid::Uuid;

use super::{
    error::{NodeError, NodeResult},
    runtime::{Node, NodeState, StdioTransport},
};

/// What the runtime should do with a handled request.
pub(crate) enum Handled {
    Reply(Payload),
    /// Acknowledge with `broadcast_ok`, then forward the newly applied
    /// values. Forwarding failures never reach the requester.
    ReplyThenForward {
        engine: Arc<DisseminationEngine>,
        fresh: Vec<GossipValue>,
    },
}

pub(crate) fn handle(node: &Node, request: &Envelope) -> NodeResult<Handled> {
    match &request.body.payload {
        Payload::Init { node_id, node_ids } => {
            init(node, node_id, node_ids)?;
            Ok(Handled::Reply(Payload::InitOk))
        }
        Payload::Echo { echo } => Ok(Handled::Reply(Payload::EchoOk { echo: echo.clone() })),
        Payload::Generate => Ok(Handled::Reply(Payload::GenerateOk {
            id: Uuid::new_v4().to_string(),
        })),
        Payload::Broadcast { .. } => broadcast(node, request),
        Payload::Read => {
            let state = node.state()?;
            Ok(Handled::Reply(Payload::ReadOk {
                messages: state.engine.read_all(),
            }))
        }
        Payload::Topology { topology } => {
            self::topology(node, topology)?;
            Ok(Handled::Reply(Payload::TopologyOk))
        }
        other => Err(NodeError::Unsupported(other.type_name().to_string())),
    }
}

fn init(node: &Node, node_id: &NodeId, node_ids: &[NodeId]) -> NodeResult<()> {
    if let Ok(state) = node.state() {
        return Err(NodeError::AlreadyInitialized(state.id.clone()));
    }

    let directory = ClusterDirectory::new(node_id.clone(), node_ids.iter().cloned())
        .map_err(|e| NodeError::Malformed(e.to_string()))?;
    let transport = Arc::new(StdioTransport::new(node.outbox.clone(), node_id.clone()));
    let dispatcher = OutboundDispatcher::start(&node.config, transport);

    let engine = match DisseminationEngine::new(directory, &node.config, dispatcher.clone()) {
        Ok(engine) => engine,
        Err(e) => {
            // the workers are already running; stop them in the background
            tokio::spawn(async move { dispatcher.shutdown().await });
            return Err(e.into());
        }
    };

    info!(
        node = %node_id,
        members = node_ids.len(),
        neighbors = ?engine.neighbors(),
        "Node initialized"
    );
    node.install(NodeState {
        id: node_id.clone(),
        engine: Arc::new(engine),
    });
    Ok(())
}

fn broadcast(node: &Node, request: &Envelope) -> NodeResult<Handled> {
    let state = node.state()?;
    let values = request.body.payload.broadcast_values().ok_or_else(|| {
        NodeError::Malformed("broadcast carries neither message nor messages".to_string())
    })?;

    let fresh = state.engine.apply(values);
    Ok(Handled::ReplyThenForward {
        engine: state.engine.clone(),
        fresh,
    })
}

/// Explicit strategy: install the assignment. Other strategies derive
/// neighbors themselves and only take the membership from the message.
fn topology(node: &Node, assignment: &BTreeMap<NodeId, Vec<NodeId>>) -> NodeResult<()> {
    let state = node.state()?;
    let engine = &state.engine;

    if engine.assign_topology(assignment.clone()) {
        return Ok(());
    }
    if assignment.is_empty() {
        return Ok(());
    }
    let members: Vec<NodeId> = assignment.keys().cloned().collect();
    if members == engine.directory().members() {
        debug!(node = %state.id, "Topology membership unchanged");
        return Ok(());
    }
    engine.rebuild_topology(members)?;
    Ok(())
}
