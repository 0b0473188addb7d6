//! Test helpers: recording and in-memory transports, cluster harness.

use std::{
    sync::{Arc, Once},
    time::Duration,
};

use async_trait::async_trait;
use dashmap::{DashMap, DashSet};
use gossip_protocol::{ErrorCode, GossipValue, NodeId, Payload, ValueId};
use parking_lot::Mutex;
use tokio::time::{sleep, Instant};
use tracing_subscriber::{
    filter::LevelFilter, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter,
};

use crate::{
    config::MeshConfig,
    directory::ClusterDirectory,
    dispatcher::OutboundDispatcher,
    engine::DisseminationEngine,
    error::{MeshError, MeshResult},
    transport::Transport,
};

static INIT: Once = Once::new();

/// Initialize test logging infrastructure
pub(crate) fn init_test_logging() {
    INIT.call_once(|| {
        let _ = tracing_subscriber::registry()
            .with(tracing_subscriber::fmt::layer())
            .with(
                EnvFilter::builder()
                    .with_default_directive(LevelFilter::INFO.into())
                    .from_env_lossy(),
            )
            .try_init();
    });
}

/// Poll `condition` until it holds or `timeout` passes.
pub(crate) async fn wait_for(mut condition: impl FnMut() -> bool, timeout: Duration) -> bool {
    let deadline = Instant::now() + timeout;
    loop {
        if condition() {
            return true;
        }
        if Instant::now() >= deadline {
            return false;
        }
        sleep(Duration::from_millis(5)).await;
    }
}

type Responder = Box<dyn Fn(&NodeId, &Payload, usize) -> MeshResult<Payload> + Send + Sync>;

/// Records every call and answers with a scripted responder. The responder
/// sees the zero-based index of the call.
pub(crate) struct RecordingTransport {
    calls: Mutex<Vec<(NodeId, Payload)>>,
    responder: Responder,
}

impl RecordingTransport {
    pub(crate) fn ok() -> Arc<Self> {
        Self::with_responder(|_, _, _| Ok(Payload::BroadcastOk))
    }

    pub(crate) fn with_responder<F>(responder: F) -> Arc<Self>
    where
        F: Fn(&NodeId, &Payload, usize) -> MeshResult<Payload> + Send + Sync + 'static,
    {
        Arc::new(Self {
            calls: Mutex::new(Vec::new()),
            responder: Box::new(responder),
        })
    }

    pub(crate) fn calls(&self) -> Vec<(NodeId, Payload)> {
        self.calls.lock().clone()
    }

    pub(crate) fn call_count(&self) -> usize {
        self.calls.lock().len()
    }
}

#[async_trait]
impl Transport for RecordingTransport {
    async fn call(
        &self,
        peer: &NodeId,
        payload: Payload,
        _timeout: Duration,
    ) -> MeshResult<Payload> {
        let index = {
            let mut calls = self.calls.lock();
            calls.push((peer.clone(), payload.clone()));
            calls.len() - 1
        };
        (self.responder)(peer, &payload, index)
    }
}

// ============================================================================
// In-memory cluster
// ============================================================================

/// Routes peer RPCs straight into the target node's engine.
#[derive(Default)]
pub(crate) struct InMemoryNetwork {
    engines: DashMap<NodeId, Arc<DisseminationEngine>>,
    down: DashSet<NodeId>,
    /// Broadcast RPCs that reached a live node
    deliveries: DashMap<NodeId, usize>,
}

impl InMemoryNetwork {
    pub(crate) fn set_down(&self, node: &NodeId, down: bool) {
        if down {
            self.down.insert(node.clone());
        } else {
            self.down.remove(node);
        }
    }

    pub(crate) fn deliveries_to(&self, node: &NodeId) -> usize {
        self.deliveries.get(node).map(|d| *d).unwrap_or(0)
    }

    pub(crate) fn total_deliveries(&self) -> usize {
        self.deliveries.iter().map(|d| *d.value()).sum()
    }
}

/// Transport for one node of an [`InMemoryNetwork`].
pub(crate) struct NetworkTransport {
    network: Arc<InMemoryNetwork>,
    local: NodeId,
}

#[async_trait]
impl Transport for NetworkTransport {
    async fn call(
        &self,
        peer: &NodeId,
        payload: Payload,
        _timeout: Duration,
    ) -> MeshResult<Payload> {
        if self.network.down.contains(peer) {
            return Err(MeshError::Transport {
                peer: peer.clone(),
                reason: "node is down".to_string(),
            });
        }
        let Some(engine) = self.network.engines.get(peer).map(|e| e.clone()) else {
            return Err(MeshError::Transport {
                peer: peer.clone(),
                reason: "unknown node".to_string(),
            });
        };
        let Some(values) = payload.broadcast_values() else {
            return Ok(Payload::error(
                ErrorCode::NotSupported,
                format!("unsupported: {}", payload.type_name()),
            ));
        };

        *self.network.deliveries.entry(peer.clone()).or_insert(0) += 1;
        Ok(accept_broadcast(engine, &self.local, values))
    }
}

/// Apply, acknowledge, and forward in the background, the way a node
/// handles a `broadcast` request.
pub(crate) fn accept_broadcast(
    engine: Arc<DisseminationEngine>,
    source: &NodeId,
    values: Vec<GossipValue>,
) -> Payload {
    let fresh = engine.apply(values);
    let source = source.clone();
    tokio::spawn(async move {
        engine.forward(&source, fresh).await;
    });
    Payload::BroadcastOk
}

pub(crate) struct TestCluster {
    pub(crate) network: Arc<InMemoryNetwork>,
    pub(crate) nodes: Vec<NodeId>,
}

impl TestCluster {
    pub(crate) fn start(size: usize, config: &MeshConfig) -> Self {
        let network = Arc::new(InMemoryNetwork::default());
        let nodes: Vec<NodeId> = (0..size).map(|i| NodeId::new(format!("n{}", i))).collect();

        for id in &nodes {
            let transport = Arc::new(NetworkTransport {
                network: network.clone(),
                local: id.clone(),
            });
            let dispatcher = OutboundDispatcher::start(config, transport);
            let directory = ClusterDirectory::new(id.clone(), nodes.clone()).unwrap();
            let engine = DisseminationEngine::new(directory, config, dispatcher).unwrap();
            network.engines.insert(id.clone(), Arc::new(engine));
        }

        Self { network, nodes }
    }

    pub(crate) fn engine(&self, index: usize) -> Arc<DisseminationEngine> {
        self.network
            .engines
            .get(&self.nodes[index])
            .map(|e| e.clone())
            .unwrap()
    }

    /// Client broadcast of one value to node `index`.
    pub(crate) fn client_broadcast(&self, index: usize, id: ValueId) -> Payload {
        accept_broadcast(
            self.engine(index),
            &NodeId::from("c1"),
            vec![GossipValue::new(id)],
        )
    }

    pub(crate) fn all_have(&self, id: ValueId) -> bool {
        (0..self.nodes.len()).all(|i| self.engine(i).has_seen(id))
    }

    pub(crate) async fn shutdown(&self) {
        for i in 0..self.nodes.len() {
            self.engine(i).dispatcher().shutdown().await;
        }
    }
}
