//! Node runtime
//!
//! Reads one JSON envelope per line from the input, answers requests, and
//! writes envelopes to the output through a single writer task. Requests
//! are handled on their own tasks, except `init`, which is handled inline
//! so that every later message sees the initialized node. Replies to this
//! node's own peer RPCs are matched to their callers by `in_reply_to`.

use std::{
    sync::{
        atomic::{AtomicU64, Ordering},
        Arc,
    },
    time::Duration,
};

use arc_swap::ArcSwapOption;
use async_trait::async_trait;
use dashmap::DashMap;
use gossip_mesh::{DisseminationEngine, MeshConfig, MeshError, MeshResult, Transport};
use gossip_protocol::{Body, Envelope, NodeId, Payload};
use serde_json::Value;
use tokio::{
    io::{AsyncBufReadExt, AsyncRead, AsyncWrite, AsyncWriteExt, BufReader, BufWriter},
    sync::{mpsc, oneshot, watch},
};
use tracing as log;
use tracing::instrument;

use super::{
    error::{NodeError, NodeResult},
    handlers::{self, Handled},
};

const OUTBOX_CAPACITY: usize = 4096;

/// Run a node until its input closes or `shutdown` flips to `true`.
pub async fn run<R, W>(
    config: MeshConfig,
    reader: R,
    writer: W,
    mut shutdown: watch::Receiver<bool>,
) -> NodeResult<()>
where
    R: AsyncRead + Unpin + Send + 'static,
    W: AsyncWrite + Unpin + Send + 'static,
{
    config.validate()?;

    let (out_tx, out_rx) = mpsc::channel(OUTBOX_CAPACITY);
    let (writer_stop_tx, writer_stop_rx) = watch::channel(false);
    let writer_task = tokio::spawn(write_loop(writer, out_rx, writer_stop_rx));

    let node = Arc::new(Node::new(config, Arc::new(Outbox::new(out_tx))));
    let mut lines = BufReader::new(reader).lines();
    let mut watching = true;
    let mut read_error = None;

    log::info!("Node runtime started");
    loop {
        tokio::select! {
            line = lines.next_line() => match line {
                Ok(Some(line)) => node.accept_line(line).await,
                Ok(None) => {
                    log::info!("Input closed");
                    break;
                }
                Err(e) => {
                    log::error!("Failed to read input: {}", e);
                    read_error = Some(e);
                    break;
                }
            },
            changed = shutdown.changed(), if watching => match changed {
                Ok(()) if *shutdown.borrow() => {
                    log::info!("Node runtime received shutdown signal");
                    break;
                }
                Ok(()) => {}
                Err(_) => watching = false,
            },
        }
    }

    node.shutdown().await;
    writer_stop_tx.send_replace(true);
    match writer_task.await {
        Ok(result) => result?,
        Err(e) => log::error!("Output writer task failed: {}", e),
    }
    log::info!("Node runtime stopped");

    match read_error {
        Some(e) => Err(e.into()),
        None => Ok(()),
    }
}

#[instrument(skip_all)]
async fn write_loop<W>(
    writer: W,
    mut rx: mpsc::Receiver<Envelope>,
    mut stop: watch::Receiver<bool>,
) -> NodeResult<()>
where
    W: AsyncWrite + Unpin,
{
    let mut writer = BufWriter::new(writer);
    loop {
        let envelope = tokio::select! {
            envelope = rx.recv() => match envelope {
                Some(envelope) => envelope,
                None => break,
            },
            _ = stop.changed() => {
                while let Ok(envelope) = rx.try_recv() {
                    write_line(&mut writer, &envelope).await?;
                }
                break;
            }
        };
        write_line(&mut writer, &envelope).await?;
        if rx.is_empty() {
            writer.flush().await?;
        }
    }
    writer.flush().await?;
    Ok(())
}

async fn write_line<W>(writer: &mut W, envelope: &Envelope) -> NodeResult<()>
where
    W: AsyncWrite + Unpin,
{
    let mut line = serde_json::to_vec(envelope)?;
    line.push(b'\n');
    writer.write_all(&line).await?;
    Ok(())
}

/// Outgoing message queue plus bookkeeping for in-flight peer RPCs.
pub(crate) struct Outbox {
    tx: mpsc::Sender<Envelope>,
    next_msg_id: AtomicU64,
    pending: DashMap<u64, oneshot::Sender<MeshResult<Payload>>>,
}

impl Outbox {
    fn new(tx: mpsc::Sender<Envelope>) -> Self {
        Self {
            tx,
            next_msg_id: AtomicU64::new(1),
            pending: DashMap::new(),
        }
    }

    fn next_msg_id(&self) -> u64 {
        self.next_msg_id.fetch_add(1, Ordering::Relaxed)
    }

    async fn send(&self, envelope: Envelope) -> NodeResult<()> {
        self.tx
            .send(envelope)
            .await
            .map_err(|_| NodeError::Io(std::io::ErrorKind::BrokenPipe.into()))
    }

    async fn reply(&self, request: &Envelope, payload: Payload) -> NodeResult<()> {
        self.send(request.reply(Some(self.next_msg_id()), payload)).await
    }

    /// Send `payload` to `peer` and wait for the matching reply.
    async fn rpc(
        &self,
        local: &NodeId,
        peer: &NodeId,
        payload: Payload,
        timeout: Duration,
    ) -> MeshResult<Payload> {
        let msg_id = self.next_msg_id();
        let (reply_tx, reply_rx) = oneshot::channel();
        self.pending.insert(msg_id, reply_tx);
        // removes the entry however this call ends, including cancellation
        let _pending = PendingEntry {
            pending: &self.pending,
            msg_id,
        };

        let request = Envelope::new(local.clone(), peer.clone(), Body::request(msg_id, payload));
        if self.tx.send(request).await.is_err() {
            return Err(MeshError::Transport {
                peer: peer.clone(),
                reason: "output closed".to_string(),
            });
        }

        match tokio::time::timeout(timeout, reply_rx).await {
            Ok(Ok(outcome)) => outcome,
            Ok(Err(_)) => Err(MeshError::Transport {
                peer: peer.clone(),
                reason: "reply channel dropped".to_string(),
            }),
            Err(_) => Err(MeshError::Timeout {
                peer: peer.clone(),
                timeout,
            }),
        }
    }

    /// Hand a reply to the RPC waiting for it. Returns `false` when no call
    /// is waiting, e.g. because it already timed out.
    fn resolve(&self, in_reply_to: u64, outcome: MeshResult<Payload>) -> bool {
        match self.pending.remove(&in_reply_to) {
            Some((_, waiter)) => waiter.send(outcome).is_ok(),
            None => false,
        }
    }

    fn in_flight(&self) -> usize {
        self.pending.len()
    }
}

struct PendingEntry<'a> {
    pending: &'a DashMap<u64, oneshot::Sender<MeshResult<Payload>>>,
    msg_id: u64,
}

impl Drop for PendingEntry<'_> {
    fn drop(&mut self) {
        self.pending.remove(&self.msg_id);
    }
}

/// Peer RPC over the node's own input and output streams.
pub(crate) struct StdioTransport {
    outbox: Arc<Outbox>,
    local: NodeId,
}

impl StdioTransport {
    pub(crate) fn new(outbox: Arc<Outbox>, local: NodeId) -> Self {
        Self { outbox, local }
    }
}

#[async_trait]
impl Transport for StdioTransport {
    async fn call(
        &self,
        peer: &NodeId,
        payload: Payload,
        timeout: Duration,
    ) -> MeshResult<Payload> {
        self.outbox.rpc(&self.local, peer, payload, timeout).await
    }
}

/// State that exists once `init` has been handled.
pub(crate) struct NodeState {
    pub(crate) id: NodeId,
    pub(crate) engine: Arc<DisseminationEngine>,
}

pub(crate) struct Node {
    pub(crate) config: MeshConfig,
    pub(crate) outbox: Arc<Outbox>,
    state: ArcSwapOption<NodeState>,
}

impl Node {
    fn new(config: MeshConfig, outbox: Arc<Outbox>) -> Self {
        Self {
            config,
            outbox,
            state: ArcSwapOption::empty(),
        }
    }

    pub(crate) fn state(&self) -> NodeResult<Arc<NodeState>> {
        self.state.load_full().ok_or(NodeError::NotInitialized)
    }

    pub(crate) fn install(&self, state: NodeState) {
        self.state.store(Some(Arc::new(state)));
    }

    async fn accept_line(self: &Arc<Self>, line: String) {
        if line.trim().is_empty() {
            return;
        }
        let envelope: Envelope = match serde_json::from_str(&line) {
            Ok(envelope) => envelope,
            Err(e) => {
                self.reject_undecodable(&line, e).await;
                return;
            }
        };

        if let Some(in_reply_to) = envelope.body.in_reply_to {
            let kind = envelope.body.payload.type_name();
            if !self.outbox.resolve(in_reply_to, Ok(envelope.body.payload)) {
                log::debug!(
                    src = %envelope.src,
                    in_reply_to,
                    "Dropping {} for a request that is no longer waiting",
                    kind
                );
            }
            return;
        }

        if matches!(envelope.body.payload, Payload::Init { .. }) {
            self.handle(envelope).await;
        } else {
            let node = self.clone();
            tokio::spawn(async move { node.handle(envelope).await });
        }
    }

    async fn handle(&self, request: Envelope) {
        let kind = request.body.payload.type_name();
        let handled = match handlers::handle(self, &request) {
            Ok(handled) => handled,
            Err(e) => {
                log::warn!(src = %request.src, "Rejecting {}: {}", kind, e);
                Handled::Reply(Payload::error(e.code(), e.to_string()))
            }
        };

        match handled {
            Handled::Reply(payload) => {
                if let Err(e) = self.outbox.reply(&request, payload).await {
                    log::warn!("Failed to reply to {}: {}", request.src, e);
                }
            }
            Handled::ReplyThenForward { engine, fresh } => {
                if let Err(e) = self.outbox.reply(&request, Payload::BroadcastOk).await {
                    log::warn!("Failed to reply to {}: {}", request.src, e);
                }
                engine.forward(&request.src, fresh).await;
            }
        }
    }

    /// Answer a line that is not a valid envelope with an `error` reply,
    /// when it carries enough addressing to send one. A line that answers
    /// one of this node's RPCs is never answered; its caller fails instead.
    async fn reject_undecodable(&self, line: &str, err: serde_json::Error) {
        let Ok(raw) = serde_json::from_str::<Value>(line) else {
            log::warn!("Dropping unparsable input line: {}", err);
            return;
        };
        let field = |name: &str| raw.get(name).and_then(Value::as_str).map(NodeId::from);
        let body = raw.get("body");
        let msg_id = body.and_then(|b| b.get("msg_id")).and_then(Value::as_u64);
        let kind = body.and_then(|b| b.get("type")).and_then(Value::as_str);

        let in_reply_to = body
            .and_then(|b| b.get("in_reply_to"))
            .and_then(Value::as_u64);
        if let Some(in_reply_to) = in_reply_to {
            let reason = format!("undecodable {} reply: {}", kind.unwrap_or("untyped"), err);
            log::warn!(src = ?field("src"), in_reply_to, "Failing RPC on {}", reason);
            self.outbox
                .resolve(in_reply_to, Err(MeshError::Malformed(reason)));
            return;
        }

        let (Some(src), Some(dest), Some(msg_id)) = (field("src"), field("dest"), msg_id) else {
            log::warn!("Dropping undecodable message without reply address: {}", err);
            return;
        };

        let error = match kind {
            Some(kind) if !Payload::KNOWN_TYPES.contains(&kind) => {
                NodeError::Unsupported(kind.to_string())
            }
            _ => NodeError::Malformed(err.to_string()),
        };
        log::warn!(%src, "Rejecting message: {}", error);

        let reply = Envelope::new(
            dest,
            src,
            Body {
                msg_id: Some(self.outbox.next_msg_id()),
                in_reply_to: Some(msg_id),
                payload: Payload::error(error.code(), error.to_string()),
            },
        );
        if let Err(e) = self.outbox.send(reply).await {
            log::warn!("Failed to send error reply: {}", e);
        }
    }

    async fn shutdown(&self) {
        if let Some(state) = self.state.load_full() {
            log::info!(
                node = %state.id,
                in_flight = self.outbox.in_flight(),
                "Stopping dispatcher"
            );
            state.engine.dispatcher().shutdown().await;
        }
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use gossip_mesh::TopologyStrategy;
    use serde_json::json;
    use tokio::{
        io::{split, AsyncBufReadExt, AsyncWriteExt, BufReader, DuplexStream, Lines, ReadHalf, WriteHalf},
        task::JoinHandle,
    };

    use super::*;

    struct Harness {
        input: WriteHalf<DuplexStream>,
        output: Lines<BufReader<ReadHalf<DuplexStream>>>,
        stop: watch::Sender<bool>,
        task: JoinHandle<NodeResult<()>>,
    }

    impl Harness {
        fn start(config: MeshConfig) -> Self {
            let (client, server) = tokio::io::duplex(64 * 1024);
            let (server_read, server_write) = split(server);
            let (client_read, client_write) = split(client);
            let (stop, stop_rx) = watch::channel(false);
            let task = tokio::spawn(run(config, server_read, server_write, stop_rx));
            Self {
                input: client_write,
                output: BufReader::new(client_read).lines(),
                stop,
                task,
            }
        }

        async fn send(&mut self, message: Value) {
            let mut line = message.to_string();
            line.push('\n');
            self.input.write_all(line.as_bytes()).await.unwrap();
        }

        async fn send_raw(&mut self, line: &str) {
            self.input.write_all(line.as_bytes()).await.unwrap();
            self.input.write_all(b"\n").await.unwrap();
        }

        async fn recv(&mut self) -> Value {
            let line = tokio::time::timeout(Duration::from_secs(5), self.output.next_line())
                .await
                .expect("timed out waiting for output")
                .unwrap()
                .expect("output closed");
            serde_json::from_str(&line).unwrap()
        }

        async fn recv_none(&mut self, wait: Duration) {
            if let Ok(line) = tokio::time::timeout(wait, self.output.next_line()).await {
                panic!("unexpected output: {:?}", line);
            }
        }

        async fn request(&mut self, src: &str, msg_id: u64, body: Value) -> Value {
            let mut body = body;
            body["msg_id"] = json!(msg_id);
            self.send(json!({"src": src, "dest": "n0", "body": body})).await;
            let reply = self.recv().await;
            assert_eq!(reply["dest"], json!(src));
            assert_eq!(reply["body"]["in_reply_to"], json!(msg_id));
            reply["body"].clone()
        }

        async fn init(&mut self, members: &[&str]) {
            let body = self
                .request("c0", 1, json!({"type": "init", "node_id": "n0", "node_ids": members}))
                .await;
            assert_eq!(body["type"], "init_ok");
        }

        async fn stop(self) {
            self.stop.send_replace(true);
            let result = tokio::time::timeout(Duration::from_secs(5), self.task)
                .await
                .expect("runtime did not stop")
                .unwrap();
            assert!(result.is_ok());
        }
    }

    fn fast_config(strategy: TopologyStrategy) -> MeshConfig {
        MeshConfig {
            strategy,
            workers: 2,
            rpc_timeout_ms: 100,
            backoff_base_ms: 10,
            max_backoff_ms: 20,
            ..Default::default()
        }
    }

    // ========================================================================
    // Handshake and simple workloads
    // ========================================================================

    #[tokio::test]
    async fn test_init_and_echo() {
        let mut node = Harness::start(MeshConfig::default());
        node.init(&["n0"]).await;

        let body = node
            .request("c1", 2, json!({"type": "echo", "echo": "hello"}))
            .await;
        assert_eq!(body["type"], "echo_ok");
        assert_eq!(body["echo"], "hello");
        node.stop().await;
    }

    #[tokio::test]
    async fn test_requests_before_init_are_temporarily_unavailable() {
        let mut node = Harness::start(MeshConfig::default());
        let body = node
            .request("c1", 1, json!({"type": "broadcast", "message": 1}))
            .await;
        assert_eq!(body["type"], "error");
        assert_eq!(body["code"], 11);
        node.stop().await;
    }

    #[tokio::test]
    async fn test_generate_returns_unique_ids() {
        let mut node = Harness::start(MeshConfig::default());
        node.init(&["n0"]).await;

        let first = node.request("c1", 2, json!({"type": "generate"})).await;
        let second = node.request("c1", 3, json!({"type": "generate"})).await;
        assert_eq!(first["type"], "generate_ok");
        assert_ne!(first["id"], second["id"]);
        node.stop().await;
    }

    #[tokio::test]
    async fn test_second_init_is_rejected() {
        let mut node = Harness::start(MeshConfig::default());
        node.init(&["n0"]).await;
        let body = node
            .request("c0", 2, json!({"type": "init", "node_id": "n0", "node_ids": ["n0"]}))
            .await;
        assert_eq!(body["type"], "error");
        assert_eq!(body["code"], 12);
        node.stop().await;
    }

    // ========================================================================
    // Broadcast and read
    // ========================================================================

    #[tokio::test]
    async fn test_single_node_broadcast_and_read() {
        let mut node = Harness::start(MeshConfig::default());
        node.init(&["n0"]).await;

        let ok = node
            .request("c1", 2, json!({"type": "broadcast", "message": 42}))
            .await;
        assert_eq!(ok["type"], "broadcast_ok");
        let ok = node
            .request("c1", 3, json!({"type": "broadcast", "messages": [7, 42, 1]}))
            .await;
        assert_eq!(ok["type"], "broadcast_ok");

        let read = node.request("c1", 4, json!({"type": "read"})).await;
        assert_eq!(read["type"], "read_ok");
        assert_eq!(read["messages"], json!([1, 7, 42]));
        node.stop().await;
    }

    #[tokio::test]
    async fn test_broadcast_is_acknowledged_before_forwarding() {
        let mut node = Harness::start(fast_config(TopologyStrategy::FullMesh));
        node.init(&["n0", "n1"]).await;

        let ok = node
            .request("c1", 2, json!({"type": "broadcast", "message": 5}))
            .await;
        assert_eq!(ok["type"], "broadcast_ok");

        let forward = node.recv().await;
        assert_eq!(forward["src"], "n0");
        assert_eq!(forward["dest"], "n1");
        assert_eq!(forward["body"]["type"], "broadcast");
        assert_eq!(forward["body"]["message"], 5);
        let msg_id = forward["body"]["msg_id"].clone();

        node.send(json!({
            "src": "n1",
            "dest": "n0",
            "body": {"type": "broadcast_ok", "in_reply_to": msg_id}
        }))
        .await;
        node.recv_none(Duration::from_millis(300)).await;
        node.stop().await;
    }

    #[tokio::test]
    async fn test_unanswered_forward_is_retried() {
        let mut node = Harness::start(fast_config(TopologyStrategy::FullMesh));
        node.init(&["n0", "n1"]).await;
        node.request("c1", 2, json!({"type": "broadcast", "message": 9}))
            .await;

        let first = node.recv().await;
        let retry = node.recv().await;
        assert_eq!(retry["dest"], "n1");
        assert_eq!(retry["body"]["message"], 9);
        assert_ne!(retry["body"]["msg_id"], first["body"]["msg_id"]);

        node.send(json!({
            "src": "n1",
            "dest": "n0",
            "body": {"type": "broadcast_ok", "in_reply_to": retry["body"]["msg_id"]}
        }))
        .await;
        node.recv_none(Duration::from_millis(300)).await;
        node.stop().await;
    }

    #[tokio::test]
    async fn test_undecodable_reply_fails_forward_without_answer() {
        let mut node = Harness::start(fast_config(TopologyStrategy::FullMesh));
        node.init(&["n0", "n1"]).await;
        node.request("c1", 2, json!({"type": "broadcast", "message": 9}))
            .await;

        let forward = node.recv().await;
        assert_eq!(forward["dest"], "n1");
        node.send(json!({
            "src": "n1",
            "dest": "n0",
            "body": {
                "type": "broadcast_ok_v2",
                "in_reply_to": forward["body"]["msg_id"],
                "msg_id": 77
            }
        }))
        .await;

        // no error reply to the reply, and no retry of the forward
        node.recv_none(Duration::from_millis(400)).await;
        let read = node.request("c1", 3, json!({"type": "read"})).await;
        assert_eq!(read["messages"], json!([9]));
        node.stop().await;
    }

    #[tokio::test]
    async fn test_peer_broadcast_is_not_sent_back() {
        let mut node = Harness::start(fast_config(TopologyStrategy::FullMesh));
        node.init(&["n0", "n1"]).await;

        let ok = node
            .request("n1", 2, json!({"type": "broadcast", "messages": [3, 4]}))
            .await;
        assert_eq!(ok["type"], "broadcast_ok");
        node.recv_none(Duration::from_millis(300)).await;

        let read = node.request("c1", 3, json!({"type": "read"})).await;
        assert_eq!(read["messages"], json!([3, 4]));
        node.stop().await;
    }

    // ========================================================================
    // Topology
    // ========================================================================

    #[tokio::test]
    async fn test_assigned_topology_routes_forwards() {
        let mut node = Harness::start(fast_config(TopologyStrategy::Explicit));
        node.init(&["n0", "n1", "n2"]).await;

        let ok = node
            .request(
                "c1",
                2,
                json!({"type": "topology", "topology": {
                    "n0": ["n2"], "n1": ["n2"], "n2": ["n0", "n1"]
                }}),
            )
            .await;
        assert_eq!(ok["type"], "topology_ok");

        node.request("c1", 3, json!({"type": "broadcast", "message": 8}))
            .await;
        let forward = node.recv().await;
        assert_eq!(forward["dest"], "n2");
        node.send(json!({
            "src": "n2",
            "dest": "n0",
            "body": {"type": "broadcast_ok", "in_reply_to": forward["body"]["msg_id"]}
        }))
        .await;
        node.recv_none(Duration::from_millis(300)).await;
        node.stop().await;
    }

    #[tokio::test]
    async fn test_explicit_strategy_accepts_unnumbered_members() {
        let mut node = Harness::start(fast_config(TopologyStrategy::Explicit));
        node.init(&["n0", "lb"]).await;

        // no edges until the assignment arrives
        node.request("c1", 2, json!({"type": "broadcast", "message": 1}))
            .await;
        node.recv_none(Duration::from_millis(200)).await;

        let ok = node
            .request(
                "c1",
                3,
                json!({"type": "topology", "topology": {"n0": ["lb"], "lb": ["n0"]}}),
            )
            .await;
        assert_eq!(ok["type"], "topology_ok");

        node.request("c1", 4, json!({"type": "broadcast", "message": 2}))
            .await;
        let forward = node.recv().await;
        assert_eq!(forward["dest"], "lb");
        assert_eq!(forward["body"]["message"], 2);
        node.send(json!({
            "src": "lb",
            "dest": "n0",
            "body": {"type": "broadcast_ok", "in_reply_to": forward["body"]["msg_id"]}
        }))
        .await;
        node.recv_none(Duration::from_millis(300)).await;
        node.stop().await;
    }

    #[tokio::test]
    async fn test_topology_with_unrankable_member_is_rejected() {
        let mut node = Harness::start(MeshConfig::default());
        node.init(&["n0", "n1"]).await;

        let body = node
            .request(
                "c1",
                2,
                json!({"type": "topology", "topology": {"n0": ["lb"], "lb": ["n0"]}}),
            )
            .await;
        assert_eq!(body["type"], "error");
        assert_eq!(body["code"], 12);
        node.stop().await;
    }

    // ========================================================================
    // Bad input
    // ========================================================================

    #[tokio::test]
    async fn test_unknown_type_not_supported() {
        let mut node = Harness::start(MeshConfig::default());
        node.init(&["n0"]).await;
        let body = node.request("c1", 2, json!({"type": "cas", "key": 1})).await;
        assert_eq!(body["type"], "error");
        assert_eq!(body["code"], 10);
        node.stop().await;
    }

    #[tokio::test]
    async fn test_malformed_body_rejected_and_node_keeps_running() {
        let mut node = Harness::start(MeshConfig::default());
        node.init(&["n0"]).await;

        let body = node
            .request("c1", 2, json!({"type": "broadcast", "message": "not a value"}))
            .await;
        assert_eq!(body["code"], 12);

        let body = node.request("c1", 3, json!({"type": "broadcast"})).await;
        assert_eq!(body["code"], 12);

        node.send_raw("this is not json").await;
        let echo = node
            .request("c1", 4, json!({"type": "echo", "echo": 1}))
            .await;
        assert_eq!(echo["type"], "echo_ok");
        node.stop().await;
    }

    #[tokio::test]
    async fn test_input_eof_stops_runtime() {
        let Harness {
            mut input,
            mut output,
            task,
            stop: _stop,
        } = Harness::start(MeshConfig::default());
        input.shutdown().await.unwrap();
        let result = tokio::time::timeout(Duration::from_secs(5), task)
            .await
            .unwrap()
            .unwrap();
        assert!(result.is_ok());
        assert!(output.next_line().await.unwrap().is_none());
    }
}
