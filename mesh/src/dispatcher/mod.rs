//! Outbound dispatcher
//!
//! Forwarding never blocks request handling: jobs go into a bounded queue
//! drained by a fixed pool of workers. Each worker delivers one job at a
//! time, retrying transient failures with linear backoff until the attempt
//! budget is spent. In batched mode jobs first accumulate in per-peer
//! buffers that a flusher task drains into the queue on a fixed interval.

mod batch;
mod retry;

use std::{
    sync::{
        atomic::{AtomicU64, Ordering},
        Arc,
    },
    time::Duration,
};

pub use batch::BatchBuffers;
use gossip_protocol::{GossipValue, NodeId, Payload};
use parking_lot::Mutex;
pub use retry::{RetryPolicy, RetryState};
use tokio::{
    sync::watch,
    task::JoinHandle,
    time::{interval, sleep, MissedTickBehavior},
};
use tracing::{debug, info, instrument, warn};

use super::{
    config::{DispatchMode, MeshConfig},
    error::{MeshError, MeshResult},
    metrics,
    transport::Transport,
};

/// Values to deliver to one peer.
#[derive(Debug, Clone, PartialEq)]
pub struct OutboundJob {
    pub destination: NodeId,
    pub values: Vec<GossipValue>,
    /// Peer the values arrived from; never equal to `destination`.
    pub source_to_exclude: Option<NodeId>,
}

impl OutboundJob {
    pub fn new(
        destination: NodeId,
        values: Vec<GossipValue>,
        source_to_exclude: Option<NodeId>,
    ) -> Self {
        Self {
            destination,
            values,
            source_to_exclude,
        }
    }
}

#[derive(Debug, Default)]
struct DispatcherStats {
    submitted: AtomicU64,
    attempts: AtomicU64,
    retries: AtomicU64,
    delivered: AtomicU64,
    dropped: AtomicU64,
    flushes: AtomicU64,
}

/// Point-in-time copy of the dispatcher counters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DispatcherSnapshot {
    pub submitted: u64,
    pub attempts: u64,
    pub retries: u64,
    pub delivered: u64,
    pub dropped: u64,
    pub flushes: u64,
}

impl DispatcherSnapshot {
    /// Jobs that reached a terminal outcome.
    pub fn settled(&self) -> u64 {
        self.delivered + self.dropped
    }
}

impl DispatcherStats {
    fn snapshot(&self) -> DispatcherSnapshot {
        DispatcherSnapshot {
            submitted: self.submitted.load(Ordering::Relaxed),
            attempts: self.attempts.load(Ordering::Relaxed),
            retries: self.retries.load(Ordering::Relaxed),
            delivered: self.delivered.load(Ordering::Relaxed),
            dropped: self.dropped.load(Ordering::Relaxed),
            flushes: self.flushes.load(Ordering::Relaxed),
        }
    }
}

pub struct OutboundDispatcher {
    mode: DispatchMode,
    queue: async_channel::Sender<OutboundJob>,
    buffers: Arc<BatchBuffers>,
    stats: Arc<DispatcherStats>,
    shutdown_tx: watch::Sender<bool>,
    tasks: Mutex<Vec<JoinHandle<()>>>,
}

impl std::fmt::Debug for OutboundDispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OutboundDispatcher")
            .field("mode", &self.mode)
            .field("queued", &self.queue.len())
            .field("stats", &self.stats.snapshot())
            .finish()
    }
}

impl OutboundDispatcher {
    /// Spawn the worker pool (and the flusher in batched mode) on the
    /// current tokio runtime.
    pub fn start(config: &MeshConfig, transport: Arc<dyn Transport>) -> Arc<Self> {
        let (queue_tx, queue_rx) = async_channel::bounded(config.queue_capacity.max(1));
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let stats = Arc::new(DispatcherStats::default());
        let buffers = Arc::new(BatchBuffers::new());
        let policy = RetryPolicy::from_config(config);
        let workers = config.workers.max(1);

        let mut tasks = Vec::with_capacity(workers + 1);
        for id in 0..workers {
            let worker = Worker {
                id,
                queue: queue_rx.clone(),
                transport: transport.clone(),
                policy,
                rpc_timeout: config.rpc_timeout(),
                stats: stats.clone(),
                shutdown: shutdown_rx.clone(),
            };
            tasks.push(tokio::spawn(worker.run()));
        }

        if config.dispatch_mode == DispatchMode::Batched {
            let flusher = Flusher {
                buffers: buffers.clone(),
                queue: queue_tx.clone(),
                period: config.flush_interval(),
                stats: stats.clone(),
            };
            tasks.push(tokio::spawn(flusher.run(shutdown_rx)));
        }

        info!(
            mode = %config.dispatch_mode,
            workers,
            queue_capacity = config.queue_capacity,
            max_attempts = policy.max_attempts(),
            "Outbound dispatcher started"
        );

        Arc::new(Self {
            mode: config.dispatch_mode,
            queue: queue_tx,
            buffers,
            stats,
            shutdown_tx,
            tasks: Mutex::new(tasks),
        })
    }

    pub fn mode(&self) -> DispatchMode {
        self.mode
    }

    /// Hand a job to the pool. In direct mode this waits for queue space
    /// when the pool is saturated; in batched mode it only buffers.
    pub async fn submit(&self, job: OutboundJob) -> MeshResult<()> {
        if job.values.is_empty() {
            return Ok(());
        }
        if self.is_shut_down() {
            return Err(MeshError::DispatcherClosed);
        }

        self.stats.submitted.fetch_add(1, Ordering::Relaxed);
        metrics::record_submit();

        match self.mode {
            DispatchMode::Direct => self
                .queue
                .send(job)
                .await
                .map_err(|_| MeshError::DispatcherClosed),
            DispatchMode::Batched => {
                self.buffers.push(job);
                Ok(())
            }
        }
    }

    /// Move every buffered batch onto the queue now. Returns the number of
    /// jobs queued.
    pub async fn flush(&self) -> MeshResult<usize> {
        flush_buffers(&self.buffers, &self.queue, &self.stats).await
    }

    pub fn stats(&self) -> DispatcherSnapshot {
        self.stats.snapshot()
    }

    pub fn queued(&self) -> usize {
        self.queue.len()
    }

    pub fn pending_batches(&self) -> usize {
        self.buffers.pending_peers()
    }

    pub fn is_shut_down(&self) -> bool {
        *self.shutdown_tx.borrow()
    }

    /// Stop accepting jobs, cancel in-flight retries, and wait for every
    /// task to exit. Jobs still queued are discarded.
    pub async fn shutdown(&self) {
        self.shutdown_tx.send_replace(true);
        self.queue.close();

        let tasks = std::mem::take(&mut *self.tasks.lock());
        for task in tasks {
            if let Err(e) = task.await {
                warn!("Dispatcher task ended abnormally: {}", e);
            }
        }
        info!(stats = ?self.stats.snapshot(), "Outbound dispatcher stopped");
    }
}

async fn flush_buffers(
    buffers: &BatchBuffers,
    queue: &async_channel::Sender<OutboundJob>,
    stats: &DispatcherStats,
) -> MeshResult<usize> {
    let jobs = buffers.take_all();
    if jobs.is_empty() {
        return Ok(0);
    }

    stats.flushes.fetch_add(1, Ordering::Relaxed);
    metrics::record_flush();

    let count = jobs.len();
    for job in jobs {
        queue
            .send(job)
            .await
            .map_err(|_| MeshError::DispatcherClosed)?;
    }
    debug!("Flushed {} batched jobs", count);
    Ok(count)
}

struct Flusher {
    buffers: Arc<BatchBuffers>,
    queue: async_channel::Sender<OutboundJob>,
    period: Duration,
    stats: Arc<DispatcherStats>,
}

impl Flusher {
    async fn run(self, mut shutdown_rx: watch::Receiver<bool>) {
        let mut ticker = interval(self.period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        // first tick completes immediately
        ticker.tick().await;
        info!("Starting batch flusher with {:?} interval", self.period);

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    if let Err(e) = flush_buffers(&self.buffers, &self.queue, &self.stats).await {
                        warn!("Batch flush failed: {}", e);
                        break;
                    }
                }
                _ = shutdown_rx.changed() => {
                    info!("Batch flusher received shutdown signal");
                    break;
                }
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Delivery {
    Delivered,
    Rejected,
    Exhausted,
    Cancelled,
}

struct Worker {
    id: usize,
    queue: async_channel::Receiver<OutboundJob>,
    transport: Arc<dyn Transport>,
    policy: RetryPolicy,
    rpc_timeout: Duration,
    stats: Arc<DispatcherStats>,
    shutdown: watch::Receiver<bool>,
}

impl Worker {
    #[instrument(skip_all, fields(worker = self.id))]
    async fn run(mut self) {
        debug!("Dispatcher worker started");
        loop {
            if *self.shutdown.borrow() {
                break;
            }
            let job = tokio::select! {
                job = self.queue.recv() => match job {
                    Ok(job) => job,
                    Err(_) => break,
                },
                _ = self.shutdown.changed() => break,
            };

            let peer = job.destination.clone();
            let outcome = self.deliver(job).await;
            debug!(%peer, ?outcome, "Job settled");
            if outcome == Delivery::Cancelled {
                break;
            }
        }
        debug!("Dispatcher worker stopped");
    }

    async fn deliver(&mut self, job: OutboundJob) -> Delivery {
        let peer = job.destination;
        let payload = Payload::broadcast(job.values);
        let mut retry = RetryState::new(self.policy);

        loop {
            let is_retry = retry.attempt_count() > 0;
            retry.record_attempt();
            self.stats.attempts.fetch_add(1, Ordering::Relaxed);
            if is_retry {
                self.stats.retries.fetch_add(1, Ordering::Relaxed);
            }
            metrics::record_attempt(is_retry);

            let call = tokio::time::timeout(
                self.rpc_timeout,
                self.transport.call(&peer, payload.clone(), self.rpc_timeout),
            );
            let result = tokio::select! {
                result = call => match result {
                    Ok(reply) => reply.and_then(|reply| check_reply(&peer, reply)),
                    Err(_) => Err(MeshError::Timeout {
                        peer: peer.clone(),
                        timeout: self.rpc_timeout,
                    }),
                },
                _ = self.shutdown.changed() => return Delivery::Cancelled,
            };

            let err = match result {
                Ok(()) => {
                    self.settle(true);
                    return Delivery::Delivered;
                }
                Err(e) => e,
            };

            if !err.is_retryable() {
                warn!(%peer, "Dropping job after non-retryable failure: {}", err);
                self.settle(false);
                return Delivery::Rejected;
            }
            if retry.exhausted() {
                warn!(
                    %peer,
                    attempts = retry.attempt_count(),
                    "Dropping job after exhausting retries: {}",
                    err
                );
                self.settle(false);
                return Delivery::Exhausted;
            }

            let delay = retry.next_delay();
            debug!(
                %peer,
                attempt = retry.attempt_count(),
                "Delivery failed, retrying in {:?}: {}",
                delay,
                err
            );
            tokio::select! {
                _ = sleep(delay) => {}
                _ = self.shutdown.changed() => return Delivery::Cancelled,
            }
        }
    }

    fn settle(&self, delivered: bool) {
        let counter = if delivered {
            &self.stats.delivered
        } else {
            &self.stats.dropped
        };
        counter.fetch_add(1, Ordering::Relaxed);
        metrics::record_outcome(delivered);
    }
}

fn check_reply(peer: &NodeId, reply: Payload) -> MeshResult<()> {
    match reply {
        Payload::BroadcastOk => Ok(()),
        Payload::Error { code, text } => Err(MeshError::Rejected {
            peer: peer.clone(),
            code,
            text,
        }),
        other => Err(MeshError::UnexpectedReply {
            peer: peer.clone(),
            reply: other.type_name().to_string(),
        }),
    }
}
