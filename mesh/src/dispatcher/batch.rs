//! Per-peer batch buffers for batched dispatch.

use std::collections::HashMap;

use gossip_protocol::{GossipValue, NodeId};
use parking_lot::Mutex;

use super::OutboundJob;

/// Values waiting for the next flush, grouped by destination.
#[derive(Debug, Default)]
pub struct BatchBuffers {
    pending: Mutex<HashMap<NodeId, Vec<GossipValue>>>,
}

impl BatchBuffers {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&self, job: OutboundJob) {
        self.pending
            .lock()
            .entry(job.destination)
            .or_default()
            .extend(job.values);
    }

    /// Swap out every buffer and return one job per peer holding everything
    /// buffered for it. The buffers are empty when this returns.
    pub fn take_all(&self) -> Vec<OutboundJob> {
        let drained = std::mem::take(&mut *self.pending.lock());
        let mut jobs: Vec<OutboundJob> = drained
            .into_iter()
            .filter(|(_, values)| !values.is_empty())
            .map(|(destination, values)| OutboundJob::new(destination, values, None))
            .collect();
        jobs.sort_by(|a, b| a.destination.cmp(&b.destination));
        jobs
    }

    pub fn pending_peers(&self) -> usize {
        self.pending.lock().len()
    }

    pub fn pending_values(&self) -> usize {
        self.pending.lock().values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.pending_peers() == 0
    }
}
