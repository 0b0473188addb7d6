//! Deduplication store
//!
//! Records the ids of every value this node has applied. The membership
//! test and the insert happen under one lock, so two concurrent arrivals of
//! the same id can never both be treated as new.
//!
//! The set is unbounded for the lifetime of the node.

use std::collections::HashSet;

use gossip_protocol::{GossipValue, ValueId};
use parking_lot::Mutex;

#[derive(Debug, Default)]
pub struct SeenSet {
    ids: Mutex<HashSet<ValueId>>,
}

impl SeenSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Mark `id` as seen; returns `true` if it had not been seen before.
    pub fn mark_and_check(&self, id: ValueId) -> bool {
        self.ids.lock().insert(id)
    }

    /// Mark a whole batch in one critical section and return the values
    /// that were new, in arrival order. Repeats inside the batch count once.
    pub fn mark_batch(&self, values: impl IntoIterator<Item = GossipValue>) -> Vec<GossipValue> {
        self.mark_batch_with(values, |_| {})
    }

    /// Like [`SeenSet::mark_batch`], but runs `on_fresh` on the new values
    /// before the lock is released, so anything it records is visible by
    /// the time a later duplicate is rejected.
    pub fn mark_batch_with(
        &self,
        values: impl IntoIterator<Item = GossipValue>,
        on_fresh: impl FnOnce(&[GossipValue]),
    ) -> Vec<GossipValue> {
        let mut ids = self.ids.lock();
        let fresh: Vec<GossipValue> = values.into_iter().filter(|v| ids.insert(v.id)).collect();
        if !fresh.is_empty() {
            on_fresh(&fresh);
        }
        fresh
    }

    pub fn contains(&self, id: ValueId) -> bool {
        self.ids.lock().contains(&id)
    }

    pub fn len(&self) -> usize {
        self.ids.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
