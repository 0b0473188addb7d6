//! Gossip metrics
//!
//! Thin wrappers over the `metrics` facade. Nothing is recorded until the
//! host process installs a recorder.

use metrics::{counter, describe_counter, describe_gauge, gauge};

pub const VALUES_APPLIED: &str = "gossip_values_applied_total";
pub const DUPLICATES: &str = "gossip_duplicates_total";
pub const JOBS_SUBMITTED: &str = "gossip_jobs_submitted_total";
pub const RPC_ATTEMPTS: &str = "gossip_rpc_attempts_total";
pub const RPC_RETRIES: &str = "gossip_rpc_retries_total";
pub const JOBS_DELIVERED: &str = "gossip_jobs_delivered_total";
pub const JOBS_DROPPED: &str = "gossip_jobs_dropped_total";
pub const BATCH_FLUSHES: &str = "gossip_batch_flushes_total";
pub const TOPOLOGY_REBUILDS: &str = "gossip_topology_rebuilds_total";
pub const FANOUT: &str = "gossip_fanout";

/// Register descriptions for every gossip metric.
pub fn describe() {
    describe_counter!(VALUES_APPLIED, "Values applied to the local log");
    describe_counter!(DUPLICATES, "Received values that were already applied");
    describe_counter!(JOBS_SUBMITTED, "Outbound jobs handed to the dispatcher");
    describe_counter!(RPC_ATTEMPTS, "Peer RPC attempts, including retries");
    describe_counter!(RPC_RETRIES, "Peer RPC attempts that followed a failure");
    describe_counter!(JOBS_DELIVERED, "Outbound jobs acknowledged by the peer");
    describe_counter!(JOBS_DROPPED, "Outbound jobs abandoned after failures");
    describe_counter!(BATCH_FLUSHES, "Batch buffer flushes");
    describe_counter!(TOPOLOGY_REBUILDS, "Topology snapshots published");
    describe_gauge!(FANOUT, "Neighbors of this node in the current topology");
}

pub(crate) fn record_apply(applied: usize, duplicates: usize) {
    counter!(VALUES_APPLIED).increment(applied as u64);
    counter!(DUPLICATES).increment(duplicates as u64);
}

pub(crate) fn record_submit() {
    counter!(JOBS_SUBMITTED).increment(1);
}

pub(crate) fn record_attempt(retry: bool) {
    counter!(RPC_ATTEMPTS).increment(1);
    if retry {
        counter!(RPC_RETRIES).increment(1);
    }
}

pub(crate) fn record_outcome(delivered: bool) {
    if delivered {
        counter!(JOBS_DELIVERED).increment(1);
    } else {
        counter!(JOBS_DROPPED).increment(1);
    }
}

pub(crate) fn record_flush() {
    counter!(BATCH_FLUSHES).increment(1);
}

pub(crate) fn record_topology(fanout: usize) {
    counter!(TOPOLOGY_REBUILDS).increment(1);
    gauge!(FANOUT).set(fanout as f64);
}
