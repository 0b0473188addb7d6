//! Mesh configuration
//!
//! Selects the topology strategy and tunes the outbound dispatcher.

use std::{fmt, str::FromStr, time::Duration};

use serde::{Deserialize, Serialize};

use super::error::{MeshError, MeshResult};

/// How neighbor lists are derived from cluster membership.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum TopologyStrategy {
    /// Rows of three same-level peers plus one hop up and one hop down.
    Ring,
    /// Balanced binary spanning tree: parent plus children.
    #[default]
    Tree,
    /// Neighbor lists taken verbatim from a `topology` message.
    Explicit,
    /// Every other member. Out-degree grows with the cluster.
    FullMesh,
}

impl fmt::Display for TopologyStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TopologyStrategy::Ring => write!(f, "ring"),
            TopologyStrategy::Tree => write!(f, "tree"),
            TopologyStrategy::Explicit => write!(f, "explicit"),
            TopologyStrategy::FullMesh => write!(f, "full_mesh"),
        }
    }
}

impl FromStr for TopologyStrategy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().replace('-', "_").as_str() {
            "ring" => Ok(TopologyStrategy::Ring),
            "tree" => Ok(TopologyStrategy::Tree),
            "explicit" => Ok(TopologyStrategy::Explicit),
            "full_mesh" | "mesh" => Ok(TopologyStrategy::FullMesh),
            _ => Err(format!("Unknown topology strategy: {}", s)),
        }
    }
}

/// How forwarded values reach the worker pool.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum DispatchMode {
    /// Each job is queued for delivery immediately.
    #[default]
    Direct,
    /// Jobs accumulate per peer and are flushed on a fixed interval.
    Batched,
}

impl fmt::Display for DispatchMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DispatchMode::Direct => write!(f, "direct"),
            DispatchMode::Batched => write!(f, "batched"),
        }
    }
}

impl FromStr for DispatchMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.eq_ignore_ascii_case("direct") {
            Ok(DispatchMode::Direct)
        } else if s.eq_ignore_ascii_case("batched") {
            Ok(DispatchMode::Batched)
        } else {
            Err(format!("Unknown dispatch mode: {}", s))
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MeshConfig {
    #[serde(default)]
    pub strategy: TopologyStrategy,

    /// Also forward to adjacent same-level peers (tree strategy only)
    #[serde(default)]
    pub include_siblings: bool,

    #[serde(default)]
    pub dispatch_mode: DispatchMode,

    /// Number of dispatcher worker tasks
    #[serde(default = "default_workers")]
    pub workers: usize,

    /// Outbound queue capacity; a full queue blocks the producer
    #[serde(default = "default_queue_capacity")]
    pub queue_capacity: usize,

    #[serde(default = "default_rpc_timeout_ms")]
    pub rpc_timeout_ms: u64,

    /// Delivery attempts per job, including the first
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    /// Backoff after attempt `n` is `n * backoff_base_ms`, capped at `max_backoff_ms`
    #[serde(default = "default_backoff_base_ms")]
    pub backoff_base_ms: u64,

    #[serde(default = "default_max_backoff_ms")]
    pub max_backoff_ms: u64,

    /// Batch flush interval (batched dispatch only)
    #[serde(default = "default_flush_interval_ms")]
    pub flush_interval_ms: u64,
}

fn default_workers() -> usize {
    8
}

fn default_queue_capacity() -> usize {
    1024
}

fn default_rpc_timeout_ms() -> u64 {
    1000
}

fn default_max_attempts() -> u32 {
    100
}

fn default_backoff_base_ms() -> u64 {
    100
}

fn default_max_backoff_ms() -> u64 {
    5000
}

fn default_flush_interval_ms() -> u64 {
    500
}

impl Default for MeshConfig {
    fn default() -> Self {
        Self {
            strategy: TopologyStrategy::default(),
            include_siblings: false,
            dispatch_mode: DispatchMode::default(),
            workers: default_workers(),
            queue_capacity: default_queue_capacity(),
            rpc_timeout_ms: default_rpc_timeout_ms(),
            max_attempts: default_max_attempts(),
            backoff_base_ms: default_backoff_base_ms(),
            max_backoff_ms: default_max_backoff_ms(),
            flush_interval_ms: default_flush_interval_ms(),
        }
    }
}

impl MeshConfig {
    pub fn rpc_timeout(&self) -> Duration {
        Duration::from_millis(self.rpc_timeout_ms)
    }

    pub fn backoff_base(&self) -> Duration {
        Duration::from_millis(self.backoff_base_ms)
    }

    pub fn max_backoff(&self) -> Duration {
        Duration::from_millis(self.max_backoff_ms)
    }

    pub fn flush_interval(&self) -> Duration {
        Duration::from_millis(self.flush_interval_ms)
    }

    pub fn validate(&self) -> MeshResult<()> {
        if self.workers == 0 {
            return Err(MeshError::Config("workers must be at least 1".to_string()));
        }
        if self.queue_capacity == 0 {
            return Err(MeshError::Config(
                "queue_capacity must be at least 1".to_string(),
            ));
        }
        if self.rpc_timeout_ms == 0 {
            return Err(MeshError::Config(
                "rpc_timeout_ms must be greater than 0".to_string(),
            ));
        }
        if self.max_attempts == 0 {
            return Err(MeshError::Config(
                "max_attempts must be at least 1".to_string(),
            ));
        }
        if self.max_backoff_ms < self.backoff_base_ms {
            return Err(MeshError::Config(format!(
                "max_backoff_ms ({}) must not be below backoff_base_ms ({})",
                self.max_backoff_ms, self.backoff_base_ms
            )));
        }
        if self.dispatch_mode == DispatchMode::Batched && self.flush_interval_ms == 0 {
            return Err(MeshError::Config(
                "flush_interval_ms must be greater than 0 in batched mode".to_string(),
            ));
        }
        Ok(())
    }
}
