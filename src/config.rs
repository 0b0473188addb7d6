//! Command line and environment configuration.
//!
//! Mesh settings start from the defaults (or a JSON file given with
//! `--config`); any flag or `GOSSIP_*` variable that is set overrides the
//! corresponding field.

use std::path::PathBuf;

use clap::Parser;
use gossip_mesh::{DispatchMode, MeshConfig, TopologyStrategy};

use super::{
    error::{NodeError, NodeResult},
    logging::LoggingConfig,
};

#[derive(Debug, Clone, Parser)]
#[command(
    name = "gossip-node",
    version,
    about = "Gossip broadcast node speaking JSON lines over stdin/stdout"
)]
pub struct NodeArgs {
    /// JSON file with mesh settings; flags below override it
    #[arg(long, env = "GOSSIP_CONFIG")]
    pub config: Option<PathBuf>,

    /// Topology strategy: ring, tree, explicit or full_mesh
    #[arg(long, env = "GOSSIP_TOPOLOGY")]
    pub topology: Option<TopologyStrategy>,

    /// Also forward to adjacent same-depth peers in the tree
    #[arg(long, env = "GOSSIP_INCLUDE_SIBLINGS")]
    pub include_siblings: bool,

    /// Dispatch mode: direct or batched
    #[arg(long, env = "GOSSIP_DISPATCH_MODE")]
    pub dispatch_mode: Option<DispatchMode>,

    #[arg(long, env = "GOSSIP_WORKERS")]
    pub workers: Option<usize>,

    #[arg(long, env = "GOSSIP_QUEUE_CAPACITY")]
    pub queue_capacity: Option<usize>,

    #[arg(long, env = "GOSSIP_RPC_TIMEOUT_MS")]
    pub rpc_timeout_ms: Option<u64>,

    #[arg(long, env = "GOSSIP_MAX_ATTEMPTS")]
    pub max_attempts: Option<u32>,

    #[arg(long, env = "GOSSIP_BACKOFF_BASE_MS")]
    pub backoff_base_ms: Option<u64>,

    #[arg(long, env = "GOSSIP_MAX_BACKOFF_MS")]
    pub max_backoff_ms: Option<u64>,

    #[arg(long, env = "GOSSIP_FLUSH_INTERVAL_MS")]
    pub flush_interval_ms: Option<u64>,

    /// Log filter directive, e.g. `info` or `gossip_mesh=debug`
    #[arg(long, env = "GOSSIP_LOG_LEVEL", default_value = "info")]
    pub log_level: String,

    /// Write logs to this file instead of stderr
    #[arg(long, env = "GOSSIP_LOG_FILE")]
    pub log_file: Option<PathBuf>,

    /// Emit logs as JSON
    #[arg(long, env = "GOSSIP_LOG_JSON")]
    pub log_json: bool,
}

impl NodeArgs {
    pub fn mesh_config(&self) -> NodeResult<MeshConfig> {
        let mut config = match &self.config {
            Some(path) => {
                let raw = std::fs::read_to_string(path).map_err(|e| {
                    NodeError::Config(format!("cannot read {}: {}", path.display(), e))
                })?;
                serde_json::from_str(&raw).map_err(|e| {
                    NodeError::Config(format!("cannot parse {}: {}", path.display(), e))
                })?
            }
            None => MeshConfig::default(),
        };

        if let Some(strategy) = self.topology {
            config.strategy = strategy;
        }
        if self.include_siblings {
            config.include_siblings = true;
        }
        if let Some(mode) = self.dispatch_mode {
            config.dispatch_mode = mode;
        }
        if let Some(workers) = self.workers {
            config.workers = workers;
        }
        if let Some(capacity) = self.queue_capacity {
            config.queue_capacity = capacity;
        }
        if let Some(timeout) = self.rpc_timeout_ms {
            config.rpc_timeout_ms = timeout;
        }
        if let Some(attempts) = self.max_attempts {
            config.max_attempts = attempts;
        }
        if let Some(base) = self.backoff_base_ms {
            config.backoff_base_ms = base;
        }
        if let Some(cap) = self.max_backoff_ms {
            config.max_backoff_ms = cap;
        }
        if let Some(interval) = self.flush_interval_ms {
            config.flush_interval_ms = interval;
        }

        config.validate()?;
        Ok(config)
    }

    pub fn logging_config(&self) -> LoggingConfig {
        LoggingConfig {
            level: self.log_level.clone(),
            json: self.log_json,
            log_file: self.log_file.clone(),
        }
    }
}
