//! Gossip broadcast node
//!
//! A cluster node that speaks a JSON-lines request/response protocol on
//! stdin/stdout. Values broadcast to any node spread to every reachable
//! node through the dissemination engine in `gossip-mesh`.
//!
//! ```text
//! stdin ──> runtime ──> handlers ──> DisseminationEngine ──> OutboundDispatcher
//!              ▲                                                   │
//!              └──── replies (in_reply_to) <── stdout <── StdioTransport
//! ```

pub mod config;
pub mod error;
mod handlers;
pub mod logging;
pub mod runtime;

pub use config::NodeArgs;
pub use error::{NodeError, NodeResult};
pub use logging::{init_logging, LoggingConfig};
pub use runtime::run;
