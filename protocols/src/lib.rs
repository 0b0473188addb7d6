//! Wire types for the gossip broadcast node protocol.
//!
//! Every message is a single JSON object on its own line:
//!
//! ```json
//! {"src": "c1", "dest": "n0", "body": {"type": "broadcast", "msg_id": 1, "message": 42}}
//! ```
//!
//! The `body` always carries a `type` tag. Requests carry a `msg_id`, replies
//! carry the `in_reply_to` of the request they answer.

pub mod error_code;
pub mod message;
pub mod node_id;
pub mod value;

pub use error_code::ErrorCode;
pub use message::{Body, Envelope, Payload};
pub use node_id::NodeId;
pub use value::{GossipValue, ValueId};
