//! Message envelope and bodies.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::{error_code::ErrorCode, node_id::NodeId, value::GossipValue};

/// A routed message: who sent it, who receives it, and what it says.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Envelope {
    pub src: NodeId,
    pub dest: NodeId,
    pub body: Body,
}

impl Envelope {
    pub fn new(src: NodeId, dest: NodeId, body: Body) -> Self {
        Self { src, dest, body }
    }

    /// Build the reply to this message, addressed back to its sender.
    pub fn reply(&self, msg_id: Option<u64>, payload: Payload) -> Envelope {
        Envelope {
            src: self.dest.clone(),
            dest: self.src.clone(),
            body: Body {
                msg_id,
                in_reply_to: self.body.msg_id,
                payload,
            },
        }
    }
}

/// Message body: correlation ids plus the typed payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Body {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub msg_id: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub in_reply_to: Option<u64>,
    #[serde(flatten)]
    pub payload: Payload,
}

impl Body {
    pub fn request(msg_id: u64, payload: Payload) -> Self {
        Self {
            msg_id: Some(msg_id),
            in_reply_to: None,
            payload,
        }
    }
}

/// Every request and reply the node understands, tagged by `type`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Payload {
    /// Node identity and cluster membership, sent once at startup.
    Init {
        node_id: NodeId,
        node_ids: Vec<NodeId>,
    },
    InitOk,
    Echo {
        echo: Value,
    },
    EchoOk {
        echo: Value,
    },
    Generate,
    GenerateOk {
        id: String,
    },
    /// A single value (`message`) or a batch of values (`messages`).
    Broadcast {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        message: Option<GossipValue>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        messages: Option<Vec<GossipValue>>,
    },
    BroadcastOk,
    Read,
    ReadOk {
        messages: Vec<GossipValue>,
    },
    /// Explicit neighbor assignment for every node of the cluster.
    Topology {
        topology: BTreeMap<NodeId, Vec<NodeId>>,
    },
    TopologyOk,
    Error {
        code: ErrorCode,
        #[serde(default)]
        text: String,
    },
}

impl Payload {
    /// Every `type` tag this protocol defines.
    pub const KNOWN_TYPES: &'static [&'static str] = &[
        "init",
        "init_ok",
        "echo",
        "echo_ok",
        "generate",
        "generate_ok",
        "broadcast",
        "broadcast_ok",
        "read",
        "read_ok",
        "topology",
        "topology_ok",
        "error",
    ];

    /// Broadcast payload for forwarding: the single-value form for one
    /// value, the batch form otherwise.
    pub fn broadcast(mut values: Vec<GossipValue>) -> Self {
        if values.len() == 1 {
            Payload::Broadcast {
                message: values.pop(),
                messages: None,
            }
        } else {
            Payload::Broadcast {
                message: None,
                messages: Some(values),
            }
        }
    }

    /// All values carried by a broadcast, `None` when this is not a
    /// broadcast or the broadcast carries neither field.
    pub fn broadcast_values(&self) -> Option<Vec<GossipValue>> {
        match self {
            Payload::Broadcast { message, messages } => {
                if message.is_none() && messages.is_none() {
                    return None;
                }
                let mut values: Vec<GossipValue> = message.iter().cloned().collect();
                if let Some(batch) = messages {
                    values.extend(batch.iter().cloned());
                }
                Some(values)
            }
            _ => None,
        }
    }

    pub fn error(code: ErrorCode, text: impl Into<String>) -> Self {
        Payload::Error {
            code,
            text: text.into(),
        }
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            Payload::Init { .. } => "init",
            Payload::InitOk => "init_ok",
            Payload::Echo { .. } => "echo",
            Payload::EchoOk { .. } => "echo_ok",
            Payload::Generate => "generate",
            Payload::GenerateOk { .. } => "generate_ok",
            Payload::Broadcast { .. } => "broadcast",
            Payload::BroadcastOk => "broadcast_ok",
            Payload::Read => "read",
            Payload::ReadOk { .. } => "read_ok",
            Payload::Topology { .. } => "topology",
            Payload::TopologyOk => "topology_ok",
            Payload::Error { .. } => "error",
        }
    }
}
