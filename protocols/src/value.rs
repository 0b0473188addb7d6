//! Values disseminated by the broadcast workload.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Identifier of a gossip value, unique within the cluster's namespace.
pub type ValueId = i64;

/// A value being gossiped through the cluster.
///
/// On the wire a value whose payload is its own id is a bare integer
/// (`42`). Values carrying any other payload are encoded as
/// `{"id": 42, "payload": ...}`. Both forms are accepted when decoding.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "WireValue", into = "WireValue")]
pub struct GossipValue {
    pub id: ValueId,
    pub payload: Value,
}

impl GossipValue {
    /// A value that is its own payload.
    pub fn new(id: ValueId) -> Self {
        Self {
            id,
            payload: Value::from(id),
        }
    }

    pub fn with_payload(id: ValueId, payload: Value) -> Self {
        Self { id, payload }
    }

    fn is_bare(&self) -> bool {
        self.payload.as_i64() == Some(self.id)
    }
}

impl From<ValueId> for GossipValue {
    fn from(id: ValueId) -> Self {
        Self::new(id)
    }
}

#[derive(Serialize, Deserialize)]
#[serde(untagged)]
enum WireValue {
    Bare(ValueId),
    Tagged { id: ValueId, payload: Value },
}

impl From<WireValue> for GossipValue {
    fn from(wire: WireValue) -> Self {
        match wire {
            WireValue::Bare(id) => GossipValue::new(id),
            WireValue::Tagged { id, payload } => GossipValue::with_payload(id, payload),
        }
    }
}

impl From<GossipValue> for WireValue {
    fn from(value: GossipValue) -> Self {
        if value.is_bare() {
            WireValue::Bare(value.id)
        } else {
            WireValue::Tagged {
                id: value.id,
                payload: value.payload,
            }
        }
    }
}
