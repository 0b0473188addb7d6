//! Cluster member identity.

use std::{cmp::Ordering, fmt};

use serde::{Deserialize, Serialize};

/// Opaque identifier of a cluster member or client, e.g. `n3` or `c12`.
///
/// Ids are ordered by their numeric suffix first (`n2 < n10`), ids without a
/// numeric suffix sort after all numbered ids and among themselves lexically.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NodeId(String);

impl NodeId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Numeric suffix of the id (`n12` -> `12`), if it has one.
    pub fn ordinal(&self) -> Option<u64> {
        let digits_at = self
            .0
            .char_indices()
            .rev()
            .take_while(|(_, c)| c.is_ascii_digit())
            .last()
            .map(|(i, _)| i)?;
        self.0[digits_at..].parse().ok()
    }

    fn sort_key(&self) -> (bool, u64, &str) {
        match self.ordinal() {
            Some(ordinal) => (false, ordinal, self.0.as_str()),
            None => (true, 0, self.0.as_str()),
        }
    }
}

impl Ord for NodeId {
    fn cmp(&self, other: &Self) -> Ordering {
        self.sort_key().cmp(&other.sort_key())
    }
}

impl PartialOrd for NodeId {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for NodeId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

impl From<String> for NodeId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

impl AsRef<str> for NodeId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}
