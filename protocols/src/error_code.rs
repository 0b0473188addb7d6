//! Error codes carried by `error` replies.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Error code of an `error` reply.
///
/// Codes are either *indefinite* (the request may or may not have taken
/// effect, retrying is reasonable) or *definite* (the request certainly
/// failed and retrying the same request cannot succeed).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "u32", into = "u32")]
pub enum ErrorCode {
    Timeout,
    NodeNotFound,
    NotSupported,
    TemporarilyUnavailable,
    MalformedRequest,
    Crash,
    Abort,
    Other(u32),
}

impl ErrorCode {
    pub fn code(&self) -> u32 {
        match self {
            ErrorCode::Timeout => 0,
            ErrorCode::NodeNotFound => 1,
            ErrorCode::NotSupported => 10,
            ErrorCode::TemporarilyUnavailable => 11,
            ErrorCode::MalformedRequest => 12,
            ErrorCode::Crash => 13,
            ErrorCode::Abort => 14,
            ErrorCode::Other(code) => *code,
        }
    }

    /// Whether a request that failed with this code may be retried.
    pub fn is_indefinite(&self) -> bool {
        matches!(
            self,
            ErrorCode::Timeout | ErrorCode::TemporarilyUnavailable | ErrorCode::Crash
        )
    }
}

impl From<u32> for ErrorCode {
    fn from(code: u32) -> Self {
        match code {
            0 => ErrorCode::Timeout,
            1 => ErrorCode::NodeNotFound,
            10 => ErrorCode::NotSupported,
            11 => ErrorCode::TemporarilyUnavailable,
            12 => ErrorCode::MalformedRequest,
            13 => ErrorCode::Crash,
            14 => ErrorCode::Abort,
            other => ErrorCode::Other(other),
        }
    }
}

impl From<ErrorCode> for u32 {
    fn from(code: ErrorCode) -> Self {
        code.code()
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ErrorCode::Timeout => write!(f, "timeout"),
            ErrorCode::NodeNotFound => write!(f, "node-not-found"),
            ErrorCode::NotSupported => write!(f, "not-supported"),
            ErrorCode::TemporarilyUnavailable => write!(f, "temporarily-unavailable"),
            ErrorCode::MalformedRequest => write!(f, "malformed-request"),
            ErrorCode::Crash => write!(f, "crash"),
            ErrorCode::Abort => write!(f, "abort"),
            ErrorCode::Other(code) => write!(f, "error-{}", code),
        }
    }
}
