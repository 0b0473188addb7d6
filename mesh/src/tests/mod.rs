//! Internal tests module
//!
//! Multi-node tests that wire several engines together in memory, plus
//! helpers shared with the per-module unit tests.

pub(crate) mod test_utils;
