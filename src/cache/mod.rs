//! Caching primitives.
//!
//! - [`EvaluationCache`] memoises calculation results within one query
//! - [`key_digest`] hashes the key material of calc nodes

mod evaluation;
mod hash;

pub use evaluation::{CacheStats, EvaluationCache};
pub use hash::key_digest;
