//! Per-query memo of calculation results.

use std::collections::HashMap;

use crate::calc::{CalcKey, Value};
use crate::eval::Fingerprint;

/// Hit/miss counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    pub entries: usize,
}

/// Results keyed by calculation key and dependency fingerprint.
///
/// Scoped to one query execution: the engine clears it before a query
/// starts and when a query is cancelled.
#[derive(Debug, Default)]
pub struct EvaluationCache {
    entries: HashMap<CalcKey, HashMap<Fingerprint, Value>>,
    hits: u64,
    misses: u64,
}

impl EvaluationCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&mut self, key: &CalcKey, fingerprint: &Fingerprint) -> Option<Value> {
        let found = self
            .entries
            .get(key)
            .and_then(|by_context| by_context.get(fingerprint))
            .cloned();
        if found.is_some() {
            self.hits += 1;
        } else {
            self.misses += 1;
        }
        found
    }

    pub fn put(&mut self, key: CalcKey, fingerprint: Fingerprint, value: Value) {
        self.entries
            .entry(key)
            .or_default()
            .insert(fingerprint, value);
    }

    /// Drop every entry and reset the counters.
    pub fn clear(&mut self) {
        self.entries.clear();
        self.hits = 0;
        self.misses = 0;
    }

    pub fn len(&self) -> usize {
        self.entries.values().map(HashMap::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            hits: self.hits,
            misses: self.misses,
            entries: self.len(),
        }
    }
}
