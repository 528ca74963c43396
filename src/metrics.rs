//! In-process metrics registry: a name → counter map.
//!
//! Values here are observability only; they are never part of on-disk state
//! and publishing them to an external backend (Prometheus, OTel, ...) is out
//! of scope for this crate (`spec.md` §1).

use std::collections::HashMap;
use std::sync::Mutex;

/// A mapping from counter name to a monotonically updated 64-bit signed
/// counter. Thread-safe: filesystem helpers increment counters both inside
/// and outside the store's structural lock.
#[derive(Default)]
pub struct MetricsRegistry {
    counters: Mutex<HashMap<String, i64>>,
}

impl MetricsRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Increment `name` by 1.
    pub fn inc(&self, name: &str) {
        self.inc_by(name, 1);
    }

    /// Increment `name` by `n` (may be negative).
    pub fn inc_by(&self, name: &str, n: i64) {
        let mut counters = self.counters.lock().unwrap();
        *counters.entry(name.to_string()).or_insert(0) += n;
    }

    /// Decrement `name` by 1.
    pub fn dec(&self, name: &str) {
        self.inc_by(name, -1);
    }

    /// Decrement `name` by `n`.
    pub fn dec_by(&self, name: &str, n: i64) {
        self.inc_by(name, -n);
    }

    /// Current value of `name`, or 0 if never touched.
    pub fn get(&self, name: &str) -> i64 {
        *self.counters.lock().unwrap().get(name).unwrap_or(&0)
    }

    /// Force `name` to an exact value (used by the startup scan to rebuild
    /// `blobCount`/`byteCount` from scratch).
    pub fn set(&self, name: &str, value: i64) {
        self.counters.lock().unwrap().insert(name.to_string(), value);
    }

    /// Read-only snapshot of every counter touched so far, for tests and any
    /// future external exporter.
    pub fn snapshot(&self) -> Vec<(String, i64)> {
        let counters = self.counters.lock().unwrap();
        let mut out: Vec<_> = counters.iter().map(|(k, v)| (k.clone(), *v)).collect();
        out.sort_by(|a, b| a.0.cmp(&b.0));
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn inc_and_dec_accumulate() {
        let m = MetricsRegistry::new();
        m.inc("blobCount");
        m.inc("blobCount");
        m.inc_by("byteCount", 42);
        assert_eq!(m.get("blobCount"), 2);
        assert_eq!(m.get("byteCount"), 42);
        m.dec("blobCount");
        m.dec_by("byteCount", 10);
        assert_eq!(m.get("blobCount"), 1);
        assert_eq!(m.get("byteCount"), 32);
    }

    #[test]
    fn unknown_counter_reads_zero() {
        let m = MetricsRegistry::new();
        assert_eq!(m.get("nonexistent"), 0);
    }

    #[test]
    fn set_overwrites() {
        let m = MetricsRegistry::new();
        m.inc_by("x", 100);
        m.set("x", 7);
        assert_eq!(m.get("x"), 7);
    }
}
