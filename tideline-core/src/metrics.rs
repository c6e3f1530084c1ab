//! Metrics sink contract and provided implementations.
//!
//! The pipelining cores are the only externally-observable state holders in
//! a connection, and they expose that state exclusively through an injected
//! [`MetricsSink`]: request/error rates, latency histograms and concurrency
//! counters, all addressed by hierarchical name (`"server.requests"`) and
//! tagged with string key/value pairs.
//!
//! Two implementations are provided: [`NullSink`] discards everything and is
//! the default, [`MemorySink`] records every emission for deterministic tests
//! and local debugging.

use std::cell::RefCell;

/// Pluggable sink for rates, histograms and counters.
///
/// Methods take `&self`; implementations aimed at the single-threaded worker
/// use interior mutability, implementations bridging to a real metrics
/// backend typically just forward.
pub trait MetricsSink {
    /// Increment the rate (occurrence count) of `name`.
    fn rate(&self, name: &str, tags: &[(String, String)]);

    /// Record one observation of `value` into the histogram `name`.
    ///
    /// Latency observations are reported in milliseconds.
    fn histogram(&self, name: &str, value: f64, tags: &[(String, String)]);

    /// Adjust the counter `name` by `delta` (which may be negative).
    fn counter(&self, name: &str, delta: i64, tags: &[(String, String)]);
}

/// Sink that discards every emission.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullSink;

impl MetricsSink for NullSink {
    fn rate(&self, _name: &str, _tags: &[(String, String)]) {}
    fn histogram(&self, _name: &str, _value: f64, _tags: &[(String, String)]) {}
    fn counter(&self, _name: &str, _delta: i64, _tags: &[(String, String)]) {}
}

/// A single recorded metric emission.
#[derive(Debug, Clone, PartialEq)]
pub enum MetricEvent {
    /// One rate increment.
    Rate {
        /// Full hierarchical metric name.
        name: String,
        /// Tags attached to the emission.
        tags: Vec<(String, String)>,
    },
    /// One histogram observation.
    Histogram {
        /// Full hierarchical metric name.
        name: String,
        /// Observed value.
        value: f64,
        /// Tags attached to the emission.
        tags: Vec<(String, String)>,
    },
    /// One counter adjustment.
    Counter {
        /// Full hierarchical metric name.
        name: String,
        /// Signed adjustment.
        delta: i64,
        /// Tags attached to the emission.
        tags: Vec<(String, String)>,
    },
}

/// In-memory recording sink for tests and local debugging.
///
/// Uses `RefCell` for single-threaded interior mutability; share it between
/// the test and the component under test via `Rc<MemorySink>`.
#[derive(Debug, Default)]
pub struct MemorySink {
    events: RefCell<Vec<MetricEvent>>,
}

impl MemorySink {
    /// Create a new, empty recording sink.
    pub fn new() -> Self {
        Self::default()
    }

    /// All emissions recorded so far, in order.
    pub fn events(&self) -> Vec<MetricEvent> {
        self.events.borrow().clone()
    }

    /// Number of rate increments recorded for `name`.
    pub fn rate_count(&self, name: &str) -> u64 {
        self.events
            .borrow()
            .iter()
            .filter(|e| matches!(e, MetricEvent::Rate { name: n, .. } if n == name))
            .count() as u64
    }

    /// Number of rate increments recorded for `name` carrying the given tag.
    pub fn rate_count_tagged(&self, name: &str, key: &str, value: &str) -> u64 {
        self.events
            .borrow()
            .iter()
            .filter(|e| match e {
                MetricEvent::Rate { name: n, tags } => {
                    n == name && tags.iter().any(|(k, v)| k == key && v == value)
                }
                _ => false,
            })
            .count() as u64
    }

    /// Current value of the counter `name` (sum of all deltas).
    pub fn counter_value(&self, name: &str) -> i64 {
        self.events
            .borrow()
            .iter()
            .filter_map(|e| match e {
                MetricEvent::Counter { name: n, delta, .. } if n == name => Some(*delta),
                _ => None,
            })
            .sum()
    }

    /// The sequence of deltas recorded for the counter `name`.
    pub fn counter_deltas(&self, name: &str) -> Vec<i64> {
        self.events
            .borrow()
            .iter()
            .filter_map(|e| match e {
                MetricEvent::Counter { name: n, delta, .. } if n == name => Some(*delta),
                _ => None,
            })
            .collect()
    }

    /// All values observed by the histogram `name`.
    pub fn histogram_values(&self, name: &str) -> Vec<f64> {
        self.events
            .borrow()
            .iter()
            .filter_map(|e| match e {
                MetricEvent::Histogram { name: n, value, .. } if n == name => Some(*value),
                _ => None,
            })
            .collect()
    }
}

impl MetricsSink for MemorySink {
    fn rate(&self, name: &str, tags: &[(String, String)]) {
        self.events.borrow_mut().push(MetricEvent::Rate {
            name: name.to_string(),
            tags: tags.to_vec(),
        });
    }

    fn histogram(&self, name: &str, value: f64, tags: &[(String, String)]) {
        self.events.borrow_mut().push(MetricEvent::Histogram {
            name: name.to_string(),
            value,
            tags: tags.to_vec(),
        });
    }

    fn counter(&self, name: &str, delta: i64, tags: &[(String, String)]) {
        self.events.borrow_mut().push(MetricEvent::Counter {
            name: name.to_string(),
            delta,
            tags: tags.to_vec(),
        });
    }
}
