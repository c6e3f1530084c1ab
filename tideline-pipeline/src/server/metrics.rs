//! Metric emission for the server core.
//!
//! Names are relative to the configured prefix: `requests`, `errors`,
//! `latency`, `requests_per_connection`, `concurrent_requests`,
//! `dropped_replies`.

use std::rc::Rc;
use std::time::Duration;

use tideline_core::MetricsSink;

/// Emits the server's metrics through the injected sink.
#[derive(Clone)]
pub(crate) struct ServerMetrics {
    sink: Rc<dyn MetricsSink>,
    prefix: String,
}

impl ServerMetrics {
    pub(crate) fn new(sink: Rc<dyn MetricsSink>, prefix: &str) -> Self {
        Self {
            sink,
            prefix: prefix.to_string(),
        }
    }

    fn scoped(&self, metric: &str) -> String {
        format!("{}.{}", self.prefix, metric)
    }

    /// One response flushed to the wire.
    pub(crate) fn request(&self, tags: &[(String, String)]) {
        self.sink.rate(&self.scoped("requests"), tags);
    }

    /// Time from request decode to response flush, in milliseconds.
    pub(crate) fn latency(&self, elapsed: Duration, tags: &[(String, String)]) {
        self.sink
            .histogram(&self.scoped("latency"), elapsed.as_secs_f64() * 1e3, tags);
    }

    /// One failed request, tagged with the error kind.
    pub(crate) fn error(&self, kind: &'static str) {
        self.sink.rate(
            &self.scoped("errors"),
            &[("kind".to_string(), kind.to_string())],
        );
    }

    /// Adjust the in-flight request gauge.
    pub(crate) fn concurrent_delta(&self, delta: i64) {
        self.sink
            .counter(&self.scoped("concurrent_requests"), delta, &[]);
    }

    /// Total requests accepted over one connection's lifetime.
    pub(crate) fn requests_per_connection(&self, accepted: u64) {
        self.sink
            .histogram(&self.scoped("requests_per_connection"), accepted as f64, &[]);
    }

    /// A response whose write completion was not a success.
    pub(crate) fn dropped_reply(&self) {
        self.sink.rate(&self.scoped("dropped_replies"), &[]);
    }
}
