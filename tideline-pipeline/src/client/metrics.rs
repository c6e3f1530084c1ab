//! Metric emission for the client core.
//!
//! Names are relative to the configured prefix: `requests`, `errors`,
//! `dropped_requests`, `connection_failures`, `disconnects`, `latency`.

use std::rc::Rc;
use std::time::Duration;

use tideline_core::MetricsSink;

/// Emits the client's metrics through the injected sink.
#[derive(Clone)]
pub(crate) struct ClientMetrics {
    sink: Rc<dyn MetricsSink>,
    prefix: String,
}

impl ClientMetrics {
    pub(crate) fn new(sink: Rc<dyn MetricsSink>, prefix: &str) -> Self {
        Self {
            sink,
            prefix: prefix.to_string(),
        }
    }

    fn scoped(&self, metric: &str) -> String {
        format!("{}.{}", self.prefix, metric)
    }

    /// One response paired with its request.
    pub(crate) fn request(&self) {
        self.sink.rate(&self.scoped("requests"), &[]);
    }

    /// One failed request, tagged with the error kind.
    pub(crate) fn error(&self, kind: &'static str) {
        self.sink.rate(
            &self.scoped("errors"),
            &[("kind".to_string(), kind.to_string())],
        );
    }

    /// Time from send to paired response, in milliseconds.
    pub(crate) fn latency(&self, elapsed: Duration) {
        self.sink
            .histogram(&self.scoped("latency"), elapsed.as_secs_f64() * 1e3, &[]);
    }

    /// A request refused in fail-fast mode while disconnected.
    pub(crate) fn dropped_request(&self) {
        self.sink.rate(&self.scoped("dropped_requests"), &[]);
    }

    /// A failed connection attempt.
    pub(crate) fn connection_failure(&self) {
        self.sink.rate(&self.scoped("connection_failures"), &[]);
    }

    /// An established connection dropped by an error.
    pub(crate) fn disconnect(&self) {
        self.sink.rate(&self.scoped("disconnects"), &[]);
    }
}
