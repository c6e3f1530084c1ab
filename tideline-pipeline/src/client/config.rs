//! Configuration for the client core.

use std::time::Duration;

use super::reconnect::RetryPolicy;

/// Configuration for [`ServiceClient`](crate::ServiceClient) behavior.
#[derive(Clone, Debug)]
pub struct ClientConfig {
    /// Remote endpoint address.
    pub address: String,

    /// Metric name prefix for this client.
    pub name: String,

    /// Per-request timeout, enforced by the controller cancelling pending
    /// writes that exceed it.
    pub request_timeout: Duration,

    /// Hard cap on the controller's not-yet-written pending buffer. A push
    /// above it is refused and the send fails with a client-overloaded
    /// error.
    pub pending_buffer_size: usize,

    /// Soft cap on the sent queue. Once reached, writes into the controller
    /// are paused until the queue drains below it.
    pub sent_buffer_size: usize,

    /// When set, connection loss immediately fails pending (not yet
    /// written) requests in addition to in-flight ones, and sends while
    /// disconnected fail instead of queueing.
    pub fail_fast: bool,

    /// Reconnect schedule.
    pub retry: RetryPolicy,
}

impl ClientConfig {
    /// Create a configuration for the given remote address and metric
    /// prefix, with defaults for everything else.
    pub fn new(address: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            address: address.into(),
            name: name.into(),
            request_timeout: Duration::from_secs(10),
            pending_buffer_size: 100,
            sent_buffer_size: 20,
            fail_fast: false,
            retry: RetryPolicy::default(),
        }
    }

    /// Set the per-request timeout.
    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    /// Set the pending buffer hard cap.
    pub fn with_pending_buffer_size(mut self, size: usize) -> Self {
        self.pending_buffer_size = size;
        self
    }

    /// Set the sent queue soft cap.
    pub fn with_sent_buffer_size(mut self, size: usize) -> Self {
        self.sent_buffer_size = size;
        self
    }

    /// Enable or disable fail-fast mode.
    pub fn with_fail_fast(mut self, fail_fast: bool) -> Self {
        self.fail_fast = fail_fast;
        self
    }

    /// Set the reconnect schedule.
    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }
}
