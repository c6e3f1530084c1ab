//! Configuration for the server core.

use std::time::Duration;

/// Configuration for [`ServiceServer`](crate::ServiceServer) behavior.
#[derive(Clone, Debug)]
pub struct ServerConfig {
    /// Metric name prefix for this server.
    pub name: String,

    /// Promises older than this at the idle check complete with a timeout
    /// error.
    pub request_timeout: Duration,

    /// Soft limit on queued promises. Once the queue reaches it, further
    /// requests are still accepted but immediately rejected with an overload
    /// response, preserving arrival order on the wire.
    pub request_buffer_size: usize,

    /// Whether request failures are logged.
    pub log_errors: bool,
}

impl ServerConfig {
    /// Create a configuration with the given metric prefix and defaults for
    /// everything else.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            request_timeout: Duration::from_secs(10),
            request_buffer_size: 100,
            log_errors: true,
        }
    }

    /// Set the request timeout.
    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    /// Set the soft request buffer limit.
    pub fn with_request_buffer_size(mut self, size: usize) -> Self {
        self.request_buffer_size = size;
        self
    }

    /// Enable or disable error logging.
    pub fn with_log_errors(mut self, log_errors: bool) -> Self {
        self.log_errors = log_errors;
        self
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self::new("server")
    }
}
