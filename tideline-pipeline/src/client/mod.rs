//! Client-side pipelining: send requests on a single connection and pair the
//! nth inbound response with the nth outstanding request.

/// Client configuration.
pub mod config;

/// The client core, its worker messages and the thread-safe façade.
pub mod core;

/// Bounded reconnect policy.
pub mod reconnect;

/// Client-side future resolving to the paired response.
pub mod reply_future;

/// FIFO of requests awaiting a response.
pub mod sent_queue;

mod metrics;

// Re-export main types
pub use config::ClientConfig;
pub use core::{ClientMessage, ConnectionStatus, ServiceClient, SharedServiceClient};
pub use reconnect::RetryPolicy;
pub use reply_future::ReplyFuture;
pub use sent_queue::SentQueue;
