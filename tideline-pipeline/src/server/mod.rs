//! Server-side pipelining: accept decoded requests, dispatch them, and write
//! responses back in the original arrival order.

/// Server configuration.
pub mod config;

/// The server core and its user hooks.
pub mod core;

/// Promises, the promise queue and the response slot handed to hooks.
pub mod promise;

mod metrics;

// Re-export main types
pub use config::ServerConfig;
pub use core::{ServerMessage, ServiceHandler, ServiceServer};
pub use promise::{PromiseQueue, ResponseSlot};
