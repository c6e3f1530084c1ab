//! # Tideline Pipelining Engine
//!
//! Per-connection request/response pipelining for a non-blocking network
//! framework.
//!
//! Two peer components live at the core: a [`ServiceServer`] that accepts
//! decoded requests on a single connection, dispatches them for processing
//! and writes responses back in the original arrival order; and a
//! [`ServiceClient`] that sends requests on a single connection and
//! correlates incoming responses with outstanding handlers by FIFO order.
//! Both are codec-agnostic (they compose with an external framing layer
//! through the [`Conduit`] contract) and both are single-threaded: one
//! instance is confined to one I/O worker.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────┐
//! │              Application Code                    │
//! │     ServiceHandler hooks / ReplyFuture           │
//! ├─────────────────────────────────────────────────┤
//! │     ServiceServer / ServiceClient                │
//! │     • Arrival-order response writes              │
//! │     • FIFO response correlation                  │
//! │     • Timeouts, overload, bounded reconnect      │
//! ├─────────────────────────────────────────────────┤
//! │     Conduit (I/O controller contract)            │
//! │     • push + completion arms                     │
//! │     • pause/resume, purge, pending buffer        │
//! └─────────────────────────────────────────────────┘
//! ```
//!
//! ## Components
//!
//! | Component | Purpose |
//! |-----------|---------|
//! | [`ServiceServer`] | Dispatch requests, flush responses in arrival order |
//! | [`ServiceClient`] | Send requests, pair the nth response with the nth send |
//! | [`ResponseSlot`] | Single-shot completion handle given to server hooks |
//! | [`ReplyFuture`] | Client-side future resolving to the paired response |
//! | [`RetryPolicy`] | Bounded reconnect schedule |
//!
//! ## Quick Start
//!
//! ```ignore
//! use tideline_pipeline::{
//!     ResponseSlot, ServerConfig, ServiceError, ServiceHandler, ServiceServer,
//! };
//!
//! struct Echo;
//!
//! impl ServiceHandler<String, String> for Echo {
//!     fn process_request(&self, request: String, reply: ResponseSlot<String>) {
//!         reply.resolve(request);
//!     }
//!
//!     fn process_failure(&self, request: &String, cause: &ServiceError) -> String {
//!         format!("{}: {}", cause, request)
//!     }
//! }
//!
//! let server = ServiceServer::new(ServerConfig::new("echo"), Echo, clock, sink);
//! server.connected(conduit);
//! ```

#![deny(missing_docs)]
#![deny(clippy::unwrap_used)]

// Re-export core contracts for convenience
pub use tideline_core::{
    CodecError, Conduit, Endpoint, JsonCodec, ManualClock, MemorySink, MessageCodec, MetricEvent,
    MetricsSink, MonotonicClock, NullSink, TimeProvider, WorkerHandle, WriteArm, WriteOutcome,
};

// =============================================================================
// Modules
// =============================================================================

/// The client-side pipelining core.
pub mod client;

/// Error taxonomy shared by both cores.
pub mod error;

/// The server-side pipelining core.
pub mod server;

// =============================================================================
// Public API Re-exports
// =============================================================================

// Error exports
pub use error::ServiceError;

// Server exports
pub use server::{
    PromiseQueue, ResponseSlot, ServerConfig, ServerMessage, ServiceHandler, ServiceServer,
};

// Client exports
pub use client::{
    ClientConfig, ClientMessage, ConnectionStatus, ReplyFuture, RetryPolicy, SentQueue,
    ServiceClient, SharedServiceClient,
};
