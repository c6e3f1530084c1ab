//! # tideline-core
//!
//! Core contracts for the tideline pipelining engine.
//!
//! The pipelining cores in `tideline-pipeline` interact with the outside
//! world through a small set of capabilities: a message codec, a monotonic
//! clock, a metrics sink, the byte-level I/O controller and the event-loop
//! worker that owns them. This crate defines those capabilities as traits so
//! the cores stay independent of any concrete transport, serialization format
//! or scheduler.
//!
//! ```text
//! ┌──────────────────────────────────────────────────────┐
//! │              ServiceServer / ServiceClient            │
//! │   Uses: Conduit, WorkerHandle, TimeProvider, ...      │
//! └───────────────────────┬──────────────────────────────┘
//!                         │ depends on traits
//!          ┌──────────────┴──────────────┐
//!          ▼                             ▼
//!   ┌─────────────────┐         ┌─────────────────┐
//!   │     Testing     │         │   Production    │
//!   │ ManualClock     │         │ MonotonicClock  │
//!   │ MemorySink      │         │ real controller │
//!   │ (deterministic) │         │  (real I/O)     │
//!   └─────────────────┘         └─────────────────┘
//! ```
//!
//! ## Contracts
//!
//! | Trait | Purpose |
//! |-------|---------|
//! | [`Conduit`] | I/O controller: push writes, pause/resume, purge |
//! | [`WorkerHandle`] | Event-loop worker: connect, timed messages |
//! | [`TimeProvider`] | Monotonic clock for timestamps and sweeps |
//! | [`MetricsSink`] | Rates, histograms and counters by name + tags |
//! | [`MessageCodec`] | Pluggable serialization for conduit implementations |

#![deny(missing_docs)]
#![deny(clippy::unwrap_used)]

mod codec;
mod conduit;
mod endpoint;
mod metrics;
mod time;
mod worker;

// Codec exports
pub use codec::{CodecError, JsonCodec, MessageCodec};

// Conduit contract exports
pub use conduit::{Conduit, WriteArm, WriteOutcome};

// Endpoint exports
pub use endpoint::Endpoint;

// Metrics exports
pub use metrics::{MemorySink, MetricEvent, MetricsSink, NullSink};

// Time exports
pub use time::{ManualClock, MonotonicClock, TimeProvider};

// Worker contract exports
pub use worker::WorkerHandle;
