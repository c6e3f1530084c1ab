//! Event-loop worker contract.
//!
//! Each pipelining core is owned by exactly one I/O worker and all of its
//! state is mutated from that worker's event loop. The core's only way to
//! cause future work is to post messages through a [`WorkerHandle`]: initiate
//! a connection, schedule a timed message to itself, or enqueue a message for
//! the next loop turn. The worker delivers scheduled and posted messages back
//! by calling the core's `handle_message` on its own thread, which is how
//! off-worker senders are serialized without internal locks.

use std::time::Duration;

/// Handle through which a core talks to its owning worker.
///
/// `M` is the core-defined message type the worker delivers back. A core is
/// *bound* iff it holds a handle; operations that need the worker are no-ops
/// or fail fast when unbound.
///
/// Implementations are typically cheap to clone and, when backed by a
/// channel sender, `Send` — which is what the client's thread-safe façade
/// relies on.
pub trait WorkerHandle<M> {
    /// Ask the worker to initiate a connection to `address`.
    ///
    /// The outcome arrives through the core's lifecycle callbacks
    /// (`connected`, `connection_failed`).
    fn connect(&self, address: &str);

    /// Ask the worker to re-attempt a connection after a failure.
    fn reconnect(&self, address: &str);

    /// Deliver `message` back to the core after `delay`.
    fn schedule(&self, delay: Duration, message: M);

    /// Deliver `message` to the core on the next loop turn.
    fn post(&self, message: M);
}
