//! I/O controller contract consumed by the pipelining cores.
//!
//! A [`Conduit`] is the byte-level controller that owns the socket, the
//! codec and the not-yet-written pending buffer. The cores never touch bytes:
//! they push typed messages, attach a completion arm per write, and steer the
//! controller with pause/resume/purge calls. Everything here is synchronous;
//! the controller reports write completion by invoking the arm, possibly on a
//! later turn of the event loop.
//!
//! The reverse direction is not a trait: the controller calls the cores'
//! public methods directly (`process_message`, `connected`,
//! `connection_lost`, `idle_check`, ...).

use std::time::Duration;

/// Completion of one pushed message, reported through its [`WriteArm`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteOutcome {
    /// The message was written to the wire.
    Success,
    /// The write failed (the connection is unusable).
    Failure,
    /// The message was purged from the pending buffer before being written.
    Cancelled,
}

/// Completion arm attached to each pushed message.
///
/// Invoked exactly once with the final [`WriteOutcome`] of that message,
/// unless the push itself was refused (see [`Conduit::push`]).
pub type WriteArm = Box<dyn FnOnce(WriteOutcome)>;

/// The I/O controller for one connection.
///
/// `Out` is the typed message the controller encodes and writes. The
/// controller outlives individual connections: its pending buffer keeps
/// accepting pushes while disconnected, which is what allows a client with
/// `fail_fast` disabled to queue requests across a reconnect.
pub trait Conduit<Out> {
    /// Enqueue a message for encoding and write.
    ///
    /// `timestamp` is an optional write tag carried alongside the message
    /// (the server passes each request's creation time). Returns `false`
    /// when the pending buffer is full; in that case the message is not
    /// enqueued and `arm` is dropped without being invoked.
    fn push(&mut self, message: Out, timestamp: Option<Duration>, arm: WriteArm) -> bool;

    /// Stop reading from the socket.
    fn pause_reads(&mut self);

    /// Resume reading from the socket.
    fn resume_reads(&mut self);

    /// Stop writing queued messages to the socket.
    fn pause_writes(&mut self);

    /// Resume writing queued messages to the socket.
    fn resume_writes(&mut self);

    /// Signal that the core is ready to receive decoded messages.
    fn ready_for_data(&mut self);

    /// Drop queued-but-unwritten outgoing messages, invoking each arm with
    /// `outcome`.
    fn purge_outgoing(&mut self, outcome: WriteOutcome);

    /// Drop messages still in the pending buffer, invoking each arm with
    /// `outcome`.
    fn purge_pending(&mut self, outcome: WriteOutcome);

    /// Discard framing/codec state, typically on (re)connect.
    fn reset(&mut self);

    /// Close the connection.
    fn close(&mut self);
}
