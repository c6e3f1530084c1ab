//! The server-side pipelining core.
//!
//! A [`ServiceServer`] owns one connection's worth of in-flight requests. The
//! I/O controller feeds it decoded requests via [`ServiceServer::process_message`];
//! user code plugs in a [`ServiceHandler`] that turns requests into responses,
//! possibly on a later turn of the event loop. The server's single job is the
//! pipelining contract: responses go out in the exact order requests came in,
//! no matter how completions interleave, with timeouts and overload rejections
//! taking their arrival slot like any other response.
//!
//! # Single-threaded
//!
//! One instance is confined to one I/O worker. All state lives behind
//! `RefCell`/`Cell` and methods take `&self`, the same interior-mutability
//! arrangement the rest of tideline uses for worker-confined components. No
//! borrow is held across a call into user hooks or the conduit, so hooks may
//! complete their [`ResponseSlot`] synchronously.

use std::cell::{Cell, RefCell};
use std::rc::{Rc, Weak};
use std::time::Duration;

use tideline_core::{Conduit, MetricsSink, TimeProvider, WorkerHandle, WriteArm, WriteOutcome};

use super::config::ServerConfig;
use super::metrics::ServerMetrics;
use super::promise::{Promise, PromiseQueue, ResponseSlot};
use crate::error::ServiceError;

/// User hooks the server is parameterized by.
///
/// Methods take `&self`; handlers that carry state use interior mutability,
/// which is safe because every call happens on the owning worker.
pub trait ServiceHandler<Req, Res> {
    /// Process one request.
    ///
    /// The handler may resolve `reply` before returning or store it and
    /// resolve it later on the same worker. Rejecting the slot (or dropping
    /// it) routes through [`ServiceHandler::process_failure`] so an error
    /// response still flushes in the request's arrival slot.
    fn process_request(&self, request: Req, reply: ResponseSlot<Res>);

    /// Map a failed request to the protocol-level error response written in
    /// its place. Must be total: this is the last line of defense and may
    /// not itself fail.
    fn process_failure(&self, request: &Req, cause: &ServiceError) -> Res;

    /// Tags attached to the per-request rate and latency metrics.
    fn response_tags(&self, _request: &Req, _response: &Res) -> Vec<(String, String)> {
        Vec::new()
    }
}

/// Timed messages the server schedules for itself through the worker.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServerMessage {
    /// Run the idle sweep; `period` is the sweep interval hint.
    IdleCheck {
        /// Interval the worker uses between sweeps.
        period: Duration,
    },
}

/// Per-connection state guarded by one `RefCell`.
struct ServerState<Req, Res> {
    queue: PromiseQueue<Req, Res>,

    /// Set once graceful shutdown begins; never cleared.
    disconnecting: bool,

    /// Requests accepted on the current connection.
    accepted_total: u64,
}

/// Accepts decoded requests, dispatches them, and writes responses back in
/// arrival order.
///
/// Construct with [`ServiceServer::new`], attach the connection's conduit
/// with [`ServiceServer::connected`], and feed it decoded requests from the
/// controller. The server is used through an `Rc` because response slots
/// carry a (weak) reference back to it.
pub struct ServiceServer<Req, Res, H, C, T> {
    config: ServerConfig,
    handler: H,
    time: T,
    metrics: ServerMetrics,
    state: RefCell<ServerState<Req, Res>>,
    conduit: RefCell<Option<C>>,
    worker: RefCell<Option<Box<dyn WorkerHandle<ServerMessage>>>>,
    next_seq: Cell<u64>,

    /// Handed to response slots so completions find their way back.
    weak_self: Weak<Self>,
}

impl<Req, Res, H, C, T> ServiceServer<Req, Res, H, C, T>
where
    Req: Clone + 'static,
    Res: 'static,
    H: ServiceHandler<Req, Res> + 'static,
    C: Conduit<Res> + 'static,
    T: TimeProvider + 'static,
{
    /// Create a new server with the given hooks, clock and metrics sink.
    pub fn new(config: ServerConfig, handler: H, time: T, sink: Rc<dyn MetricsSink>) -> Rc<Self> {
        let metrics = ServerMetrics::new(sink, &config.name);
        Rc::new_cyclic(|weak_self| Self {
            config,
            handler,
            time,
            metrics,
            state: RefCell::new(ServerState {
                queue: PromiseQueue::new(),
                disconnecting: false,
                accepted_total: 0,
            }),
            conduit: RefCell::new(None),
            worker: RefCell::new(None),
            next_seq: Cell::new(0),
            weak_self: weak_self.clone(),
        })
    }

    /// Bind this server to its owning worker.
    pub fn bind_worker(&self, worker: Box<dyn WorkerHandle<ServerMessage>>) {
        *self.worker.borrow_mut() = Some(worker);
    }

    /// Whether a conduit is attached.
    pub fn is_connected(&self) -> bool {
        self.conduit.borrow().is_some()
    }

    /// Number of promises currently queued.
    pub fn pending_requests(&self) -> usize {
        self.state.borrow().queue.len()
    }

    /// Whether graceful shutdown has begun.
    pub fn is_draining(&self) -> bool {
        self.state.borrow().disconnecting
    }

    /// Inbound hook: one decoded request from the controller.
    ///
    /// Allocates a promise in the request's arrival slot and dispatches it.
    /// At or above the soft buffer limit the user hook is skipped and the
    /// promise completes immediately with the mapped overload response,
    /// which still flushes in order.
    pub fn process_message(&self, request: Req) {
        let now = self.time.now();
        let seq = self.next_seq.get();
        self.next_seq.set(seq + 1);

        let at_capacity = {
            let mut st = self.state.borrow_mut();
            let at_capacity = st.queue.len() >= self.config.request_buffer_size;
            st.queue.push(Promise::new(seq, request.clone(), now));
            st.accepted_total += 1;
            at_capacity
        };
        self.metrics.concurrent_delta(1);
        tracing::trace!(seq, at_capacity, "request accepted");

        if at_capacity {
            self.fail_promise(seq, ServiceError::Overloaded);
            return;
        }

        let weak = self.weak_self.clone();
        let slot = ResponseSlot::new(move |result| {
            let Some(server) = weak.upgrade() else { return };
            match result {
                Ok(response) => server.complete_promise(seq, response),
                Err(cause) => server.fail_promise(seq, cause),
            }
        });
        self.handler.process_request(request, slot);
    }

    /// Graceful shutdown: pause reads and let in-flight requests finish.
    ///
    /// The connection closes only once the promise queue is empty; stuck
    /// requests leave through the timeout sweep.
    pub fn graceful_disconnect(&self) {
        if let Some(conduit) = self.conduit.borrow_mut().as_mut() {
            conduit.pause_reads();
        }
        self.state.borrow_mut().disconnecting = true;
        tracing::info!(name = %self.config.name, "graceful disconnect; draining in-flight requests");
        self.maybe_finish_drain();
    }

    /// Request a timed callback from the worker; no-op when unbound.
    pub fn schedule(&self, delay: Duration, message: ServerMessage) {
        if let Some(worker) = self.worker.borrow().as_ref() {
            worker.schedule(delay, message);
        }
    }

    /// Deliver a worker message scheduled earlier.
    pub fn handle_message(&self, message: ServerMessage) {
        match message {
            ServerMessage::IdleCheck { period } => self.idle_check(period),
        }
    }

    /// Periodic sweep: complete expired incomplete heads with a timeout
    /// error.
    ///
    /// Completion triggers the ordering pass, so a timed-out head flushes
    /// immediately and unblocks any already-completed successors behind it.
    pub fn idle_check(&self, _period: Duration) {
        let now = self.time.now();
        loop {
            let expired = self
                .state
                .borrow()
                .queue
                .expired_head(now, self.config.request_timeout);
            let Some((seq, request)) = expired else { break };

            tracing::debug!(seq, "request timed out at idle check");
            let response = self.handle_failure(&request, &ServiceError::Timeout);
            if self.state.borrow_mut().queue.complete(seq, response) {
                self.flush_ready();
            }
        }
    }

    /// Attach the connection's conduit.
    pub fn connected(&self, conduit: C) {
        *self.conduit.borrow_mut() = Some(conduit);
        self.state.borrow_mut().accepted_total = 0;
        tracing::info!(name = %self.config.name, "connection attached");
    }

    /// Clean connection close.
    pub fn connection_closed(&self) {
        tracing::info!(name = %self.config.name, "connection closed");
        self.finish_connection();
    }

    /// Connection torn down by an error.
    pub fn connection_lost(&self, cause: &ServiceError) {
        tracing::warn!(name = %self.config.name, error = %cause, "connection lost");
        self.finish_connection();
    }

    /// Per-connection accounting on close. Undelivered responses are
    /// discarded: the socket is gone.
    fn finish_connection(&self) {
        *self.conduit.borrow_mut() = None;
        let (accepted, remaining) = {
            let mut st = self.state.borrow_mut();
            let remaining = st.queue.clear();
            (st.accepted_total, remaining)
        };
        self.metrics.requests_per_connection(accepted);
        if remaining > 0 {
            self.metrics.concurrent_delta(-(remaining as i64));
        }
    }

    /// Assign a success response to the promise `seq` and flush.
    fn complete_promise(&self, seq: u64, response: Res) {
        if self.state.borrow_mut().queue.complete(seq, response) {
            self.flush_ready();
        } else {
            tracing::trace!(seq, "ignoring completion for promise no longer pending");
        }
    }

    /// Map a failure to a response for the promise `seq` and flush.
    fn fail_promise(&self, seq: u64, cause: ServiceError) {
        let Some(request) = self.state.borrow().queue.pending_request(seq) else {
            tracing::trace!(seq, "ignoring failure for promise no longer pending");
            return;
        };
        let response = self.handle_failure(&request, &cause);
        if self.state.borrow_mut().queue.complete(seq, response) {
            self.flush_ready();
        }
    }

    /// Record the error and map it through the user's failure hook.
    fn handle_failure(&self, request: &Req, cause: &ServiceError) -> Res {
        self.metrics.error(cause.kind_tag());
        if self.config.log_errors {
            tracing::warn!(name = %self.config.name, error = %cause, "request failed");
        }
        self.handler.process_failure(request, cause)
    }

    /// The ordering pass: flush completed promises from the head while the
    /// connection is alive.
    ///
    /// This is the only writer. Responses completed behind an incomplete
    /// head wait; there is no out-of-order flush.
    fn flush_ready(&self) {
        loop {
            let popped = {
                if self.conduit.borrow().is_none() {
                    break;
                }
                self.state.borrow_mut().queue.pop_ready()
            };
            let Some((request, response, created)) = popped else {
                break;
            };

            let tags = self.handler.response_tags(&request, &response);
            let elapsed = self.time.now().saturating_sub(created);
            self.metrics.request(&tags);
            self.metrics.latency(elapsed, &tags);
            self.metrics.concurrent_delta(-1);

            let metrics = self.metrics.clone();
            let arm: WriteArm = Box::new(move |outcome| {
                if outcome != WriteOutcome::Success {
                    metrics.dropped_reply();
                    tracing::debug!(?outcome, "reply dropped before reaching the wire");
                }
            });

            if let Some(conduit) = self.conduit.borrow_mut().as_mut()
                && !conduit.push(response, Some(created), arm)
            {
                tracing::warn!("conduit refused response push; pending buffer full");
            }

            self.maybe_finish_drain();
        }
    }

    /// Close the connection once draining and empty.
    fn maybe_finish_drain(&self) {
        let drained = {
            let st = self.state.borrow();
            st.disconnecting && st.queue.is_empty()
        };
        if drained && let Some(conduit) = self.conduit.borrow_mut().as_mut() {
            tracing::info!(name = %self.config.name, "promise queue drained; closing connection");
            conduit.close();
        }
    }
}
