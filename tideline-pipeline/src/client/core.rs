//! The client-side pipelining core.
//!
//! A [`ServiceClient`] sends requests over a single connection and pairs the
//! nth inbound response with the nth outstanding request: the protocol is
//! strict FIFO on the wire, so no correlation IDs exist and a count mismatch
//! is a protocol error. Around that core invariant the client handles the
//! messy parts of a long-lived connection: backpressure against a bounded
//! controller, failing outstanding requests with the right cause when the
//! connection drops, bounded reconnection, and graceful shutdown that lets
//! in-flight requests finish.
//!
//! # Single-threaded
//!
//! One instance is confined to one I/O worker; `send` must be called from
//! that worker. Off-worker senders go through [`ServiceClient::shared`],
//! which posts an [`ClientMessage::AsyncRequest`] for the worker to execute
//! on its own thread.

use std::cell::RefCell;
use std::marker::PhantomData;
use std::rc::{Rc, Weak};

use tokio::sync::oneshot;

use tideline_core::{
    Conduit, Endpoint, MetricsSink, TimeProvider, WorkerHandle, WriteArm, WriteOutcome,
};

use super::config::ClientConfig;
use super::metrics::ClientMetrics;
use super::reply_future::ReplyFuture;
use super::sent_queue::{SentQueue, SourcedRequest};
use crate::error::ServiceError;

/// Observable connection lifecycle state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionStatus {
    /// Created, never connected.
    Initial,
    /// First connection attempt in progress.
    Connecting,
    /// Connected and usable.
    Connected,
    /// Connection lost; a retry is scheduled.
    Reconnecting,
    /// Retries exhausted; terminal.
    Failed,
    /// Graceful disconnect in progress; in-flight requests draining.
    Draining,
    /// Cleanly closed; terminal.
    Closed,
}

/// Messages the worker delivers back to the client.
pub enum ClientMessage<Req, Res> {
    /// Re-attempt the connection after the retry interval.
    Reconnect,

    /// A request posted from another thread via the shared façade.
    AsyncRequest {
        /// The request to send.
        request: Req,
        /// Single-shot handler for the paired response.
        reply: oneshot::Sender<Result<Res, ServiceError>>,
    },
}

/// Connection state guarded by one `RefCell`.
struct ClientState<Res> {
    sent: SentQueue<Res>,

    /// The writer handle; `Some` iff connected.
    endpoint: Option<Endpoint>,

    status: ConnectionStatus,

    /// Set once graceful shutdown begins; never cleared.
    disconnecting: bool,

    /// Latches on graceful disconnect or clean close. Once set, the client
    /// is terminal and `connect` fails with a stale-client error.
    manually_disconnected: bool,

    /// Reconnect schedules since the last successful connect.
    connection_attempts: u32,

    writes_paused: bool,
}

/// Sends requests on a single connection and correlates responses with
/// outstanding handlers by FIFO order.
///
/// Construct with [`ServiceClient::new`], bind the owning worker with
/// [`ServiceClient::bind_worker`], then [`ServiceClient::connect`]. The
/// client is used through an `Rc` because write completion arms carry a
/// (weak) reference back to it.
pub struct ServiceClient<Req, Res, C, W, T> {
    config: ClientConfig,
    time: T,
    metrics: ClientMetrics,
    conduit: RefCell<C>,
    worker: RefCell<Option<W>>,
    state: RefCell<ClientState<Res>>,

    /// Handed to write-completion arms so successes find their way back.
    weak_self: Weak<Self>,
    _request: PhantomData<fn(Req)>,
}

impl<Req, Res, C, W, T> ServiceClient<Req, Res, C, W, T>
where
    Req: 'static,
    Res: 'static,
    C: Conduit<Req> + 'static,
    W: WorkerHandle<ClientMessage<Req, Res>> + Clone + 'static,
    T: TimeProvider + 'static,
{
    /// Create a new client over the given controller, clock and metrics
    /// sink.
    ///
    /// The controller outlives individual connections: with `fail_fast`
    /// disabled its pending buffer keeps accepting sends across a
    /// reconnect.
    pub fn new(config: ClientConfig, conduit: C, time: T, sink: Rc<dyn MetricsSink>) -> Rc<Self> {
        let metrics = ClientMetrics::new(sink, &config.name);
        Rc::new_cyclic(|weak_self| Self {
            config,
            time,
            metrics,
            conduit: RefCell::new(conduit),
            worker: RefCell::new(None),
            state: RefCell::new(ClientState {
                sent: SentQueue::new(),
                endpoint: None,
                status: ConnectionStatus::Initial,
                disconnecting: false,
                manually_disconnected: false,
                connection_attempts: 0,
                writes_paused: false,
            }),
            weak_self: weak_self.clone(),
            _request: PhantomData,
        })
    }

    /// Bind this client to its owning worker.
    pub fn bind_worker(&self, worker: W) {
        *self.worker.borrow_mut() = Some(worker);
    }

    /// Whether a connection is established.
    pub fn is_connected(&self) -> bool {
        self.state.borrow().endpoint.is_some()
    }

    /// Current lifecycle state.
    pub fn connection_status(&self) -> ConnectionStatus {
        self.state.borrow().status
    }

    /// Number of sent requests awaiting a response.
    pub fn in_flight(&self) -> usize {
        self.state.borrow().sent.len()
    }

    /// Instruct the worker to initiate a connection.
    ///
    /// # Errors
    ///
    /// [`ServiceError::StaleClient`] when the client was terminally
    /// disconnected; [`ServiceError::NotConnected`] when no worker is bound.
    pub fn connect(&self) -> Result<(), ServiceError> {
        if self.state.borrow().manually_disconnected {
            return Err(ServiceError::StaleClient);
        }
        let worker = self.worker.borrow();
        let Some(worker) = worker.as_ref() else {
            return Err(ServiceError::not_connected("client is not bound to a worker"));
        };
        self.state.borrow_mut().status = ConnectionStatus::Connecting;
        tracing::info!(address = %self.config.address, "initiating connection");
        worker.connect(&self.config.address);
        Ok(())
    }

    /// Send a request; must be called from the owning worker.
    ///
    /// The returned future resolves with the paired response or the
    /// [`ServiceError`] that terminated the request.
    pub fn send(&self, request: Req) -> ReplyFuture<Res> {
        let (tx, rx) = oneshot::channel();
        let sourced = SourcedRequest::new(tx, self.time.now());
        self.attempt_write(request, sourced);
        ReplyFuture::new(rx)
    }

    /// Thread-safe send façade.
    ///
    /// Each send posts an [`ClientMessage::AsyncRequest`] that the worker
    /// executes on its own thread.
    ///
    /// # Errors
    ///
    /// [`ServiceError::NotConnected`] when the client is not bound to a
    /// worker.
    pub fn shared(&self) -> Result<SharedServiceClient<Req, Res, W>, ServiceError> {
        match self.worker.borrow().as_ref() {
            Some(worker) => Ok(SharedServiceClient {
                worker: worker.clone(),
                _marker: PhantomData,
            }),
            None => Err(ServiceError::not_connected("client is not bound to a worker")),
        }
    }

    /// Graceful shutdown: no new work, in-flight requests drain, pending
    /// (never-written) requests are cancelled.
    ///
    /// The connection closes once the sent queue is empty. The client is
    /// terminal afterwards: any further [`ServiceClient::connect`] fails
    /// with a stale-client error.
    pub fn graceful_disconnect(&self) {
        {
            let mut st = self.state.borrow_mut();
            st.disconnecting = true;
            st.manually_disconnected = true;
            st.status = ConnectionStatus::Draining;
        }
        tracing::info!(name = %self.config.name, "graceful disconnect; draining sent queue");
        self.conduit
            .borrow_mut()
            .purge_pending(WriteOutcome::Cancelled);
        self.maybe_finish_drain();
    }

    /// Inbound hook: one decoded response from the controller.
    ///
    /// Completes the head of the sent queue.
    ///
    /// # Errors
    ///
    /// [`ServiceError::Data`] when no request is outstanding; the protocol
    /// is desynchronized and the surrounding handler is expected to tear
    /// the connection down.
    pub fn process_response(&self, response: Res) -> Result<(), ServiceError> {
        let sourced = self.state.borrow_mut().sent.pop();
        let Some(sourced) = sourced else {
            let cause = ServiceError::data("response received with no outstanding request");
            self.metrics.error(cause.kind_tag());
            tracing::error!(name = %self.config.name, "protocol desynchronization");
            return Err(cause);
        };

        let elapsed = self.time.now().saturating_sub(sourced.started());
        self.metrics.latency(elapsed);
        sourced.complete(response);
        self.metrics.request();

        self.maybe_finish_drain();

        let should_resume = {
            let st = self.state.borrow();
            st.writes_paused && st.sent.len() < self.config.sent_buffer_size
        };
        if should_resume {
            self.state.borrow_mut().writes_paused = false;
            tracing::debug!("sent queue below soft cap; resuming writes");
            self.conduit.borrow_mut().resume_writes();
        }
        Ok(())
    }

    /// Connection established.
    pub fn connected(&self, endpoint: Endpoint) {
        tracing::info!(endpoint = %endpoint, "connected");
        self.conduit.borrow_mut().reset();
        {
            let mut st = self.state.borrow_mut();
            st.endpoint = Some(endpoint);
            st.connection_attempts = 0;
            st.status = ConnectionStatus::Connected;
        }
        self.conduit.borrow_mut().ready_for_data();
    }

    /// Clean connection close. Latches the client terminal.
    pub fn connection_closed(&self) {
        tracing::info!(name = %self.config.name, "connection closed");
        {
            let mut st = self.state.borrow_mut();
            st.manually_disconnected = true;
            st.status = ConnectionStatus::Closed;
        }
        self.purge_buffers();
    }

    /// Connection torn down by an error. Outstanding requests fail, then a
    /// reconnect is attempted.
    pub fn connection_lost(&self, cause: &ServiceError) {
        tracing::warn!(name = %self.config.name, error = %cause, "connection lost");
        self.purge_buffers();
        self.metrics.disconnect();
        self.attempt_reconnect();
    }

    /// A connection attempt failed before being established.
    pub fn connection_failed(&self) {
        tracing::warn!(address = %self.config.address, "connection attempt failed");
        self.metrics.connection_failure();
        self.attempt_reconnect();
    }

    /// Deliver a worker message scheduled or posted earlier.
    pub fn handle_message(&self, message: ClientMessage<Req, Res>) {
        match message {
            ClientMessage::Reconnect => {
                if self.state.borrow().disconnecting {
                    return;
                }
                if let Some(worker) = self.worker.borrow().as_ref() {
                    tracing::debug!(address = %self.config.address, "re-attempting connection");
                    worker.reconnect(&self.config.address);
                }
            }
            ClientMessage::AsyncRequest { request, reply } => {
                let sourced = SourcedRequest::new(reply, self.time.now());
                self.attempt_write(request, sourced);
            }
        }
    }

    /// The send pipeline.
    ///
    /// A request is handed to the controller when there is a live writer or
    /// `fail_fast` is disabled; its completion arm routes the write outcome
    /// into the handler. With no writer and `fail_fast` set, the request is
    /// dropped immediately.
    fn attempt_write(&self, request: Req, sourced: SourcedRequest<Res>) {
        let (disconnecting, has_writer) = {
            let st = self.state.borrow();
            (st.disconnecting, st.endpoint.is_some())
        };

        if disconnecting {
            let cause = ServiceError::not_connected("client is disconnecting");
            self.metrics.error(cause.kind_tag());
            sourced.fail(cause);
            return;
        }

        if !has_writer && self.config.fail_fast {
            self.metrics.dropped_request();
            let cause = ServiceError::not_connected("no connection and fail-fast is set");
            self.metrics.error(cause.kind_tag());
            sourced.fail(cause);
            return;
        }

        // The arm may fire synchronously inside push, later on a write
        // completion, or never (push refused). The shared slot makes sure
        // exactly one of those paths consumes the handler.
        let slot = Rc::new(RefCell::new(Some(sourced)));
        let arm: WriteArm = {
            let slot = Rc::clone(&slot);
            let weak = self.weak_self.clone();
            let metrics = self.metrics.clone();
            Box::new(move |outcome| {
                let Some(sourced) = slot.borrow_mut().take() else {
                    return;
                };
                match outcome {
                    WriteOutcome::Success => {
                        if let Some(client) = weak.upgrade() {
                            client.record_sent(sourced);
                        }
                    }
                    WriteOutcome::Failure => {
                        let cause = ServiceError::not_connected("error while sending");
                        metrics.error(cause.kind_tag());
                        sourced.fail(cause);
                    }
                    WriteOutcome::Cancelled => {
                        metrics.error(ServiceError::Timeout.kind_tag());
                        sourced.fail(ServiceError::Timeout);
                    }
                }
            })
        };

        let accepted = self.conduit.borrow_mut().push(request, None, arm);
        if !accepted {
            if let Some(sourced) = slot.borrow_mut().take() {
                self.metrics.error(ServiceError::ClientOverloaded.kind_tag());
                sourced.fail(ServiceError::ClientOverloaded);
            }
            return;
        }

        let should_pause = {
            let st = self.state.borrow();
            !st.writes_paused && st.sent.len() >= self.config.sent_buffer_size
        };
        if should_pause {
            self.state.borrow_mut().writes_paused = true;
            tracing::debug!(
                cap = self.config.sent_buffer_size,
                "sent queue at soft cap; pausing writes"
            );
            self.conduit.borrow_mut().pause_writes();
        }
    }

    /// A write completed: the request is now awaiting its response.
    fn record_sent(&self, sourced: SourcedRequest<Res>) {
        self.state.borrow_mut().sent.push(sourced);
    }

    /// Fail every outstanding request and drop unwritten ones.
    ///
    /// Sent requests were in transit and get a connection-lost error.
    /// Unwritten outgoing messages are purged with a write failure; in
    /// fail-fast mode the pending buffer is purged the same way.
    fn purge_buffers(&self) {
        let drained = {
            let mut st = self.state.borrow_mut();
            st.endpoint = None;
            st.writes_paused = false;
            st.sent.drain()
        };
        if !drained.is_empty() {
            tracing::debug!(in_flight = drained.len(), "failing in-flight requests");
        }
        for sourced in drained {
            let cause =
                ServiceError::connection_lost("connection closed while request was in transit");
            self.metrics.error(cause.kind_tag());
            sourced.fail(cause);
        }

        let mut conduit = self.conduit.borrow_mut();
        conduit.purge_outgoing(WriteOutcome::Failure);
        if self.config.fail_fast {
            conduit.purge_pending(WriteOutcome::Failure);
        }
    }

    /// Schedule a reconnect if the policy allows another attempt.
    fn attempt_reconnect(&self) {
        let schedule = {
            let mut st = self.state.borrow_mut();
            if st.disconnecting {
                false
            } else if self.config.retry.is_exhausted(st.connection_attempts) {
                st.status = ConnectionStatus::Failed;
                tracing::warn!(
                    attempts = st.connection_attempts,
                    address = %self.config.address,
                    "reconnect attempts exhausted; giving up"
                );
                false
            } else {
                st.connection_attempts += 1;
                st.status = ConnectionStatus::Reconnecting;
                true
            }
        };
        if schedule && let Some(worker) = self.worker.borrow().as_ref() {
            worker.schedule(self.config.retry.interval(), ClientMessage::Reconnect);
        }
    }

    /// Close the connection once draining and the sent queue is empty.
    fn maybe_finish_drain(&self) {
        let drained = {
            let st = self.state.borrow();
            st.disconnecting && st.sent.is_empty() && st.endpoint.is_some()
        };
        if drained {
            tracing::info!(name = %self.config.name, "sent queue drained; closing connection");
            self.conduit.borrow_mut().close();
        }
    }
}

/// Thread-safe send façade over a [`ServiceClient`].
///
/// Holds only the worker handle; every send posts an
/// [`ClientMessage::AsyncRequest`] for the owning worker to execute. Safe to
/// hand to other threads whenever the worker handle is `Send`.
pub struct SharedServiceClient<Req, Res, W> {
    worker: W,
    _marker: PhantomData<fn(Req) -> Res>,
}

impl<Req, Res, W: Clone> Clone for SharedServiceClient<Req, Res, W> {
    fn clone(&self) -> Self {
        Self {
            worker: self.worker.clone(),
            _marker: PhantomData,
        }
    }
}

impl<Req, Res, W> SharedServiceClient<Req, Res, W>
where
    W: WorkerHandle<ClientMessage<Req, Res>>,
{
    /// Send a request from any thread.
    pub fn send(&self, request: Req) -> ReplyFuture<Res> {
        let (tx, rx) = oneshot::channel();
        self.worker.post(ClientMessage::AsyncRequest {
            request,
            reply: tx,
        });
        ReplyFuture::new(rx)
    }
}
