//! Promises: one placeholder per received request, flushed strictly in
//! arrival order.
//!
//! A [`Promise`] is created the moment a request is decoded and lives in the
//! [`PromiseQueue`] until its response has been written. The user hook never
//! sees the promise itself; it receives a [`ResponseSlot`], a single-shot
//! completion handle that must be resolved with a response or rejected with
//! an error. A slot dropped without either is converted into a failure
//! response so the request does not silently hang until the timeout sweep.

use std::collections::VecDeque;
use std::time::Duration;

use crate::error::ServiceError;

/// One received request awaiting its response.
#[derive(Debug)]
pub struct Promise<Req, Res> {
    /// Queue-unique sequence number, assigned in arrival order.
    seq: u64,

    /// The original request, kept for failure mapping and response tags.
    request: Req,

    /// Monotonic creation time.
    created: Duration,

    /// The response, once the promise has completed.
    response: Option<Res>,
}

impl<Req, Res> Promise<Req, Res> {
    pub(crate) fn new(seq: u64, request: Req, created: Duration) -> Self {
        Self {
            seq,
            request,
            created,
            response: None,
        }
    }

    /// Whether a response has been assigned.
    pub fn is_complete(&self) -> bool {
        self.response.is_some()
    }
}

/// Ordered buffer of in-flight request promises.
///
/// The head is always the oldest incomplete or completed-but-unflushed
/// promise. Responses leave the queue strictly in arrival order: a completed
/// promise behind an incomplete head waits. There is no reordering
/// operation.
#[derive(Debug, Default)]
pub struct PromiseQueue<Req, Res> {
    entries: VecDeque<Promise<Req, Res>>,
}

impl<Req, Res> PromiseQueue<Req, Res> {
    /// Create an empty queue.
    pub fn new() -> Self {
        Self {
            entries: VecDeque::new(),
        }
    }

    /// Number of promises currently queued.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the queue is empty.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub(crate) fn push(&mut self, promise: Promise<Req, Res>) {
        self.entries.push_back(promise);
    }

    /// Assign the response for `seq`.
    ///
    /// Returns `false` when the promise is no longer queued (already
    /// flushed) or already completed; a second completion is a no-op.
    pub(crate) fn complete(&mut self, seq: u64, response: Res) -> bool {
        match self.entries.iter_mut().find(|p| p.seq == seq) {
            Some(promise) if promise.response.is_none() => {
                promise.response = Some(response);
                true
            }
            _ => false,
        }
    }

    /// Pop the head if it has completed, yielding request, response and
    /// creation time.
    pub(crate) fn pop_ready(&mut self) -> Option<(Req, Res, Duration)> {
        if self.entries.front()?.is_complete() {
            let promise = self.entries.pop_front()?;
            let response = promise.response?;
            return Some((promise.request, response, promise.created));
        }
        None
    }

    /// The head's sequence number and a clone of its request, when the head
    /// is incomplete and older than `timeout` at `now`.
    pub(crate) fn expired_head(&self, now: Duration, timeout: Duration) -> Option<(u64, Req)>
    where
        Req: Clone,
    {
        let head = self.entries.front()?;
        if head.response.is_none() && now.saturating_sub(head.created) > timeout {
            Some((head.seq, head.request.clone()))
        } else {
            None
        }
    }

    /// A clone of the request for `seq`, when that promise is still queued
    /// and incomplete.
    pub(crate) fn pending_request(&self, seq: u64) -> Option<Req>
    where
        Req: Clone,
    {
        self.entries
            .iter()
            .find(|p| p.seq == seq && p.response.is_none())
            .map(|p| p.request.clone())
    }

    /// Drop every queued promise, returning how many were discarded.
    pub(crate) fn clear(&mut self) -> usize {
        let discarded = self.entries.len();
        self.entries.clear();
        discarded
    }
}

/// Single-shot completion handle for one request.
///
/// Handed to [`ServiceHandler::process_request`](crate::ServiceHandler::process_request),
/// which may resolve it synchronously or store it and resolve it on a later
/// turn of the owning worker's event loop. Completion consumes the slot, so
/// a promise can never be completed twice through it.
pub struct ResponseSlot<Res> {
    complete: Option<Box<dyn FnOnce(Result<Res, ServiceError>)>>,
}

impl<Res> ResponseSlot<Res> {
    /// Create a slot that feeds `complete` exactly once.
    pub fn new(complete: impl FnOnce(Result<Res, ServiceError>) + 'static) -> Self {
        Self {
            complete: Some(Box::new(complete)),
        }
    }

    /// Complete the request with a response.
    pub fn resolve(mut self, response: Res) {
        if let Some(complete) = self.complete.take() {
            complete(Ok(response));
        }
    }

    /// Complete the request with an error.
    ///
    /// The error is mapped into a protocol-level response by the handler's
    /// `process_failure` before anything reaches the wire.
    pub fn reject(mut self, cause: ServiceError) {
        if let Some(complete) = self.complete.take() {
            complete(Err(cause));
        }
    }
}

impl<Res> Drop for ResponseSlot<Res> {
    fn drop(&mut self) {
        if let Some(complete) = self.complete.take() {
            complete(Err(ServiceError::user(
                "request handler dropped its response slot",
            )));
        }
    }
}
