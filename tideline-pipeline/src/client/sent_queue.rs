//! FIFO of requests written to the wire and awaiting a response.

use std::collections::VecDeque;
use std::time::Duration;

use tokio::sync::oneshot;

use crate::error::ServiceError;

/// One request written to the wire, awaiting its response.
///
/// The payload itself has moved on to the controller by the time an entry
/// lands here; what remains is the single-shot handler and the start time
/// for latency accounting.
pub(crate) struct SourcedRequest<Res> {
    reply: oneshot::Sender<Result<Res, ServiceError>>,
    started: Duration,
}

impl<Res> SourcedRequest<Res> {
    pub(crate) fn new(reply: oneshot::Sender<Result<Res, ServiceError>>, started: Duration) -> Self {
        Self { reply, started }
    }

    pub(crate) fn started(&self) -> Duration {
        self.started
    }

    /// Complete the handler with the paired response.
    pub(crate) fn complete(self, response: Res) {
        // The caller may have dropped its ReplyFuture; that's fine.
        let _ = self.reply.send(Ok(response));
    }

    /// Complete the handler with a terminal error.
    pub(crate) fn fail(self, cause: ServiceError) {
        let _ = self.reply.send(Err(cause));
    }
}

/// FIFO of sent-but-unanswered requests.
///
/// The protocol requires strict FIFO on the wire: the nth decoded response
/// completes the nth entry here. No reordering operation exists.
#[derive(Default)]
pub struct SentQueue<Res> {
    entries: VecDeque<SourcedRequest<Res>>,
}

impl<Res> SentQueue<Res> {
    /// Create an empty queue.
    pub fn new() -> Self {
        Self {
            entries: VecDeque::new(),
        }
    }

    /// Number of requests awaiting a response.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether no request is awaiting a response.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub(crate) fn push(&mut self, request: SourcedRequest<Res>) {
        self.entries.push_back(request);
    }

    pub(crate) fn pop(&mut self) -> Option<SourcedRequest<Res>> {
        self.entries.pop_front()
    }

    /// Take every outstanding request, leaving the queue empty.
    pub(crate) fn drain(&mut self) -> Vec<SourcedRequest<Res>> {
        self.entries.drain(..).collect()
    }
}
