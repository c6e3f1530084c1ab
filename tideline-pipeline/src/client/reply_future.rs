//! ReplyFuture: client-side future waiting for the paired response.
//!
//! Returned by [`ServiceClient::send`](crate::ServiceClient::send) and the
//! shared façade. Resolves with the response once the matching (FIFO) reply
//! arrives, or with the [`ServiceError`] that terminated the request.

use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};

use tokio::sync::oneshot;

use crate::error::ServiceError;

/// Future that resolves when the paired response (or a terminal error)
/// arrives.
pub struct ReplyFuture<Res> {
    rx: oneshot::Receiver<Result<Res, ServiceError>>,
}

impl<Res> ReplyFuture<Res> {
    pub(crate) fn new(rx: oneshot::Receiver<Result<Res, ServiceError>>) -> Self {
        Self { rx }
    }
}

impl<Res> Future for ReplyFuture<Res> {
    type Output = Result<Res, ServiceError>;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        match Pin::new(&mut self.get_mut().rx).poll(cx) {
            Poll::Ready(Ok(result)) => Poll::Ready(result),
            // The owning client went away without completing the handler.
            Poll::Ready(Err(_)) => Poll::Ready(Err(ServiceError::connection_lost(
                "client dropped before the request completed",
            ))),
            Poll::Pending => Poll::Pending,
        }
    }
}
