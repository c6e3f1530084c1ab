//! Error taxonomy for the pipelining cores.
//!
//! Every failure a request can meet has a kind here. On the server, errors
//! never escape to the wire as-is: each one is mapped by the handler's
//! `process_failure` into a protocol-level response and written in order. On
//! the client, errors reach the per-request handler as a failed
//! [`ReplyFuture`](crate::ReplyFuture). Metrics are tagged with
//! [`ServiceError::kind_tag`] on every error path.

/// Errors surfaced to user code or via metrics tags.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ServiceError {
    /// Request exceeded the configured request timeout.
    #[error("request timed out")]
    Timeout,

    /// Server queue at capacity; the request was admitted only to be
    /// rejected in its arrival slot.
    #[error("server at capacity")]
    Overloaded,

    /// Client pending buffer full; the send was refused.
    #[error("client pending buffer full")]
    ClientOverloaded,

    /// Attempted to send while not connected, or after graceful disconnect
    /// began.
    #[error("not connected: {reason}")]
    NotConnected {
        /// What was being attempted.
        reason: String,
    },

    /// The request was in flight when the connection dropped.
    #[error("connection lost: {reason}")]
    ConnectionLost {
        /// Details about the loss.
        reason: String,
    },

    /// Connect attempted on a terminally-disconnected client.
    #[error("client is terminally disconnected")]
    StaleClient,

    /// Protocol desynchronization, e.g. a response with no outstanding
    /// request.
    #[error("protocol data error: {message}")]
    Data {
        /// Details about the desynchronization.
        message: String,
    },

    /// Error raised by the user's request processing hook.
    #[error("handler error: {message}")]
    User {
        /// Details about the handler failure.
        message: String,
    },
}

impl ServiceError {
    /// Build a [`ServiceError::NotConnected`] with the given reason.
    pub fn not_connected(reason: impl Into<String>) -> Self {
        ServiceError::NotConnected {
            reason: reason.into(),
        }
    }

    /// Build a [`ServiceError::ConnectionLost`] with the given reason.
    pub fn connection_lost(reason: impl Into<String>) -> Self {
        ServiceError::ConnectionLost {
            reason: reason.into(),
        }
    }

    /// Build a [`ServiceError::Data`] with the given message.
    pub fn data(message: impl Into<String>) -> Self {
        ServiceError::Data {
            message: message.into(),
        }
    }

    /// Build a [`ServiceError::User`] with the given message.
    pub fn user(message: impl Into<String>) -> Self {
        ServiceError::User {
            message: message.into(),
        }
    }

    /// The kind name used as a metrics tag.
    ///
    /// Alphanumeric only, stable across payload contents.
    pub fn kind_tag(&self) -> &'static str {
        match self {
            ServiceError::Timeout => "Timeout",
            ServiceError::Overloaded => "Overloaded",
            ServiceError::ClientOverloaded => "ClientOverloaded",
            ServiceError::NotConnected { .. } => "NotConnected",
            ServiceError::ConnectionLost { .. } => "ConnectionLost",
            ServiceError::StaleClient => "StaleClient",
            ServiceError::Data { .. } => "Data",
            ServiceError::User { .. } => "User",
        }
    }
}
