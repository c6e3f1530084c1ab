//! Endpoint addressing for connected writers.
//!
//! An [`Endpoint`] identifies one established connection: the remote address
//! plus a token distinguishing successive connections to the same address.
//! The pipelining cores treat it as an opaque writer handle; `Some(endpoint)`
//! means connected.

use std::fmt;

/// A connected remote endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Endpoint {
    /// Remote address (e.g. "10.0.0.1:4500").
    address: String,

    /// Token distinguishing this connection from earlier ones to the same
    /// address.
    token: u64,
}

impl Endpoint {
    /// Create an endpoint for the given address and connection token.
    pub fn new(address: impl Into<String>, token: u64) -> Self {
        Self {
            address: address.into(),
            token,
        }
    }

    /// The remote address.
    pub fn address(&self) -> &str {
        &self.address
    }

    /// The connection token.
    pub fn token(&self) -> u64 {
        self.token
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}#{}", self.address, self.token)
    }
}
