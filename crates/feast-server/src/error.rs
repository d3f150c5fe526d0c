//! Listener errors.

use std::net::SocketAddr;

use thiserror::Error;

/// Errors that stop the HTTP server.
///
/// Request-level failures never surface here; they become JSON error
/// responses.
#[derive(Error, Debug)]
pub enum ServerError {
    /// The configured address does not parse.
    #[error("invalid listen address '{addr}'")]
    InvalidAddress {
        /// The configured value.
        addr: String,
        /// Parse failure.
        #[source]
        source: std::net::AddrParseError,
    },

    /// The socket could not be bound.
    #[error("failed to bind {addr}")]
    Bind {
        /// The address.
        addr: SocketAddr,
        /// Underlying error.
        #[source]
        source: std::io::Error,
    },

    /// Other listener I/O failure.
    #[error("server I/O error: {0}")]
    Io(#[from] std::io::Error),
}
