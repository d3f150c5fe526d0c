//! Test error types.

use thiserror::Error;

/// Failures while building a request or reading a response.
#[derive(Debug, Error)]
pub enum TestError {
    /// The request could not be assembled.
    #[error("request build error: {0}")]
    RequestBuild(String),

    /// A header name or value was rejected.
    #[error("invalid header: {0}")]
    InvalidHeader(String),

    /// The response body could not be read.
    #[error("body read error: {0}")]
    BodyRead(String),

    /// JSON encoding or decoding failed.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Form or query encoding failed.
    #[error("form encoding error: {0}")]
    Form(#[from] serde_urlencoded::ser::Error),
}
