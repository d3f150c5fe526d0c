//! # Feast Core
//!
//! Request and error types shared by the Feast router, dispatcher and
//! endpoints.
//!
//! - [`ApiError`] - structured failure with code groups, HTTP status and data
//! - [`RequestContext`] - one inbound request, built by the transport adapter
//! - [`Principal`] / [`AuthResult`] - who is calling, and how that was decided
//! - [`Handler`] / [`ParamSpec`] - invocable units with declared parameters
//! - [`bind`] - maps a merged argument bag onto a handler's parameters

#![doc(html_root_url = "https://docs.rs/feast-core/0.1.0")]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

mod binder;
mod context;
mod error;
mod handler;
mod identity;

pub use binder::bind;
pub use context::{ParamMap, RequestContext, RequestId};
pub use error::{codes, ApiError, ApiResult, ErrorItem};
pub use handler::{Args, BoxFuture, FnHandler, Handler, ParamSpec};
pub use identity::{AuthResult, Principal};
