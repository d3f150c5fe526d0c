//! # Feast Server
//!
//! Turns HTTP requests into handler calls and handler results into JSON.
//!
//! ```text
//!  hyper ─► Server ─► FeastService::handle
//!                         │ request::to_context (prefix, query, form)
//!                         ▼
//!                    serve_request
//!                         │ api switch ─► _jsonp ─► _method ─► AuthGate
//!                         ▼
//!                    Dispatcher ─► RouteTable ─► HandlerRegistry ─► bind ─► Handler
//!                         ▼
//!                    response::serialize ─► JSON / JSONP
//! ```
//!
//! ## Example
//!
//! ```rust
//! use feast_core::{FnHandler, ParamSpec, RequestContext};
//! use feast_router::{HandlerEntry, MethodMask, Route, RouteTable};
//! use feast_server::{FeastService, HandlerRegistry};
//! use http::Method;
//!
//! # tokio_test::block_on(async {
//! let routes = RouteTable::new().with(
//!     Route::new("/items/{id}")
//!         .unwrap()
//!         .entry(HandlerEntry::new("items.get", MethodMask::READABLE)),
//! );
//! let handlers = HandlerRegistry::new().with(
//!     "items.get",
//!     FnHandler::new(
//!         vec![ParamSpec::required("id"), ParamSpec::optional("verbose", false)],
//!         |_ctx, args| async move { Ok(args.into_values()) },
//!     ),
//! );
//!
//! let service = FeastService::builder().routes(routes, handlers).build();
//! let response = service
//!     .serve_request(RequestContext::new(Method::GET, "/items/42"))
//!     .await;
//! assert_eq!(response.body().as_ref(), br#"["42",false]"#);
//! # });
//! ```

#![doc(html_root_url = "https://docs.rs/feast-server/0.1.0")]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

pub mod auth;
pub mod config;
pub mod dispatcher;
mod error;
pub mod handler;
pub mod request;
pub mod response;
mod server;
mod service;
pub mod shutdown;

pub use auth::{AuthGate, AuthResolver, BasicCredentials, CredentialVerifier, StaticCredentials};
pub use config::{ServerConfig, ServerConfigBuilder};
pub use dispatcher::{merge_inputs, Dispatched, Dispatcher};
pub use error::ServerError;
pub use handler::{HandlerRegistry, SharedHandler};
pub use response::{is_valid_jsonp_callback, serialize, JsonResponse};
pub use server::{HttpResponse, Server};
pub use service::{FeastService, FeastServiceBuilder, JSONP_PARAM, METHOD_OVERRIDE_PARAM};
pub use shutdown::{ConnectionToken, ConnectionTracker, ShutdownSignal};
