//! # Feast Test
//!
//! In-memory testing for the Feast JSON API. Requests go through the same
//! [`FeastService::handle`](feast_server::FeastService::handle) path as the
//! hyper server, including the transport adapter and request switches, but
//! no socket is bound.
//!
//! - [`TestClient`] - wraps a service and prefixes paths with its route prefix
//! - [`TestRequestBuilder`] - query, JSON, form, Basic auth, `_jsonp`, `_method`
//! - [`TestResponse`] - status, header and JSON assertions, flat error codes
//!
//! ```rust,ignore
//! let client = TestClient::new(service).with_basic_auth("admin", "secret");
//! client
//!     .post("/feeds")
//!     .json(&json!({ "title": "Planet", "url": "https://planet.example/rss" }))
//!     .send()
//!     .await
//!     .assert_status(StatusCode::OK)
//!     .assert_json_field("title", &json!("Planet"));
//! ```

#![doc(html_root_url = "https://docs.rs/feast-test/0.1.0")]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

mod client;
mod error;
mod request;
mod response;

pub use client::{TestClient, TestClientRequest};
pub use error::TestError;
pub use request::{TestRequest, TestRequestBuilder};
pub use response::TestResponse;
