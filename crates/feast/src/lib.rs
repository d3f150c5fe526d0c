//! # Feast
//!
//! A JSON web API for a feed reader, served from a declarative route table.
//!
//! - [`router`] - URL patterns, method masks and the ordered route table
//! - [`core`] - request context, handler trait, parameter binding, errors
//! - [`server`] - dispatcher, request switches, Basic auth, hyper server
//! - [`api`] - the feed and item endpoints over a [`DomainStore`](api::DomainStore)
//! - [`config`] - layered TOML and environment configuration
//! - [`telemetry`] - structured logging and Prometheus metrics
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//!
//! use feast::prelude::*;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = ConfigLoader::new().with_env_prefix(DEFAULT_ENV_PREFIX).load()?;
//!     let service = feast::build_service(&config, Arc::new(MemoryStore::new()))?;
//!     Server::new(service).run().await?;
//!     Ok(())
//! }
//! ```

#![doc(html_root_url = "https://docs.rs/feast/0.1.0")]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

mod app;

pub use app::{auth_gate, build_service, credentials, server_config};

pub use feast_api as api;
pub use feast_config as config;
pub use feast_core as core;
pub use feast_router as router;
pub use feast_server as server;
pub use feast_telemetry as telemetry;

/// Common imports.
pub mod prelude {
    pub use feast_api::{build_dispatcher, DomainStore, MemoryStore};
    pub use feast_config::{ConfigLoader, FeastConfig, DEFAULT_ENV_PREFIX};
    pub use feast_core::{ApiError, ApiResult, Args, FnHandler, ParamSpec, RequestContext};
    pub use feast_router::{compose, HandlerEntry, MethodMask, Route, RouteTable};
    pub use feast_server::{AuthGate, FeastService, HandlerRegistry, Server, ServerConfig};
}
