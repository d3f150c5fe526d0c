//! Typed configuration for Feast.
//!
//! Sources, lowest priority first:
//!
//! 1. **Defaults**, or the `development`/`production` presets
//! 2. **Config file**, TOML or JSON
//! 3. **Environment**, `FEAST__SECTION__KEY`
//!
//! # Example
//!
//! ```toml
//! [server]
//! http_addr = "0.0.0.0:8080"
//! request_timeout_ms = 10000
//!
//! [api]
//! enabled = true
//! jsonp_enabled = false
//! route_prefix = "/feast/api"
//! charset = "UTF-8"
//!
//! [[auth.users]]
//! username = "admin"
//! password = "changeme"
//! roles = ["administrator"]
//!
//! [logging]
//! level = "info"
//! format = "json"
//!
//! [metrics]
//! enabled = true
//! addr = "0.0.0.0:9090"
//! ```
//!
//! ```rust,no_run
//! use feast_config::ConfigLoader;
//!
//! let config = ConfigLoader::new()
//!     .with_file("feast.toml")?
//!     .with_env_prefix("FEAST")
//!     .load()?;
//! # Ok::<(), feast_config::ConfigError>(())
//! ```

#![doc(html_root_url = "https://docs.rs/feast-config/0.1.0")]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

mod config;
mod error;
mod loader;
mod schema;

pub use config::FeastConfig;
pub use error::ConfigError;
pub use loader::{ConfigLoader, DEFAULT_ENV_PREFIX};
pub use schema::*;
