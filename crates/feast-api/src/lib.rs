//! # Feast API
//!
//! The feed reader endpoints served under `/feast/api`.
//!
//! | Route | Callbacks |
//! |---|---|
//! | `/` | `api.index` (hidden) |
//! | `/feeds` | `feeds.list`, `feeds.create` |
//! | `/feeds/{id}` | `feeds.get`, `feeds.edit`, `feeds.delete` |
//! | `/feeds/{feed}/items` | `items.list` |
//! | `/feeds/{feed}/items/{id}` | `items.get`, `items.edit` |
//! | `/items` | `items.list` |
//! | `/items/read` | `items.mark_read` |
//! | `/items/{id}` | `items.get`, `items.edit`, `items.delete` |
//!
//! Records live behind [`DomainStore`]; [`MemoryStore`] keeps them in
//! process.
//!
//! ## Example
//!
//! ```rust
//! use std::sync::Arc;
//!
//! use feast_api::{build_dispatcher, MemoryStore};
//! use feast_server::FeastService;
//!
//! let dispatcher = build_dispatcher(Arc::new(MemoryStore::new()), [], |_| {}).unwrap();
//! let service = FeastService::builder().dispatcher(dispatcher).build();
//! assert!(service.dispatcher().handlers().contains("feeds.list"));
//! ```

#![doc(html_root_url = "https://docs.rs/feast-api/0.1.0")]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

pub mod endpoints;
pub mod model;
pub mod routes;
mod store;

pub use model::{Author, Feed, FeedId, FeedPatch, Item, ItemId, ItemQuery, NewFeed, NewItem};
pub use routes::{base_routes, build_dispatcher, callbacks, register_handlers};
pub use store::{DomainStore, MemoryStore, StoreError, StoreResult};
