//! Ordered route table for the Feast JSON API.
//!
//! This crate resolves a `(method, path)` pair to a single handler entry. It
//! knows handlers only by callback name; invoking them is the dispatcher's job.
//!
//! # Features
//!
//! - **Path templates**: `/feeds/{id}` with digit captures by default and
//!   `{name:regex}` for custom tokens, anchored and case-insensitive
//! - **Method masks**: each entry accepts a bitset of verbs, HEAD routes as GET
//! - **Registration order**: the first matching route is final
//! - **Extensions**: composable hooks that add, replace or remove routes
//!
//! # Example
//!
//! ```rust
//! use feast_router::{HandlerEntry, Lookup, MethodMask, Route, RouteTable};
//! use http::Method;
//!
//! let table = RouteTable::new()
//!     .with(
//!         Route::new("/items")
//!             .unwrap()
//!             .entry(HandlerEntry::new("items.list", MethodMask::READABLE)),
//!     )
//!     .with(
//!         Route::new("/items/{id}")
//!             .unwrap()
//!             .entry(HandlerEntry::new("items.get", MethodMask::READABLE))
//!             .entry(HandlerEntry::new("items.delete", MethodMask::DELETABLE)),
//!     );
//!
//! let method = MethodMask::from_method(&Method::HEAD).unwrap();
//! let Lookup::Matched(m) = table.lookup(method, "/items/42") else {
//!     panic!("route should match");
//! };
//! assert_eq!(m.entry.callback(), "items.get");
//! assert_eq!(m.captures.get("id"), Some("42"));
//! ```
//!
//! # Lookup
//!
//! ```text
//!   path ──► route 1 ─ no match ─► route 2 ─ match ─► entries in order
//!                                                      │
//!                                     mask & method ≠ 0 ├─► Matched
//!                                     none accepted     └─► MethodNotAllowed
//!   no route matched ─────────────────────────────────────► NotFound
//! ```

#![doc(html_root_url = "https://docs.rs/feast-router/0.1.0")]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

mod method;
mod params;
mod pattern;
mod table;

pub use method::{EntryFlags, MethodMask};
pub use params::Captures;
pub use pattern::{match_path, Pattern, PatternError, DEFAULT_TOKEN};
pub use table::{
    compose, HandlerEntry, Lookup, Route, RouteDescription, RouteExtension, RouteMatch, RouteTable,
};
