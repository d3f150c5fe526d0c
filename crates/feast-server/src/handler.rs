//! Handler registry.
//!
//! Route entries name their callback by string. The registry maps those
//! names to [`Handler`] implementations, and is the point where external
//! code can swap or wrap a handler before the first dispatch.
//!
//! # Example
//!
//! ```rust
//! use feast_core::{FnHandler, ParamSpec};
//! use feast_server::HandlerRegistry;
//!
//! let mut registry = HandlerRegistry::new();
//! registry.register(
//!     "feeds.get",
//!     FnHandler::new(vec![ParamSpec::required("id")], |_ctx, args| async move {
//!         let [id] = args.into_array()?;
//!         Ok(serde_json::json!({ "id": id }))
//!     }),
//! );
//!
//! assert!(registry.contains("feeds.get"));
//! ```

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use feast_core::Handler;

/// A shared, type-erased handler.
pub type SharedHandler = Arc<dyn Handler>;

/// Callback name to handler.
#[derive(Default, Clone)]
pub struct HandlerRegistry {
    handlers: HashMap<String, SharedHandler>,
}

impl HandlerRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `handler` under `callback`, returning any handler it
    /// replaced.
    pub fn register(
        &mut self,
        callback: impl Into<String>,
        handler: impl Handler,
    ) -> Option<SharedHandler> {
        self.register_shared(callback, Arc::new(handler))
    }

    /// Registers an already shared handler.
    pub fn register_shared(
        &mut self,
        callback: impl Into<String>,
        handler: SharedHandler,
    ) -> Option<SharedHandler> {
        let callback = callback.into();
        tracing::debug!(callback = %callback, "registering handler");
        self.handlers.insert(callback, handler)
    }

    /// Builder form of [`HandlerRegistry::register`].
    #[must_use]
    pub fn with(mut self, callback: impl Into<String>, handler: impl Handler) -> Self {
        self.register(callback, handler);
        self
    }

    /// Replaces the handler under `callback` with `wrap(current)`.
    ///
    /// Returns `false` when nothing is registered under that name.
    pub fn wrap<F>(&mut self, callback: &str, wrap: F) -> bool
    where
        F: FnOnce(SharedHandler) -> SharedHandler,
    {
        match self.handlers.remove(callback) {
            Some(current) => {
                self.handlers.insert(callback.to_string(), wrap(current));
                true
            }
            None => false,
        }
    }

    /// Removes a handler.
    pub fn remove(&mut self, callback: &str) -> Option<SharedHandler> {
        self.handlers.remove(callback)
    }

    /// The handler for `callback`.
    #[must_use]
    pub fn get(&self, callback: &str) -> Option<SharedHandler> {
        self.handlers.get(callback).cloned()
    }

    /// Returns `true` if `callback` is registered.
    #[must_use]
    pub fn contains(&self, callback: &str) -> bool {
        self.handlers.contains_key(callback)
    }

    /// Registered callback names, sorted.
    #[must_use]
    pub fn callbacks(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.handlers.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    /// Number of handlers.
    #[must_use]
    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    /// Returns `true` if nothing is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }
}

impl fmt::Debug for HandlerRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HandlerRegistry")
            .field("callbacks", &self.callbacks())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use feast_core::{
        ApiResult, Args, BoxFuture, FnHandler, ParamSpec, RequestContext,
    };
    use http::Method;
    use serde_json::{json, Value};

    fn echo() -> impl Handler {
        FnHandler::new(vec![ParamSpec::optional("x", 1)], |_ctx, args| async move {
            Ok(args.into_values())
        })
    }

    struct Upper(SharedHandler);

    impl Handler for Upper {
        fn params(&self) -> &[ParamSpec] {
            self.0.params()
        }

        fn call(&self, ctx: &RequestContext, args: Args) -> BoxFuture<'static, ApiResult<Value>> {
            let inner = self.0.call(ctx, args);
            Box::pin(async move { Ok(json!({ "wrapped": inner.await? })) })
        }
    }

    #[test]
    fn test_registry_new() {
        let registry = HandlerRegistry::new();
        assert!(registry.is_empty());
        assert_eq!(registry.len(), 0);
        assert!(registry.get("feeds.list").is_none());
    }

    #[test]
    fn test_register_replaces() {
        let mut registry = HandlerRegistry::new();
        assert!(registry.register("a", echo()).is_none());
        assert!(registry.register("a", echo()).is_some());
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_callbacks_sorted() {
        let registry = HandlerRegistry::new()
            .with("items.list", echo())
            .with("feeds.list", echo());
        assert_eq!(registry.callbacks(), vec!["feeds.list", "items.list"]);
    }

    #[test]
    fn test_remove() {
        let mut registry = HandlerRegistry::new().with("a", echo());
        assert!(registry.remove("a").is_some());
        assert!(!registry.contains("a"));
        assert!(registry.remove("a").is_none());
    }

    #[tokio::test]
    async fn test_wrap() {
        let mut registry = HandlerRegistry::new().with("a", echo());
        assert!(registry.wrap("a", |inner| Arc::new(Upper(inner))));
        assert!(!registry.wrap("missing", |inner| inner));

        let handler = registry.get("a").unwrap();
        assert_eq!(handler.params()[0].name(), "x");

        let ctx = RequestContext::new(Method::GET, "/");
        let mut args = Args::new();
        args.push("x", json!(5));
        let out = handler.call(&ctx, args).await.unwrap();
        assert_eq!(out, json!({ "wrapped": [5] }));
    }
}
