//! Route selection, input merging, binding and invocation.
//!
//! ```text
//!  RequestContext
//!       │ method ──► MethodMask ──(none)──► unsupported_method 400
//!       ▼
//!  RouteTable::lookup ──► NotFound ──────► no_route 404
//!       │            └──► MethodNotAllowed ► invalid_http_method 405
//!       ▼
//!  HandlerRegistry ──(missing)──► invalid_handler 500
//!       ▼
//!  merge_inputs ─► bind ─(missing)─► missing_parameter 400
//!       ▼
//!  Handler::call ─► ApiResult<Value>
//! ```

use std::sync::Arc;

use feast_core::{bind, ApiError, ApiResult, RequestContext};
use feast_router::{Captures, Lookup, MethodMask, RouteTable};
use serde_json::{Map, Value};

use crate::handler::HandlerRegistry;

/// What a dispatch produced.
#[derive(Debug)]
pub struct Dispatched {
    /// Callback of the selected entry, when one was selected.
    pub callback: Option<String>,
    /// Handler output or the failure that stopped dispatch.
    pub result: ApiResult<Value>,
}

impl Dispatched {
    fn unrouted(error: ApiError) -> Self {
        Self {
            callback: None,
            result: Err(error),
        }
    }
}

/// Resolves requests against an immutable route table.
///
/// Cloning is cheap; the table and registry are shared.
#[derive(Debug, Clone, Default)]
pub struct Dispatcher {
    routes: Arc<RouteTable>,
    handlers: Arc<HandlerRegistry>,
}

impl Dispatcher {
    /// Creates a dispatcher owning its table and registry.
    #[must_use]
    pub fn new(routes: RouteTable, handlers: HandlerRegistry) -> Self {
        Self::from_shared(Arc::new(routes), Arc::new(handlers))
    }

    /// Creates a dispatcher over an already shared table and registry.
    #[must_use]
    pub fn from_shared(routes: Arc<RouteTable>, handlers: Arc<HandlerRegistry>) -> Self {
        Self { routes, handlers }
    }

    /// The route table.
    #[must_use]
    pub fn routes(&self) -> &RouteTable {
        &self.routes
    }

    /// The handler registry.
    #[must_use]
    pub fn handlers(&self) -> &HandlerRegistry {
        &self.handlers
    }

    /// Dispatches one request.
    pub async fn dispatch(&self, ctx: &RequestContext) -> Dispatched {
        let Some(method) = MethodMask::from_method(ctx.method()) else {
            tracing::debug!(method = %ctx.method(), "unsupported request method");
            return Dispatched::unrouted(ApiError::unsupported_method());
        };

        let selected = match self.routes.lookup(method, ctx.path()) {
            Lookup::Matched(selected) => selected,
            Lookup::MethodNotAllowed { route } => {
                tracing::debug!(
                    route = route.template(),
                    method = %method,
                    "route matched but no entry accepts the method"
                );
                return Dispatched::unrouted(ApiError::invalid_http_method());
            }
            Lookup::NotFound => {
                tracing::debug!(path = ctx.path(), "no route matched");
                return Dispatched::unrouted(ApiError::no_route());
            }
        };

        let callback = selected.entry.callback().to_string();
        tracing::debug!(
            route = selected.route.template(),
            callback = %callback,
            "route selected"
        );

        let Some(handler) = self.handlers.get(&callback) else {
            tracing::warn!(callback = %callback, "selected callback is not registered");
            return Dispatched {
                result: Err(ApiError::invalid_handler(&callback)),
                callback: Some(callback),
            };
        };

        let inputs = merge_inputs(
            &selected.captures,
            ctx,
            method,
            selected.entry.accepts_json_body(),
        );

        let result = match bind(handler.params(), &inputs) {
            Ok(args) => handler.call(ctx, args).await,
            Err(err) => Err(err),
        };

        Dispatched {
            callback: Some(callback),
            result,
        }
    }
}

/// Builds the argument bag, later sources overwriting earlier ones:
/// path captures, query, form body (POST only), JSON body (flagged entries
/// only).
///
/// A query parameter shadows a capture of the same name.
#[must_use]
pub fn merge_inputs(
    captures: &Captures,
    ctx: &RequestContext,
    method: MethodMask,
    accept_json: bool,
) -> Map<String, Value> {
    let mut bag = Map::new();

    for (name, value) in captures.iter() {
        bag.insert(name.to_string(), Value::String(value.to_string()));
    }

    for (name, value) in ctx.query() {
        bag.insert(name.clone(), Value::String(value.clone()));
    }

    if method == MethodMask::POST {
        if let Some(body) = ctx.body_params() {
            for (name, value) in body {
                bag.insert(name.clone(), Value::String(value.clone()));
            }
        }
    }

    if accept_json {
        bag.extend(ctx.json_body());
    }

    bag
}

#[cfg(test)]
mod tests {
    use super::*;
    use feast_core::{codes, FnHandler, ParamMap, ParamSpec};
    use feast_router::{HandlerEntry, Route};
    use http::{Method, StatusCode};
    use serde_json::json;

    fn echo(params: Vec<ParamSpec>) -> impl feast_core::Handler {
        FnHandler::new(params, |_ctx, args| async move { Ok(args.into_values()) })
    }

    fn dispatcher() -> Dispatcher {
        let routes = RouteTable::new()
            .with(
                Route::new("/items/{id}")
                    .unwrap()
                    .entry(HandlerEntry::new("items.get", MethodMask::READABLE))
                    .entry(HandlerEntry::new("items.edit", MethodMask::EDITABLE).accept_json()),
            )
            .with(
                Route::new("/items/{id:\\w+}")
                    .unwrap()
                    .entry(HandlerEntry::new("items.any", MethodMask::ALL)),
            )
            .with(
                Route::new("/ghost")
                    .unwrap()
                    .entry(HandlerEntry::new("ghost.get", MethodMask::READABLE)),
            );

        let handlers = HandlerRegistry::new()
            .with(
                "items.get",
                echo(vec![
                    ParamSpec::required("id"),
                    ParamSpec::optional("verbose", false),
                ]),
            )
            .with(
                "items.edit",
                echo(vec![ParamSpec::required("id"), ParamSpec::optional("read", Value::Null)]),
            )
            .with("items.any", echo(vec![ParamSpec::required("id")]));

        Dispatcher::new(routes, handlers)
    }

    #[tokio::test]
    async fn test_dispatch_binds_in_declaration_order() {
        let d = dispatcher();
        let out = d.dispatch(&RequestContext::new(Method::GET, "/items/42")).await;
        assert_eq!(out.callback.as_deref(), Some("items.get"));
        assert_eq!(out.result.unwrap(), json!(["42", false]));

        let ctx = RequestContext::new(Method::GET, "/items/42").with_query_param("verbose", "true");
        assert_eq!(d.dispatch(&ctx).await.result.unwrap(), json!(["42", "true"]));
    }

    #[tokio::test]
    async fn test_head_dispatches_as_get() {
        let out = dispatcher()
            .dispatch(&RequestContext::new(Method::HEAD, "/items/1"))
            .await;
        assert_eq!(out.callback.as_deref(), Some("items.get"));
    }

    #[tokio::test]
    async fn test_query_shadows_capture() {
        // Preserved precedence: the query string wins over the path.
        let ctx = RequestContext::new(Method::GET, "/items/5").with_query_param("id", "9");
        let out = dispatcher().dispatch(&ctx).await;
        assert_eq!(out.result.unwrap(), json!(["9", false]));
    }

    #[tokio::test]
    async fn test_unsupported_method() {
        let out = dispatcher()
            .dispatch(&RequestContext::new(Method::OPTIONS, "/items/1"))
            .await;
        assert!(out.callback.is_none());
        let err = out.result.unwrap_err();
        assert_eq!(err.code(), codes::UNSUPPORTED_METHOD);
        assert_eq!(err.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_first_matching_route_is_final() {
        // "/items/abc" only matches the second route; "/items/7" matches the
        // first, which has no DELETE entry, and must not fall through.
        let d = dispatcher();
        let out = d.dispatch(&RequestContext::new(Method::DELETE, "/items/abc")).await;
        assert_eq!(out.callback.as_deref(), Some("items.any"));

        let out = d.dispatch(&RequestContext::new(Method::DELETE, "/items/7")).await;
        let err = out.result.unwrap_err();
        assert_eq!(err.code(), codes::INVALID_HTTP_METHOD);
        assert_eq!(err.status(), StatusCode::METHOD_NOT_ALLOWED);
    }

    #[tokio::test]
    async fn test_no_route() {
        let out = dispatcher()
            .dispatch(&RequestContext::new(Method::GET, "/nothing/here"))
            .await;
        let err = out.result.unwrap_err();
        assert_eq!(err.code(), codes::NO_ROUTE);
        assert_eq!(err.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_unregistered_callback() {
        let out = dispatcher()
            .dispatch(&RequestContext::new(Method::GET, "/ghost"))
            .await;
        assert_eq!(out.callback.as_deref(), Some("ghost.get"));
        let err = out.result.unwrap_err();
        assert_eq!(err.code(), codes::INVALID_HANDLER);
        assert_eq!(err.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[tokio::test]
    async fn test_missing_parameter_verbatim() {
        let routes = RouteTable::new().with(
            Route::new("/items")
                .unwrap()
                .entry(HandlerEntry::new("items.mark", MethodMask::CREATABLE)),
        );
        let handlers =
            HandlerRegistry::new().with("items.mark", echo(vec![ParamSpec::required("items")]));
        let out = Dispatcher::new(routes, handlers)
            .dispatch(&RequestContext::new(Method::POST, "/items"))
            .await;
        let err = out.result.unwrap_err();
        assert_eq!(err.code(), codes::MISSING_PARAMETER);
        assert!(err.message().contains("items"));
    }

    #[tokio::test]
    async fn test_json_body_merged_for_flagged_entry() {
        let ctx = RequestContext::new(Method::PATCH, "/items/3").with_body(r#"{"read": true}"#);
        let out = dispatcher().dispatch(&ctx).await;
        assert_eq!(out.callback.as_deref(), Some("items.edit"));
        assert_eq!(out.result.unwrap(), json!(["3", true]));
    }

    #[tokio::test]
    async fn test_malformed_json_body_binds_as_empty() {
        let ctx = RequestContext::new(Method::PATCH, "/items/3").with_body("{not json");
        let out = dispatcher().dispatch(&ctx).await;
        assert_eq!(out.result.unwrap(), json!(["3", null]));
    }

    #[test]
    fn test_merge_order() {
        let mut captures = Captures::new();
        captures.insert("id", "1");

        let mut query = ParamMap::new();
        query.insert("id".into(), "2".into());
        query.insert("title".into(), "from-query".into());

        let mut form = ParamMap::new();
        form.insert("title".into(), "from-form".into());
        form.insert("url".into(), "http://a".into());

        let ctx = RequestContext::new(Method::POST, "/feeds")
            .with_query(query)
            .with_body_params(form)
            .with_body(r#"{"url": "http://b", "icon": null}"#);

        let bag = merge_inputs(&captures, &ctx, MethodMask::POST, true);
        assert_eq!(bag["id"], "2");
        assert_eq!(bag["title"], "from-form");
        assert_eq!(bag["url"], "http://b");
        assert!(bag["icon"].is_null());

        let bag = merge_inputs(&captures, &ctx, MethodMask::PUT, false);
        assert_eq!(bag["title"], "from-query");
        assert!(!bag.contains_key("url"));
    }
}
