//! Request-level orchestration.
//!
//! [`FeastService::serve_request`] applies, in order:
//!
//! 1. the API switch (`api_disabled`)
//! 2. the `_jsonp` callback (`jsonp_disabled`, `invalid_jsonp_callback`)
//! 3. the `_method` override
//! 4. the authentication gate
//! 5. dispatch and serialization
//!
//! Errors from steps 1 and 2 are never JSONP-wrapped.

use std::sync::Arc;
use std::time::Instant;

use bytes::Bytes;
use feast_core::{ApiError, AuthResult, RequestContext};
use feast_router::RouteTable;
use feast_telemetry::metrics::{InFlightGuard, UNROUTED};
use feast_telemetry::{record_auth_failure, record_request};
use http::{Method, Request, Response};
use http_body_util::Full;
use tracing::Instrument;

use crate::auth::AuthGate;
use crate::config::ServerConfig;
use crate::dispatcher::Dispatcher;
use crate::handler::HandlerRegistry;
use crate::request::{request_id, to_context};
use crate::response::{is_valid_jsonp_callback, serialize, serialize_error, JsonResponse};

/// Query parameter naming the JSONP callback.
pub const JSONP_PARAM: &str = "_jsonp";

/// Query parameter overriding the request method.
pub const METHOD_OVERRIDE_PARAM: &str = "_method";

struct Inner {
    config: ServerConfig,
    dispatcher: Dispatcher,
    auth: AuthGate,
}

/// The JSON API as a service over collected requests.
///
/// Cheap to clone. The hyper server and the test client both drive it
/// through [`FeastService::handle`].
#[derive(Clone)]
pub struct FeastService {
    inner: Arc<Inner>,
}

impl FeastService {
    /// Assembles a service.
    #[must_use]
    pub fn new(config: ServerConfig, dispatcher: Dispatcher, auth: AuthGate) -> Self {
        Self {
            inner: Arc::new(Inner {
                config,
                dispatcher,
                auth,
            }),
        }
    }

    /// Starts a builder.
    #[must_use]
    pub fn builder() -> FeastServiceBuilder {
        FeastServiceBuilder::default()
    }

    /// The active configuration.
    #[must_use]
    pub fn config(&self) -> &ServerConfig {
        &self.inner.config
    }

    /// The dispatcher.
    #[must_use]
    pub fn dispatcher(&self) -> &Dispatcher {
        &self.inner.dispatcher
    }

    /// Serves one collected HTTP request.
    pub async fn handle(&self, request: Request<Bytes>) -> Response<Full<Bytes>> {
        let transport_head = request.method() == Method::HEAD;
        let started = Instant::now();
        let config = &self.inner.config;

        let request_id = request_id(request.headers());

        match to_context(request, config.route_prefix()) {
            Ok(ctx) => {
                let request_id = ctx.request_id();
                self.serve_request(ctx)
                    .await
                    .into_http(&config.content_type(), request_id)
            }
            Err(err) => {
                let response = serialize_error(err, transport_head);
                record_request(UNROUTED, response.status().as_u16(), started.elapsed());
                response.into_http(&config.content_type(), request_id)
            }
        }
    }

    /// Serves one request context.
    pub async fn serve_request(&self, ctx: RequestContext) -> JsonResponse {
        let _in_flight = InFlightGuard::new();
        let started = Instant::now();
        let span = tracing::info_span!(
            "request",
            request_id = %ctx.request_id(),
            method = %ctx.method(),
            path = ctx.path(),
        );

        async move {
            let (response, callback) = self.serve_inner(ctx).await;
            let elapsed = started.elapsed();
            let status = response.status();
            let callback = callback.as_deref().unwrap_or(UNROUTED);

            record_request(callback, status.as_u16(), elapsed);

            let duration_ms = u64::try_from(elapsed.as_millis()).unwrap_or(u64::MAX);
            if status.is_server_error() {
                tracing::warn!(
                    status = status.as_u16(),
                    callback = callback,
                    error_code = response.error_code().unwrap_or_default(),
                    duration_ms = duration_ms,
                    "request failed"
                );
            } else {
                tracing::info!(
                    status = status.as_u16(),
                    callback = callback,
                    duration_ms = duration_ms,
                    "request served"
                );
            }
            response
        }
        .instrument(span)
        .await
    }

    async fn serve_inner(&self, mut ctx: RequestContext) -> (JsonResponse, Option<String>) {
        let config = &self.inner.config;
        let transport_head = ctx.is_head();

        if !config.api_enabled() {
            return (serialize_error(ApiError::api_disabled(), transport_head), None);
        }

        let jsonp = ctx.query_param(JSONP_PARAM).map(str::to_string);
        if jsonp.is_some() {
            if !config.jsonp_enabled() {
                return (serialize_error(ApiError::jsonp_disabled(), transport_head), None);
            }
            if !jsonp.as_deref().is_some_and(is_valid_jsonp_callback) {
                return (
                    serialize_error(ApiError::invalid_jsonp_callback(), transport_head),
                    None,
                );
            }
        }
        let jsonp = jsonp.as_deref();

        if let Some(raw) = ctx.query_param(METHOD_OVERRIDE_PARAM).map(str::to_string) {
            match Method::from_bytes(raw.to_ascii_uppercase().as_bytes()) {
                Ok(method) => {
                    tracing::debug!(from = %ctx.method(), to = %method, "method override");
                    ctx = ctx.with_method(method);
                }
                Err(_) => {
                    return (
                        serialize(Err(ApiError::unsupported_method()), jsonp, transport_head),
                        None,
                    );
                }
            }
        }
        let head = ctx.is_head();

        match self.inner.auth.authenticate(&ctx).await {
            AuthResult::Authenticated(principal) => {
                tracing::debug!(user_id = %principal.log_id(), "authenticated");
                ctx.set_principal(principal);
            }
            AuthResult::Failed(err) => {
                record_auth_failure();
                return (serialize(Err(err), jsonp, head), None);
            }
            AuthResult::Anonymous => {}
        }

        let dispatched = self.inner.dispatcher.dispatch(&ctx).await;
        if let Err(err) = &dispatched.result {
            if err.status().is_server_error() {
                tracing::error!(
                    error_code = err.code(),
                    detail = err.message(),
                    "handler error"
                );
            }
        }

        (serialize(dispatched.result, jsonp, head), dispatched.callback)
    }
}

impl std::fmt::Debug for FeastService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FeastService")
            .field("config", &self.inner.config)
            .field("dispatcher", &self.inner.dispatcher)
            .field("auth", &self.inner.auth)
            .finish()
    }
}

/// Builder for [`FeastService`].
#[derive(Debug, Default)]
pub struct FeastServiceBuilder {
    config: ServerConfig,
    dispatcher: Dispatcher,
    auth: AuthGate,
}

impl FeastServiceBuilder {
    /// Sets the configuration.
    #[must_use]
    pub fn config(mut self, config: ServerConfig) -> Self {
        self.config = config;
        self
    }

    /// Sets the dispatcher.
    #[must_use]
    pub fn dispatcher(mut self, dispatcher: Dispatcher) -> Self {
        self.dispatcher = dispatcher;
        self
    }

    /// Builds the dispatcher from a table and a registry.
    #[must_use]
    pub fn routes(mut self, routes: RouteTable, handlers: HandlerRegistry) -> Self {
        self.dispatcher = Dispatcher::new(routes, handlers);
        self
    }

    /// Sets the authentication gate.
    #[must_use]
    pub fn auth(mut self, auth: AuthGate) -> Self {
        self.auth = auth;
        self
    }

    /// Builds the service.
    #[must_use]
    pub fn build(self) -> FeastService {
        FeastService::new(self.config, self.dispatcher, self.auth)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use feast_core::{codes, FnHandler, ParamSpec, Principal};
    use feast_router::{HandlerEntry, MethodMask, Route};
    use http::StatusCode;
    use serde_json::{json, Value};

    fn service(config: ServerConfig) -> FeastService {
        let routes = RouteTable::new().with(
            Route::new("/items/{id}")
                .unwrap()
                .entry(HandlerEntry::new("items.get", MethodMask::READABLE))
                .entry(HandlerEntry::new("items.delete", MethodMask::DELETABLE)),
        );
        let handlers = HandlerRegistry::new()
            .with(
                "items.get",
                FnHandler::new(vec![ParamSpec::required("id")], |ctx, args| {
                    let who = ctx.principal().map(|p| p.id().to_string());
                    async move {
                        let [id] = args.into_array()?;
                        Ok(json!({ "id": id, "who": who }))
                    }
                }),
            )
            .with(
                "items.delete",
                FnHandler::new(vec![ParamSpec::required("id")], |_ctx, args| async move {
                    let [id] = args.into_array()?;
                    Ok(json!({ "deleted": id }))
                }),
            );
        FeastService::builder()
            .config(config)
            .routes(routes, handlers)
            .auth(AuthGate::new().with_resolver(|ctx: &RequestContext| {
                ctx.header("x-user").map(|u| Principal::new(u, u))
            }))
            .build()
    }

    fn body(r: &JsonResponse) -> Value {
        serde_json::from_slice(r.body()).unwrap()
    }

    #[tokio::test]
    async fn test_serve_success() {
        let svc = service(ServerConfig::default());
        let r = svc.serve_request(RequestContext::new(Method::GET, "/items/3")).await;
        assert_eq!(r.status(), StatusCode::OK);
        assert_eq!(body(&r), json!({ "id": "3", "who": null }));
    }

    #[tokio::test]
    async fn test_api_disabled() {
        let svc = service(ServerConfig::builder().api_enabled(false).build());
        let ctx = RequestContext::new(Method::GET, "/items/3").with_query_param("_jsonp", "cb");
        let r = svc.serve_request(ctx).await;
        assert_eq!(r.status(), StatusCode::METHOD_NOT_ALLOWED);
        assert_eq!(r.error_code(), Some(codes::API_DISABLED));
        // never wrapped
        assert!(r.body().starts_with(b"["));
    }

    #[tokio::test]
    async fn test_jsonp_disabled() {
        let svc = service(ServerConfig::builder().jsonp_enabled(false).build());
        let ctx = RequestContext::new(Method::GET, "/items/3").with_query_param("_jsonp", "cb");
        let r = svc.serve_request(ctx).await;
        assert_eq!(r.error_code(), Some(codes::JSONP_DISABLED));
        assert_eq!(r.status(), StatusCode::METHOD_NOT_ALLOWED);
    }

    #[tokio::test]
    async fn test_jsonp_wraps_success() {
        let svc = service(ServerConfig::default());
        let ctx = RequestContext::new(Method::GET, "/items/3").with_query_param("_jsonp", "abc123");
        let r = svc.serve_request(ctx).await;
        assert!(r.body().starts_with(b"abc123({"));
        assert!(r.body().ends_with(b"})"));
    }

    #[tokio::test]
    async fn test_invalid_jsonp_skips_dispatch() {
        let svc = service(ServerConfig::default());
        let ctx = RequestContext::new(Method::GET, "/nowhere").with_query_param("_jsonp", "abc-123");
        let r = svc.serve_request(ctx).await;
        assert_eq!(r.status(), StatusCode::BAD_REQUEST);
        assert_eq!(r.error_code(), Some(codes::INVALID_JSONP_CALLBACK));
    }

    #[tokio::test]
    async fn test_method_override() {
        let svc = service(ServerConfig::default());
        let ctx = RequestContext::new(Method::POST, "/items/8").with_query_param("_method", "delete");
        let r = svc.serve_request(ctx).await;
        assert_eq!(body(&r), json!({ "deleted": "8" }));

        let ctx = RequestContext::new(Method::POST, "/items/8").with_query_param("_method", "bad verb");
        let r = svc.serve_request(ctx).await;
        assert_eq!(r.error_code(), Some(codes::UNSUPPORTED_METHOD));
    }

    #[tokio::test]
    async fn test_method_override_to_head_suppresses_body() {
        let svc = service(ServerConfig::default());
        let ctx = RequestContext::new(Method::GET, "/items/8").with_query_param("_method", "HEAD");
        let r = svc.serve_request(ctx).await;
        assert_eq!(r.status(), StatusCode::OK);
        assert!(r.body().is_empty());
    }

    #[tokio::test]
    async fn test_resolver_principal_reaches_handler() {
        let svc = service(ServerConfig::default());
        let ctx = RequestContext::new(Method::GET, "/items/1")
            .with_header("x-user".parse().unwrap(), "alice".parse().unwrap());
        let r = svc.serve_request(ctx).await;
        assert_eq!(body(&r)["who"], "alice");
    }

    #[tokio::test]
    async fn test_handle_outside_prefix() {
        let svc = service(ServerConfig::default());
        let response = svc
            .handle(Request::get("/elsewhere").body(Bytes::new()).unwrap())
            .await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert!(response.headers().contains_key("x-request-id"));
    }

    #[tokio::test]
    async fn test_outside_prefix_keeps_client_request_id() {
        let svc = service(ServerConfig::default());
        let id = feast_core::RequestId::new();
        let response = svc
            .handle(
                Request::get("/elsewhere")
                    .header("x-request-id", id.to_string())
                    .body(Bytes::new())
                    .unwrap(),
            )
            .await;
        assert_eq!(response.headers()["x-request-id"], id.to_string().as_str());
    }
}
