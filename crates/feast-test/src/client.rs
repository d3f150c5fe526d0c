//! In-memory client over a [`FeastService`].

use feast_server::FeastService;
use http::Method;
use serde::Serialize;

use crate::error::TestError;
use crate::request::{TestRequest, TestRequestBuilder};
use crate::response::TestResponse;

/// Drives requests through [`FeastService::handle`] without a socket.
///
/// Paths are relative to the service's route prefix: `client.get("/feeds")`
/// requests `/feast/api/feeds` under the default configuration.
///
/// # Example
///
/// ```rust
/// use feast_core::{FnHandler, ParamSpec};
/// use feast_router::{HandlerEntry, MethodMask, Route, RouteTable};
/// use feast_server::{FeastService, HandlerRegistry};
/// use feast_test::TestClient;
/// use http::StatusCode;
/// use serde_json::json;
///
/// # tokio_test::block_on(async {
/// let service = FeastService::builder()
///     .routes(
///         RouteTable::new().with(
///             Route::new("/ping")
///                 .unwrap()
///                 .entry(HandlerEntry::new("ping", MethodMask::READABLE)),
///         ),
///         HandlerRegistry::new().with(
///             "ping",
///             FnHandler::new(Vec::<ParamSpec>::new(), |_ctx, _args| async { Ok(json!("pong")) }),
///         ),
///     )
///     .build();
///
/// let client = TestClient::new(service);
/// client
///     .get("/ping")
///     .send()
///     .await
///     .assert_status(StatusCode::OK)
///     .assert_json_eq(&json!("pong"));
/// # });
/// ```
#[must_use]
#[derive(Clone)]
pub struct TestClient {
    service: FeastService,
    prefix: String,
    default_headers: Vec<(String, String)>,
}

impl TestClient {
    /// A client for `service`, using its configured route prefix.
    pub fn new(service: FeastService) -> Self {
        let prefix = service.config().route_prefix().to_string();
        Self {
            service,
            prefix,
            default_headers: Vec::new(),
        }
    }

    /// Sends paths as given, without the route prefix.
    pub fn without_prefix(mut self) -> Self {
        self.prefix.clear();
        self
    }

    /// Adds a header to every request.
    pub fn with_default_header(
        mut self,
        name: impl Into<String>,
        value: impl Into<String>,
    ) -> Self {
        self.default_headers.push((name.into(), value.into()));
        self
    }

    /// Sends Basic credentials with every request.
    pub fn with_basic_auth(self, username: &str, password: &str) -> Self {
        self.with_default_header(
            http::header::AUTHORIZATION.as_str(),
            feast_server::BasicCredentials::header_value(username, password),
        )
    }

    /// The wrapped service.
    pub fn service(&self) -> &FeastService {
        &self.service
    }

    /// Starts a GET request.
    pub fn get(&self, path: impl AsRef<str>) -> TestClientRequest<'_> {
        self.request(Method::GET, path)
    }

    /// Starts a POST request.
    pub fn post(&self, path: impl AsRef<str>) -> TestClientRequest<'_> {
        self.request(Method::POST, path)
    }

    /// Starts a PUT request.
    pub fn put(&self, path: impl AsRef<str>) -> TestClientRequest<'_> {
        self.request(Method::PUT, path)
    }

    /// Starts a PATCH request.
    pub fn patch(&self, path: impl AsRef<str>) -> TestClientRequest<'_> {
        self.request(Method::PATCH, path)
    }

    /// Starts a DELETE request.
    pub fn delete(&self, path: impl AsRef<str>) -> TestClientRequest<'_> {
        self.request(Method::DELETE, path)
    }

    /// Starts a HEAD request.
    pub fn head(&self, path: impl AsRef<str>) -> TestClientRequest<'_> {
        self.request(Method::HEAD, path)
    }

    /// Starts a request with any method.
    pub fn request(&self, method: Method, path: impl AsRef<str>) -> TestClientRequest<'_> {
        let mut builder = TestRequestBuilder::new(method, path).prefixed(&self.prefix);
        for (name, value) in &self.default_headers {
            builder = builder.header(name, value);
        }
        TestClientRequest {
            client: self,
            builder,
        }
    }

    /// Sends an already built request.
    pub async fn send(&self, request: TestRequest) -> Result<TestResponse, TestError> {
        let response = self.service.handle(request.into_http_request()).await;
        TestResponse::from_http(response).await
    }
}

/// A request builder bound to a [`TestClient`].
#[must_use]
pub struct TestClientRequest<'a> {
    client: &'a TestClient,
    builder: TestRequestBuilder,
}

impl TestClientRequest<'_> {
    fn map(mut self, f: impl FnOnce(TestRequestBuilder) -> TestRequestBuilder) -> Self {
        self.builder = f(self.builder);
        self
    }

    /// Sets a header.
    pub fn header(self, name: impl AsRef<str>, value: impl AsRef<str>) -> Self {
        self.map(|b| b.header(name, value))
    }

    /// Sets the Content-Type header.
    pub fn content_type(self, content_type: impl AsRef<str>) -> Self {
        self.map(|b| b.content_type(content_type))
    }

    /// Sends Basic credentials.
    pub fn basic_auth(self, username: &str, password: &str) -> Self {
        self.map(|b| b.basic_auth(username, password))
    }

    /// Appends a query parameter.
    pub fn query(self, name: impl Into<String>, value: impl ToString) -> Self {
        self.map(|b| b.query(name, value))
    }

    /// Asks for a JSONP response.
    pub fn jsonp(self, callback: &str) -> Self {
        self.map(|b| b.jsonp(callback))
    }

    /// Overrides the dispatch method.
    pub fn method_override(self, method: &str) -> Self {
        self.map(|b| b.method_override(method))
    }

    /// Sets the raw body.
    pub fn body(self, body: impl Into<bytes::Bytes>) -> Self {
        self.map(|b| b.body(body))
    }

    /// Sets a JSON body.
    pub fn json<T: Serialize + ?Sized>(self, value: &T) -> Self {
        self.map(|b| b.json(value))
    }

    /// Sets a form body.
    pub fn form<T: Serialize + ?Sized>(self, value: &T) -> Self {
        self.map(|b| b.form(value))
    }

    /// Sends the request.
    ///
    /// # Panics
    ///
    /// Panics when the request cannot be built or the body cannot be read.
    pub async fn send(self) -> TestResponse {
        match self.try_send().await {
            Ok(response) => response,
            Err(e) => panic!("test request failed: {e}"),
        }
    }

    /// Sends the request, returning build and read failures.
    pub async fn try_send(self) -> Result<TestResponse, TestError> {
        let request = self.builder.build()?;
        self.client.send(request).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use feast_core::{ApiError, FnHandler, ParamSpec};
    use feast_router::{HandlerEntry, MethodMask, Route, RouteTable};
    use feast_server::{AuthGate, HandlerRegistry, ServerConfig, StaticCredentials};
    use http::StatusCode;
    use serde_json::json;

    fn client(config: ServerConfig) -> TestClient {
        let routes = RouteTable::new()
            .with(
                Route::new("/echo/{id}")
                    .unwrap()
                    .entry(HandlerEntry::new("echo", MethodMask::ALL).accept_json()),
            )
            .with(
                Route::new("/me")
                    .unwrap()
                    .entry(HandlerEntry::new("me", MethodMask::READABLE)),
            );
        let handlers = HandlerRegistry::new()
            .with(
                "echo",
                FnHandler::new(
                    vec![ParamSpec::required("id"), ParamSpec::optional("note", "none")],
                    |ctx, args| {
                        let method = ctx.method().to_string();
                        async move {
                            let [id, note] = args.into_array()?;
                            Ok(json!({ "method": method, "id": id, "note": note }))
                        }
                    },
                ),
            )
            .with(
                "me",
                FnHandler::new(Vec::new(), |ctx, _args| {
                    let me = ctx.principal().map(|p| p.id().to_string());
                    async move { me.ok_or_else(ApiError::unauthenticated) }
                }),
            );
        let service = FeastService::builder()
            .config(config)
            .routes(routes, handlers)
            .auth(AuthGate::new().with_verifier(StaticCredentials::new().with_user(
                "ann",
                "pw",
                ["reader"],
            )))
            .build();
        TestClient::new(service)
    }

    #[tokio::test]
    async fn test_prefix_is_applied() {
        let client = client(ServerConfig::default());
        client
            .get("/echo/7")
            .send()
            .await
            .assert_status(StatusCode::OK)
            .assert_json_content_type("UTF-8")
            .assert_json_eq(&json!({ "method": "GET", "id": "7", "note": "none" }));
    }

    #[tokio::test]
    async fn test_without_prefix_misses() {
        let client = client(ServerConfig::default()).without_prefix();
        client
            .get("/echo/7")
            .send()
            .await
            .assert_error(StatusCode::NOT_FOUND, "no_route");
    }

    #[tokio::test]
    async fn test_custom_prefix() {
        let client = client(ServerConfig::builder().route_prefix("/api/").build());
        client.get("/echo/1").send().await.assert_status(StatusCode::OK);
    }

    #[tokio::test]
    async fn test_json_and_form_bodies() {
        let client = client(ServerConfig::default());
        client
            .put("/echo/2")
            .json(&json!({ "note": "json" }))
            .send()
            .await
            .assert_json_field("note", &json!("json"));
        client
            .post("/echo/2")
            .form(&[("note", "form")])
            .send()
            .await
            .assert_json_field("note", &json!("form"));
    }

    #[tokio::test]
    async fn test_default_basic_auth() {
        let anonymous = client(ServerConfig::default());
        anonymous
            .get("/me")
            .send()
            .await
            .assert_error(StatusCode::UNAUTHORIZED, "unauthenticated");

        let ann = anonymous.clone().with_basic_auth("ann", "pw");
        ann.get("/me").send().await.assert_json_eq(&json!("ann"));
    }

    #[tokio::test]
    async fn test_jsonp_and_override() {
        let client = client(ServerConfig::default());
        let response = client
            .post("/echo/3")
            .method_override("patch")
            .jsonp("cb")
            .send()
            .await;
        assert_eq!(response.jsonp_value("cb").unwrap()["method"], "PATCH");
    }

    #[tokio::test]
    async fn test_head_and_request_id() {
        let client = client(ServerConfig::default());
        let response = client.head("/echo/4").send().await;
        response.assert_status(StatusCode::OK).assert_empty_body();
        assert!(response.request_id().is_some());
    }

    #[tokio::test]
    async fn test_try_send_reports_build_errors() {
        let client = client(ServerConfig::default());
        let err = client
            .get("/echo/1")
            .header("bad header", "x")
            .try_send()
            .await
            .unwrap_err();
        assert!(matches!(err, TestError::InvalidHeader(_)));
    }
}
