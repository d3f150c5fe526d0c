//! Per-request input.
//!
//! The transport adapter builds one [`RequestContext`] per inbound request and
//! hands it to the dispatcher by reference. Nothing in the dispatch path reads
//! ambient server state; everything a handler can see is in here.

use std::time::{Duration, Instant};

use bytes::Bytes;
use http::{HeaderMap, HeaderName, HeaderValue, Method};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use uuid::Uuid;

use crate::Principal;

/// A unique identifier for each request, using UUID v7.
///
/// UUID v7 is time-ordered, which keeps log lines for one request easy to
/// correlate and sort.
///
/// # Example
///
/// ```
/// use feast_core::RequestId;
///
/// let id = RequestId::new();
/// assert_eq!(id.to_string().len(), 36);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RequestId(Uuid);

impl RequestId {
    /// Creates a new request ID.
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::now_v7())
    }

    /// Parses an ID supplied by the client, e.g. from `X-Request-Id`.
    #[must_use]
    pub fn parse(value: &str) -> Option<Self> {
        Uuid::parse_str(value).ok().map(Self)
    }

    /// Returns the underlying UUID.
    #[must_use]
    pub const fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for RequestId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for RequestId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<Uuid> for RequestId {
    fn from(uuid: Uuid) -> Self {
        Self(uuid)
    }
}

/// String parameters keyed by name, last value wins.
pub type ParamMap = IndexMap<String, String>;

/// Everything the dispatcher knows about one request.
///
/// `method` is the verb used for dispatch. It may differ from the transport
/// verb when the client asked for an override.
///
/// # Example
///
/// ```
/// use feast_core::RequestContext;
/// use http::Method;
///
/// let ctx = RequestContext::new(Method::PUT, "/feeds/3")
///     .with_query_param("id", "9")
///     .with_body(r#"{"title": "News"}"#);
///
/// assert_eq!(ctx.query_param("id"), Some("9"));
/// assert_eq!(ctx.json_body()["title"], "News");
/// ```
#[derive(Debug, Clone)]
pub struct RequestContext {
    request_id: RequestId,
    method: Method,
    path: String,
    query: ParamMap,
    body_params: Option<ParamMap>,
    raw_body: Bytes,
    headers: HeaderMap,
    principal: Option<Principal>,
    started_at: Instant,
}

impl RequestContext {
    /// Creates a context with no query, body or headers.
    #[must_use]
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            request_id: RequestId::new(),
            method,
            path: path.into(),
            query: ParamMap::new(),
            body_params: None,
            raw_body: Bytes::new(),
            headers: HeaderMap::new(),
            principal: None,
            started_at: Instant::now(),
        }
    }

    /// Replaces the request ID.
    #[must_use]
    pub fn with_request_id(mut self, request_id: RequestId) -> Self {
        self.request_id = request_id;
        self
    }

    /// Replaces the dispatch verb.
    #[must_use]
    pub fn with_method(mut self, method: Method) -> Self {
        self.method = method;
        self
    }

    /// Replaces the query parameters.
    #[must_use]
    pub fn with_query(mut self, query: ParamMap) -> Self {
        self.query = query;
        self
    }

    /// Sets one query parameter, replacing any earlier value.
    #[must_use]
    pub fn with_query_param(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.query.insert(name.into(), value.into());
        self
    }

    /// Sets the form-decoded body parameters.
    #[must_use]
    pub fn with_body_params(mut self, params: ParamMap) -> Self {
        self.body_params = Some(params);
        self
    }

    /// Sets the raw body.
    #[must_use]
    pub fn with_body(mut self, body: impl Into<Bytes>) -> Self {
        self.raw_body = body.into();
        self
    }

    /// Replaces the headers.
    #[must_use]
    pub fn with_headers(mut self, headers: HeaderMap) -> Self {
        self.headers = headers;
        self
    }

    /// Adds a header.
    #[must_use]
    pub fn with_header(mut self, name: HeaderName, value: HeaderValue) -> Self {
        self.headers.append(name, value);
        self
    }

    /// Request ID.
    #[must_use]
    pub const fn request_id(&self) -> RequestId {
        self.request_id
    }

    /// Dispatch verb.
    #[must_use]
    pub const fn method(&self) -> &Method {
        &self.method
    }

    /// True for HEAD, which dispatches as GET but has no response body.
    #[must_use]
    pub fn is_head(&self) -> bool {
        self.method == Method::HEAD
    }

    /// Path with any routing prefix already removed.
    #[must_use]
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Query parameters.
    #[must_use]
    pub const fn query(&self) -> &ParamMap {
        &self.query
    }

    /// One query parameter.
    #[must_use]
    pub fn query_param(&self, name: &str) -> Option<&str> {
        self.query.get(name).map(String::as_str)
    }

    /// Form body parameters, present only for POST requests that sent them.
    #[must_use]
    pub const fn body_params(&self) -> Option<&ParamMap> {
        self.body_params.as_ref()
    }

    /// Raw body bytes.
    #[must_use]
    pub const fn raw_body(&self) -> &Bytes {
        &self.raw_body
    }

    /// The body decoded as a JSON object.
    ///
    /// Anything that is not a JSON object (empty body, invalid JSON, an array,
    /// a scalar) decodes to an empty map.
    #[must_use]
    pub fn json_body(&self) -> Map<String, Value> {
        match serde_json::from_slice::<Value>(&self.raw_body) {
            Ok(Value::Object(map)) => map,
            Ok(_) => Map::new(),
            Err(e) => {
                if !self.raw_body.is_empty() {
                    tracing::debug!(error = %e, "ignoring undecodable JSON body");
                }
                Map::new()
            }
        }
    }

    /// Request headers.
    #[must_use]
    pub const fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    /// One header as a string, if present and valid UTF-8.
    #[must_use]
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }

    /// The authenticated caller, once the gate has run.
    #[must_use]
    pub const fn principal(&self) -> Option<&Principal> {
        self.principal.as_ref()
    }

    /// Records the authenticated caller.
    pub fn set_principal(&mut self, principal: Principal) {
        self.principal = Some(principal);
    }

    /// Builder form of [`RequestContext::set_principal`].
    #[must_use]
    pub fn with_principal(mut self, principal: Principal) -> Self {
        self.principal = Some(principal);
        self
    }

    /// Time since the context was created.
    #[must_use]
    pub fn elapsed(&self) -> Duration {
        self.started_at.elapsed()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_id_unique() {
        assert_ne!(RequestId::new(), RequestId::new());
    }

    #[test]
    fn test_request_id_parse() {
        let id = RequestId::new();
        assert_eq!(RequestId::parse(&id.to_string()), Some(id));
        assert_eq!(RequestId::parse("not-a-uuid"), None);
    }

    #[test]
    fn test_request_id_serializes_as_string() {
        let id = RequestId::new();
        let json = serde_json::to_value(id).unwrap();
        assert_eq!(json, Value::String(id.to_string()));
    }

    #[test]
    fn test_query_last_wins() {
        let ctx = RequestContext::new(Method::GET, "/items")
            .with_query_param("page", "1")
            .with_query_param("page", "2");
        assert_eq!(ctx.query_param("page"), Some("2"));
        assert_eq!(ctx.query().len(), 1);
    }

    #[test]
    fn test_json_body_permissive() {
        let ctx = RequestContext::new(Method::POST, "/feeds").with_body("{not json");
        assert!(ctx.json_body().is_empty());

        let ctx = RequestContext::new(Method::POST, "/feeds").with_body("[1, 2]");
        assert!(ctx.json_body().is_empty());

        let ctx = RequestContext::new(Method::POST, "/feeds");
        assert!(ctx.json_body().is_empty());

        let ctx = RequestContext::new(Method::POST, "/feeds").with_body(r#"{"read": true}"#);
        assert_eq!(ctx.json_body().get("read"), Some(&Value::Bool(true)));
    }

    #[test]
    fn test_head_and_principal() {
        let mut ctx = RequestContext::new(Method::HEAD, "/");
        assert!(ctx.is_head());
        assert!(ctx.principal().is_none());

        ctx.set_principal(Principal::new("1", "admin"));
        assert_eq!(ctx.principal().map(Principal::name), Some("admin"));
    }

    #[test]
    fn test_headers() {
        let ctx = RequestContext::new(Method::GET, "/").with_header(
            http::header::AUTHORIZATION,
            HeaderValue::from_static("Basic YTpi"),
        );
        assert_eq!(ctx.header("authorization"), Some("Basic YTpi"));
        assert_eq!(ctx.header("x-missing"), None);
    }
}
