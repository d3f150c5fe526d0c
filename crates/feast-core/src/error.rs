//! The API error value.
//!
//! [`ApiError`] is what every failure becomes before it reaches the wire.
//! Handlers return it like any other value; nothing here relies on panics
//! or unwinding.
//!
//! An error carries one or more code groups, each with one or more messages.
//! The first group is the primary code. On the wire the groups are flattened
//! into a JSON array of `{code, message}` objects, group order first and
//! message order within a group second:
//!
//! ```json
//! [
//!   {"code": "missing_parameter", "message": "Missing parameter title"},
//!   {"code": "missing_parameter", "message": "Missing parameter url"}
//! ]
//! ```

use std::fmt;

use http::StatusCode;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Result type alias using [`ApiError`].
pub type ApiResult<T> = Result<T, ApiError>;

/// Stable machine-readable error codes produced by the router and its endpoints.
pub mod codes {
    /// The request verb is not one the router understands.
    pub const UNSUPPORTED_METHOD: &str = "unsupported_method";
    /// The selected entry names a callback that cannot be invoked.
    pub const INVALID_HANDLER: &str = "invalid_handler";
    /// The path matched but no entry accepts the verb.
    pub const INVALID_HTTP_METHOD: &str = "invalid_http_method";
    /// No pattern matched the path.
    pub const NO_ROUTE: &str = "no_route";
    /// A required handler parameter was not supplied.
    pub const MISSING_PARAMETER: &str = "missing_parameter";
    /// The endpoint needs an authenticated caller.
    pub const UNAUTHENTICATED: &str = "unauthenticated";
    /// The JSONP callback name is not `[A-Za-z0-9_]+`.
    pub const INVALID_JSONP_CALLBACK: &str = "invalid_jsonp_callback";
    /// The API is switched off.
    pub const API_DISABLED: &str = "api_disabled";
    /// JSONP is switched off.
    pub const JSONP_DISABLED: &str = "jsonp_disabled";
    /// A parameter could not be coerced to the type the handler needs.
    pub const INVALID_PARAMETER: &str = "invalid_parameter";
    /// The addressed record does not exist.
    pub const NOT_FOUND: &str = "not_found";
    /// The supplied username/password pair was rejected.
    pub const INVALID_CREDENTIALS: &str = "invalid_credentials";
    /// The transport gave up waiting for the handler.
    pub const REQUEST_TIMEOUT: &str = "request_timeout";
    /// The request body could not be read.
    pub const INVALID_BODY: &str = "invalid_body";
    /// The request body exceeds the configured size limit.
    pub const PAYLOAD_TOO_LARGE: &str = "payload_too_large";
    /// Anything else that went wrong on the server side.
    pub const INTERNAL_ERROR: &str = "internal_error";
}

/// One flattened `{code, message}` pair.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorItem {
    /// Machine-readable code.
    pub code: String,
    /// Human-readable message.
    pub message: String,
}

/// A structured, serializable failure.
///
/// # Example
///
/// ```
/// use feast_core::ApiError;
/// use http::StatusCode;
///
/// let err = ApiError::missing_parameter("title").with_message("missing_parameter", "Missing parameter url");
/// assert_eq!(err.code(), "missing_parameter");
/// assert_eq!(err.status(), StatusCode::BAD_REQUEST);
/// assert_eq!(err.flatten().len(), 2);
///
/// // no explicit status means 500
/// assert_eq!(ApiError::new("boom", "Something broke").status(), StatusCode::INTERNAL_SERVER_ERROR);
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct ApiError {
    groups: IndexMap<String, Vec<String>>,
    status: Option<StatusCode>,
    data: Option<Value>,
}

impl ApiError {
    /// Creates an error with a single code and message and no status.
    #[must_use]
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        let mut groups = IndexMap::with_capacity(1);
        groups.insert(code.into(), vec![message.into()]);
        Self {
            groups,
            status: None,
            data: None,
        }
    }

    /// Creates an error with a code, message and status.
    #[must_use]
    pub fn with_code_status(
        code: impl Into<String>,
        message: impl Into<String>,
        status: StatusCode,
    ) -> Self {
        Self::new(code, message).with_status(status)
    }

    /// Sets the HTTP status.
    #[must_use]
    pub fn with_status(mut self, status: StatusCode) -> Self {
        self.status = Some(status);
        self
    }

    /// Attaches structured data.
    #[must_use]
    pub fn with_data(mut self, data: Value) -> Self {
        self.data = Some(data);
        self
    }

    /// Appends a message, creating the code group when it is new.
    #[must_use]
    pub fn with_message(mut self, code: impl Into<String>, message: impl Into<String>) -> Self {
        self.add(code, message);
        self
    }

    /// Appends a message in place.
    pub fn add(&mut self, code: impl Into<String>, message: impl Into<String>) {
        self.groups
            .entry(code.into())
            .or_default()
            .push(message.into());
    }

    /// The primary code.
    #[must_use]
    pub fn code(&self) -> &str {
        self.groups.keys().next().map_or("", String::as_str)
    }

    /// The first message of the primary code.
    #[must_use]
    pub fn message(&self) -> &str {
        self.groups
            .values()
            .next()
            .and_then(|m| m.first())
            .map_or("", String::as_str)
    }

    /// Messages recorded under `code`.
    #[must_use]
    pub fn messages(&self, code: &str) -> &[String] {
        self.groups.get(code).map_or(&[][..], Vec::as_slice)
    }

    /// All codes, in insertion order.
    pub fn codes(&self) -> impl Iterator<Item = &str> {
        self.groups.keys().map(String::as_str)
    }

    /// The HTTP status, 500 when none was set.
    #[must_use]
    pub fn status(&self) -> StatusCode {
        self.status.unwrap_or(StatusCode::INTERNAL_SERVER_ERROR)
    }

    /// The explicitly set status, if any.
    #[must_use]
    pub const fn explicit_status(&self) -> Option<StatusCode> {
        self.status
    }

    /// Attached structured data.
    #[must_use]
    pub const fn data(&self) -> Option<&Value> {
        self.data.as_ref()
    }

    /// Flattens every group into `{code, message}` pairs.
    #[must_use]
    pub fn flatten(&self) -> Vec<ErrorItem> {
        self.groups
            .iter()
            .flat_map(|(code, messages)| {
                messages.iter().map(move |message| ErrorItem {
                    code: code.clone(),
                    message: message.clone(),
                })
            })
            .collect()
    }

    /// The flattened array as a JSON value.
    #[must_use]
    pub fn to_json(&self) -> Value {
        Value::Array(
            self.flatten()
                .into_iter()
                .map(|item| serde_json::json!({ "code": item.code, "message": item.message }))
                .collect(),
        )
    }

    // -- router --

    /// The request verb cannot be normalised.
    #[must_use]
    pub fn unsupported_method() -> Self {
        Self::with_code_status(
            codes::UNSUPPORTED_METHOD,
            "Unsupported request method",
            StatusCode::BAD_REQUEST,
        )
    }

    /// The selected callback is not registered.
    #[must_use]
    pub fn invalid_handler(callback: &str) -> Self {
        Self::with_code_status(
            codes::INVALID_HANDLER,
            "The handler for the route is invalid",
            StatusCode::INTERNAL_SERVER_ERROR,
        )
        .with_data(serde_json::json!({ "callback": callback }))
    }

    /// The path matched but not the verb.
    #[must_use]
    pub fn invalid_http_method() -> Self {
        Self::with_code_status(
            codes::INVALID_HTTP_METHOD,
            "The specified route does not match the HTTP method used",
            StatusCode::METHOD_NOT_ALLOWED,
        )
    }

    /// Nothing matched the path.
    #[must_use]
    pub fn no_route() -> Self {
        Self::with_code_status(
            codes::NO_ROUTE,
            "No route was found matching the URL and request method",
            StatusCode::NOT_FOUND,
        )
    }

    /// A required parameter is absent.
    #[must_use]
    pub fn missing_parameter(name: &str) -> Self {
        Self::with_code_status(
            codes::MISSING_PARAMETER,
            format!("Missing parameter {name}"),
            StatusCode::BAD_REQUEST,
        )
    }

    /// The caller must authenticate.
    #[must_use]
    pub fn unauthenticated() -> Self {
        Self::with_code_status(
            codes::UNAUTHENTICATED,
            "You must be logged in to do this",
            StatusCode::UNAUTHORIZED,
        )
    }

    /// The JSONP callback name is unsafe.
    #[must_use]
    pub fn invalid_jsonp_callback() -> Self {
        Self::with_code_status(
            codes::INVALID_JSONP_CALLBACK,
            "The JSONP callback function is invalid",
            StatusCode::BAD_REQUEST,
        )
    }

    // -- request switches --

    /// The API is disabled.
    #[must_use]
    pub fn api_disabled() -> Self {
        Self::with_code_status(
            codes::API_DISABLED,
            "The API is disabled on this site",
            StatusCode::METHOD_NOT_ALLOWED,
        )
    }

    /// JSONP was requested but is disabled.
    #[must_use]
    pub fn jsonp_disabled() -> Self {
        Self::with_code_status(
            codes::JSONP_DISABLED,
            "JSONP support is disabled on this site",
            StatusCode::METHOD_NOT_ALLOWED,
        )
    }

    // -- endpoints --

    /// A parameter has the wrong shape.
    #[must_use]
    pub fn invalid_parameter(name: &str, expected: &str) -> Self {
        Self::with_code_status(
            codes::INVALID_PARAMETER,
            format!("Parameter {name} must be {expected}"),
            StatusCode::BAD_REQUEST,
        )
    }

    /// A record is missing.
    #[must_use]
    pub fn not_found(what: &str) -> Self {
        Self::with_code_status(
            codes::NOT_FOUND,
            format!("{what} not found"),
            StatusCode::NOT_FOUND,
        )
    }

    /// Username/password rejected.
    #[must_use]
    pub fn invalid_credentials() -> Self {
        Self::with_code_status(
            codes::INVALID_CREDENTIALS,
            "Invalid username or password",
            StatusCode::UNAUTHORIZED,
        )
    }

    /// The transport timed out.
    #[must_use]
    pub fn request_timeout() -> Self {
        Self::with_code_status(
            codes::REQUEST_TIMEOUT,
            "The request took too long to process",
            StatusCode::GATEWAY_TIMEOUT,
        )
    }

    /// The request body could not be read.
    #[must_use]
    pub fn invalid_body() -> Self {
        Self::with_code_status(
            codes::INVALID_BODY,
            "Could not read the request body",
            StatusCode::BAD_REQUEST,
        )
    }

    /// The request body is larger than `limit` bytes.
    #[must_use]
    pub fn payload_too_large(limit: usize) -> Self {
        Self::with_code_status(
            codes::PAYLOAD_TOO_LARGE,
            format!("Request body exceeds {limit} bytes"),
            StatusCode::PAYLOAD_TOO_LARGE,
        )
    }

    /// A server-side failure. The message is shown to the client.
    #[must_use]
    pub fn internal(message: impl Into<String>) -> Self {
        Self::with_code_status(
            codes::INTERNAL_ERROR,
            message,
            StatusCode::INTERNAL_SERVER_ERROR,
        )
    }
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.code(), self.message())
    }
}

impl std::error::Error for ApiError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_router_error_statuses() {
        assert_eq!(ApiError::unsupported_method().status(), StatusCode::BAD_REQUEST);
        assert_eq!(ApiError::invalid_handler("x").status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(ApiError::invalid_http_method().status(), StatusCode::METHOD_NOT_ALLOWED);
        assert_eq!(ApiError::no_route().status(), StatusCode::NOT_FOUND);
        assert_eq!(ApiError::missing_parameter("id").status(), StatusCode::BAD_REQUEST);
        assert_eq!(ApiError::unauthenticated().status(), StatusCode::UNAUTHORIZED);
        assert_eq!(ApiError::invalid_jsonp_callback().status(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn test_transport_error_statuses() {
        assert_eq!(ApiError::invalid_body().status(), StatusCode::BAD_REQUEST);
        let err = ApiError::payload_too_large(1024);
        assert_eq!(err.status(), StatusCode::PAYLOAD_TOO_LARGE);
        assert_eq!(err.message(), "Request body exceeds 1024 bytes");
    }

    #[test]
    fn test_status_defaults_to_500() {
        let err = ApiError::new("custom", "Custom failure");
        assert_eq!(err.explicit_status(), None);
        assert_eq!(err.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn test_missing_parameter_names_param() {
        let err = ApiError::missing_parameter("feed");
        assert_eq!(err.code(), codes::MISSING_PARAMETER);
        assert!(err.message().contains("feed"));
    }

    #[test]
    fn test_flatten_order() {
        let err = ApiError::new("a", "a1")
            .with_message("b", "b1")
            .with_message("a", "a2")
            .with_message("b", "b2");

        let flat: Vec<_> = err
            .flatten()
            .into_iter()
            .map(|i| format!("{}:{}", i.code, i.message))
            .collect();
        assert_eq!(flat, vec!["a:a1", "a:a2", "b:b1", "b:b2"]);
        assert_eq!(err.codes().collect::<Vec<_>>(), vec!["a", "b"]);
        assert_eq!(err.messages("b"), ["b1", "b2"]);
        assert!(err.messages("c").is_empty());
    }

    #[test]
    fn test_to_json() {
        let json = ApiError::no_route().to_json();
        assert_eq!(
            json,
            serde_json::json!([{
                "code": "no_route",
                "message": "No route was found matching the URL and request method"
            }])
        );
    }

    #[test]
    fn test_data_and_display() {
        let err = ApiError::invalid_handler("feeds.list");
        assert_eq!(err.data(), Some(&serde_json::json!({ "callback": "feeds.list" })));
        assert_eq!(
            err.to_string(),
            "invalid_handler: The handler for the route is invalid"
        );
    }
}
