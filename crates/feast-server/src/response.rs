//! JSON and JSONP response serialization.
//!
//! Errors become a flat array of `{code, message}` objects and take their
//! status from the error. Successes are `200`. A JSONP callback wraps the
//! JSON as `callback(<json>)`.

use std::sync::OnceLock;

use bytes::Bytes;
use feast_core::{ApiError, ApiResult, RequestId};
use http::header::{HeaderValue, CONTENT_TYPE};
use http::{HeaderName, Response, StatusCode};
use http_body_util::Full;
use regex::Regex;
use serde_json::Value;

/// Response header carrying the request ID.
pub const REQUEST_ID_HEADER: &str = "x-request-id";

/// Returns `true` when `callback` matches `^[A-Za-z0-9_]+$`.
#[must_use]
pub fn is_valid_jsonp_callback(callback: &str) -> bool {
    static CALLBACK: OnceLock<Option<Regex>> = OnceLock::new();
    CALLBACK
        .get_or_init(|| Regex::new("^[A-Za-z0-9_]+$").ok())
        .as_ref()
        .is_some_and(|re| re.is_match(callback))
}

/// A serialized outcome, ready to become an HTTP response.
#[derive(Debug, Clone, PartialEq)]
pub struct JsonResponse {
    status: StatusCode,
    body: Bytes,
    error_code: Option<String>,
}

impl JsonResponse {
    /// The status code.
    #[must_use]
    pub fn status(&self) -> StatusCode {
        self.status
    }

    /// The body. Empty for HEAD.
    #[must_use]
    pub fn body(&self) -> &Bytes {
        &self.body
    }

    /// Primary error code, when the outcome was an error.
    #[must_use]
    pub fn error_code(&self) -> Option<&str> {
        self.error_code.as_deref()
    }

    /// Drops the body, keeping the status.
    #[must_use]
    pub fn without_body(mut self) -> Self {
        self.body = Bytes::new();
        self
    }

    /// Builds the HTTP response with `Content-Type` and `X-Request-Id`.
    #[must_use]
    pub fn into_http(self, content_type: &str, request_id: RequestId) -> Response<Full<Bytes>> {
        let mut response = Response::new(Full::new(self.body));
        *response.status_mut() = self.status;

        let headers = response.headers_mut();
        if let Ok(value) = HeaderValue::from_str(content_type) {
            headers.insert(CONTENT_TYPE, value);
        }
        if let Ok(value) = HeaderValue::from_str(&request_id.to_string()) {
            headers.insert(HeaderName::from_static(REQUEST_ID_HEADER), value);
        }
        response
    }
}

/// Serializes a handler outcome.
///
/// An invalid `jsonp` callback replaces the outcome with
/// `invalid_jsonp_callback`, which is then written unwrapped. `head`
/// suppresses the body but not the status.
#[must_use]
pub fn serialize(outcome: ApiResult<Value>, jsonp: Option<&str>, head: bool) -> JsonResponse {
    let (outcome, jsonp) = match jsonp {
        Some(cb) if !is_valid_jsonp_callback(cb) => {
            (Err(ApiError::invalid_jsonp_callback()), None)
        }
        other => (outcome, other),
    };

    let (status, value, error_code) = match outcome {
        Ok(value) => (StatusCode::OK, value, None),
        Err(err) => (err.status(), err.to_json(), Some(err.code().to_string())),
    };

    let body = if head {
        Bytes::new()
    } else {
        encode(&value, jsonp)
    };

    JsonResponse {
        status,
        body,
        error_code,
    }
}

/// Serializes an error with no JSONP wrapping.
#[must_use]
pub fn serialize_error(error: ApiError, head: bool) -> JsonResponse {
    serialize(Err(error), None, head)
}

fn encode(value: &Value, jsonp: Option<&str>) -> Bytes {
    // Value serialization only fails for non-string map keys, which Value
    // cannot hold.
    let json = serde_json::to_string(value).unwrap_or_else(|_| "null".to_string());
    match jsonp {
        Some(callback) => Bytes::from(format!("{callback}({json})")),
        None => Bytes::from(json),
    }
}
