//! Response wrapper with JSON API assertions.

use std::fmt;

use bytes::Bytes;
use feast_server::response::REQUEST_ID_HEADER;
use http::{header, HeaderMap, HeaderValue, StatusCode};
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::error::TestError;

/// A fully collected response.
#[derive(Clone)]
pub struct TestResponse {
    status: StatusCode,
    headers: HeaderMap,
    body: Bytes,
}

impl TestResponse {
    /// Collects an `http::Response`.
    pub async fn from_http<B>(response: http::Response<B>) -> Result<Self, TestError>
    where
        B: http_body_util::BodyExt,
        B::Error: fmt::Display,
    {
        let (parts, body) = response.into_parts();
        let body = body
            .collect()
            .await
            .map_err(|e| TestError::BodyRead(e.to_string()))?
            .to_bytes();

        Ok(Self::new(parts.status, parts.headers, body))
    }

    /// A response from raw parts.
    pub fn new(status: StatusCode, headers: HeaderMap, body: Bytes) -> Self {
        Self {
            status,
            headers,
            body,
        }
    }

    /// Status code.
    #[must_use]
    pub fn status(&self) -> StatusCode {
        self.status
    }

    /// Status code as a number.
    #[must_use]
    pub fn status_code(&self) -> u16 {
        self.status.as_u16()
    }

    /// All headers.
    #[must_use]
    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    /// One header.
    #[must_use]
    pub fn header(&self, name: impl AsRef<str>) -> Option<&HeaderValue> {
        self.headers.get(name.as_ref())
    }

    /// One header as text.
    #[must_use]
    pub fn header_str(&self, name: impl AsRef<str>) -> Option<&str> {
        self.header(name).and_then(|v| v.to_str().ok())
    }

    /// The Content-Type header.
    #[must_use]
    pub fn content_type(&self) -> Option<&str> {
        self.header_str(header::CONTENT_TYPE.as_str())
    }

    /// The X-Request-Id header.
    #[must_use]
    pub fn request_id(&self) -> Option<&str> {
        self.header_str(REQUEST_ID_HEADER)
    }

    /// Raw body.
    #[must_use]
    pub fn body(&self) -> &Bytes {
        &self.body
    }

    /// Body as UTF-8 text.
    pub fn text(&self) -> Result<String, TestError> {
        String::from_utf8(self.body.to_vec())
            .map_err(|e| TestError::BodyRead(format!("invalid UTF-8: {e}")))
    }

    /// Deserializes the JSON body.
    pub fn json<T: DeserializeOwned>(&self) -> Result<T, TestError> {
        Ok(serde_json::from_slice(&self.body)?)
    }

    /// The JSON body as a [`Value`].
    pub fn json_value(&self) -> Result<Value, TestError> {
        self.json()
    }

    /// The JSON payload of a JSONP body wrapped in `callback(...)`.
    pub fn jsonp_value(&self, callback: &str) -> Result<Value, TestError> {
        let text = self.text()?;
        let inner = text
            .strip_prefix(callback)
            .and_then(|rest| rest.strip_prefix('('))
            .and_then(|rest| rest.strip_suffix(')'))
            .ok_or_else(|| TestError::BodyRead(format!("not wrapped in {callback}(...): {text}")))?;
        Ok(serde_json::from_str(inner)?)
    }

    /// Error codes of a flat `[{code, message}]` error body, in order.
    ///
    /// Empty when the body is not an error array.
    #[must_use]
    pub fn error_codes(&self) -> Vec<String> {
        let Ok(Value::Array(items)) = self.json_value() else {
            return Vec::new();
        };
        items
            .iter()
            .filter_map(|item| item.get("code").and_then(Value::as_str))
            .map(str::to_string)
            .collect()
    }

    /// Asserts the status code.
    ///
    /// # Panics
    ///
    /// Panics on mismatch.
    pub fn assert_status(&self, expected: StatusCode) -> &Self {
        assert_eq!(
            self.status,
            expected,
            "expected status {expected}, got {} with body {}",
            self.status,
            String::from_utf8_lossy(&self.body)
        );
        self
    }

    /// Asserts a header value.
    ///
    /// # Panics
    ///
    /// Panics when the header is missing or differs.
    pub fn assert_header(&self, name: impl AsRef<str>, expected: impl AsRef<str>) -> &Self {
        let name = name.as_ref();
        let expected = expected.as_ref();
        let actual = self
            .header_str(name)
            .unwrap_or_else(|| panic!("header '{name}' not found"));
        assert_eq!(actual, expected, "header '{name}'");
        self
    }

    /// Asserts `application/json; charset=<charset>`.
    ///
    /// # Panics
    ///
    /// Panics on mismatch.
    pub fn assert_json_content_type(&self, charset: &str) -> &Self {
        self.assert_header(
            header::CONTENT_TYPE.as_str(),
            format!("application/json; charset={charset}"),
        )
    }

    /// Asserts the whole JSON body.
    ///
    /// # Panics
    ///
    /// Panics when the body is not JSON or differs.
    pub fn assert_json_eq(&self, expected: &Value) -> &Self {
        let actual = self
            .json_value()
            .unwrap_or_else(|e| panic!("body is not JSON ({e}): {:?}", self.text()));
        assert_eq!(&actual, expected, "JSON body mismatch");
        self
    }

    /// Asserts one JSON field by dotted path (`"0.author.name"`).
    ///
    /// # Panics
    ///
    /// Panics when the path is missing or the value differs.
    pub fn assert_json_field(&self, path: &str, expected: &Value) -> &Self {
        let json = self
            .json_value()
            .unwrap_or_else(|e| panic!("body is not JSON ({e}): {:?}", self.text()));
        let actual =
            json_path(&json, path).unwrap_or_else(|| panic!("JSON path '{path}' not in {json}"));
        assert_eq!(actual, expected, "JSON field '{path}'");
        self
    }

    /// Asserts an error response whose first code is `code`.
    ///
    /// # Panics
    ///
    /// Panics when the status or first code differs.
    pub fn assert_error(&self, status: StatusCode, code: &str) -> &Self {
        self.assert_status(status);
        let codes = self.error_codes();
        assert_eq!(
            codes.first().map(String::as_str),
            Some(code),
            "error codes {codes:?}"
        );
        self
    }

    /// Asserts an empty body, as for HEAD.
    ///
    /// # Panics
    ///
    /// Panics when the body has content.
    pub fn assert_empty_body(&self) -> &Self {
        assert!(
            self.body.is_empty(),
            "expected empty body, got {}",
            String::from_utf8_lossy(&self.body)
        );
        self
    }
}

impl fmt::Debug for TestResponse {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TestResponse")
            .field("status", &self.status)
            .field("headers", &self.headers)
            .field("body", &String::from_utf8_lossy(&self.body))
            .finish()
    }
}

fn json_path<'a>(value: &'a Value, path: &str) -> Option<&'a Value> {
    path.split('.')
        .filter(|segment| !segment.is_empty())
        .try_fold(value, |current, segment| match segment.parse::<usize>() {
            Ok(index) => current.get(index),
            Err(_) => current.get(segment),
        })
}
