//! Transport adapter: `http::Request<Bytes>` to [`RequestContext`].

use bytes::Bytes;
use feast_core::{ApiError, ParamMap, RequestContext, RequestId};
use http::header::CONTENT_TYPE;
use http::{HeaderMap, Method, Request};

use crate::response::REQUEST_ID_HEADER;

const FORM_CONTENT_TYPE: &str = "application/x-www-form-urlencoded";

/// Strips `prefix` from `path`.
///
/// Returns `None` when the path lies outside the prefix. The bare prefix
/// maps to `/`.
#[must_use]
pub fn strip_route_prefix<'a>(path: &'a str, prefix: &str) -> Option<&'a str> {
    if prefix.is_empty() {
        return Some(if path.is_empty() { "/" } else { path });
    }
    let rest = path.strip_prefix(prefix)?;
    if rest.is_empty() {
        Some("/")
    } else if rest.starts_with('/') {
        Some(rest)
    } else {
        None
    }
}

/// Parses form-urlencoded pairs. Duplicate keys keep the last value.
#[must_use]
pub fn parse_params(encoded: &str) -> ParamMap {
    let pairs: Vec<(String, String)> = serde_urlencoded::from_str(encoded).unwrap_or_default();
    let mut params = ParamMap::with_capacity(pairs.len());
    for (name, value) in pairs {
        params.insert(name, value);
    }
    params
}

/// The request ID carried in `X-Request-Id`, or a fresh one when the
/// header is missing or not a UUID.
#[must_use]
pub fn request_id(headers: &HeaderMap) -> RequestId {
    headers
        .get(REQUEST_ID_HEADER)
        .and_then(|v| v.to_str().ok())
        .and_then(RequestId::parse)
        .unwrap_or_default()
}

/// Builds a context from a collected request.
///
/// An incoming `X-Request-Id` that parses as a UUID is kept; otherwise a
/// fresh ID is generated. Form bodies are parsed only for POST.
///
/// # Errors
///
/// Returns `no_route` when the path is outside `prefix`.
pub fn to_context(request: Request<Bytes>, prefix: &str) -> Result<RequestContext, ApiError> {
    let (parts, body) = request.into_parts();

    let request_id = request_id(&parts.headers);

    let Some(path) = strip_route_prefix(parts.uri.path(), prefix) else {
        tracing::debug!(path = parts.uri.path(), prefix, "path outside route prefix");
        return Err(ApiError::no_route());
    };

    let query = parts.uri.query().map(parse_params).unwrap_or_default();

    let mut ctx = RequestContext::new(parts.method.clone(), path)
        .with_request_id(request_id)
        .with_query(query);

    if parts.method == Method::POST && is_form(&parts.headers) {
        let form = std::str::from_utf8(&body).map(parse_params).unwrap_or_default();
        ctx = ctx.with_body_params(form);
    }

    Ok(ctx.with_headers(parts.headers).with_body(body))
}

fn is_form(headers: &http::HeaderMap) -> bool {
    headers
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(';').next())
        .is_some_and(|mime| mime.trim().eq_ignore_ascii_case(FORM_CONTENT_TYPE))
}
