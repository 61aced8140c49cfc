//! Outgoing HTTP response type and the [`IntoResponse`] conversion trait.
//!
//! Handlers build a [`Response`] and hand it to
//! [`Context::respond`](crate::Context::respond). The context accepts one
//! response per request; the dispatcher turns it into a hyper response.

use bytes::Bytes;
use http::header::CONTENT_TYPE;
use http::{HeaderMap, HeaderName, HeaderValue, StatusCode};
use http_body_util::Full;
use tracing::warn;

// ── ContentType ───────────────────────────────────────────────────────────────

/// Common content-type values for use with [`ResponseBuilder::bytes`].
#[derive(Debug, Clone, Copy)]
pub enum ContentType {
    Html,         // text/html; charset=utf-8
    Json,         // application/json
    OctetStream,  // application/octet-stream
    Text,         // text/plain; charset=utf-8
    Xml,          // application/xml
}

impl ContentType {
    fn as_str(self) -> &'static str {
        match self {
            Self::Html        => "text/html; charset=utf-8",
            Self::Json        => "application/json",
            Self::OctetStream => "application/octet-stream",
            Self::Text        => "text/plain; charset=utf-8",
            Self::Xml         => "application/xml",
        }
    }
}

// ── Response ─────────────────────────────────────────────────────────────────

/// An outgoing HTTP response.
///
/// ```rust
/// use relay::Response;
/// use http::StatusCode;
///
/// Response::json(br#"{"id":1}"#.to_vec());
/// Response::text("hello");
/// Response::status(StatusCode::NO_CONTENT);
///
/// Response::builder()
///     .status(StatusCode::CREATED)
///     .header("location", "/users/42")
///     .json(br#"{"id":42}"#.to_vec());
/// ```
#[derive(Debug, Clone)]
pub struct Response {
    status: StatusCode,
    headers: HeaderMap,
    body: Bytes,
}

impl Response {
    /// `200 OK` — `application/json`.
    pub fn json(body: impl Into<Bytes>) -> Self {
        Self::builder().json(body)
    }

    /// `200 OK` — `text/plain; charset=utf-8`.
    pub fn text(body: impl Into<String>) -> Self {
        Self::builder().text(body)
    }

    /// Response with no body.
    pub fn status(code: StatusCode) -> Self {
        Self { status: code, headers: HeaderMap::new(), body: Bytes::new() }
    }

    /// Builder for responses that need a custom status or extra headers.
    pub fn builder() -> ResponseBuilder {
        ResponseBuilder { headers: HeaderMap::new(), status: StatusCode::OK }
    }

    pub fn status_code(&self) -> StatusCode { self.status }
    pub fn headers(&self) -> &HeaderMap { &self.headers }
    pub fn body(&self) -> &[u8] { &self.body }

    /// Converts into the hyper-facing response. `content-length` is derived
    /// from the `Full` body by hyper.
    pub fn into_inner(self) -> http::Response<Full<Bytes>> {
        let mut res = http::Response::new(Full::new(self.body));
        *res.status_mut() = self.status;
        *res.headers_mut() = self.headers;
        res
    }
}

// ── ResponseBuilder ───────────────────────────────────────────────────────────

/// Fluent builder for [`Response`].
///
/// Obtain via [`Response::builder()`]. Defaults to `200 OK`.
#[derive(Debug)]
pub struct ResponseBuilder {
    headers: HeaderMap,
    status: StatusCode,
}

impl ResponseBuilder {
    pub fn status(mut self, code: StatusCode) -> Self {
        self.status = code;
        self
    }

    /// Appends a header. An invalid name or value is logged and skipped.
    pub fn header(mut self, name: &str, value: &str) -> Self {
        match (HeaderName::from_bytes(name.as_bytes()), HeaderValue::from_str(value)) {
            (Ok(name), Ok(value)) => {
                self.headers.append(name, value);
            }
            _ => warn!(header = name, "dropping invalid response header"),
        }
        self
    }

    /// Terminate with a JSON body (`application/json`).
    pub fn json(self, body: impl Into<Bytes>) -> Response {
        self.finish(ContentType::Json, body.into())
    }

    /// Terminate with a plain-text body (`text/plain; charset=utf-8`).
    pub fn text(self, body: impl Into<String>) -> Response {
        self.finish(ContentType::Text, Bytes::from(body.into()))
    }

    /// Terminate with a typed body.
    pub fn bytes(self, content_type: ContentType, body: impl Into<Bytes>) -> Response {
        self.finish(content_type, body.into())
    }

    /// Terminate with no body.
    pub fn no_body(self) -> Response {
        Response { status: self.status, headers: self.headers, body: Bytes::new() }
    }

    fn finish(mut self, content_type: ContentType, body: Bytes) -> Response {
        self.headers
            .insert(CONTENT_TYPE, HeaderValue::from_static(content_type.as_str()));
        Response { status: self.status, headers: self.headers, body }
    }
}

// ── IntoResponse ──────────────────────────────────────────────────────────────

/// Conversion into an HTTP [`Response`].
///
/// Implement on your own types to pass them straight to
/// [`Context::respond`](crate::Context::respond).
pub trait IntoResponse {
    fn into_response(self) -> Response;
}

impl IntoResponse for Response {
    fn into_response(self) -> Response { self }
}

impl IntoResponse for &'static str {
    fn into_response(self) -> Response { Response::text(self) }
}

impl IntoResponse for String {
    fn into_response(self) -> Response { Response::text(self) }
}

impl IntoResponse for StatusCode {
    fn into_response(self) -> Response { Response::status(self) }
}

impl IntoResponse for (StatusCode, String) {
    fn into_response(self) -> Response {
        Response::builder().status(self.0).text(self.1)
    }
}
