//! Incoming HTTP request type.

use std::net::SocketAddr;

use bytes::Bytes;
use http::{HeaderMap, HeaderName, HeaderValue, Method};

/// An incoming HTTP request with its body already collected.
///
/// [`target`](Request::target) is the request-target exactly as the client
/// sent it (path plus query), which is what group prefixes are compared
/// against. Nothing is decoded or normalised.
#[derive(Debug, Clone)]
pub struct Request {
    method: Method,
    target: String,
    headers: HeaderMap,
    body: Bytes,
    remote_addr: Option<SocketAddr>,
}

impl Request {
    /// Builds a request by hand. Mostly useful in tests; the server builds
    /// requests from hyper parts.
    pub fn new(method: Method, target: impl Into<String>) -> Self {
        Self {
            method,
            target: target.into(),
            headers: HeaderMap::new(),
            body: Bytes::new(),
            remote_addr: None,
        }
    }

    pub(crate) fn from_parts(
        parts: http::request::Parts,
        body: Bytes,
        remote_addr: SocketAddr,
    ) -> Self {
        Self {
            method: parts.method,
            target: parts.uri.to_string(),
            headers: parts.headers,
            body,
            remote_addr: Some(remote_addr),
        }
    }

    /// Adds a header. Invalid names or values are ignored.
    pub fn with_header(mut self, name: &str, value: &str) -> Self {
        if let (Ok(name), Ok(value)) = (
            HeaderName::from_bytes(name.as_bytes()),
            HeaderValue::from_str(value),
        ) {
            self.headers.append(name, value);
        }
        self
    }

    pub fn with_body(mut self, body: impl Into<Bytes>) -> Self {
        self.body = body.into();
        self
    }

    pub fn method(&self) -> &Method { &self.method }
    pub fn target(&self) -> &str { &self.target }
    pub fn headers(&self) -> &HeaderMap { &self.headers }
    pub fn body(&self) -> &[u8] { &self.body }
    pub fn remote_addr(&self) -> Option<SocketAddr> { self.remote_addr }

    /// The target without its query string.
    pub fn path(&self) -> &str {
        self.target
            .split_once('?')
            .map_or(self.target.as_str(), |(path, _)| path)
    }

    /// Case-insensitive header lookup. Returns `None` for non-UTF-8 values.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }
}
