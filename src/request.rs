//! Incoming HTTP request type.

use std::collections::HashMap;

use bytes::Bytes;
use http::header::{HOST, HeaderName, HeaderValue, ToStrError};
use http::{Extensions, HeaderMap, Method, Uri};

use crate::middleware::RequestStamp;

/// An incoming HTTP request with its body fully buffered.
///
/// Route parameters and [`Extensions`] together form the per-request context
/// a handler receives next to the raw request data.
#[derive(Debug)]
pub struct Request {
    pub(crate) method: Method,
    pub(crate) uri: Uri,
    pub(crate) headers: HeaderMap,
    pub(crate) body: Bytes,
    pub(crate) params: HashMap<String, String>,
    pub(crate) extensions: Extensions,
}

impl Request {
    pub(crate) fn from_parts(
        parts: http::request::Parts,
        body: Bytes,
        params: HashMap<String, String>,
    ) -> Self {
        Self {
            method: parts.method,
            uri: parts.uri,
            headers: parts.headers,
            body,
            params,
            extensions: parts.extensions,
        }
    }

    /// Starts building a request by hand. Mostly useful in tests.
    pub fn builder(method: Method, uri: &str) -> RequestBuilder {
        RequestBuilder {
            method,
            uri: uri.parse().unwrap_or_else(|_| Uri::from_static("/")),
            headers: HeaderMap::new(),
            body: Bytes::new(),
            params: HashMap::new(),
        }
    }

    pub fn method(&self) -> &Method { &self.method }
    pub fn uri(&self) -> &Uri { &self.uri }
    pub fn path(&self) -> &str { self.uri.path() }
    pub fn headers(&self) -> &HeaderMap { &self.headers }
    pub fn headers_mut(&mut self) -> &mut HeaderMap { &mut self.headers }
    pub fn body(&self) -> &[u8] { &self.body }
    pub fn extensions(&self) -> &Extensions { &self.extensions }
    pub fn extensions_mut(&mut self) -> &mut Extensions { &mut self.extensions }

    /// Header lookup. Values that are not visible ASCII read as `None`.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }

    /// Header lookup that reports undecodable values instead of hiding them.
    pub fn try_header(&self, name: &str) -> Result<Option<&str>, ToStrError> {
        self.headers.get(name).map(HeaderValue::to_str).transpose()
    }

    /// Returns a named path parameter.
    ///
    /// For a route `/users/{id}`, `req.param("id")` on `/users/42` returns `Some("42")`.
    pub fn param(&self, key: &str) -> Option<&str> {
        self.params.get(key).map(String::as_str)
    }

    /// Correlation id assigned by the request-logging wrapper, if any.
    pub fn request_id(&self) -> Option<&str> {
        self.extensions.get::<RequestStamp>().map(|s| s.id.as_str())
    }

    /// Absolute URL as the client addressed it.
    ///
    /// Behind a proxy the origin-form target carries no scheme or host, so
    /// they come from `x-forwarded-proto` and `host`. Without a host the
    /// bare path and query are returned.
    pub fn url(&self) -> String {
        let path = self.uri.path_and_query().map_or("/", |pq| pq.as_str());

        let host = self.uri.authority()
            .map(|a| a.as_str())
            .or_else(|| self.header(HOST.as_str()));

        let Some(host) = host else {
            return path.to_owned();
        };

        let scheme = self.header("x-forwarded-proto")
            .and_then(|v| v.split(',').next())
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .or_else(|| self.uri.scheme_str())
            .unwrap_or("http");

        format!("{scheme}://{host}{path}")
    }
}

/// Fluent builder for [`Request`]. Obtain via [`Request::builder`].
pub struct RequestBuilder {
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    body: Bytes,
    params: HashMap<String, String>,
}

impl RequestBuilder {
    /// Appends a header. Invalid names or values are skipped.
    pub fn header(mut self, name: &str, value: &str) -> Self {
        if let (Ok(name), Ok(value)) = (
            HeaderName::try_from(name),
            HeaderValue::try_from(value),
        ) {
            self.headers.append(name, value);
        }
        self
    }

    /// Appends a header from raw bytes, allowing non-ASCII values.
    pub fn header_bytes(mut self, name: &str, value: &[u8]) -> Self {
        if let (Ok(name), Ok(value)) = (
            HeaderName::try_from(name),
            HeaderValue::from_bytes(value),
        ) {
            self.headers.append(name, value);
        }
        self
    }

    pub fn param(mut self, key: &str, value: &str) -> Self {
        self.params.insert(key.to_owned(), value.to_owned());
        self
    }

    pub fn body(mut self, body: impl Into<Bytes>) -> Self {
        self.body = body.into();
        self
    }

    pub fn build(self) -> Request {
        Request {
            method: self.method,
            uri: self.uri,
            headers: self.headers,
            body: self.body,
            params: self.params,
            extensions: Extensions::new(),
        }
    }
}
