//! Request building for handlers under test.

use crate::error::{CaptureError, CaptureResult};
use bytes::Bytes;
use http::{header, HeaderMap, HeaderName, HeaderValue, Method, Request, Uri};
use serde::Serialize;

/// Host used for requests whose target has no authority.
pub const DEFAULT_HOST: &str = "example.com";

/// Entry points for building requests to hand to a handler.
///
/// ```
/// use httprec::TestRequest;
///
/// let request = TestRequest::post("/items")
///     .header("X-Request-Id", "42")
///     .json(&serde_json::json!({"name": "widget"}))
///     .build()
///     .unwrap();
///
/// assert_eq!(request.headers()["content-type"], "application/json");
/// assert_eq!(request.headers()["host"], "example.com");
/// ```
pub struct TestRequest;

impl TestRequest {
    /// Creates a new GET request.
    pub fn get(uri: impl AsRef<str>) -> TestRequestBuilder {
        TestRequestBuilder::new(Method::GET, uri)
    }

    /// Creates a new POST request.
    pub fn post(uri: impl AsRef<str>) -> TestRequestBuilder {
        TestRequestBuilder::new(Method::POST, uri)
    }

    /// Creates a new PUT request.
    pub fn put(uri: impl AsRef<str>) -> TestRequestBuilder {
        TestRequestBuilder::new(Method::PUT, uri)
    }

    /// Creates a new PATCH request.
    pub fn patch(uri: impl AsRef<str>) -> TestRequestBuilder {
        TestRequestBuilder::new(Method::PATCH, uri)
    }

    /// Creates a new DELETE request.
    pub fn delete(uri: impl AsRef<str>) -> TestRequestBuilder {
        TestRequestBuilder::new(Method::DELETE, uri)
    }

    /// Creates a new OPTIONS request.
    pub fn options(uri: impl AsRef<str>) -> TestRequestBuilder {
        TestRequestBuilder::new(Method::OPTIONS, uri)
    }

    /// Creates a new HEAD request.
    pub fn head(uri: impl AsRef<str>) -> TestRequestBuilder {
        TestRequestBuilder::new(Method::HEAD, uri)
    }
}

/// Builder for requests passed to a [`Handler`](crate::Handler).
///
/// Errors are collected and reported by [`build`](Self::build), so calls can
/// be chained freely.
#[must_use]
#[derive(Debug)]
pub struct TestRequestBuilder {
    method: Method,
    uri: String,
    headers: HeaderMap,
    body: Bytes,
    error: Option<CaptureError>,
}

impl TestRequestBuilder {
    /// Creates a new request builder.
    pub fn new(method: Method, uri: impl AsRef<str>) -> Self {
        Self {
            method,
            uri: uri.as_ref().to_string(),
            headers: HeaderMap::new(),
            body: Bytes::new(),
            error: None,
        }
    }

    /// Sets a header, replacing earlier values with the same name.
    pub fn header(mut self, name: impl AsRef<str>, value: impl AsRef<str>) -> Self {
        if self.error.is_some() {
            return self;
        }
        let name = name.as_ref();
        let parsed = HeaderName::try_from(name)
            .map_err(|e| CaptureError::InvalidHeader(format!("{name:?}: {e}")))
            .and_then(|name| {
                HeaderValue::try_from(value.as_ref())
                    .map(|value| (name, value))
                    .map_err(|e| CaptureError::InvalidHeader(format!("{}: {e}", value.as_ref())))
            });
        match parsed {
            Ok((name, value)) => {
                self.headers.insert(name, value);
            }
            Err(e) => self.error = Some(e),
        }
        self
    }

    /// Sets the Content-Type header.
    pub fn content_type(self, content_type: impl AsRef<str>) -> Self {
        self.header(header::CONTENT_TYPE.as_str(), content_type)
    }

    /// Sets the raw request body.
    pub fn body(mut self, body: impl Into<Bytes>) -> Self {
        self.body = body.into();
        self
    }

    /// Sets the request body as JSON.
    ///
    /// This also sets the `Content-Type` header to `application/json`.
    pub fn json<T: Serialize>(mut self, value: &T) -> Self {
        match serde_json::to_vec(value) {
            Ok(bytes) => {
                self.body = Bytes::from(bytes);
                self.content_type("application/json")
            }
            Err(e) => {
                self.error.get_or_insert(CaptureError::Json(e));
                self
            }
        }
    }

    /// Builds the request.
    ///
    /// Targets without an authority get a `Host: example.com` header unless
    /// one was set explicitly.
    pub fn build(self) -> CaptureResult<Request<Bytes>> {
        if let Some(e) = self.error {
            return Err(e);
        }

        let uri: Uri = self
            .uri
            .parse()
            .map_err(|e| CaptureError::RequestBuild(format!("Invalid URI {:?}: {e}", self.uri)))?;

        let mut headers = self.headers;
        if !headers.contains_key(header::HOST) {
            let host = uri.authority().map_or(DEFAULT_HOST, |a| a.as_str());
            let host = HeaderValue::try_from(host)
                .map_err(|e| CaptureError::InvalidHeader(format!("host: {e}")))?;
            headers.insert(header::HOST, host);
        }

        let mut request = Request::new(self.body);
        *request.method_mut() = self.method;
        *request.uri_mut() = uri;
        *request.headers_mut() = headers;
        Ok(request)
    }
}
