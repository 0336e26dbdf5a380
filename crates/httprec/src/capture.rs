//! Response capture with comparison helpers.

use crate::config::CaptureConfig;
use crate::error::{CaptureError, CaptureResult};
use crate::media::base_media_type;
use crate::recorder::ResponseRecorder;
use crate::writer::{Handler, ResponseWriter};
use bytes::Bytes;
use http::header::CONTENT_TYPE;
use http::{HeaderMap, Request, StatusCode};
use serde::de::DeserializeOwned;
use std::{fmt, io};

/// A recorded response plus the comparisons tests usually want.
///
/// Every `expect_*` method returns the actual value next to a `bool` that
/// says whether it matched, so a test can both branch on the result and
/// print what the handler really produced. The `assert_*` variants panic on
/// mismatch instead.
///
/// # Example
///
/// ```
/// use bytes::Bytes;
/// use http::{header, HeaderValue, Request, StatusCode};
/// use httprec::{ResponseCapture, ResponseWriter};
///
/// fn create_item(w: &mut dyn ResponseWriter, _req: &Request<Bytes>) {
///     w.headers_mut()
///         .insert(header::CONTENT_TYPE, HeaderValue::from_static("application/json"));
///     w.write_status(StatusCode::CREATED);
///     w.write_text("{\"id\":1}\n").unwrap();
/// }
///
/// let mut capture = ResponseCapture::new();
/// capture.serve(&create_item, &Request::new(Bytes::new()));
///
/// assert_eq!(capture.expect_status(201), (201, true));
/// assert!(capture.expect_bytes(b"{\"id\":1}", false).1);
/// assert_eq!(
///     capture.expect_content_type("application/json"),
///     ("application/json".to_string(), true)
/// );
/// ```
#[derive(Clone, Default)]
pub struct ResponseCapture {
    recorder: ResponseRecorder,
    config: CaptureConfig,
}

impl ResponseCapture {
    /// Creates an empty capture: status 200, no headers, empty body.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates an empty capture with the given configuration.
    #[must_use]
    pub fn with_config(config: CaptureConfig) -> Self {
        Self {
            recorder: ResponseRecorder::new().with_sniff_content_type(config.sniff_content_type),
            config,
        }
    }

    /// Wraps an existing recorder.
    #[must_use]
    pub fn from_recorder(recorder: ResponseRecorder) -> Self {
        Self {
            recorder,
            config: CaptureConfig::default(),
        }
    }

    /// Returns the configuration in use.
    #[must_use]
    pub fn config(&self) -> &CaptureConfig {
        &self.config
    }

    /// Returns the underlying recorder.
    #[must_use]
    pub fn recorder(&self) -> &ResponseRecorder {
        &self.recorder
    }

    /// Returns the underlying recorder mutably.
    pub fn recorder_mut(&mut self) -> &mut ResponseRecorder {
        &mut self.recorder
    }

    /// Consumes the capture, returning the recorder.
    #[must_use]
    pub fn into_recorder(self) -> ResponseRecorder {
        self.recorder
    }

    /// Returns the recorded status.
    #[must_use]
    pub fn status(&self) -> StatusCode {
        self.recorder.status()
    }

    /// Returns the live header map.
    #[must_use]
    pub fn headers(&self) -> &HeaderMap {
        self.recorder.headers()
    }

    /// Returns the recorded body.
    #[must_use]
    pub fn body(&self) -> &[u8] {
        self.recorder.body()
    }

    /// Builds the response a client would have seen.
    #[must_use]
    pub fn to_response(&self) -> http::Response<Bytes> {
        self.recorder.to_response()
    }

    /// Runs `handler` once with this capture as its response writer.
    pub fn serve<H>(&mut self, handler: &H, request: &Request<Bytes>)
    where
        H: Handler + ?Sized,
    {
        let _span = tracing::debug_span!(
            "serve",
            method = %request.method(),
            uri = %request.uri()
        )
        .entered();
        handler.serve(self, request);
    }

    /// Records a response returned by a handler.
    pub async fn record<B>(&mut self, response: http::Response<B>) -> CaptureResult<()>
    where
        B: http_body_util::BodyExt,
        B::Error: fmt::Display,
    {
        self.recorder.record(response).await
    }

    /// Compares the recorded status with `expected`.
    ///
    /// Returns the recorded status and whether it matched. Any integer type
    /// is accepted; values outside the valid status range (negative, or too
    /// large for `i64`) never match.
    pub fn expect_status<N>(&self, expected: N) -> (u16, bool)
    where
        N: TryInto<i64>,
    {
        let actual = self.recorder.status_code();
        let expected: Option<i64> = expected.try_into().ok();
        let matched = expected == Some(i64::from(actual));
        if !matched {
            self.log_mismatch("status", &expected, &actual);
        }
        (actual, matched)
    }

    /// Compares the recorded body with `expected`.
    ///
    /// In strict mode the body must be byte-for-byte identical. Otherwise a
    /// body equal to `expected` followed by exactly one `\n` also matches;
    /// two trailing newlines do not.
    pub fn expect_bytes(&self, expected: &[u8], strict: bool) -> (&[u8], bool) {
        let body = self.recorder.body();
        let matched = body == expected
            || (!strict
                && body.len() == expected.len() + 1
                && body.ends_with(b"\n")
                && &body[..expected.len()] == expected);
        if !matched {
            self.log_mismatch(
                "body",
                &String::from_utf8_lossy(expected),
                &String::from_utf8_lossy(body),
            );
        }
        (body, matched)
    }

    /// Compares the recorded body with `expected` using the configured mode.
    pub fn expect_body(&self, expected: &[u8]) -> (&[u8], bool) {
        self.expect_bytes(expected, self.config.strict_body)
    }

    /// Compares the recorded body with UTF-8 text.
    pub fn expect_text(&self, expected: &str, strict: bool) -> (&[u8], bool) {
        self.expect_bytes(expected.as_bytes(), strict)
    }

    /// Decodes the body as JSON into `model` and compares it with `expect`.
    ///
    /// `model` and `expect` share one type, so a mismatched pair does not
    /// compile. A body that fails to decode is reported as not matching and
    /// leaves `model` untouched; the raw body is returned in every case.
    pub fn expect_json<T>(&self, model: &mut T, expect: &T) -> (&[u8], bool)
    where
        T: DeserializeOwned + PartialEq,
    {
        let body = self.recorder.body();
        let matched = match serde_json::from_slice::<T>(body) {
            Ok(decoded) => {
                *model = decoded;
                *model == *expect
            }
            Err(e) => {
                if self.config.log_mismatches {
                    tracing::debug!(error = %e, "JSON body did not decode");
                }
                return (body, false);
            }
        };
        if !matched {
            self.log_mismatch(
                "json",
                &std::any::type_name::<T>(),
                &String::from_utf8_lossy(body),
            );
        }
        (body, matched)
    }

    /// Compares the base media type of `Content-Type` with `expected`.
    ///
    /// Parameters are ignored, so `application/json; charset=utf-8` matches
    /// `application/json`. Returns `("", false)` when the header is missing
    /// or empty, and the parse error text with `false` when it is malformed.
    pub fn expect_content_type(&self, expected: &str) -> (String, bool) {
        let Some(value) = self.recorder.headers().get(CONTENT_TYPE) else {
            return (String::new(), false);
        };
        if value.is_empty() {
            return (String::new(), false);
        }

        let parsed = value
            .to_str()
            .map_err(|e| {
                CaptureError::invalid_media_type(
                    String::from_utf8_lossy(value.as_bytes()),
                    e.to_string(),
                )
            })
            .and_then(base_media_type);

        match parsed {
            Ok(media_type) => {
                let matched = media_type == expected;
                if !matched {
                    self.log_mismatch("content_type", &expected, &media_type);
                }
                (media_type, matched)
            }
            Err(e) => {
                let message = e.to_string();
                self.log_mismatch("content_type", &expected, &message);
                (message, false)
            }
        }
    }

    // Assertion methods

    /// Asserts that the status equals `expected`.
    ///
    /// # Panics
    ///
    /// Panics if the status doesn't match.
    pub fn assert_status<N>(&self, expected: N) -> &Self
    where
        N: TryInto<i64> + fmt::Display,
    {
        let shown = expected.to_string();
        let (actual, matched) = self.expect_status(expected);
        assert!(matched, "Expected status {shown}, got {actual}");
        self
    }

    /// Asserts that the body equals `expected`.
    ///
    /// # Panics
    ///
    /// Panics if the body doesn't match.
    pub fn assert_bytes(&self, expected: &[u8], strict: bool) -> &Self {
        let (actual, matched) = self.expect_bytes(expected, strict);
        assert!(
            matched,
            "Body mismatch: expected {:?}, got {:?}",
            String::from_utf8_lossy(expected),
            String::from_utf8_lossy(actual)
        );
        self
    }

    /// Asserts that the JSON body decodes to a value equal to `expect`.
    ///
    /// # Panics
    ///
    /// Panics if the body doesn't decode or the value doesn't match.
    pub fn assert_json<T>(&self, expect: &T) -> &Self
    where
        T: DeserializeOwned + PartialEq + fmt::Debug,
    {
        let decoded = serde_json::from_slice::<T>(self.recorder.body());
        match decoded {
            Ok(actual) => assert!(
                actual == *expect,
                "JSON body mismatch: expected {expect:?}, got {actual:?}"
            ),
            Err(e) => panic!(
                "Body is not valid JSON for {}: {e}; body: {}",
                std::any::type_name::<T>(),
                String::from_utf8_lossy(self.recorder.body())
            ),
        }
        self
    }

    /// Asserts that the base media type equals `expected`.
    ///
    /// # Panics
    ///
    /// Panics if Content-Type is missing, malformed or different.
    pub fn assert_content_type(&self, expected: &str) -> &Self {
        let (actual, matched) = self.expect_content_type(expected);
        assert!(
            matched,
            "Content-Type: expected '{expected}', got '{actual}'"
        );
        self
    }

    fn log_mismatch(&self, what: &str, expected: &dyn fmt::Debug, actual: &dyn fmt::Debug) {
        if self.config.log_mismatches {
            tracing::debug!(
                comparison = what,
                expected = ?expected,
                actual = ?actual,
                "comparison did not match"
            );
        }
    }
}

impl ResponseWriter for ResponseCapture {
    fn headers_mut(&mut self) -> &mut HeaderMap {
        self.recorder.headers_mut()
    }

    fn write_status(&mut self, status: StatusCode) {
        self.recorder.write_status(status);
    }

    fn write_body(&mut self, chunk: &[u8]) -> io::Result<usize> {
        self.recorder.write_body(chunk)
    }

    fn flush(&mut self) {
        ResponseWriter::flush(&mut self.recorder);
    }
}

impl io::Write for ResponseCapture {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.recorder.write_body(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        ResponseWriter::flush(&mut self.recorder);
        Ok(())
    }
}

impl fmt::Debug for ResponseCapture {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResponseCapture")
            .field("recorder", &self.recorder)
            .field("config", &self.config)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use http::HeaderValue;
    use serde::Deserialize;
    use std::collections::BTreeMap;

    fn create_capture(
        status: StatusCode,
        content_type: Option<&'static str>,
        body: &str,
    ) -> ResponseCapture {
        let mut capture = ResponseCapture::new();
        if let Some(ct) = content_type {
            capture
                .headers_mut()
                .insert(CONTENT_TYPE, HeaderValue::from_static(ct));
        }
        capture.write_status(status);
        capture.write_text(body).unwrap();
        capture
    }

    #[derive(Debug, Default, PartialEq, Deserialize)]
    struct Item {
        id: u32,
        #[serde(default)]
        tags: Vec<String>,
        #[serde(default)]
        attrs: BTreeMap<String, String>,
    }

    #[test]
    fn test_new_capture() {
        let capture = ResponseCapture::new();
        assert_eq!(capture.status(), StatusCode::OK);
        assert!(capture.headers().is_empty());
        assert!(capture.body().is_empty());
        assert_eq!(capture.expect_status(200), (200, true));
    }

    #[test]
    fn test_expect_status() {
        let capture = create_capture(StatusCode::CREATED, None, "");
        assert_eq!(capture.expect_status(201), (201, true));
        assert_eq!(capture.expect_status(200), (201, false));
        assert_eq!(capture.expect_status(0), (201, false));
        assert_eq!(capture.expect_status(u16::MAX), (201, false));
    }

    #[test]
    fn test_expect_status_any_integer() {
        let capture = create_capture(StatusCode::CREATED, None, "");
        assert_eq!(capture.expect_status(201_i32), (201, true));
        assert_eq!(capture.expect_status(201_usize), (201, true));
        assert_eq!(capture.expect_status(201_i64), (201, true));
        assert_eq!(capture.expect_status(-201_i32), (201, false));
        assert_eq!(capture.expect_status(65_737_u32), (201, false));
        assert_eq!(capture.expect_status(i64::MAX), (201, false));
        assert_eq!(capture.expect_status(u64::MAX), (201, false));
        assert_eq!(capture.expect_status(u128::MAX), (201, false));
    }

    #[test]
    fn test_expect_bytes_exact() {
        let capture = create_capture(StatusCode::OK, None, "hello");
        assert_eq!(capture.expect_bytes(b"hello", true), (&b"hello"[..], true));
        assert_eq!(capture.expect_bytes(b"hello", false), (&b"hello"[..], true));
        assert!(!capture.expect_bytes(b"hell", false).1);
    }

    #[test]
    fn test_expect_bytes_trailing_newline() {
        let capture = create_capture(StatusCode::OK, None, "hello\n");
        assert_eq!(capture.expect_bytes(b"hello", true), (&b"hello\n"[..], false));
        assert_eq!(capture.expect_bytes(b"hello", false), (&b"hello\n"[..], true));
    }

    #[test]
    fn test_expect_bytes_only_one_newline_tolerated() {
        let capture = create_capture(StatusCode::OK, None, "hello\n\n");
        assert!(!capture.expect_bytes(b"hello", false).1);
        assert!(capture.expect_bytes(b"hello\n", false).1);
    }

    #[test]
    fn test_expect_bytes_no_leading_tolerance() {
        let capture = create_capture(StatusCode::OK, None, "\nhello");
        assert!(!capture.expect_bytes(b"hello", false).1);
    }

    #[test]
    fn test_expect_bytes_carriage_return_not_tolerated() {
        let capture = create_capture(StatusCode::OK, None, "hello\r\n");
        assert!(!capture.expect_bytes(b"hello", false).1);
    }

    #[test]
    fn test_expect_body_uses_config() {
        let mut capture = ResponseCapture::with_config(CaptureConfig::new().with_strict_body(true));
        capture.write_text("ok\n").unwrap();
        assert!(!capture.expect_body(b"ok").1);

        let mut capture = ResponseCapture::new();
        capture.write_text("ok\n").unwrap();
        assert!(capture.expect_body(b"ok").1);
    }

    #[test]
    fn test_expect_text() {
        let capture = create_capture(StatusCode::OK, None, "héllo\n");
        assert!(capture.expect_text("héllo", false).1);
        assert!(!capture.expect_text("héllo", true).1);
    }

    #[test]
    fn test_expect_json_match() {
        let capture = create_capture(
            StatusCode::OK,
            Some("application/json"),
            r#"{"id":7,"tags":["a","b"],"attrs":{"k":"v"}}"#,
        );
        let expect = Item {
            id: 7,
            tags: vec!["a".into(), "b".into()],
            attrs: BTreeMap::from([("k".to_string(), "v".to_string())]),
        };
        let mut model = Item::default();
        let (raw, matched) = capture.expect_json(&mut model, &expect);
        assert!(matched);
        assert_eq!(raw, capture.body());
        assert_eq!(model, expect);
    }

    #[test]
    fn test_expect_json_order_matters_for_sequences() {
        let capture = create_capture(StatusCode::OK, None, r#"{"id":1,"tags":["b","a"]}"#);
        let expect = Item {
            id: 1,
            tags: vec!["a".into(), "b".into()],
            ..Item::default()
        };
        let mut model = Item::default();
        assert!(!capture.expect_json(&mut model, &expect).1);
        assert_eq!(model.tags, vec!["b".to_string(), "a".to_string()]);
    }

    #[test]
    fn test_expect_json_malformed() {
        let capture = create_capture(StatusCode::OK, None, "{\"id\":");
        let mut model = Item { id: 99, ..Item::default() };
        let (raw, matched) = capture.expect_json(&mut model, &Item::default());
        assert!(!matched);
        assert_eq!(raw, b"{\"id\":");
        assert_eq!(model.id, 99);
    }

    #[test]
    fn test_expect_json_trailing_newline_decodes() {
        let capture = create_capture(StatusCode::OK, None, "{\"id\":1}\n");
        let mut model = Item::default();
        assert!(capture.expect_json(&mut model, &Item { id: 1, ..Item::default() }).1);
    }

    #[test]
    fn test_expect_json_value() {
        let capture = create_capture(StatusCode::OK, None, r#"{"name":"Alice","age":30}"#);
        let mut model = serde_json::Value::Null;
        let expect = serde_json::json!({"age": 30, "name": "Alice"});
        assert!(capture.expect_json(&mut model, &expect).1);
    }

    #[test]
    fn test_expect_content_type_with_params() {
        let capture = create_capture(StatusCode::OK, Some("application/json; charset=utf-8"), "{}");
        assert_eq!(
            capture.expect_content_type("application/json"),
            ("application/json".to_string(), true)
        );
        assert_eq!(
            capture.expect_content_type("text/html"),
            ("application/json".to_string(), false)
        );
    }

    #[test]
    fn test_expect_content_type_missing() {
        let capture = ResponseCapture::new();
        assert_eq!(capture.expect_content_type("text/html"), (String::new(), false));
    }

    #[test]
    fn test_expect_content_type_empty() {
        let mut capture = ResponseCapture::new();
        capture
            .headers_mut()
            .insert(CONTENT_TYPE, HeaderValue::from_static(""));
        assert_eq!(capture.expect_content_type(""), (String::new(), false));
    }

    #[test]
    fn test_expect_content_type_malformed() {
        let capture = create_capture(StatusCode::OK, Some("json"), "{}");
        let (message, matched) = capture.expect_content_type("json");
        assert!(!matched);
        assert!(message.starts_with("invalid media type"));
    }

    #[test]
    fn test_expect_content_type_whitespace_before_semicolon() {
        let capture = create_capture(StatusCode::OK, Some("application/json ; charset=utf-8"), "{}");
        assert_eq!(
            capture.expect_content_type("application/json"),
            ("application/json".to_string(), true)
        );
    }

    #[test]
    fn test_expect_content_type_duplicate_parameter() {
        let capture = create_capture(StatusCode::OK, Some("text/html; a=1; a=2"), "");
        let (message, matched) = capture.expect_content_type("text/html");
        assert!(!matched);
        assert!(message.contains("duplicate parameter name"));
    }

    #[test]
    fn test_expect_content_type_first_value_wins() {
        let mut capture = ResponseCapture::new();
        capture
            .headers_mut()
            .append(CONTENT_TYPE, HeaderValue::from_static("text/plain"));
        capture
            .headers_mut()
            .append(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        assert!(capture.expect_content_type("text/plain").1);
        assert!(!capture.expect_content_type("application/json").1);
    }

    #[test]
    fn test_comparisons_do_not_mutate() {
        let capture = create_capture(StatusCode::ACCEPTED, Some("text/plain"), "body\n");
        for _ in 0..3 {
            let _ = capture.expect_status(200);
            let _ = capture.expect_bytes(b"other", false);
            let _ = capture.expect_content_type("text/html");
        }
        assert_eq!(capture.status(), StatusCode::ACCEPTED);
        assert_eq!(capture.body(), b"body\n");
    }

    #[test]
    fn test_assertions_chain() {
        let capture = create_capture(StatusCode::OK, Some("application/json"), "{\"id\":3}\n");
        capture
            .assert_status(200)
            .assert_bytes(b"{\"id\":3}", false)
            .assert_content_type("application/json")
            .assert_json(&serde_json::json!({"id": 3}));
    }

    #[test]
    #[should_panic(expected = "Expected status 404, got 200")]
    fn test_assert_status_panics() {
        ResponseCapture::new().assert_status(404);
    }

    #[test]
    #[should_panic(expected = "Content-Type: expected 'text/html', got ''")]
    fn test_assert_content_type_panics() {
        ResponseCapture::new().assert_content_type("text/html");
    }

    #[test]
    fn test_serve_handler() {
        fn teapot(w: &mut dyn ResponseWriter, req: &Request<Bytes>) {
            w.write_status(StatusCode::IM_A_TEAPOT);
            w.write_text(req.uri().path()).unwrap();
        }

        let request = Request::builder()
            .uri("/brew")
            .body(Bytes::new())
            .unwrap();
        let mut capture = ResponseCapture::new();
        capture.serve(&teapot, &request);

        assert_eq!(capture.expect_status(418), (418, true));
        assert!(capture.expect_bytes(b"/brew", true).1);
    }

    #[test]
    fn test_with_config_disables_sniffing() {
        let mut capture =
            ResponseCapture::with_config(CaptureConfig::new().with_sniff_content_type(false));
        capture.write_text("hi").unwrap();
        assert_eq!(capture.expect_content_type("text/plain"), (String::new(), false));
    }

    #[test]
    fn test_io_write() {
        use std::io::Write;

        let mut capture = ResponseCapture::new();
        writeln!(capture, "line {}", 1).unwrap();
        assert!(capture.expect_bytes(b"line 1", false).1);
    }
}
