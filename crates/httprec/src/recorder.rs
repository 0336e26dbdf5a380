//! In-memory response recording.
//!
//! [`ResponseRecorder`] is a [`ResponseWriter`] that keeps everything a
//! handler writes so a test can inspect it afterwards. It follows the usual
//! server semantics:
//!
//! - the status defaults to `200 OK` and can only be written once;
//! - the first body write or flush implies `200 OK`;
//! - if no `Content-Type` was set before the first body write, one is
//!   sniffed from the body bytes (can be disabled);
//! - the headers are snapshotted when the status is written, and
//!   [`to_response`](ResponseRecorder::to_response) reports that snapshot.

use crate::error::{CaptureError, CaptureResult};
use crate::writer::ResponseWriter;
use bytes::{Bytes, BytesMut};
use http::header::{CONTENT_TYPE, TRANSFER_ENCODING};
use http::{HeaderMap, HeaderValue, StatusCode};
use std::{fmt, io};

/// Records the status, headers and body written by a handler.
#[derive(Clone)]
pub struct ResponseRecorder {
    status: StatusCode,
    headers: HeaderMap,
    body: BytesMut,
    wrote_header: bool,
    flushed: bool,
    snapshot: Option<HeaderMap>,
    sniff_content_type: bool,
}

impl Default for ResponseRecorder {
    fn default() -> Self {
        Self::new()
    }
}

impl ResponseRecorder {
    /// Creates an empty recorder with status `200 OK`.
    #[must_use]
    pub fn new() -> Self {
        Self {
            status: StatusCode::OK,
            headers: HeaderMap::new(),
            body: BytesMut::new(),
            wrote_header: false,
            flushed: false,
            snapshot: None,
            sniff_content_type: true,
        }
    }

    /// Enables or disables `Content-Type` sniffing on the first body write.
    #[must_use]
    pub fn with_sniff_content_type(mut self, sniff: bool) -> Self {
        self.sniff_content_type = sniff;
        self
    }

    /// Returns the recorded status.
    #[must_use]
    pub fn status(&self) -> StatusCode {
        self.status
    }

    /// Returns the recorded status as a u16.
    #[must_use]
    pub fn status_code(&self) -> u16 {
        self.status.as_u16()
    }

    /// Returns the live header map.
    #[must_use]
    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    /// Returns the recorded body bytes.
    #[must_use]
    pub fn body(&self) -> &[u8] {
        &self.body
    }

    /// Returns true once a status has been written, explicitly or implicitly.
    #[must_use]
    pub fn wrote_header(&self) -> bool {
        self.wrote_header
    }

    /// Returns true if the handler flushed the response.
    #[must_use]
    pub fn flushed(&self) -> bool {
        self.flushed
    }

    /// Builds the response a client would have seen.
    ///
    /// Headers come from the snapshot taken when the status was written, or
    /// from the live map if the handler never wrote anything.
    #[must_use]
    pub fn to_response(&self) -> http::Response<Bytes> {
        let mut response = http::Response::new(Bytes::copy_from_slice(&self.body));
        *response.status_mut() = self.status;
        *response.headers_mut() = self
            .snapshot
            .as_ref()
            .unwrap_or(&self.headers)
            .clone();
        response
    }

    /// Records a response returned by a handler.
    ///
    /// Headers are appended to the recorder's map, then the status is
    /// written, then the collected body. Recording into a recorder that
    /// already holds a status keeps the original status.
    pub async fn record<B>(&mut self, response: http::Response<B>) -> CaptureResult<()>
    where
        B: http_body_util::BodyExt,
        B::Error: fmt::Display,
    {
        let (parts, body) = response.into_parts();
        let body_bytes = body
            .collect()
            .await
            .map_err(|e| CaptureError::BodyRead(e.to_string()))?
            .to_bytes();

        let mut last_name = None;
        for (name, value) in parts.headers {
            if let Some(name) = name {
                last_name = Some(name);
            }
            if let Some(name) = &last_name {
                self.headers.append(name.clone(), value);
            }
        }

        self.write_status(parts.status);
        if !body_bytes.is_empty() {
            self.body.extend_from_slice(&body_bytes);
        }

        tracing::trace!(
            status = parts.status.as_u16(),
            body_len = body_bytes.len(),
            "recorded handler response"
        );
        Ok(())
    }

    fn write_implicit_header(&mut self, chunk: &[u8]) {
        if self.wrote_header {
            return;
        }
        if self.sniff_content_type
            && !self.headers.contains_key(CONTENT_TYPE)
            && !self.headers.contains_key(TRANSFER_ENCODING)
        {
            self.headers
                .insert(CONTENT_TYPE, HeaderValue::from_static(detect_content_type(chunk)));
        }
        self.write_status(StatusCode::OK);
    }
}

impl ResponseWriter for ResponseRecorder {
    fn headers_mut(&mut self) -> &mut HeaderMap {
        &mut self.headers
    }

    fn write_status(&mut self, status: StatusCode) {
        if self.wrote_header {
            tracing::warn!(
                recorded = self.status.as_u16(),
                ignored = status.as_u16(),
                "superfluous write_status call"
            );
            return;
        }
        self.wrote_header = true;
        self.status = status;
        self.snapshot = Some(self.headers.clone());
        tracing::trace!(status = status.as_u16(), "status written");
    }

    fn write_body(&mut self, chunk: &[u8]) -> io::Result<usize> {
        self.write_implicit_header(chunk);
        self.body.extend_from_slice(chunk);
        tracing::trace!(len = chunk.len(), total = self.body.len(), "body chunk written");
        Ok(chunk.len())
    }

    fn flush(&mut self) {
        if !self.wrote_header {
            self.write_status(StatusCode::OK);
        }
        self.flushed = true;
    }
}

impl io::Write for ResponseRecorder {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.write_body(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        ResponseWriter::flush(self);
        Ok(())
    }
}

impl fmt::Debug for ResponseRecorder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResponseRecorder")
            .field("status", &self.status)
            .field("headers", &self.headers)
            .field("body_len", &self.body.len())
            .field("wrote_header", &self.wrote_header)
            .field("flushed", &self.flushed)
            .finish()
    }
}

/// Guesses a content type from the first bytes of a body.
///
/// Only the first 512 bytes are considered. Text is recognized by the absence
/// of binary control bytes, so a chunk that ends inside a multi-byte UTF-8
/// sequence is still text.
fn detect_content_type(data: &[u8]) -> &'static str {
    const SNIFF_LEN: usize = 512;
    const HTML_PREFIXES: [&[u8]; 4] = [b"<!doctype html", b"<html", b"<head", b"<body"];

    let data = &data[..data.len().min(SNIFF_LEN)];

    let start = data
        .iter()
        .position(|b| !matches!(b, b'\t' | b'\n' | b'\x0c' | b'\r' | b' '))
        .unwrap_or(data.len());
    let text = &data[start..];

    if HTML_PREFIXES
        .iter()
        .any(|p| text.len() >= p.len() && text[..p.len()].eq_ignore_ascii_case(p))
    {
        return "text/html; charset=utf-8";
    }
    if text.starts_with(b"<?xml") {
        return "text/xml; charset=utf-8";
    }
    if data.starts_with(b"%PDF-") {
        return "application/pdf";
    }
    if data.starts_with(b"\x89PNG\r\n\x1a\n") {
        return "image/png";
    }
    if data.starts_with(b"GIF87a") || data.starts_with(b"GIF89a") {
        return "image/gif";
    }
    if data.starts_with(b"\xff\xd8\xff") {
        return "image/jpeg";
    }

    let binary = data
        .iter()
        .any(|b| matches!(b, 0x00..=0x08 | 0x0b | 0x0e..=0x1a | 0x1c..=0x1f));
    if binary {
        "application/octet-stream"
    } else {
        "text/plain; charset=utf-8"
    }
}
