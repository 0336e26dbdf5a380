//! The response-writer capability and the shape of a handler under test.

use bytes::Bytes;
use http::{HeaderMap, Request, StatusCode};
use std::io;

/// Something a handler writes its response into.
///
/// Handlers under test set headers through [`headers_mut`](Self::headers_mut),
/// optionally write a status line, and then stream body chunks. Writing the
/// body before the status implies `200 OK`.
pub trait ResponseWriter {
    /// Mutable access to the response headers.
    ///
    /// Changes made after the status has been written are still visible
    /// through the live header map but are not part of the response snapshot.
    fn headers_mut(&mut self) -> &mut HeaderMap;

    /// Writes the response status. Only the first call has an effect.
    fn write_status(&mut self, status: StatusCode);

    /// Appends a chunk to the response body, returning the number of bytes
    /// accepted.
    fn write_body(&mut self, chunk: &[u8]) -> io::Result<usize>;

    /// Appends UTF-8 text to the response body.
    fn write_text(&mut self, text: &str) -> io::Result<usize> {
        self.write_body(text.as_bytes())
    }

    /// Flushes buffered output to the client.
    fn flush(&mut self) {}
}

/// A handler that writes a response for a request.
///
/// Any `Fn(&mut dyn ResponseWriter, &Request<Bytes>)` is a handler, so plain
/// functions can be passed directly:
///
/// ```
/// use bytes::Bytes;
/// use http::{Request, StatusCode};
/// use httprec::{ResponseCapture, ResponseWriter};
///
/// fn created(w: &mut dyn ResponseWriter, _req: &Request<Bytes>) {
///     w.write_status(StatusCode::CREATED);
/// }
///
/// let request = Request::new(Bytes::new());
/// let mut capture = ResponseCapture::new();
/// capture.serve(&created, &request);
/// assert_eq!(capture.expect_status(201), (201, true));
/// ```
pub trait Handler {
    /// Serves `request`, writing the response into `writer`.
    fn serve(&self, writer: &mut dyn ResponseWriter, request: &Request<Bytes>);
}

impl<F> Handler for F
where
    F: Fn(&mut dyn ResponseWriter, &Request<Bytes>),
{
    fn serve(&self, writer: &mut dyn ResponseWriter, request: &Request<Bytes>) {
        self(writer, request);
    }
}
