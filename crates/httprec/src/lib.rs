//! # httprec
//!
//! In-memory HTTP response recording for handler tests.
//!
//! A [`ResponseCapture`] is handed to the handler under test as its
//! [`ResponseWriter`]. Afterwards the test compares what was written:
//!
//! - [`expect_status`](ResponseCapture::expect_status): status equality
//! - [`expect_bytes`](ResponseCapture::expect_bytes): body equality, optionally
//!   tolerating one trailing newline
//! - [`expect_json`](ResponseCapture::expect_json): decode the body and compare
//!   it with an expected value of the same type
//! - [`expect_content_type`](ResponseCapture::expect_content_type): base media
//!   type of `Content-Type`, parameters ignored
//!
//! Each returns the actual value alongside a `bool`, so a mismatch is an
//! ordinary test failure rather than an error.
//!
//! ## Example
//!
//! ```
//! use bytes::Bytes;
//! use http::{header, HeaderValue, Request, StatusCode};
//! use httprec::{ResponseCapture, ResponseWriter, TestRequest};
//!
//! fn hello(w: &mut dyn ResponseWriter, req: &Request<Bytes>) {
//!     w.headers_mut().insert(
//!         header::CONTENT_TYPE,
//!         HeaderValue::from_static("text/plain; charset=utf-8"),
//!     );
//!     w.write_status(StatusCode::OK);
//!     w.write_text(&format!("hello {}\n", req.uri().path())).unwrap();
//! }
//!
//! let request = TestRequest::get("/world").build().unwrap();
//! let mut capture = ResponseCapture::new();
//! capture.serve(&hello, &request);
//!
//! assert_eq!(capture.expect_status(200), (200, true));
//! assert!(capture.expect_bytes(b"hello /world", false).1);
//! assert!(!capture.expect_bytes(b"hello /world", true).1);
//! assert!(capture.expect_content_type("text/plain").1);
//! ```
//!
//! Handlers that return an `http::Response` instead of writing into a
//! writer can be recorded with [`ResponseCapture::record`].

#![doc(html_root_url = "https://docs.rs/httprec/0.1.0")]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

mod capture;
pub mod config;
mod error;
pub mod logging;
pub mod media;
mod recorder;
mod request;
mod writer;

pub use capture::ResponseCapture;
pub use config::CaptureConfig;
pub use error::{CaptureError, CaptureResult};
pub use recorder::ResponseRecorder;
pub use request::{TestRequest, TestRequestBuilder};
pub use writer::{Handler, ResponseWriter};
