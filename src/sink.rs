use bytes::{Bytes, BytesMut};
use http::header::{self, HeaderMap, HeaderName, HeaderValue};
use http::{Response, StatusCode, response::Parts};
use http_body_util::Full;
use std::io;

/// Destination of a negotiated response.
///
/// A sink accepts header updates until the first body write commits the
/// response head. Body bytes are written in order and never retried.
pub trait ResponseSink {
    /// Sets a response header, replacing any previous values.
    fn set_header(&mut self, name: HeaderName, value: HeaderValue);

    /// Writes a chunk of body bytes.
    ///
    /// The first call commits the status line and headers.
    fn write(&mut self, buf: &[u8]) -> io::Result<()>;
}

impl<S: ResponseSink + ?Sized> ResponseSink for &mut S {
    fn set_header(&mut self, name: HeaderName, value: HeaderValue) {
        (**self).set_header(name, value)
    }

    fn write(&mut self, buf: &[u8]) -> io::Result<()> {
        (**self).write(buf)
    }
}

impl<S: ResponseSink + ?Sized> ResponseSink for Box<S> {
    fn set_header(&mut self, name: HeaderName, value: HeaderValue) {
        (**self).set_header(name, value)
    }

    fn write(&mut self, buf: &[u8]) -> io::Result<()> {
        (**self).write(buf)
    }
}

/// A sink that collects the response in memory.
#[derive(Debug)]
pub struct BufferedSink {
    parts: Parts,
    body: BytesMut,
    committed: bool,
}

impl BufferedSink {
    /// Creates an empty sink with a `200 OK` status.
    pub fn new() -> Self {
        let (parts, ()) = Response::new(()).into_parts();
        Self::from_parts(parts)
    }

    /// Creates a sink seeded with an existing response head.
    pub fn from_parts(parts: Parts) -> Self {
        Self {
            parts,
            body: BytesMut::new(),
            committed: false,
        }
    }

    /// Sets the status code. Ignored once the response is committed.
    pub fn set_status(&mut self, status: StatusCode) {
        if self.committed {
            tracing::warn!(%status, "status set after response body started, ignoring");
            return;
        }
        self.parts.status = status;
    }

    /// Returns the status code.
    pub fn status(&self) -> StatusCode {
        self.parts.status
    }

    /// Returns the headers written so far.
    pub fn headers(&self) -> &HeaderMap {
        &self.parts.headers
    }

    /// Returns the body bytes written so far.
    pub fn body(&self) -> &[u8] {
        &self.body
    }

    /// Returns whether a body write has committed the head.
    pub fn is_committed(&self) -> bool {
        self.committed
    }

    /// Converts the collected head and body into a response.
    ///
    /// `Content-Length` is set to the number of body bytes written.
    pub fn into_response(self) -> Response<Full<Bytes>> {
        let Self {
            mut parts, body, ..
        } = self;
        parts
            .headers
            .insert(header::CONTENT_LENGTH, HeaderValue::from(body.len()));
        Response::from_parts(parts, Full::new(body.freeze()))
    }
}

impl Default for BufferedSink {
    fn default() -> Self {
        Self::new()
    }
}

impl ResponseSink for BufferedSink {
    fn set_header(&mut self, name: HeaderName, value: HeaderValue) {
        if self.committed {
            tracing::warn!(header = %name, "header set after response body started, dropping");
            return;
        }
        self.parts.headers.insert(name, value);
    }

    fn write(&mut self, buf: &[u8]) -> io::Result<()> {
        self.committed = true;
        self.body.extend_from_slice(buf);
        Ok(())
    }
}

/// Adds Accept-Encoding to the Vary header if not already present.
pub(crate) fn add_vary_accept_encoding(headers: &mut HeaderMap) {
    for vary in headers.get_all(header::VARY) {
        if let Ok(vary_str) = vary.to_str() {
            let covered = vary_str.split(',').any(|v| {
                let v = v.trim();
                v == "*" || v.eq_ignore_ascii_case("accept-encoding")
            });
            if covered {
                return;
            }
        }
    }

    headers.append(
        header::VARY,
        HeaderValue::from_static("accept-encoding"),
    );
}
