use crate::codec::{Codec, CodecSet};
use crate::error::WriteError;
use crate::sink::ResponseSink;
use crate::sniff::detect_content_type;
use crate::stream::CompressStream;
use http::header::{self, HeaderMap, HeaderValue};
use std::fmt;

/// The encoding chosen for a single response.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// The body is compressed with the codec.
    Compressed(Codec),
    /// The body is written unmodified.
    Identity,
}

impl Outcome {
    /// Returns the codec, if the body is compressed.
    pub fn codec(&self) -> Option<Codec> {
        match self {
            Outcome::Compressed(codec) => Some(*codec),
            Outcome::Identity => None,
        }
    }

    /// Returns the Content-Encoding header value written for this outcome.
    ///
    /// Identity responses are labelled `deflate` although their bytes are not
    /// compressed.
    pub fn content_encoding(&self) -> &'static str {
        match self {
            Outcome::Compressed(codec) => codec.content_encoding(),
            Outcome::Identity => Codec::Deflate.content_encoding(),
        }
    }
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Outcome::Compressed(codec) => fmt::Display::fmt(codec, f),
            Outcome::Identity => f.write_str("identity"),
        }
    }
}

/// Negotiates the response encoding and writes the body.
#[derive(Debug, Clone, Copy, Default)]
pub struct Negotiator {
    codecs: CodecSet,
}

impl Negotiator {
    /// Creates a negotiator that may choose any codec in `codecs`.
    pub fn new(codecs: CodecSet) -> Self {
        Self { codecs }
    }

    /// Returns the codecs this negotiator may choose.
    pub fn codecs(&self) -> CodecSet {
        self.codecs
    }

    /// Chooses the outcome for a request's raw Accept-Encoding value.
    pub fn negotiate(&self, accept_encoding: &str) -> Outcome {
        self.codecs
            .select(accept_encoding)
            .map_or(Outcome::Identity, Outcome::Compressed)
    }

    /// Writes `payload` to `sink` using the encoding negotiated from
    /// `accept_encoding`.
    ///
    /// `Content-Type` is sniffed from the uncompressed payload and set
    /// together with `Content-Encoding` before the first body byte is
    /// written. A compression stream is always finished before returning
    /// `Ok`, so the body is complete on success.
    ///
    /// # Errors
    ///
    /// Returns the first sink or encoder failure. Nothing is retried and no
    /// other encoding is attempted.
    pub fn serve<S>(
        &self,
        accept_encoding: &str,
        payload: &[u8],
        sink: &mut S,
    ) -> Result<(), WriteError>
    where
        S: ResponseSink + ?Sized,
    {
        let outcome = self.negotiate(accept_encoding);
        let content_type = detect_content_type(payload);

        tracing::debug!(
            encoding = %outcome,
            content_type,
            len = payload.len(),
            "serving negotiated response"
        );

        sink.set_header(header::CONTENT_TYPE, HeaderValue::from_static(content_type));
        sink.set_header(
            header::CONTENT_ENCODING,
            HeaderValue::from_static(outcome.content_encoding()),
        );

        match outcome {
            Outcome::Compressed(codec) => {
                let mut stream = CompressStream::new(codec, sink);
                stream.write_all(payload)?;
                stream.finish()
            }
            // The first write commits the default status if none was set
            Outcome::Identity => sink.write(payload).map_err(WriteError::Sink),
        }
    }
}

/// Returns the raw Accept-Encoding value of a request.
///
/// A missing header, or one that is not visible ASCII, reads as empty.
pub(crate) fn accept_encoding(headers: &HeaderMap) -> &str {
    headers
        .get(header::ACCEPT_ENCODING)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sink::BufferedSink;
    use http::header::{HeaderName, HeaderValue};
    use std::io::{self, Read};

    fn gunzip(data: &[u8]) -> Vec<u8> {
        let mut out = Vec::new();
        flate2::read::GzDecoder::new(data)
            .read_to_end(&mut out)
            .unwrap();
        out
    }

    fn inflate(data: &[u8]) -> Vec<u8> {
        let mut out = Vec::new();
        flate2::read::DeflateDecoder::new(data)
            .read_to_end(&mut out)
            .unwrap();
        out
    }

    fn serve(negotiator: Negotiator, accept_encoding: &str, payload: &[u8]) -> BufferedSink {
        let mut sink = BufferedSink::new();
        negotiator
            .serve(accept_encoding, payload, &mut sink)
            .unwrap();
        sink
    }

    fn header_str<'a>(sink: &'a BufferedSink, name: HeaderName) -> &'a str {
        sink.headers().get(name).unwrap().to_str().unwrap()
    }

    #[derive(Debug, PartialEq)]
    enum Event {
        Header(HeaderName),
        Write,
    }

    /// Records the order of sink calls and optionally fails writes.
    struct RecordingSink {
        events: Vec<Event>,
        fail_writes: bool,
    }

    impl RecordingSink {
        fn new(fail_writes: bool) -> Self {
            Self {
                events: Vec::new(),
                fail_writes,
            }
        }
    }

    impl ResponseSink for RecordingSink {
        fn set_header(&mut self, name: HeaderName, _value: HeaderValue) {
            self.events.push(Event::Header(name));
        }

        fn write(&mut self, _buf: &[u8]) -> io::Result<()> {
            self.events.push(Event::Write);
            if self.fail_writes {
                Err(io::ErrorKind::ConnectionReset.into())
            } else {
                Ok(())
            }
        }
    }

    #[test]
    fn test_negotiate_priority() {
        let negotiator = Negotiator::default();
        assert_eq!(
            negotiator.negotiate("gzip, deflate"),
            Outcome::Compressed(Codec::Gzip)
        );
        assert_eq!(
            negotiator.negotiate("br, deflate"),
            Outcome::Compressed(Codec::Deflate)
        );
        assert_eq!(negotiator.negotiate(""), Outcome::Identity);
        assert_eq!(negotiator.negotiate("br"), Outcome::Identity);
    }

    #[test]
    fn test_negotiate_gzip_only() {
        let negotiator = Negotiator::new(CodecSet::gzip_only());
        assert_eq!(negotiator.negotiate("deflate"), Outcome::Identity);
        assert_eq!(
            negotiator.negotiate("deflate, gzip"),
            Outcome::Compressed(Codec::Gzip)
        );
    }

    #[test]
    fn test_outcome_labels() {
        assert_eq!(Outcome::Compressed(Codec::Gzip).content_encoding(), "gzip");
        assert_eq!(Outcome::Identity.content_encoding(), "deflate");
        assert_eq!(Outcome::Identity.to_string(), "identity");
        assert_eq!(Outcome::Identity.codec(), None);
    }

    #[test]
    fn test_serve_gzip() {
        let payload = b"<h1>Welcome to this webpage.</h1>";
        let sink = serve(Negotiator::default(), "gzip, deflate", payload);

        assert_eq!(header_str(&sink, header::CONTENT_ENCODING), "gzip");
        assert_eq!(
            header_str(&sink, header::CONTENT_TYPE),
            "text/html; charset=utf-8"
        );
        assert_eq!(gunzip(sink.body()), payload);
    }

    #[test]
    fn test_serve_deflate() {
        let payload = b"<h1>Welcome to this webpage.</h1>";
        let sink = serve(Negotiator::default(), "br, deflate", payload);

        assert_eq!(header_str(&sink, header::CONTENT_ENCODING), "deflate");
        assert_eq!(
            header_str(&sink, header::CONTENT_TYPE),
            "text/html; charset=utf-8"
        );
        assert_eq!(inflate(sink.body()), payload);
    }

    #[test]
    fn test_serve_identity_keeps_deflate_label() {
        let payload = b"<h1>Welcome to this webpage.</h1>";
        let sink = serve(Negotiator::default(), "", payload);

        assert_eq!(header_str(&sink, header::CONTENT_ENCODING), "deflate");
        assert_eq!(
            header_str(&sink, header::CONTENT_TYPE),
            "text/html; charset=utf-8"
        );
        assert_eq!(sink.body(), payload);
        assert_eq!(sink.status(), http::StatusCode::OK);
    }

    #[test]
    fn test_serve_gzip_only_sets_content_type_on_identity() {
        let sink = serve(
            Negotiator::new(CodecSet::gzip_only()),
            "deflate",
            b"plain words",
        );

        assert_eq!(header_str(&sink, header::CONTENT_ENCODING), "deflate");
        assert_eq!(
            header_str(&sink, header::CONTENT_TYPE),
            "text/plain; charset=utf-8"
        );
        assert_eq!(sink.body(), b"plain words");
    }

    #[test]
    fn test_content_type_from_uncompressed_payload() {
        let png = b"\x89PNG\x0D\x0A\x1A\x0A\x00\x00\x00\x0DIHDR";
        for accept in ["gzip", "deflate", ""] {
            let sink = serve(Negotiator::default(), accept, png);
            assert_eq!(header_str(&sink, header::CONTENT_TYPE), "image/png");
        }
    }

    #[test]
    fn test_round_trip_sizes() {
        let large: Vec<u8> = (0..64 * 1024).map(|i| (i % 251) as u8).collect();
        let binary = vec![0x00, 0xFF, 0xFE, 0x80, 0xC3, 0x28, 0x1F, 0x8B];
        let payloads: [&[u8]; 4] = [b"", b"x", &large, &binary];

        for payload in payloads {
            let gz = serve(Negotiator::default(), "gzip", payload);
            assert_eq!(gunzip(gz.body()), payload);

            let fl = serve(Negotiator::default(), "deflate", payload);
            assert_eq!(inflate(fl.body()), payload);

            let id = serve(Negotiator::default(), "identity", payload);
            assert_eq!(id.body(), payload);
        }
    }

    #[test]
    fn test_serve_is_idempotent() {
        let payload = b"the same bytes every time, the same bytes every time";
        for accept in ["gzip", "deflate", ""] {
            let first = serve(Negotiator::default(), accept, payload);
            let second = serve(Negotiator::default(), accept, payload);
            assert_eq!(first.body(), second.body());
            assert_eq!(first.headers(), second.headers());
        }
    }

    #[test]
    fn test_headers_set_before_body() {
        for accept in ["gzip", "deflate", ""] {
            let mut sink = RecordingSink::new(false);
            Negotiator::default()
                .serve(accept, b"some body", &mut sink)
                .unwrap();

            assert_eq!(
                &sink.events[..2],
                &[
                    Event::Header(header::CONTENT_TYPE),
                    Event::Header(header::CONTENT_ENCODING),
                ]
            );
            assert!(sink.events[2..].iter().all(|e| *e == Event::Write));
            assert!(sink.events.len() > 2);
        }
    }

    #[test]
    fn test_write_failure_is_returned_once() {
        for accept in ["gzip", "deflate", ""] {
            let mut sink = RecordingSink::new(true);
            let err = Negotiator::default()
                .serve(accept, b"some body", &mut sink)
                .unwrap_err();

            assert!(matches!(err, WriteError::Sink(ref e) if e.kind() == io::ErrorKind::ConnectionReset));
            // No retry and no fallback after the failed write
            let writes = sink.events.iter().filter(|e| **e == Event::Write).count();
            assert_eq!(writes, 1);
        }
    }

    #[test]
    fn test_accept_encoding_header() {
        let mut headers = HeaderMap::new();
        assert_eq!(accept_encoding(&headers), "");

        headers.insert(header::ACCEPT_ENCODING, HeaderValue::from_static("gzip, br"));
        assert_eq!(accept_encoding(&headers), "gzip, br");

        headers.insert(
            header::ACCEPT_ENCODING,
            HeaderValue::from_bytes(b"gzip\xFF").unwrap(),
        );
        assert_eq!(accept_encoding(&headers), "");
    }

    #[test]
    fn test_serve_through_trait_object() {
        let mut sink: Box<dyn ResponseSink> = Box::new(BufferedSink::new());
        Negotiator::default()
            .serve("gzip", b"boxed", sink.as_mut())
            .unwrap();
    }
}
