use crate::codec::CodecSet;
use crate::service::CompressionService;
use tower::Layer;

/// A Tower layer that negotiates encoding for buffered response bodies.
///
/// This layer wraps services and runs their responses through a
/// [`Negotiator`](crate::Negotiator) based on the client's Accept-Encoding
/// header. Response bodies are collected fully in memory first.
///
/// The inner response's status and headers are kept, except that
/// Content-Type is replaced by the type sniffed from the collected body and
/// Content-Length is recomputed. Accept-Ranges is removed when the body is
/// compressed.
///
/// Responses are passed through untouched when they already carry
/// Content-Encoding or Content-Range, answer a HEAD request, or have a 1xx,
/// 204 or 304 status.
#[derive(Debug, Clone, Default)]
pub struct CompressionLayer {
    codecs: CodecSet,
}

impl CompressionLayer {
    /// Creates a compression layer that may choose gzip or deflate.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the codecs the layer may choose.
    pub fn codecs(mut self, codecs: CodecSet) -> Self {
        self.codecs = codecs;
        self
    }
}

impl<S> Layer<S> for CompressionLayer {
    type Service = CompressionService<S>;

    fn layer(&self, inner: S) -> Self::Service {
        CompressionService::new(inner, self.codecs)
    }
}
