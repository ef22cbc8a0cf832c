use crate::codec::CodecSet;
use crate::future::ResponseFuture;
use crate::negotiate::{Negotiator, accept_encoding};
use http::{Method, Request};
use http_body::Body;
use std::task::{Context, Poll};
use tower::{BoxError, Service};

/// A Tower service that negotiates encoding for buffered response bodies.
#[derive(Debug, Clone)]
pub struct CompressionService<S> {
    inner: S,
    negotiator: Negotiator,
}

impl<S> CompressionService<S> {
    /// Creates a new compression service wrapping the given inner service.
    pub fn new(inner: S, codecs: CodecSet) -> Self {
        Self {
            inner,
            negotiator: Negotiator::new(codecs),
        }
    }

    /// Returns a reference to the inner service.
    pub fn inner(&self) -> &S {
        &self.inner
    }

    /// Returns a mutable reference to the inner service.
    pub fn inner_mut(&mut self) -> &mut S {
        &mut self.inner
    }

    /// Consumes this service, returning the inner service.
    pub fn into_inner(self) -> S {
        self.inner
    }
}

impl<S, ReqBody, ResBody> Service<Request<ReqBody>> for CompressionService<S>
where
    S: Service<Request<ReqBody>, Response = http::Response<ResBody>>,
    S::Error: Into<BoxError>,
    ResBody: Body,
    ResBody::Error: Into<BoxError>,
{
    type Response = http::Response<http_body_util::Full<bytes::Bytes>>;
    type Error = BoxError;
    type Future = ResponseFuture<S::Future, ResBody>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx).map_err(Into::into)
    }

    fn call(&mut self, req: Request<ReqBody>) -> Self::Future {
        // Owned copy, the request moves into the inner service
        let accept_encoding = accept_encoding(req.headers()).to_owned();
        let head = *req.method() == Method::HEAD;

        let inner = self.inner.call(req);

        ResponseFuture::new(inner, accept_encoding, self.negotiator, head)
    }
}
