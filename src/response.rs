use crate::codec::CodecSet;
use crate::error::WriteError;
use crate::negotiate::{Negotiator, accept_encoding};
use crate::sink::{BufferedSink, add_vary_accept_encoding};
use bytes::Bytes;
use http::{Request, Response};
use http_body_util::Full;
use std::future::{Ready, ready};
use std::task::{Context, Poll};
use tower::Service;

/// A Tower service that answers every request with the same payload.
///
/// The payload is fixed at construction and shared by clones of the service.
/// Each response gets its encoding negotiated from the request's
/// Accept-Encoding header and a Content-Type sniffed from the payload.
#[derive(Debug, Clone)]
pub struct FixedResponse {
    payload: Bytes,
    negotiator: Negotiator,
}

impl FixedResponse {
    /// Creates a service serving `payload`, negotiating over all codecs.
    pub fn new(payload: impl Into<Bytes>) -> Self {
        Self {
            payload: payload.into(),
            negotiator: Negotiator::default(),
        }
    }

    /// Restricts the codecs the service may choose.
    pub fn codecs(mut self, codecs: CodecSet) -> Self {
        self.negotiator = Negotiator::new(codecs);
        self
    }

    /// Returns the payload served.
    pub fn payload(&self) -> &Bytes {
        &self.payload
    }

    /// Builds the response for a raw Accept-Encoding value.
    pub fn respond(&self, accept_encoding: &str) -> Result<Response<Full<Bytes>>, WriteError> {
        let mut sink = BufferedSink::new();
        self.negotiator
            .serve(accept_encoding, &self.payload, &mut sink)?;

        let mut response = sink.into_response();
        add_vary_accept_encoding(response.headers_mut());
        Ok(response)
    }
}

impl<B> Service<Request<B>> for FixedResponse {
    type Response = Response<Full<Bytes>>;
    type Error = WriteError;
    type Future = Ready<Result<Self::Response, Self::Error>>;

    fn poll_ready(&mut self, _cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        Poll::Ready(Ok(()))
    }

    fn call(&mut self, req: Request<B>) -> Self::Future {
        let result = self.respond(accept_encoding(req.headers()));
        if let Err(err) = &result {
            tracing::debug!(error = %err, "failed to write fixed response");
        }
        ready(result)
    }
}
