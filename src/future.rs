use crate::negotiate::Negotiator;
use crate::sink::{BufferedSink, add_vary_accept_encoding};
use bytes::Bytes;
use http::{Response, StatusCode, header, response::Parts};
use http_body::Body;
use http_body_util::{BodyExt, Full, combinators::Collect};
use pin_project_lite::pin_project;
use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll, ready};
use tower::BoxError;

pin_project! {
    /// Future for compression service responses.
    pub struct ResponseFuture<F, B>
    where
        B: Body,
    {
        #[pin]
        state: State<F, B>,
        accept_encoding: String,
        negotiator: Negotiator,
        head: bool,
    }
}

pin_project! {
    #[project = StateProj]
    #[project_replace = StateProjReplace]
    enum State<F, B>
    where
        B: Body,
    {
        /// Waiting for the inner service.
        Inner {
            #[pin]
            future: F,
        },
        /// Collecting the inner response body.
        Collect {
            #[pin]
            collect: Collect<B>,
            parts: Parts,
        },
        /// The response has been returned.
        Done,
    }
}

impl<F, B: Body> ResponseFuture<F, B> {
    pub(crate) fn new(
        inner: F,
        accept_encoding: String,
        negotiator: Negotiator,
        head: bool,
    ) -> Self {
        Self {
            state: State::Inner { future: inner },
            accept_encoding,
            negotiator,
            head,
        }
    }
}

impl<F, B, E> Future for ResponseFuture<F, B>
where
    F: Future<Output = Result<Response<B>, E>>,
    E: Into<BoxError>,
    B: Body,
    B::Error: Into<BoxError>,
{
    type Output = Result<Response<Full<Bytes>>, BoxError>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        loop {
            let mut this = self.as_mut().project();

            match this.state.as_mut().project() {
                StateProj::Inner { future } => {
                    let response = match ready!(future.poll(cx)) {
                        Ok(response) => response,
                        Err(e) => {
                            this.state.set(State::Done);
                            return Poll::Ready(Err(e.into()));
                        }
                    };
                    let (parts, body) = response.into_parts();
                    this.state.set(State::Collect {
                        collect: body.collect(),
                        parts,
                    });
                }
                StateProj::Collect { collect, .. } => {
                    let collected = ready!(collect.poll(cx));
                    let StateProjReplace::Collect { parts, .. } =
                        this.state.as_mut().project_replace(State::Done)
                    else {
                        unreachable!("state was Collect");
                    };
                    let body = match collected {
                        Ok(collected) => collected.to_bytes(),
                        Err(e) => return Poll::Ready(Err(e.into())),
                    };
                    return Poll::Ready(encode_response(
                        parts,
                        body,
                        this.accept_encoding,
                        *this.negotiator,
                        *this.head,
                    ));
                }
                StateProj::Done => panic!("ResponseFuture polled after completion"),
            }
        }
    }
}

/// Runs a buffered response through the negotiator.
///
/// Responses that are already encoded, carry a byte range, answer a HEAD
/// request, or have a status that forbids a body are passed through untouched.
fn encode_response(
    parts: Parts,
    body: Bytes,
    accept_encoding: &str,
    negotiator: Negotiator,
    head: bool,
) -> Result<Response<Full<Bytes>>, BoxError> {
    if has_content_encoding(&parts.headers) || has_content_range(&parts.headers) {
        tracing::debug!(status = %parts.status, "passing encoded or ranged response through");
        return Ok(Response::from_parts(parts, Full::new(body)));
    }
    if head || is_bodyless_status(parts.status) {
        tracing::debug!(status = %parts.status, head, "passing bodyless response through");
        return Ok(Response::from_parts(parts, Full::new(body)));
    }

    let outcome = negotiator.negotiate(accept_encoding);
    let mut sink = BufferedSink::from_parts(parts);
    if let Err(err) = negotiator.serve(accept_encoding, &body, &mut sink) {
        tracing::debug!(error = %err, "failed to encode buffered response");
        return Err(err.into());
    }

    let mut response = sink.into_response();
    if outcome.codec().is_some() {
        // Byte offsets of the compressed body no longer match the resource
        response.headers_mut().remove(header::ACCEPT_RANGES);
    }
    add_vary_accept_encoding(response.headers_mut());
    Ok(response)
}

/// Checks if Content-Encoding header is already present.
fn has_content_encoding(headers: &header::HeaderMap) -> bool {
    headers.contains_key(header::CONTENT_ENCODING)
}

/// Checks if Content-Range header is present (range response).
fn has_content_range(headers: &header::HeaderMap) -> bool {
    headers.contains_key(header::CONTENT_RANGE)
}

/// 1xx, 204 and 304 responses never carry a body.
fn is_bodyless_status(status: StatusCode) -> bool {
    status.is_informational()
        || status == StatusCode::NO_CONTENT
        || status == StatusCode::NOT_MODIFIED
}
