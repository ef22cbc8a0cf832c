//! Content-Encoding negotiation and compression for fixed HTTP response bodies.
//!
//! The core is [`Negotiator::serve`]: given the raw `Accept-Encoding` value of a
//! request and a payload held in memory, it picks gzip, deflate or no
//! compression, sets `Content-Type` and `Content-Encoding` on a
//! [`ResponseSink`], and writes the body.
//!
//! Two Tower adapters are built on top of it:
//! - [`FixedResponse`] serves one immutable payload for every request.
//! - [`CompressionLayer`] buffers the body of an inner service's response and
//!   runs it through the negotiator.
//!
//! # Example
//!
//! ```ignore
//! use fixed_response_compression::{CodecSet, FixedResponse};
//!
//! let service = FixedResponse::new("<h1>Welcome to this webpage.</h1>")
//!     .codecs(CodecSet::all());
//! ```
//!
//! # Negotiation Rules
//!
//! The raw header value is searched for substrings, case-sensitively:
//! - `gzip` anywhere in the value selects gzip (default level)
//! - otherwise `deflate` anywhere selects raw deflate (fastest level)
//! - otherwise the payload is written unmodified
//!
//! Quality values and the client's listing order are ignored. Only codecs in
//! the configured [`CodecSet`] are considered.
//!
//! # Response Headers
//!
//! - `Content-Type` is sniffed from the uncompressed payload
//! - `Content-Encoding` is the chosen codec, and `deflate` for uncompressed
//!   bodies
//! - Both are set before the first body byte is written
//!
//! The Tower adapters additionally set `Content-Length` to the size of the
//! written body and add `Accept-Encoding` to `Vary`.

#![deny(missing_docs)]

mod codec;
mod error;
mod future;
mod layer;
mod negotiate;
mod response;
mod service;
mod sink;
mod sniff;
mod stream;

pub use codec::{Codec, CodecSet};
pub use error::WriteError;
pub use future::ResponseFuture;
pub use layer::CompressionLayer;
pub use negotiate::{Negotiator, Outcome};
pub use response::FixedResponse;
pub use service::CompressionService;
pub use sink::{BufferedSink, ResponseSink};
pub use sniff::{SNIFF_LEN, detect_content_type};
