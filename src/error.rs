use crate::codec::Codec;
use std::io;
use thiserror::Error;

/// Errors that can occur while writing a negotiated response.
///
/// Every variant is fatal for the response being written. Nothing is retried
/// and no other encoding is attempted; the caller decides whether to log the
/// failure, abort the connection, or both.
#[derive(Debug, Error)]
pub enum WriteError {
    /// The sink rejected body bytes.
    #[error("failed to write response body")]
    Sink(#[source] io::Error),

    /// The encoder failed while compressing the payload.
    #[error("failed to {codec}-compress response body")]
    Encode {
        /// Codec of the failing stream.
        codec: Codec,
        /// Underlying error.
        #[source]
        source: io::Error,
    },

    /// The encoder failed while finishing the stream.
    #[error("failed to finish {codec} stream")]
    Finish {
        /// Codec of the failing stream.
        codec: Codec,
        /// Underlying error.
        #[source]
        source: io::Error,
    },
}

impl WriteError {
    /// Returns the codec of the compression stream involved, if any.
    pub fn codec(&self) -> Option<Codec> {
        match self {
            WriteError::Sink(_) => None,
            WriteError::Encode { codec, .. } | WriteError::Finish { codec, .. } => Some(*codec),
        }
    }
}
