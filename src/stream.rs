use crate::codec::Codec;
use crate::error::WriteError;
use crate::sink::ResponseSink;
use compression_codecs::EncodeV2;
use compression_core::util::{PartialBuffer, WriteBuffer};
use std::io;

const OUTPUT_BUFFER_SIZE: usize = 8 * 1024; // 8KB output buffer

/// A compressing writer in front of a response sink.
///
/// Compressed output is forwarded to the sink as soon as the encoder produces
/// it. The stream must be [`finish`](Self::finish)ed to emit the trailer;
/// dropping it early releases the encoder and leaves the body truncated.
pub(crate) struct CompressStream<'a, S: ?Sized> {
    codec: Codec,
    encoder: Box<dyn EncodeV2 + Send>,
    output_buffer: Vec<u8>,
    sink: &'a mut S,
}

impl<'a, S: ResponseSink + ?Sized> CompressStream<'a, S> {
    /// Opens a stream for `codec` over `sink`.
    pub(crate) fn new(codec: Codec, sink: &'a mut S) -> Self {
        Self {
            codec,
            encoder: codec.encoder(),
            output_buffer: vec![0u8; OUTPUT_BUFFER_SIZE],
            sink,
        }
    }

    /// Compresses all of `input`, forwarding output to the sink.
    pub(crate) fn write_all(&mut self, input: &[u8]) -> Result<(), WriteError> {
        let mut input_buf = PartialBuffer::new(input);

        // Keep encoding until all input is consumed
        while input_buf.written_len() < input.len() {
            let consumed_before = input_buf.written_len();
            let mut output = WriteBuffer::new_initialized(self.output_buffer.as_mut_slice());

            self.encoder
                .encode(&mut input_buf, &mut output)
                .map_err(|source| WriteError::Encode {
                    codec: self.codec,
                    source,
                })?;

            let written = output.written_len();
            if written > 0 {
                self.sink
                    .write(&self.output_buffer[..written])
                    .map_err(WriteError::Sink)?;
            } else if input_buf.written_len() == consumed_before {
                return Err(WriteError::Encode {
                    codec: self.codec,
                    source: io::Error::other("encoder made no progress"),
                });
            }
        }

        Ok(())
    }

    /// Finishes the stream, forwarding the remaining output and trailer.
    pub(crate) fn finish(mut self) -> Result<(), WriteError> {
        loop {
            let mut output = WriteBuffer::new_initialized(self.output_buffer.as_mut_slice());

            let done = self
                .encoder
                .finish(&mut output)
                .map_err(|source| WriteError::Finish {
                    codec: self.codec,
                    source,
                })?;

            let written = output.written_len();
            if written > 0 {
                self.sink
                    .write(&self.output_buffer[..written])
                    .map_err(WriteError::Sink)?;
            }
            if done {
                return Ok(());
            }
        }
    }
}
