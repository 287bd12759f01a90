//! Compression context for the continuous zlib stream
//!
//! The server compresses the whole connection as one deflate stream and
//! flushes it at message boundaries, so one binary frame inflates to
//! one logical JSON message. The inflate context carries window state
//! across frames and therefore lives exactly as long as its socket: a
//! reconnect always gets a fresh [`Inflater`].

use flate2::{Decompress, FlushDecompress, Status};

/// Scratch buffer size per inflate step
const INFLATE_CHUNK: usize = 16 * 1024;

/// Errors from feeding one frame through the context
#[derive(Debug, thiserror::Error)]
pub enum InflateError {
    /// The frame did not inflate; the stream window is abandoned and
    /// restarted, subsequent frames are attempted normally
    #[error("decompression failed: {0}")]
    Corrupt(#[from] flate2::DecompressError),

    /// The inflated frame was not valid UTF-8
    #[error("decompressed frame is not valid UTF-8")]
    InvalidText(#[from] std::string::FromUtf8Error),
}

/// Stateful decompressor for one WebSocket connection
#[derive(Debug)]
pub struct Inflater {
    ctx: Decompress,
}

impl Inflater {
    /// Create a fresh context (one per connection)
    #[must_use]
    pub fn new() -> Self {
        Self {
            ctx: Decompress::new(true),
        }
    }

    /// Inflate one binary frame into JSON text
    ///
    /// Returns `Ok(None)` when the frame produced no output (a flush
    /// marker with nothing buffered); the caller skips it without
    /// dispatching. Errors are recoverable: the context resets its
    /// window and stays usable for subsequent frames.
    pub fn feed(&mut self, chunk: &[u8]) -> Result<Option<String>, InflateError> {
        let mut out = Vec::with_capacity(chunk.len().saturating_mul(3));
        let mut consumed = 0usize;

        loop {
            let mut scratch = [0u8; INFLATE_CHUNK];
            let before_in = self.ctx.total_in();
            let before_out = self.ctx.total_out();

            let status = match self
                .ctx
                .decompress(&chunk[consumed..], &mut scratch, FlushDecompress::Sync)
            {
                Ok(status) => status,
                Err(err) => {
                    self.ctx.reset(true);
                    return Err(err.into());
                }
            };

            let consumed_step = (self.ctx.total_in() - before_in) as usize;
            let produced = (self.ctx.total_out() - before_out) as usize;
            consumed += consumed_step;
            out.extend_from_slice(&scratch[..produced]);

            match status {
                Status::StreamEnd => break,
                Status::Ok | Status::BufError => {
                    // Done once the input is drained and the scratch
                    // buffer was not filled to the brim (nothing left
                    // buffered inside zlib). A fully stalled step ends
                    // the loop too.
                    if consumed >= chunk.len() && produced < scratch.len() {
                        break;
                    }
                    if consumed_step == 0 && produced == 0 {
                        break;
                    }
                }
            }
        }

        if out.is_empty() {
            return Ok(None);
        }

        String::from_utf8(out).map(Some).map_err(InflateError::from)
    }
}

impl Default for Inflater {
    fn default() -> Self {
        Self::new()
    }
}
