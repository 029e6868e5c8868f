use bytes::{Buf, Bytes, BytesMut};

use crate::error::{FrameError, Result};
use crate::transform::SENTINEL;

/// Default limit for a single raw frame, sentinels included.
pub const DEFAULT_MAX_FRAME_SIZE: usize = 4 * 1024;

/// Outcome of one scan over buffered stream bytes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Scan {
    /// A complete `0x7E ... 0x7E` span was found.
    Frame {
        /// Offset of the opening sentinel.
        start: usize,
        /// Offset one past the closing sentinel; everything before it is consumed.
        end: usize,
    },
    /// No complete frame yet. Bytes before `discard` can never belong to a
    /// frame and may be dropped before buffering more input.
    NeedMore { discard: usize },
    /// End of input was reached without another complete frame.
    EndOfStream,
}

/// Locate the next frame in `data`.
///
/// Garbage before the first sentinel is skipped. Only complete spans are
/// reported; a trailing partial span yields [`Scan::NeedMore`] unless
/// `at_eof` is set.
pub fn scan_frame(data: &[u8], at_eof: bool) -> Scan {
    let start = data.iter().position(|&b| b == SENTINEL);

    if let Some(start) = start {
        if let Some(len) = data[start + 1..].iter().position(|&b| b == SENTINEL) {
            return Scan::Frame {
                start,
                end: start + len + 2,
            };
        }
    }

    if at_eof {
        return Scan::EndOfStream;
    }

    Scan::NeedMore {
        discard: start.unwrap_or(data.len()),
    }
}

/// Configuration for frame readers and writers.
#[derive(Debug, Clone)]
pub struct FrameConfig {
    /// Maximum raw frame size in bytes. Default: 4 KiB.
    pub max_frame_size: usize,
    /// Read timeout for blocking operations.
    pub read_timeout: Option<std::time::Duration>,
    /// Write timeout for blocking operations.
    pub write_timeout: Option<std::time::Duration>,
}

impl Default for FrameConfig {
    fn default() -> Self {
        Self {
            max_frame_size: DEFAULT_MAX_FRAME_SIZE,
            read_timeout: None,
            write_timeout: None,
        }
    }
}

/// Incremental frame extractor over an owned buffer.
///
/// Push stream chunks in, pull complete raw frames out.
#[derive(Debug)]
pub struct FrameScanner {
    buf: BytesMut,
    max_frame_size: usize,
    resync: bool,
}

impl Default for FrameScanner {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_FRAME_SIZE)
    }
}

impl FrameScanner {
    /// Create a scanner that rejects frames larger than `max_frame_size`.
    pub fn new(max_frame_size: usize) -> Self {
        Self {
            buf: BytesMut::with_capacity(max_frame_size.min(8 * 1024)),
            max_frame_size,
            resync: false,
        }
    }

    /// Append stream bytes.
    pub fn push(&mut self, data: &[u8]) {
        self.buf.extend_from_slice(data);
    }

    /// Number of buffered, not yet consumed bytes.
    pub fn buffered(&self) -> usize {
        self.buf.len()
    }

    /// Extract the next complete frame from the buffer.
    ///
    /// Returns `Ok(None)` when more data is needed.
    pub fn next_frame(&mut self) -> Result<Option<Bytes>> {
        decode_frame(&mut self.buf, self.max_frame_size, &mut self.resync)
    }

    /// Mutable access to the internal buffer, for readers that fill it directly.
    pub(crate) fn buffer_mut(&mut self) -> &mut BytesMut {
        &mut self.buf
    }
}

/// Decode one raw frame from `src`, consuming it and any garbage before it.
///
/// Returns `Ok(None)` if the buffer doesn't contain a complete frame yet.
/// A partial span longer than `max_frame_size` is dropped and reported as
/// [`FrameError::FrameTooLarge`]. `resync` is then set, and the next call
/// discards input up to and including the dropped span's closing sentinel
/// before scanning again. Callers keep `resync` alongside `src`.
///
/// Two adjacent sentinels are a closer followed by an opener; only the first
/// is consumed, so a stream that lost alignment recovers at the next frame.
pub fn decode_frame(
    src: &mut BytesMut,
    max_frame_size: usize,
    resync: &mut bool,
) -> Result<Option<Bytes>> {
    if *resync {
        match src.iter().position(|&b| b == SENTINEL) {
            Some(closer) => {
                src.advance(closer + 1);
                *resync = false;
            }
            None => {
                src.clear();
                return Ok(None);
            }
        }
    }

    loop {
        match scan_frame(src, false) {
            Scan::Frame { start, end } if end - start == 2 => src.advance(start + 1),
            Scan::Frame { start, end } => {
                src.advance(start);
                let frame = src.split_to(end - start).freeze();
                if frame.len() > max_frame_size {
                    return Err(FrameError::FrameTooLarge {
                        size: frame.len(),
                        max: max_frame_size,
                    });
                }
                return Ok(Some(frame));
            }
            Scan::NeedMore { discard } => {
                src.advance(discard);
                if src.len() > max_frame_size {
                    let size = src.len();
                    src.clear();
                    *resync = true;
                    tracing::warn!(size, max = max_frame_size, "dropping oversized partial frame");
                    return Err(FrameError::FrameTooLarge {
                        size,
                        max: max_frame_size,
                    });
                }
                return Ok(None);
            }
            Scan::EndOfStream => return Ok(None),
        }
    }
}
