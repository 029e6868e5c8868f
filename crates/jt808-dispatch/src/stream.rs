use std::io::{Read, Write};

use jt808_frame::{FrameError, FrameReader};
use tracing::{debug, warn};

use crate::error::Result;
use crate::handler::Handler;
use crate::processor::{Disposition, Processor};

/// Counters for one processed stream.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StreamStats {
    /// Raw frames handed to the processor.
    pub frames: u64,
    pub handled: u64,
    pub suppressed: u64,
    pub ignored: u64,
    pub dropped: u64,
    /// Spans discarded by the scanner for exceeding the frame size limit.
    pub oversized: u64,
}

impl StreamStats {
    fn record(&mut self, disposition: &Disposition) {
        self.frames += 1;
        match disposition {
            Disposition::Handled => self.handled += 1,
            Disposition::Suppressed => self.suppressed += 1,
            Disposition::Ignored => self.ignored += 1,
            Disposition::Dropped(_) => self.dropped += 1,
        }
    }
}

/// Feed every frame from `reader` through `processor`, writing responses to
/// `writer`, until the peer closes the stream.
///
/// Oversized frames are counted and skipped. Read errors and errors that
/// escape the handler's filter end the stream.
pub fn process_stream<R, W, H>(
    reader: &mut FrameReader<R>,
    writer: &mut W,
    processor: &mut Processor<H>,
) -> Result<StreamStats>
where
    R: Read,
    W: Write,
    H: Handler,
{
    let mut stats = StreamStats::default();
    loop {
        let frame = match reader.read_frame() {
            Ok(frame) => frame,
            Err(FrameError::ConnectionClosed) => {
                debug!(frames = stats.frames, "stream closed by peer");
                return Ok(stats);
            }
            Err(err @ FrameError::FrameTooLarge { .. }) => {
                warn!(error = %err, "skipping oversized frame");
                stats.oversized += 1;
                continue;
            }
            Err(err) => return Err(err.into()),
        };

        let disposition = processor.process(writer, &frame)?;
        stats.record(&disposition);
    }
}
