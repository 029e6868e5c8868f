//! `tokio_util` codec over the frame scanner and the stuffing encoder.

use bytes::{Bytes, BytesMut};
use tokio_util::codec::{Decoder, Encoder};

use crate::error::FrameError;
use crate::scanner::{decode_frame, DEFAULT_MAX_FRAME_SIZE};
use crate::transform::{stuff_into, WireEncode};

/// Decodes raw (still stuffed) frames and encodes `(header, body)` pairs.
#[derive(Debug, Clone)]
pub struct FrameCodec {
    max_frame_size: usize,
    resync: bool,
}

impl FrameCodec {
    pub fn new(max_frame_size: usize) -> Self {
        Self {
            max_frame_size,
            resync: false,
        }
    }
}

impl Default for FrameCodec {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_FRAME_SIZE)
    }
}

impl Decoder for FrameCodec {
    type Item = Bytes;
    type Error = FrameError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        decode_frame(src, self.max_frame_size, &mut self.resync)
    }

    fn decode_eof(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        match self.decode(src)? {
            Some(frame) => Ok(Some(frame)),
            None => {
                // A trailing partial frame can never complete.
                src.clear();
                Ok(None)
            }
        }
    }
}

impl<H, B> Encoder<(H, B)> for FrameCodec
where
    H: WireEncode,
    B: WireEncode,
{
    type Error = FrameError;

    fn encode(&mut self, item: (H, B), dst: &mut BytesMut) -> Result<(), Self::Error> {
        stuff_into(&item.0, &item.1, dst)
    }
}
