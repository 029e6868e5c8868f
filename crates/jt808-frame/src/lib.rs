//! Sentinel-delimited, byte-stuffed framing for JT/T 808 streams.
//!
//! Every frame on the wire looks like:
//! - A `0x7E` sentinel
//! - The header and body, with `0x7E`/`0x7D` escaped as `0x7D 0x02`/`0x7D 0x01`
//! - An XOR checksum over the unescaped header and body
//! - A closing `0x7E` sentinel
//!
//! This crate finds frames in a byte stream, restores them to logical
//! messages, offers a bounds-checked field decoder over the result and
//! encodes outgoing frames.

pub mod bcd;
#[cfg(feature = "async")]
pub mod codec;
pub mod decoder;
pub mod error;
pub mod reader;
pub mod scanner;
pub mod transform;
pub mod writer;

pub use bcd::{bcd_to_string, string_to_bcd};
#[cfg(feature = "async")]
pub use codec::FrameCodec;
pub use decoder::FieldDecoder;
pub use error::{FrameError, Result};
pub use reader::FrameReader;
pub use scanner::{
    decode_frame, scan_frame, FrameConfig, FrameScanner, Scan, DEFAULT_MAX_FRAME_SIZE,
};
pub use transform::{
    checksum, restore, restore_with, stuff, stuff_into, verify_checksum, ChecksumMode,
    WireEncode, ESCAPE, MAX_BODY_LEN, MIN_MESSAGE_LEN, SENTINEL,
};
pub use writer::{write_frame, FrameWriter};
