//! JT/T 808 terminal protocol for Rust.
//!
//! Vehicle terminals talk to a platform over TCP using sentinel-delimited,
//! byte-stuffed, XOR-checksummed frames. This crate recovers frames from a
//! stream, decodes the header and per-type bodies, dispatches messages to
//! handlers and encodes the platform's responses.
//!
//! # Crate Structure
//!
//! - [`frame`]: stream scanning, stuffing/restoring, checksum, field decoder, BCD
//! - [`message`]: header, body decoders and response encoders
//! - [`dispatch`]: processor, handler trait, default handlers and flow ids

/// Re-export frame types.
pub mod frame {
    pub use jt808_frame::*;
}

/// Re-export message types.
pub mod message {
    pub use jt808_message::*;
}

/// Re-export dispatch types.
pub mod dispatch {
    pub use jt808_dispatch::*;
}
