/// Errors that can occur while scanning, restoring, decoding or encoding frames.
#[derive(Debug, thiserror::Error)]
pub enum FrameError {
    /// A read asked for more bytes than the buffer has left.
    #[error("short buffer (needed {needed} bytes, {remaining} remaining)")]
    ShortBuffer { needed: usize, remaining: usize },

    /// The raw frame is not wrapped in 0x7E sentinels.
    #[error("malformed frame (expected 0x7E sentinels at both ends)")]
    MissingSentinel,

    /// The trailing checksum byte does not match the XOR of the message.
    #[error("checksum mismatch (expected {expected:#04x}, got {actual:#04x})")]
    Checksum { expected: u8, actual: u8 },

    /// An opening sentinel was not closed within the configured limit.
    #[error("frame too large ({size} bytes without closing sentinel, max {max})")]
    FrameTooLarge { size: usize, max: usize },

    /// The message body does not fit the 10-bit length field.
    #[error("body too large ({size} bytes, max {max})")]
    BodyTooLarge { size: usize, max: usize },

    /// A string could not be packed as binary-coded decimal.
    #[error("invalid BCD digit {0:?}")]
    InvalidBcd(char),

    /// An I/O error occurred while reading or writing frames.
    #[error("frame I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The stream ended before another complete frame was received.
    #[error("connection closed")]
    ConnectionClosed,
}

pub type Result<T> = std::result::Result<T, FrameError>;
