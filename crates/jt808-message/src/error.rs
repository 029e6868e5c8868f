use jt808_frame::FrameError;

/// Errors that can occur while decoding message headers and bodies.
#[derive(Debug, thiserror::Error)]
pub enum MessageError {
    /// Field-level decode error (short buffer, bad BCD).
    #[error(transparent)]
    Frame(#[from] FrameError),

    /// The header asks for a feature this codec does not implement.
    #[error("unsupported message feature: {0}")]
    Unsupported(&'static str),
}

impl MessageError {
    /// True when the error came from running out of bytes.
    pub fn is_short_buffer(&self) -> bool {
        matches!(self, Self::Frame(FrameError::ShortBuffer { .. }))
    }
}

pub type Result<T> = std::result::Result<T, MessageError>;
