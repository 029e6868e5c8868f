use jt808_frame::FrameError;
use jt808_message::MessageError;

/// Outcomes a handler or the dispatcher can report besides success.
#[derive(Debug, thiserror::Error)]
pub enum DispatchError {
    /// Recoverable condition: skip this message and keep processing the stream.
    #[error("message skipped, continuing")]
    Continue,

    /// Frame-level error, including I/O failures while sending a response.
    #[error("frame error: {0}")]
    Frame(#[from] FrameError),

    /// Message-level error a handler chose to surface.
    #[error("message error: {0}")]
    Message(#[from] MessageError),

    /// Any other handler failure.
    #[error("handler failed: {0}")]
    Handler(#[source] Box<dyn std::error::Error + Send + Sync>),
}

impl DispatchError {
    /// Wrap an arbitrary handler error.
    pub fn handler(err: impl Into<Box<dyn std::error::Error + Send + Sync>>) -> Self {
        Self::Handler(err.into())
    }

    /// True for the suppressible [`DispatchError::Continue`] condition.
    pub fn is_continue(&self) -> bool {
        matches!(self, Self::Continue)
    }
}

pub type Result<T> = std::result::Result<T, DispatchError>;
