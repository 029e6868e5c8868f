use std::io::{ErrorKind, Write};

use bytes::BytesMut;

use crate::error::{FrameError, Result};
use crate::scanner::FrameConfig;
use crate::transform::{stuff_into, WireEncode};

const INITIAL_BUFFER_CAPACITY: usize = 2 * 1024;

/// Writes stuffed, checksummed frames to any `Write` stream.
///
/// Each frame is encoded into an internal buffer first and then written and
/// flushed in one pass, so a failed encode never leaves a partial frame on
/// the wire.
pub struct FrameWriter<T> {
    inner: T,
    buf: BytesMut,
    config: FrameConfig,
}

impl<T: Write> FrameWriter<T> {
    /// Create a new frame writer with default configuration.
    pub fn new(inner: T) -> Self {
        Self::with_config(inner, FrameConfig::default())
    }

    /// Create a new frame writer with explicit configuration.
    pub fn with_config(inner: T, config: FrameConfig) -> Self {
        Self {
            inner,
            buf: BytesMut::with_capacity(INITIAL_BUFFER_CAPACITY),
            config,
        }
    }

    /// Encode and send one frame built from `header` and `body`.
    pub fn send<H, B>(&mut self, header: &H, body: &B) -> Result<()>
    where
        H: WireEncode + ?Sized,
        B: WireEncode + ?Sized,
    {
        self.buf.clear();
        stuff_into(header, body, &mut self.buf)?;
        write_all(&mut self.inner, &self.buf)?;
        self.flush()
    }

    /// Flush the underlying stream.
    pub fn flush(&mut self) -> Result<()> {
        flush(&mut self.inner)
    }

    /// Borrow the underlying stream.
    pub fn get_ref(&self) -> &T {
        &self.inner
    }

    /// Mutably borrow the underlying stream.
    pub fn get_mut(&mut self) -> &mut T {
        &mut self.inner
    }

    /// Consume the writer and return the inner stream.
    pub fn into_inner(self) -> T {
        self.inner
    }

    /// Current frame writer configuration.
    pub fn config(&self) -> &FrameConfig {
        &self.config
    }
}

impl FrameWriter<std::net::TcpStream> {
    /// Create a frame writer for a TCP stream and apply write timeout from config.
    pub fn with_config_tcp(inner: std::net::TcpStream, config: FrameConfig) -> Result<Self> {
        inner.set_write_timeout(config.write_timeout)?;
        Ok(Self::with_config(inner, config))
    }
}

/// Encode one frame and write it to `sink` with a single write-then-flush.
///
/// This is the path handlers use to answer a message on an arbitrary sink.
pub fn write_frame<W, H, B>(sink: &mut W, header: &H, body: &B) -> Result<()>
where
    W: Write + ?Sized,
    H: WireEncode + ?Sized,
    B: WireEncode + ?Sized,
{
    let mut buf = BytesMut::with_capacity((header.encoded_len() + body.encoded_len()) * 2 + 4);
    stuff_into(header, body, &mut buf)?;
    write_all(sink, &buf)?;
    flush(sink)
}

/// Write every byte of `buf`, retrying interrupted calls.
///
/// `WouldBlock` and `TimedOut` are surfaced as I/O errors: with a write
/// timeout set they mean the peer stopped reading.
fn write_all<W: Write + ?Sized>(sink: &mut W, mut buf: &[u8]) -> Result<()> {
    while !buf.is_empty() {
        match sink.write(buf) {
            Ok(0) => return Err(FrameError::ConnectionClosed),
            Ok(n) => buf = &buf[n..],
            Err(err) if err.kind() == ErrorKind::Interrupted => {}
            Err(err) => return Err(FrameError::Io(err)),
        }
    }
    Ok(())
}

fn flush<W: Write + ?Sized>(sink: &mut W) -> Result<()> {
    loop {
        match sink.flush() {
            Err(err) if err.kind() == ErrorKind::Interrupted => {}
            other => return other.map_err(FrameError::Io),
        }
    }
}
