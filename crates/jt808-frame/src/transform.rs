use bytes::{BufMut, Bytes, BytesMut};

use crate::error::{FrameError, Result};

/// Frame delimiter.
pub const SENTINEL: u8 = 0x7E;

/// Escape byte introducing a stuffed pair.
pub const ESCAPE: u8 = 0x7D;

/// Follow byte standing for an escaped `0x7E`.
pub const ESCAPED_SENTINEL: u8 = 0x02;

/// Follow byte standing for an escaped `0x7D`.
pub const ESCAPED_ESCAPE: u8 = 0x01;

/// Smallest de-stuffed message: 12-byte header plus the checksum byte.
pub const MIN_MESSAGE_LEN: usize = 13;

/// Largest body the 10-bit length field can describe.
pub const MAX_BODY_LEN: usize = 0x03FF;

/// Whether [`restore_with`] verifies the trailing checksum byte.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ChecksumMode {
    /// Reject messages whose XOR does not match the trailing byte.
    #[default]
    Verify,
    /// Strip the trailing byte without looking at it.
    Skip,
}

/// Something that serializes itself into the header or body slot of a frame.
pub trait WireEncode {
    /// Number of bytes [`WireEncode::encode`] appends.
    fn encoded_len(&self) -> usize;

    /// Append the unstuffed wire representation to `dst`.
    fn encode(&self, dst: &mut BytesMut);
}

impl WireEncode for [u8] {
    fn encoded_len(&self) -> usize {
        self.len()
    }

    fn encode(&self, dst: &mut BytesMut) {
        dst.put_slice(self);
    }
}

impl WireEncode for Bytes {
    fn encoded_len(&self) -> usize {
        self.len()
    }

    fn encode(&self, dst: &mut BytesMut) {
        dst.put_slice(self);
    }
}

/// XOR of every byte in `bytes`.
pub fn checksum(bytes: &[u8]) -> u8 {
    bytes.iter().fold(0, |acc, b| acc ^ b)
}

/// Check `message` against its trailing checksum byte.
///
/// Returns `message` unchanged on success, so the step can be chained.
pub fn verify_checksum(message: &[u8], sum: u8, mode: ChecksumMode) -> Result<&[u8]> {
    if mode == ChecksumMode::Verify {
        let expected = checksum(message);
        if expected != sum {
            return Err(FrameError::Checksum {
                expected,
                actual: sum,
            });
        }
    }
    Ok(message)
}

/// De-stuff a raw frame and verify its checksum.
///
/// Returns the logical message (header and body) without the checksum byte.
pub fn restore(raw: &[u8]) -> Result<Bytes> {
    restore_with(raw, ChecksumMode::Verify)
}

/// [`restore`] with an explicit checksum policy.
///
/// An escape byte followed by anything other than `0x01`/`0x02` is dropped
/// together with its follow byte.
pub fn restore_with(raw: &[u8], mode: ChecksumMode) -> Result<Bytes> {
    if raw.len() < 2 || raw[0] != SENTINEL || raw[raw.len() - 1] != SENTINEL {
        return Err(FrameError::MissingSentinel);
    }

    let interior = &raw[1..raw.len() - 1];
    let mut buf = BytesMut::with_capacity(interior.len());
    let mut iter = interior.iter();

    while let Some(&b) = iter.next() {
        if b != ESCAPE {
            buf.put_u8(b);
            continue;
        }
        match iter.next() {
            Some(&ESCAPED_SENTINEL) => buf.put_u8(SENTINEL),
            Some(&ESCAPED_ESCAPE) => buf.put_u8(ESCAPE),
            _ => {}
        }
    }

    if buf.len() < MIN_MESSAGE_LEN {
        return Err(FrameError::ShortBuffer {
            needed: MIN_MESSAGE_LEN,
            remaining: buf.len(),
        });
    }

    let sum = buf[buf.len() - 1];
    let len = verify_checksum(&buf[..buf.len() - 1], sum, mode)?.len();
    buf.truncate(len);
    Ok(buf.freeze())
}

/// Encode `header` and `body` into a complete frame appended to `dst`.
///
/// Wire format:
/// ```text
/// ┌──────┬──────────────────────────┬──────────┬──────┐
/// │ 0x7E │ stuffed(header ‖ body)   │ checksum │ 0x7E │
/// └──────┴──────────────────────────┴──────────┴──────┘
/// ```
///
/// The checksum is the XOR of the unstuffed header and body bytes. It is
/// escaped like any other byte so a checksum of `0x7E` cannot end the frame
/// early.
pub fn stuff_into<H, B>(header: &H, body: &B, dst: &mut BytesMut) -> Result<()>
where
    H: WireEncode + ?Sized,
    B: WireEncode + ?Sized,
{
    let body_len = body.encoded_len();
    if body_len > MAX_BODY_LEN {
        return Err(FrameError::BodyTooLarge {
            size: body_len,
            max: MAX_BODY_LEN,
        });
    }

    let mut plain = BytesMut::with_capacity(header.encoded_len() + body_len);
    header.encode(&mut plain);
    body.encode(&mut plain);

    // Worst case every byte is escaped.
    dst.reserve(plain.len() * 2 + 3);
    dst.put_u8(SENTINEL);
    for &b in plain.iter() {
        put_stuffed(b, dst);
    }
    put_stuffed(checksum(&plain), dst);
    dst.put_u8(SENTINEL);
    Ok(())
}

fn put_stuffed(b: u8, dst: &mut BytesMut) {
    match b {
        SENTINEL => dst.put_slice(&[ESCAPE, ESCAPED_SENTINEL]),
        ESCAPE => dst.put_slice(&[ESCAPE, ESCAPED_ESCAPE]),
        _ => dst.put_u8(b),
    }
}

/// Encode `header` and `body` into a fresh frame.
pub fn stuff<H, B>(header: &H, body: &B) -> Result<Bytes>
where
    H: WireEncode + ?Sized,
    B: WireEncode + ?Sized,
{
    let mut dst = BytesMut::new();
    stuff_into(header, body, &mut dst)?;
    Ok(dst.freeze())
}
