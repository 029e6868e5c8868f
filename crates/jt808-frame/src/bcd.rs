//! Binary-coded decimal helpers.
//!
//! Each byte carries two digits, high nibble first. Nibbles above 9 render as
//! `A`-`F` so that padding nibbles survive a round trip through a string.

use crate::error::{FrameError, Result};

const DIGITS: &[u8; 16] = b"0123456789ABCDEF";

/// Render BCD bytes as their digit string.
pub fn bcd_to_string(bytes: &[u8]) -> String {
    let mut out = String::with_capacity(bytes.len() * 2);
    for &b in bytes {
        out.push(DIGITS[(b >> 4) as usize] as char);
        out.push(DIGITS[(b & 0x0f) as usize] as char);
    }
    out
}

/// Pack a digit string into exactly `len` BCD bytes.
///
/// Shorter inputs are left-padded with zeros; longer inputs keep their
/// rightmost digits, matching how terminal phone numbers are usually stored.
pub fn string_to_bcd(digits: &str, len: usize) -> Result<Vec<u8>> {
    let mut nibbles = Vec::with_capacity(digits.len());
    for c in digits.chars() {
        let n = c.to_digit(16).ok_or(FrameError::InvalidBcd(c))?;
        nibbles.push(n as u8);
    }

    let wanted = len * 2;
    let nibbles = if nibbles.len() > wanted {
        &nibbles[nibbles.len() - wanted..]
    } else {
        &nibbles[..]
    };

    let mut padded = vec![0u8; wanted - nibbles.len()];
    padded.extend_from_slice(nibbles);

    Ok(padded
        .chunks_exact(2)
        .map(|pair| (pair[0] << 4) | pair[1])
        .collect())
}
