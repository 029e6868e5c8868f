use bytes::{BufMut, BytesMut};
use jt808_frame::{bcd_to_string, FieldDecoder, WireEncode};

use crate::error::{MessageError, Result};

/// Encoded header size: id (2) + property (2) + device id (6) + flow id (2).
pub const HEADER_SIZE: usize = 12;

/// Length of the BCD device identifier.
pub const DEVICE_ID_LEN: usize = 6;

/// Bits 0-9: body length.
pub const BODY_LEN_MASK: u16 = 0x03FF;

/// Bit 10: body is encrypted.
pub const ENCRYPTED_MASK: u16 = 0x0400;

/// Bit 13: message is split into sub-packages.
pub const MULTIPLEXED_MASK: u16 = 0x2000;

/// The 16-bit message property field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Property(pub u16);

impl Property {
    /// Build a property for a plain (unencrypted, unsplit) body.
    pub fn for_body(len: u16) -> Self {
        Self(len & BODY_LEN_MASK)
    }

    pub fn raw(self) -> u16 {
        self.0
    }

    /// Declared body length. Informational only; decoders do not enforce it.
    pub fn body_len(self) -> u16 {
        self.0 & BODY_LEN_MASK
    }

    pub fn is_encrypted(self) -> bool {
        self.0 & ENCRYPTED_MASK != 0
    }

    pub fn is_multiplexed(self) -> bool {
        self.0 & MULTIPLEXED_MASK != 0
    }
}

/// Decoded header of a terminal message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MessageHeader {
    pub message_id: u16,
    pub property: Property,
    /// Raw BCD device identifier, echoed back in responses.
    pub device_id: [u8; DEVICE_ID_LEN],
    /// `device_id` rendered as digits.
    pub phone: String,
    pub flow_id: u16,
}

impl MessageHeader {
    /// Decode a header and leave `dec` at the first body byte.
    ///
    /// Multiplexed (sub-packaged) messages are rejected as unsupported.
    pub fn decode(dec: &mut FieldDecoder<'_>) -> Result<Self> {
        let message_id = dec.read_u16()?;
        let property = Property(dec.read_u16()?);
        let device_id = dec.read_array::<DEVICE_ID_LEN>()?;
        let flow_id = dec.read_u16()?;

        if property.is_multiplexed() {
            return Err(MessageError::Unsupported("multiplexed message"));
        }

        Ok(Self {
            message_id,
            property,
            device_id,
            phone: bcd_to_string(&device_id),
            flow_id,
        })
    }

    pub fn body_len(&self) -> u16 {
        self.property.body_len()
    }

    pub fn is_encrypted(&self) -> bool {
        self.property.is_encrypted()
    }
}

impl WireEncode for MessageHeader {
    fn encoded_len(&self) -> usize {
        HEADER_SIZE
    }

    fn encode(&self, dst: &mut BytesMut) {
        dst.put_u16(self.message_id);
        dst.put_u16(self.property.raw());
        dst.put_slice(&self.device_id);
        dst.put_u16(self.flow_id);
    }
}
