//! Terminal message bodies.
//!
//! Every decoder reads from a cursor positioned right after the header.
//! The declared body length in the header is not re-checked; a body that
//! runs out of bytes fails with a short-buffer error.

use bytes::Bytes;
use jt808_frame::{FieldDecoder, FrameError};

use crate::error::Result;
use crate::header::MessageHeader;
use crate::ids::MessageKind;

/// Status bit: ACC (ignition) on.
pub const STATUS_ACC_ON: u32 = 0x0001;

/// Status bit: position fixed.
pub const STATUS_POSITIONED: u32 = 0x0002;

/// Status bit: latitude is south.
pub const STATUS_SOUTH_LATITUDE: u32 = 0x0004;

/// Status bit: longitude is west.
pub const STATUS_WEST_LONGITUDE: u32 = 0x0008;

/// A body decoder keyed by message type.
pub trait DecodeBody: Sized {
    fn decode(header: &MessageHeader, dec: &mut FieldDecoder<'_>) -> Result<Self>;
}

/// Location report (`0x0200`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocationReport {
    pub alarm: u32,
    pub status: u32,
    /// Latitude in millionths of a degree, unsigned.
    pub latitude: u32,
    /// Longitude in millionths of a degree, unsigned.
    pub longitude: u32,
    /// Metres above sea level.
    pub elevation: u16,
    /// Tenths of km/h.
    pub speed: u16,
    /// Degrees clockwise from north.
    pub direction: u16,
    /// `YYMMDDhhmmss` as reported by the terminal.
    pub timestamp: String,
}

impl DecodeBody for LocationReport {
    fn decode(_header: &MessageHeader, dec: &mut FieldDecoder<'_>) -> Result<Self> {
        Ok(Self {
            alarm: dec.read_u32()?,
            status: dec.read_u32()?,
            latitude: dec.read_u32()?,
            longitude: dec.read_u32()?,
            elevation: dec.read_u16()?,
            speed: dec.read_u16()?,
            direction: dec.read_u16()?,
            timestamp: dec.read_bcd(6)?,
        })
    }
}

impl LocationReport {
    pub fn acc_on(&self) -> bool {
        self.status & STATUS_ACC_ON != 0
    }

    pub fn is_positioned(&self) -> bool {
        self.status & STATUS_POSITIONED != 0
    }

    /// Signed latitude in degrees, negative for south.
    pub fn latitude_degrees(&self) -> f64 {
        let deg = f64::from(self.latitude) / 1_000_000.0;
        if self.status & STATUS_SOUTH_LATITUDE != 0 {
            -deg
        } else {
            deg
        }
    }

    /// Signed longitude in degrees, negative for west.
    pub fn longitude_degrees(&self) -> f64 {
        let deg = f64::from(self.longitude) / 1_000_000.0;
        if self.status & STATUS_WEST_LONGITUDE != 0 {
            -deg
        } else {
            deg
        }
    }

    pub fn speed_kmh(&self) -> f64 {
        f64::from(self.speed) / 10.0
    }
}

/// Authentication (`0x0102`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Authentication {
    pub code: String,
}

impl DecodeBody for Authentication {
    /// The auth code is every remaining body byte. An empty body is malformed.
    fn decode(_header: &MessageHeader, dec: &mut FieldDecoder<'_>) -> Result<Self> {
        if dec.is_empty() {
            return Err(FrameError::ShortBuffer {
                needed: 1,
                remaining: 0,
            }
            .into());
        }
        let code = String::from_utf8_lossy(dec.read_rest()).into_owned();
        Ok(Self { code })
    }
}

/// Terminal registration (`0x0100`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Registration {
    pub province: u16,
    pub city: u16,
    pub manufacturer_id: String,
    pub terminal_type: String,
    pub terminal_id: String,
    /// Plate colour and plate number, when the terminal sends them.
    pub plate_color: Option<u8>,
    pub plate: Option<String>,
}

impl DecodeBody for Registration {
    fn decode(_header: &MessageHeader, dec: &mut FieldDecoder<'_>) -> Result<Self> {
        let province = dec.read_u16()?;
        let city = dec.read_u16()?;
        let manufacturer_id = dec.read_bcd(5)?;
        let terminal_type = dec.read_bcd(20)?;
        let terminal_id = dec.read_bcd(7)?;

        let (plate_color, plate) = if dec.is_empty() {
            (None, None)
        } else {
            let color = dec.read_u8()?;
            let rest = dec.read_rest();
            let plate = (!rest.is_empty()).then(|| String::from_utf8_lossy(rest).into_owned());
            (Some(color), plate)
        };

        Ok(Self {
            province,
            city,
            manufacturer_id,
            terminal_type,
            terminal_id,
            plate_color,
            plate,
        })
    }
}

/// Terminal general response (`0x0001`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TerminalResponse {
    pub flow_id: u16,
    pub response_id: u16,
    pub result: u8,
}

impl DecodeBody for TerminalResponse {
    fn decode(_header: &MessageHeader, dec: &mut FieldDecoder<'_>) -> Result<Self> {
        Ok(Self {
            flow_id: dec.read_u16()?,
            response_id: dec.read_u16()?,
            result: dec.read_u8()?,
        })
    }
}

/// Any terminal message body, keyed by message type.
#[derive(Debug, Clone, PartialEq)]
pub enum MessageBody {
    TerminalResponse(TerminalResponse),
    Heartbeat,
    Logout,
    Registration(Registration),
    Authentication(Authentication),
    LocationReport(LocationReport),
    /// A type without a dedicated decoder; the payload is left as-is.
    Other { message_id: u16, payload: Bytes },
}

impl MessageBody {
    /// Decode the body matching `header.message_id`.
    pub fn decode(header: &MessageHeader, dec: &mut FieldDecoder<'_>) -> Result<Self> {
        let body = match MessageKind::from_id(header.message_id) {
            MessageKind::TerminalCommonResponse => {
                Self::TerminalResponse(TerminalResponse::decode(header, dec)?)
            }
            MessageKind::Heartbeat => Self::Heartbeat,
            MessageKind::Logout => Self::Logout,
            MessageKind::Registration => Self::Registration(Registration::decode(header, dec)?),
            MessageKind::Authentication => {
                Self::Authentication(Authentication::decode(header, dec)?)
            }
            MessageKind::LocationReport => {
                Self::LocationReport(LocationReport::decode(header, dec)?)
            }
            MessageKind::Other(message_id) => Self::Other {
                message_id,
                payload: Bytes::copy_from_slice(dec.read_rest()),
            },
        };
        Ok(body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::header::Property;
    use crate::ids;

    fn header(id: u16) -> MessageHeader {
        MessageHeader {
            message_id: id,
            property: Property::default(),
            device_id: [0x01, 0x23, 0x45, 0x67, 0x89, 0x01],
            phone: "012345678901".to_string(),
            flow_id: 1,
        }
    }

    fn location_bytes() -> Vec<u8> {
        let mut out = Vec::new();
        out.extend_from_slice(&0u32.to_be_bytes());
        out.extend_from_slice(&(STATUS_ACC_ON | STATUS_POSITIONED | STATUS_WEST_LONGITUDE).to_be_bytes());
        out.extend_from_slice(&31_230_416u32.to_be_bytes());
        out.extend_from_slice(&121_473_701u32.to_be_bytes());
        out.extend_from_slice(&12u16.to_be_bytes());
        out.extend_from_slice(&605u16.to_be_bytes());
        out.extend_from_slice(&90u16.to_be_bytes());
        out.extend_from_slice(&[0x26, 0x01, 0x01, 0x12, 0x30, 0x59]);
        out
    }

    #[test]
    fn decodes_location_report() {
        let bytes = location_bytes();
        let mut dec = FieldDecoder::new(&bytes);
        let loc = LocationReport::decode(&header(ids::LOCATION_REPORT), &mut dec).unwrap();

        assert_eq!(loc.latitude, 31_230_416);
        assert_eq!(loc.elevation, 12);
        assert_eq!(loc.direction, 90);
        assert_eq!(loc.timestamp, "260101123059");
        assert!(loc.acc_on());
        assert!(loc.is_positioned());
        assert!((loc.latitude_degrees() - 31.230416).abs() < 1e-9);
        assert!((loc.longitude_degrees() + 121.473701).abs() < 1e-9);
        assert!((loc.speed_kmh() - 60.5).abs() < 1e-9);
        assert!(dec.is_empty());
    }

    #[test]
    fn truncated_location_is_short_buffer() {
        let bytes = location_bytes();
        for len in [0, 3, 16, 22, 27] {
            let mut dec = FieldDecoder::new(&bytes[..len]);
            let err = LocationReport::decode(&header(ids::LOCATION_REPORT), &mut dec).unwrap_err();
            assert!(err.is_short_buffer(), "len {len}");
        }
    }

    #[test]
    fn authentication_takes_remaining_bytes() {
        let mut dec = FieldDecoder::new(b"AUTH-7f3a");
        let auth = Authentication::decode(&header(ids::AUTHENTICATION), &mut dec).unwrap();
        assert_eq!(auth.code, "AUTH-7f3a");
    }

    #[test]
    fn empty_authentication_is_short_buffer() {
        let mut dec = FieldDecoder::new(&[]);
        let err = Authentication::decode(&header(ids::AUTHENTICATION), &mut dec).unwrap_err();
        assert!(err.is_short_buffer());
    }

    fn registration_bytes() -> Vec<u8> {
        let mut out = Vec::new();
        out.extend_from_slice(&44u16.to_be_bytes());
        out.extend_from_slice(&300u16.to_be_bytes());
        out.extend_from_slice(&[0x70, 0x11, 0x10, 0x00, 0x01]);
        out.extend_from_slice(&[0x00; 19]);
        out.push(0x08);
        out.extend_from_slice(&[0x00, 0x00, 0x00, 0x00, 0x12, 0x34, 0x56]);
        out
    }

    #[test]
    fn decodes_registration_without_plate() {
        let bytes = registration_bytes();
        let mut dec = FieldDecoder::new(&bytes);
        let reg = Registration::decode(&header(ids::REGISTRATION), &mut dec).unwrap();

        assert_eq!(reg.province, 44);
        assert_eq!(reg.city, 300);
        assert_eq!(reg.manufacturer_id, "7011100001");
        assert_eq!(reg.terminal_type.len(), 40);
        assert!(reg.terminal_type.ends_with("08"));
        assert_eq!(reg.terminal_id, "00000000123456");
        assert!(reg.plate_color.is_none());
        assert!(reg.plate.is_none());
    }

    #[test]
    fn decodes_registration_with_plate() {
        let mut bytes = registration_bytes();
        bytes.push(0x01);
        bytes.extend_from_slice(b"AB1234");
        let mut dec = FieldDecoder::new(&bytes);
        let reg = Registration::decode(&header(ids::REGISTRATION), &mut dec).unwrap();

        assert_eq!(reg.plate_color, Some(1));
        assert_eq!(reg.plate.as_deref(), Some("AB1234"));
    }

    #[test]
    fn decodes_terminal_response() {
        let bytes = [0x00, 0x09, 0x81, 0x03, 0x00];
        let mut dec = FieldDecoder::new(&bytes);
        let resp = TerminalResponse::decode(&header(ids::TERMINAL_COMMON_RESPONSE), &mut dec)
            .unwrap();
        assert_eq!(
            resp,
            TerminalResponse {
                flow_id: 9,
                response_id: 0x8103,
                result: 0
            }
        );
    }

    #[test]
    fn message_body_selects_decoder_by_id() {
        let bytes = location_bytes();
        let body = MessageBody::decode(
            &header(ids::LOCATION_REPORT),
            &mut FieldDecoder::new(&bytes),
        )
        .unwrap();
        assert!(matches!(body, MessageBody::LocationReport(_)));

        let body =
            MessageBody::decode(&header(ids::HEARTBEAT), &mut FieldDecoder::new(&[])).unwrap();
        assert_eq!(body, MessageBody::Heartbeat);

        let body = MessageBody::decode(
            &header(ids::TYRE_PRESSURE),
            &mut FieldDecoder::new(&[0x01, 0x02]),
        )
        .unwrap();
        assert_eq!(
            body,
            MessageBody::Other {
                message_id: ids::TYRE_PRESSURE,
                payload: Bytes::from_static(&[0x01, 0x02]),
            }
        );
    }
}
