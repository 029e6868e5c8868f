//! Platform responses.

use bytes::{BufMut, BytesMut};
use jt808_frame::WireEncode;

use crate::header::{MessageHeader, Property, DEVICE_ID_LEN, HEADER_SIZE};
use crate::ids::{ResultCode, PLATFORM_COMMON_RESPONSE, REGISTRATION_RESPONSE};

/// Header of an outgoing platform message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResponseHeader {
    pub message_id: u16,
    pub property: Property,
    pub device_id: [u8; DEVICE_ID_LEN],
    pub flow_id: u16,
}

impl ResponseHeader {
    /// Header for `body`, with the property set to the body length.
    pub fn for_body(
        message_id: u16,
        body: &ResponseBody,
        flow_id: u16,
        device_id: [u8; DEVICE_ID_LEN],
    ) -> Self {
        Self {
            message_id,
            property: Property::for_body(u16::try_from(body.len()).unwrap_or(u16::MAX)),
            device_id,
            flow_id,
        }
    }
}

impl WireEncode for ResponseHeader {
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

/// Platform general response body (`0x8001`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CommonResponse {
    /// Flow id of the message being answered.
    pub flow_id: u16,
    /// Message id of the message being answered.
    pub response_id: u16,
    pub result: ResultCode,
}

impl CommonResponse {
    pub const LEN: usize = 5;
}

/// Registration response body (`0x8100`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegistrationResponse {
    pub flow_id: u16,
    pub result: ResultCode,
    /// Only sent when `result` is success.
    pub auth_code: String,
}

impl RegistrationResponse {
    pub fn body_len(&self) -> usize {
        match self.result {
            ResultCode::Success => 3 + self.auth_code.len(),
            _ => 3,
        }
    }
}

/// Body of an outgoing platform message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResponseBody {
    Common(CommonResponse),
    Registration(RegistrationResponse),
    Empty,
}

impl ResponseBody {
    /// Encoded length in bytes.
    pub fn len(&self) -> usize {
        match self {
            Self::Common(_) => CommonResponse::LEN,
            Self::Registration(body) => body.body_len(),
            Self::Empty => 0,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl WireEncode for ResponseBody {
    fn encoded_len(&self) -> usize {
        self.len()
    }

    fn encode(&self, dst: &mut BytesMut) {
        match self {
            Self::Common(body) => {
                dst.put_u16(body.flow_id);
                dst.put_u16(body.response_id);
                dst.put_u8(body.result.as_u8());
            }
            Self::Registration(body) => {
                dst.put_u16(body.flow_id);
                dst.put_u8(body.result.as_u8());
                if body.result == ResultCode::Success {
                    dst.put_slice(body.auth_code.as_bytes());
                }
            }
            Self::Empty => {}
        }
    }
}

/// Build a platform general response acknowledging `header`.
///
/// The body echoes the request's flow id and message id; the header carries
/// `flow_id` and the request's device id.
pub fn common_response(
    header: &MessageHeader,
    result: ResultCode,
    flow_id: u16,
) -> (ResponseHeader, ResponseBody) {
    let body = ResponseBody::Common(CommonResponse {
        flow_id: header.flow_id,
        response_id: header.message_id,
        result,
    });
    let head = ResponseHeader::for_body(PLATFORM_COMMON_RESPONSE, &body, flow_id, header.device_id);
    (head, body)
}

/// Build a registration response for `header`.
pub fn registration_response(
    header: &MessageHeader,
    result: ResultCode,
    auth_code: impl Into<String>,
    flow_id: u16,
) -> (ResponseHeader, ResponseBody) {
    let body = ResponseBody::Registration(RegistrationResponse {
        flow_id: header.flow_id,
        result,
        auth_code: auth_code.into(),
    });
    let head = ResponseHeader::for_body(REGISTRATION_RESPONSE, &body, flow_id, header.device_id);
    (head, body)
}
