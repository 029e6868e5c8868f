//! JT/T 808 message layer.
//!
//! Decodes the fixed 12-byte header and the per-type bodies of restored
//! terminal messages, and builds the platform responses sent back.

pub mod body;
pub mod error;
pub mod header;
pub mod ids;
pub mod response;

pub use body::{
    Authentication, DecodeBody, LocationReport, MessageBody, Registration, TerminalResponse,
};
pub use error::{MessageError, Result};
pub use header::{MessageHeader, Property, DEVICE_ID_LEN, HEADER_SIZE};
pub use ids::{message_name, MessageKind, ResultCode};
pub use response::{
    common_response, registration_response, CommonResponse, RegistrationResponse, ResponseBody,
    ResponseHeader,
};
