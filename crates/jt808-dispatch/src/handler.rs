use std::io::Write;

use jt808_frame::{write_frame, FieldDecoder};
use jt808_message::{
    common_response, Authentication, LocationReport, MessageHeader, Registration, ResponseBody,
    ResponseHeader, ResultCode, TerminalResponse,
};

use crate::error::{DispatchError, Result};
use crate::flow_id::{time_of_day_flow_id, FlowIdGenerator, FlowIdMode, FlowIds};

/// Per-message-type callbacks invoked by the [`Processor`](crate::Processor).
///
/// Every method has a default: acknowledge the message with a platform
/// general response (success) echoing the request's flow id, message id and
/// device id. Implementors override only the message types they care about.
///
/// Handlers answer by writing at most one frame to `w`, normally through
/// [`send_response`]. Returning [`DispatchError::Continue`] skips the message
/// quietly; any other error is passed to [`Handler::filter_error`].
pub trait Handler {
    /// Called with every raw frame before it is parsed, valid or not.
    fn raw(&mut self, _raw: &[u8]) {}

    /// Flow id for the next outgoing response.
    fn next_flow_id(&mut self) -> u16 {
        time_of_day_flow_id()
    }

    fn heartbeat(&mut self, w: &mut dyn Write, head: &MessageHeader) -> Result<()> {
        self.acknowledge(w, head)
    }

    fn registration(
        &mut self,
        w: &mut dyn Write,
        head: &MessageHeader,
        _body: &Registration,
    ) -> Result<()> {
        self.acknowledge(w, head)
    }

    fn logout(&mut self, w: &mut dyn Write, head: &MessageHeader) -> Result<()> {
        self.acknowledge(w, head)
    }

    fn authentication(
        &mut self,
        w: &mut dyn Write,
        head: &MessageHeader,
        _body: &Authentication,
    ) -> Result<()> {
        self.acknowledge(w, head)
    }

    fn location_report(
        &mut self,
        w: &mut dyn Write,
        head: &MessageHeader,
        _body: &LocationReport,
    ) -> Result<()> {
        self.acknowledge(w, head)
    }

    /// Terminal acknowledgements of platform commands. Nothing is sent back.
    fn terminal_response(&mut self, _head: &MessageHeader, _body: &TerminalResponse) -> Result<()> {
        Ok(())
    }

    /// Any message type without a dedicated decoder. `dec` sits at the first
    /// body byte.
    fn other(
        &mut self,
        w: &mut dyn Write,
        head: &MessageHeader,
        _dec: &mut FieldDecoder<'_>,
    ) -> Result<()> {
        self.acknowledge(w, head)
    }

    /// Decide whether an outcome stops the stream. `Continue` is swallowed;
    /// everything else propagates.
    fn filter_error(&mut self, _w: &mut dyn Write, err: DispatchError) -> Result<()> {
        match err {
            DispatchError::Continue => Ok(()),
            other => Err(other),
        }
    }

    /// Send a success general response for `head`.
    fn acknowledge(&mut self, w: &mut dyn Write, head: &MessageHeader) -> Result<()> {
        let (resp_head, resp_body) = common_response(head, ResultCode::Success, self.next_flow_id());
        send_response(w, &resp_head, &resp_body)
    }
}

/// Stuff, checksum, frame and write one response with a single write-then-flush.
pub fn send_response(w: &mut dyn Write, head: &ResponseHeader, body: &ResponseBody) -> Result<()> {
    write_frame(w, head, body)?;
    Ok(())
}

/// Acknowledges every message and otherwise does nothing.
#[derive(Debug, Default)]
pub struct DefaultHandler {
    flow_ids: FlowIds,
}

impl DefaultHandler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Use the given flow-id source for responses.
    pub fn with_flow_ids(mode: FlowIdMode) -> Self {
        Self {
            flow_ids: FlowIds::new(mode),
        }
    }
}

impl Handler for DefaultHandler {
    fn next_flow_id(&mut self) -> u16 {
        self.flow_ids.next_flow_id()
    }
}

#[cfg(test)]
mod tests {
    use jt808_frame::{decode_frame, restore, FrameError};
    use jt808_message::{ids, registration_response, Property};

    use super::*;

    fn request(message_id: u16) -> MessageHeader {
        MessageHeader {
            message_id,
            property: Property::default(),
            device_id: [0x01, 0x38, 0x00, 0x13, 0x80, 0x00],
            phone: "013800138000".to_string(),
            flow_id: 0x0102,
        }
    }

    fn only_message(wire: &[u8]) -> Vec<u8> {
        let mut buf = bytes::BytesMut::from(wire);
        let frame = decode_frame(&mut buf, usize::MAX, &mut false).unwrap().unwrap();
        assert!(buf.is_empty());
        restore(&frame).unwrap().to_vec()
    }

    #[test]
    fn default_heartbeat_acknowledges() {
        let mut handler = DefaultHandler::with_flow_ids(FlowIdMode::Sequential);
        let mut out = Vec::new();

        handler.heartbeat(&mut out, &request(ids::HEARTBEAT)).unwrap();

        let msg = only_message(&out);
        assert_eq!(&msg[..2], &[0x80, 0x01]);
        assert_eq!(&msg[2..4], &[0x00, 0x05]);
        assert_eq!(&msg[4..10], &[0x01, 0x38, 0x00, 0x13, 0x80, 0x00]);
        assert_eq!(&msg[10..12], &[0x00, 0x00]);
        assert_eq!(&msg[12..], &[0x01, 0x02, 0x00, 0x02, 0x00]);
    }

    #[test]
    fn sequential_flow_ids_advance_per_response() {
        let mut handler = DefaultHandler::with_flow_ids(FlowIdMode::Sequential);
        let head = request(ids::LOGOUT);

        let mut first = Vec::new();
        let mut second = Vec::new();
        handler.logout(&mut first, &head).unwrap();
        handler.logout(&mut second, &head).unwrap();

        assert_eq!(&only_message(&first)[10..12], &[0x00, 0x00]);
        assert_eq!(&only_message(&second)[10..12], &[0x00, 0x01]);
    }

    #[test]
    fn oversized_registration_response_is_not_written() {
        let (head, body) = registration_response(
            &request(ids::REGISTRATION),
            ResultCode::Success,
            "x".repeat(65_534),
            1,
        );
        let mut out = Vec::new();

        let err = send_response(&mut out, &head, &body).unwrap_err();

        assert!(matches!(
            err,
            DispatchError::Frame(FrameError::BodyTooLarge { size: 65_537, .. })
        ));
        assert!(out.is_empty());
    }

    #[test]
    fn terminal_response_sends_nothing() {
        let mut handler = DefaultHandler::new();
        let body = TerminalResponse {
            flow_id: 1,
            response_id: ids::PARAM_SETTINGS,
            result: 0,
        };
        handler
            .terminal_response(&request(ids::TERMINAL_COMMON_RESPONSE), &body)
            .unwrap();
    }

    #[test]
    fn filter_swallows_only_continue() {
        let mut handler = DefaultHandler::new();
        let mut out = Vec::new();

        assert!(handler.filter_error(&mut out, DispatchError::Continue).is_ok());

        let err = handler
            .filter_error(
                &mut out,
                DispatchError::Frame(jt808_frame::FrameError::ConnectionClosed),
            )
            .unwrap_err();
        assert!(matches!(err, DispatchError::Frame(_)));
        assert!(out.is_empty());
    }
}
