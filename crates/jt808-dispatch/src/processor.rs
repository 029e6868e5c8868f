use std::io::Write;

use jt808_frame::{restore_with, ChecksumMode, FieldDecoder, FrameError};
use jt808_message::{
    message_name, Authentication, DecodeBody, LocationReport, MessageError, MessageHeader,
    MessageKind, Registration, TerminalResponse,
};
use tracing::debug;

use crate::error::{DispatchError, Result};
use crate::handler::Handler;

/// Processor behaviour switches.
#[derive(Debug, Clone, Default)]
pub struct ProcessorConfig {
    /// Checksum policy applied when restoring frames. Default: verify.
    pub checksum: ChecksumMode,
    /// Dispatch registration, logout and terminal general responses to their
    /// handler methods. When off (the default) they are accepted and ignored.
    pub route_session_messages: bool,
}

/// Why a frame was dropped without reaching a handler.
#[derive(Debug)]
pub enum DropReason {
    /// Framing, length or checksum failure while restoring.
    Restore(FrameError),
    /// Malformed or multiplexed header.
    Header(MessageError),
    /// Encrypted bodies are not supported.
    Encrypted,
}

/// What happened to one raw frame.
#[derive(Debug)]
pub enum Disposition {
    /// Dropped silently before dispatch.
    Dropped(DropReason),
    /// A known message type with no dispatch target.
    Ignored,
    /// The handler (or body decoder) reported a condition the error filter swallowed.
    Suppressed,
    /// The handler completed successfully.
    Handled,
}

/// Routes raw frames to a [`Handler`] by message type.
///
/// One processor serves one stream. Malformed frames, bad headers and bad
/// bodies never abort processing; only errors the handler's filter lets
/// through (typically I/O failures while responding) are returned.
pub struct Processor<H> {
    handler: H,
    config: ProcessorConfig,
}

impl<H: Handler> Processor<H> {
    /// Create a processor with default configuration.
    pub fn new(handler: H) -> Self {
        Self::with_config(handler, ProcessorConfig::default())
    }

    /// Create a processor with explicit configuration.
    pub fn with_config(handler: H, config: ProcessorConfig) -> Self {
        Self { handler, config }
    }

    /// Restore, decode and dispatch one raw frame, writing any response to `w`.
    pub fn process(&mut self, w: &mut dyn Write, raw: &[u8]) -> Result<Disposition> {
        self.handler.raw(raw);

        let message = match restore_with(raw, self.config.checksum) {
            Ok(message) => message,
            Err(err) => {
                debug!(error = %err, len = raw.len(), "dropping unrestorable frame");
                return Ok(Disposition::Dropped(DropReason::Restore(err)));
            }
        };

        let mut dec = FieldDecoder::new(&message);
        let head = match MessageHeader::decode(&mut dec) {
            Ok(head) => head,
            Err(err) => {
                debug!(error = %err, "dropping frame with bad header");
                return Ok(Disposition::Dropped(DropReason::Header(err)));
            }
        };

        if head.is_encrypted() {
            debug!(
                message_id = head.message_id,
                phone = %head.phone,
                "dropping encrypted message"
            );
            return Ok(Disposition::Dropped(DropReason::Encrypted));
        }

        match route(&mut self.handler, &self.config, w, &head, &mut dec) {
            Ok(true) => Ok(Disposition::Handled),
            Ok(false) => {
                debug!(
                    message_id = head.message_id,
                    name = message_name(head.message_id),
                    "accepted without dispatch"
                );
                Ok(Disposition::Ignored)
            }
            Err(err) => {
                debug!(
                    message_id = head.message_id,
                    flow_id = head.flow_id,
                    error = %err,
                    "handler outcome passed to error filter"
                );
                self.handler
                    .filter_error(w, err)
                    .map(|()| Disposition::Suppressed)
            }
        }
    }

    /// Borrow the handler.
    pub fn handler(&self) -> &H {
        &self.handler
    }

    /// Mutably borrow the handler.
    pub fn handler_mut(&mut self) -> &mut H {
        &mut self.handler
    }

    /// Consume the processor and return the handler.
    pub fn into_handler(self) -> H {
        self.handler
    }

    /// Current processor configuration.
    pub fn config(&self) -> &ProcessorConfig {
        &self.config
    }
}

/// Invoke the handler method for `head`. Returns `false` for message types
/// accepted without dispatch.
fn route<H: Handler>(
    handler: &mut H,
    config: &ProcessorConfig,
    w: &mut dyn Write,
    head: &MessageHeader,
    dec: &mut FieldDecoder<'_>,
) -> Result<bool> {
    let session = config.route_session_messages;
    match MessageKind::from_id(head.message_id) {
        MessageKind::LocationReport => {
            let body = decode_body::<LocationReport>(head, dec)?;
            handler.location_report(w, head, &body)?;
        }
        MessageKind::Heartbeat => handler.heartbeat(w, head)?,
        MessageKind::Authentication => {
            let body = decode_body::<Authentication>(head, dec)?;
            handler.authentication(w, head, &body)?;
        }
        MessageKind::Registration if session => {
            let body = decode_body::<Registration>(head, dec)?;
            handler.registration(w, head, &body)?;
        }
        MessageKind::Logout if session => handler.logout(w, head)?,
        MessageKind::TerminalCommonResponse if session => {
            let body = decode_body::<TerminalResponse>(head, dec)?;
            handler.terminal_response(head, &body)?;
        }
        MessageKind::Registration
        | MessageKind::Logout
        | MessageKind::TerminalCommonResponse => return Ok(false),
        MessageKind::Other(_) => handler.other(w, head, dec)?,
    }
    Ok(true)
}

/// Decode a body, turning any failure into the recoverable `Continue`.
fn decode_body<B: DecodeBody>(head: &MessageHeader, dec: &mut FieldDecoder<'_>) -> Result<B> {
    B::decode(head, dec).map_err(|err| {
        debug!(
            message_id = head.message_id,
            phone = %head.phone,
            error = %err,
            "skipping malformed body"
        );
        DispatchError::Continue
    })
}

#[cfg(test)]
mod tests {
    use std::io::ErrorKind;

    use bytes::{BufMut, BytesMut};
    use jt808_frame::{decode_frame, restore, stuff, SENTINEL};
    use jt808_message::{ids, Property, DEVICE_ID_LEN};

    use super::*;
    use crate::flow_id::FlowIdMode;
    use crate::handler::DefaultHandler;

    const DEVICE: [u8; DEVICE_ID_LEN] = [0x01, 0x23, 0x45, 0x67, 0x89, 0x01];

    fn frame(message_id: u16, property: u16, flow_id: u16, body: &[u8]) -> Vec<u8> {
        let mut header = BytesMut::new();
        header.put_u16(message_id);
        header.put_u16(property);
        header.put_slice(&DEVICE);
        header.put_u16(flow_id);
        stuff(&header[..], body).unwrap().to_vec()
    }

    fn location_body() -> Vec<u8> {
        let mut body = BytesMut::new();
        body.put_u32(0);
        body.put_u32(0x0003);
        body.put_u32(31_230_416);
        body.put_u32(121_473_701);
        body.put_u16(4);
        body.put_u16(600);
        body.put_u16(180);
        body.put_slice(&[0x26, 0x10, 0x16, 0x08, 0x00, 0x00]);
        body.to_vec()
    }

    fn responses(wire: &[u8]) -> Vec<Vec<u8>> {
        let mut buf = BytesMut::from(wire);
        let mut out = Vec::new();
        while let Some(frame) = decode_frame(&mut buf, usize::MAX, &mut false).unwrap() {
            out.push(restore(&frame).unwrap().to_vec());
        }
        out
    }

    fn processor() -> Processor<DefaultHandler> {
        Processor::new(DefaultHandler::with_flow_ids(FlowIdMode::Sequential))
    }

    #[derive(Default)]
    struct Recording {
        raw: usize,
        locations: Vec<LocationReport>,
        auth_codes: Vec<String>,
        registrations: usize,
        terminal_responses: Vec<TerminalResponse>,
        other_payloads: Vec<Vec<u8>>,
        fail_with: Option<ErrorKind>,
    }

    impl Handler for Recording {
        fn raw(&mut self, _raw: &[u8]) {
            self.raw += 1;
        }

        fn location_report(
            &mut self,
            _w: &mut dyn Write,
            _head: &MessageHeader,
            body: &LocationReport,
        ) -> Result<()> {
            self.locations.push(body.clone());
            match self.fail_with {
                Some(kind) => Err(FrameError::Io(std::io::Error::from(kind)).into()),
                None => Ok(()),
            }
        }

        fn authentication(
            &mut self,
            _w: &mut dyn Write,
            _head: &MessageHeader,
            body: &Authentication,
        ) -> Result<()> {
            self.auth_codes.push(body.code.clone());
            Err(DispatchError::Continue)
        }

        fn registration(
            &mut self,
            _w: &mut dyn Write,
            _head: &MessageHeader,
            _body: &Registration,
        ) -> Result<()> {
            self.registrations += 1;
            Ok(())
        }

        fn terminal_response(&mut self, _head: &MessageHeader, body: &TerminalResponse) -> Result<()> {
            self.terminal_responses.push(*body);
            Ok(())
        }

        fn other(
            &mut self,
            _w: &mut dyn Write,
            _head: &MessageHeader,
            dec: &mut FieldDecoder<'_>,
        ) -> Result<()> {
            self.other_payloads.push(dec.read_rest().to_vec());
            Ok(())
        }
    }

    #[test]
    fn heartbeat_gets_common_response() {
        let mut p = processor();
        let mut out = Vec::new();

        let d = p
            .process(&mut out, &frame(ids::HEARTBEAT, 0, 0x0007, &[]))
            .unwrap();

        assert!(matches!(d, Disposition::Handled));
        let msgs = responses(&out);
        assert_eq!(msgs.len(), 1);
        let msg = &msgs[0];
        assert_eq!(u16::from_be_bytes([msg[0], msg[1]]), ids::PLATFORM_COMMON_RESPONSE);
        assert_eq!(Property(u16::from_be_bytes([msg[2], msg[3]])).body_len(), 5);
        assert_eq!(&msg[4..10], &DEVICE);
        assert_eq!(&msg[12..], &[0x00, 0x07, 0x00, 0x02, 0x00]);
    }

    #[test]
    fn short_location_body_is_suppressed() {
        let mut p = processor();
        let mut out = Vec::new();
        let body = &location_body()[..20];

        let d = p
            .process(&mut out, &frame(ids::LOCATION_REPORT, 20, 1, body))
            .unwrap();

        assert!(matches!(d, Disposition::Suppressed));
        assert!(out.is_empty());
    }

    #[test]
    fn location_report_is_acknowledged() {
        let mut p = processor();
        let mut out = Vec::new();

        let d = p
            .process(&mut out, &frame(ids::LOCATION_REPORT, 28, 0x0A0B, &location_body()))
            .unwrap();

        assert!(matches!(d, Disposition::Handled));
        let msgs = responses(&out);
        assert_eq!(&msgs[0][12..], &[0x0A, 0x0B, 0x02, 0x00, 0x00]);
    }

    #[test]
    fn missing_sentinel_is_dropped() {
        let mut p = processor();
        let mut out = Vec::new();
        let mut raw = frame(ids::HEARTBEAT, 0, 1, &[]);
        raw[0] = 0x00;

        let d = p.process(&mut out, &raw).unwrap();

        assert!(matches!(
            d,
            Disposition::Dropped(DropReason::Restore(FrameError::MissingSentinel))
        ));
        assert!(out.is_empty());
    }

    #[test]
    fn header_only_message_is_dropped_as_short() {
        let mut p = Processor::with_config(
            DefaultHandler::new(),
            ProcessorConfig {
                checksum: ChecksumMode::Skip,
                ..ProcessorConfig::default()
            },
        );
        let mut raw = vec![SENTINEL];
        raw.extend_from_slice(&[0x00, 0x02, 0x00, 0x00]);
        raw.extend_from_slice(&DEVICE);
        raw.extend_from_slice(&[0x00, 0x01, SENTINEL]);
        let mut out = Vec::new();

        let d = p.process(&mut out, &raw).unwrap();

        assert!(matches!(
            d,
            Disposition::Dropped(DropReason::Restore(FrameError::ShortBuffer { .. }))
        ));
        assert!(out.is_empty());
    }

    #[test]
    fn bad_checksum_is_dropped_unless_skipped() {
        let mut raw = frame(ids::HEARTBEAT, 0, 1, &[]);
        let idx = raw.len() - 2;
        raw[idx] ^= 0x01;

        let mut out = Vec::new();
        let d = processor().process(&mut out, &raw).unwrap();
        assert!(matches!(
            d,
            Disposition::Dropped(DropReason::Restore(FrameError::Checksum { .. }))
        ));
        assert!(out.is_empty());

        let mut lenient = Processor::with_config(
            DefaultHandler::new(),
            ProcessorConfig {
                checksum: ChecksumMode::Skip,
                ..ProcessorConfig::default()
            },
        );
        let d = lenient.process(&mut out, &raw).unwrap();
        assert!(matches!(d, Disposition::Handled));
        assert_eq!(responses(&out).len(), 1);
    }

    #[test]
    fn multiplexed_and_encrypted_headers_are_dropped() {
        let mut p = processor();
        let mut out = Vec::new();

        let d = p
            .process(&mut out, &frame(ids::HEARTBEAT, 0x2000, 1, &[]))
            .unwrap();
        assert!(matches!(
            d,
            Disposition::Dropped(DropReason::Header(MessageError::Unsupported(_)))
        ));

        let d = p
            .process(&mut out, &frame(ids::HEARTBEAT, 0x0400, 1, &[]))
            .unwrap();
        assert!(matches!(d, Disposition::Dropped(DropReason::Encrypted)));
        assert!(out.is_empty());
    }

    #[test]
    fn session_messages_are_ignored_by_default() {
        let mut p = Processor::new(Recording::default());
        let mut out = Vec::new();

        for id in [ids::REGISTRATION, ids::LOGOUT, ids::TERMINAL_COMMON_RESPONSE] {
            let d = p.process(&mut out, &frame(id, 0, 1, &[])).unwrap();
            assert!(matches!(d, Disposition::Ignored));
        }
        assert!(out.is_empty());
        assert_eq!(p.handler().raw, 3);
        assert_eq!(p.handler().registrations, 0);
    }

    #[test]
    fn session_messages_route_when_enabled() {
        let mut p = Processor::with_config(
            Recording::default(),
            ProcessorConfig {
                route_session_messages: true,
                ..ProcessorConfig::default()
            },
        );
        let mut out = Vec::new();

        let d = p
            .process(
                &mut out,
                &frame(ids::TERMINAL_COMMON_RESPONSE, 5, 2, &[0x00, 0x09, 0x81, 0x03, 0x00]),
            )
            .unwrap();
        assert!(matches!(d, Disposition::Handled));
        assert_eq!(p.handler().terminal_responses[0].response_id, ids::PARAM_SETTINGS);

        // Truncated registration body is recoverable.
        let d = p
            .process(&mut out, &frame(ids::REGISTRATION, 4, 3, &[0x00, 0x2C, 0x01]))
            .unwrap();
        assert!(matches!(d, Disposition::Suppressed));
        assert_eq!(p.handler().registrations, 0);

        // Logout falls back to the default acknowledgement.
        let d = p.process(&mut out, &frame(ids::LOGOUT, 0, 4, &[])).unwrap();
        assert!(matches!(d, Disposition::Handled));
        assert_eq!(responses(&out).len(), 1);
    }

    #[test]
    fn authentication_decodes_code_and_continue_is_swallowed() {
        let mut p = Processor::new(Recording::default());
        let mut out = Vec::new();

        let d = p
            .process(&mut out, &frame(ids::AUTHENTICATION, 6, 1, b"secret"))
            .unwrap();

        assert!(matches!(d, Disposition::Suppressed));
        assert_eq!(p.handler().auth_codes, vec!["secret".to_string()]);
    }

    #[test]
    fn empty_authentication_body_is_suppressed() {
        let mut p = Processor::new(Recording::default());
        let mut out = Vec::new();

        let d = p
            .process(&mut out, &frame(ids::AUTHENTICATION, 0, 1, &[]))
            .unwrap();

        assert!(matches!(d, Disposition::Suppressed));
        assert!(p.handler().auth_codes.is_empty());
    }

    #[test]
    fn other_messages_get_positioned_cursor() {
        let mut p = Processor::new(Recording::default());
        let mut out = Vec::new();

        let d = p
            .process(&mut out, &frame(ids::TYRE_PRESSURE, 3, 1, &[0x7E, 0x7D, 0x01]))
            .unwrap();

        assert!(matches!(d, Disposition::Handled));
        assert_eq!(p.handler().other_payloads, vec![vec![0x7E, 0x7D, 0x01]]);
    }

    #[test]
    fn unknown_messages_default_to_acknowledgement() {
        let mut p = processor();
        let mut out = Vec::new();

        p.process(&mut out, &frame(ids::PARAM_QUERY_RESPONSE, 0, 9, &[]))
            .unwrap();

        let msgs = responses(&out);
        assert_eq!(&msgs[0][12..], &[0x00, 0x09, 0x01, 0x04, 0x00]);
    }

    #[test]
    fn handler_io_error_propagates() {
        let mut p = Processor::new(Recording {
            fail_with: Some(ErrorKind::BrokenPipe),
            ..Recording::default()
        });
        let mut out = Vec::new();

        let err = p
            .process(&mut out, &frame(ids::LOCATION_REPORT, 28, 1, &location_body()))
            .unwrap_err();

        assert!(matches!(err, DispatchError::Frame(FrameError::Io(_))));
        assert_eq!(p.handler().locations.len(), 1);
    }

    #[test]
    fn raw_hook_sees_every_frame() {
        let mut p = Processor::new(Recording::default());
        let mut out = Vec::new();

        p.process(&mut out, &[0x01, 0x02]).unwrap();
        p.process(&mut out, &frame(ids::HEARTBEAT, 0, 1, &[])).unwrap();

        assert_eq!(p.into_handler().raw, 2);
    }
}
