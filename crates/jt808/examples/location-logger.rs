//! Custom handler: prints location reports and rejects unknown terminals.
//!
//! Run with:
//!   cargo run --example location-logger

use std::collections::HashSet;
use std::io::Write;
use std::net::TcpListener;

use jt808::dispatch::{
    process_stream, send_response, DispatchError, Handler, Processor, ProcessorConfig, Result,
};
use jt808::frame::FrameReader;
use jt808::message::{common_response, Authentication, LocationReport, MessageHeader, ResultCode};

struct LocationLogger {
    known_codes: HashSet<String>,
    authenticated: bool,
}

impl Handler for LocationLogger {
    fn authentication(
        &mut self,
        w: &mut dyn Write,
        head: &MessageHeader,
        body: &Authentication,
    ) -> Result<()> {
        self.authenticated = self.known_codes.contains(&body.code);
        let result = if self.authenticated {
            ResultCode::Success
        } else {
            ResultCode::Failure
        };
        let (resp_head, resp_body) = common_response(head, result, self.next_flow_id());
        send_response(w, &resp_head, &resp_body)
    }

    fn location_report(
        &mut self,
        w: &mut dyn Write,
        head: &MessageHeader,
        body: &LocationReport,
    ) -> Result<()> {
        if !self.authenticated {
            // Skip silently; the terminal will re-authenticate.
            return Err(DispatchError::Continue);
        }
        println!(
            "{} {} lat={:.6} lon={:.6} speed={:.1}km/h acc={}",
            head.phone,
            body.timestamp,
            body.latitude_degrees(),
            body.longitude_degrees(),
            body.speed_kmh(),
            if body.acc_on() { "on" } else { "off" },
        );
        self.acknowledge(w, head)
    }
}

fn main() -> std::result::Result<(), Box<dyn std::error::Error>> {
    let listener = TcpListener::bind("127.0.0.1:6809")?;
    eprintln!("Listening on {}", listener.local_addr()?);

    // One terminal at a time keeps the output readable.
    for stream in listener.incoming() {
        let stream = stream?;
        let mut writer = stream.try_clone()?;
        let mut reader = FrameReader::new(stream);
        let handler = LocationLogger {
            known_codes: HashSet::from(["demo-auth-code".to_string()]),
            authenticated: false,
        };
        let mut processor = Processor::with_config(
            handler,
            ProcessorConfig {
                route_session_messages: true,
                ..ProcessorConfig::default()
            },
        );
        if let Err(e) = process_stream(&mut reader, &mut writer, &mut processor) {
            eprintln!("Terminal failed: {e}");
        }
    }

    Ok(())
}
