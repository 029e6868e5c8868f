use std::io::{ErrorKind, Read, Write};
use std::net::{SocketAddr, TcpListener, TcpStream};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use jt808_dispatch::{
    process_stream, DefaultHandler, DispatchError, FlowIdMode, Handler, Processor,
    ProcessorConfig, StreamStats,
};
use jt808_frame::{ChecksumMode, FieldDecoder, FrameConfig, FrameError, FrameReader};
use jt808_message::{message_name, Authentication, LocationReport, MessageHeader, Registration};

use crate::cmd::{parse_duration, ServeArgs};
use crate::exit::{io_error, CliError, CliResult, INTERNAL, SUCCESS};

const ACCEPT_POLL: Duration = Duration::from_millis(100);

#[derive(Debug, Clone, Default)]
struct ServeSettings {
    frame: FrameConfig,
    processor: ProcessorConfig,
    flow_ids: FlowIdMode,
}

impl ServeSettings {
    fn from_args(args: &ServeArgs) -> CliResult<Self> {
        let idle = args.idle_timeout.as_deref().map(parse_duration).transpose()?;
        Ok(Self {
            frame: FrameConfig {
                max_frame_size: args.max_frame_size,
                read_timeout: idle,
                write_timeout: idle,
            },
            processor: ProcessorConfig {
                checksum: if args.skip_checksum {
                    ChecksumMode::Skip
                } else {
                    ChecksumMode::Verify
                },
                route_session_messages: args.route_session,
            },
            flow_ids: if args.sequential_flow_ids {
                FlowIdMode::Sequential
            } else {
                FlowIdMode::TimeOfDay
            },
        })
    }
}

pub fn run(args: ServeArgs) -> CliResult<i32> {
    let settings = Arc::new(ServeSettings::from_args(&args)?);
    let listener = TcpListener::bind(&args.listen).map_err(|err| io_error("bind failed", err))?;
    listener
        .set_nonblocking(true)
        .map_err(|err| io_error("listener setup failed", err))?;
    let local = listener
        .local_addr()
        .map_err(|err| io_error("listener setup failed", err))?;
    tracing::info!(addr = %local, "listening for terminals");

    let running = Arc::new(AtomicBool::new(true));
    install_ctrlc_handler(running.clone())?;

    while running.load(Ordering::SeqCst) {
        let (stream, peer) = match listener.accept() {
            Ok(accepted) => accepted,
            Err(err) if err.kind() == ErrorKind::WouldBlock => {
                thread::sleep(ACCEPT_POLL);
                continue;
            }
            Err(err) if err.kind() == ErrorKind::Interrupted => continue,
            Err(err) => return Err(io_error("accept failed", err)),
        };

        let settings = Arc::clone(&settings);
        let spawned = thread::Builder::new()
            .name(format!("conn-{peer}"))
            .spawn(move || serve_connection(stream, peer, &settings));
        if let Err(err) = spawned {
            tracing::error!(peer = %peer, error = %err, "failed to spawn connection thread");
        }
    }

    tracing::info!("shutting down");
    Ok(SUCCESS)
}

fn serve_connection(stream: TcpStream, peer: SocketAddr, settings: &ServeSettings) {
    tracing::info!(peer = %peer, "terminal connected");
    match serve_tcp(stream, peer, settings) {
        Ok(stats) => tracing::info!(
            peer = %peer,
            frames = stats.frames,
            handled = stats.handled,
            dropped = stats.dropped,
            oversized = stats.oversized,
            "terminal disconnected"
        ),
        Err(DispatchError::Frame(FrameError::Io(err)))
            if matches!(err.kind(), ErrorKind::WouldBlock | ErrorKind::TimedOut) =>
        {
            tracing::info!(peer = %peer, "closing idle connection");
        }
        Err(err) => tracing::warn!(peer = %peer, error = %err, "connection failed"),
    }
}

fn serve_tcp(
    stream: TcpStream,
    peer: SocketAddr,
    settings: &ServeSettings,
) -> Result<StreamStats, DispatchError> {
    stream.set_nonblocking(false).map_err(FrameError::Io)?;
    let writer = stream.try_clone().map_err(FrameError::Io)?;
    writer
        .set_write_timeout(settings.frame.write_timeout)
        .map_err(FrameError::Io)?;
    let reader = FrameReader::with_config_tcp(stream, settings.frame.clone())?;
    serve_stream(reader, writer, peer.to_string(), settings)
}

fn serve_stream<R: Read, W: Write>(
    mut reader: FrameReader<R>,
    mut writer: W,
    peer: String,
    settings: &ServeSettings,
) -> Result<StreamStats, DispatchError> {
    let handler = LoggingHandler::new(peer, settings.flow_ids);
    let mut processor = Processor::with_config(handler, settings.processor.clone());
    process_stream(&mut reader, &mut writer, &mut processor)
}

/// Acknowledges like [`DefaultHandler`] and logs what terminals report.
struct LoggingHandler {
    peer: String,
    inner: DefaultHandler,
}

impl LoggingHandler {
    fn new(peer: String, flow_ids: FlowIdMode) -> Self {
        Self {
            peer,
            inner: DefaultHandler::with_flow_ids(flow_ids),
        }
    }
}

impl Handler for LoggingHandler {
    fn raw(&mut self, raw: &[u8]) {
        tracing::trace!(peer = %self.peer, frame = %hex::encode(raw), "frame received");
    }

    fn next_flow_id(&mut self) -> u16 {
        self.inner.next_flow_id()
    }

    fn heartbeat(&mut self, w: &mut dyn Write, head: &MessageHeader) -> jt808_dispatch::Result<()> {
        tracing::debug!(peer = %self.peer, phone = %head.phone, "heartbeat");
        self.acknowledge(w, head)
    }

    fn registration(
        &mut self,
        w: &mut dyn Write,
        head: &MessageHeader,
        body: &Registration,
    ) -> jt808_dispatch::Result<()> {
        tracing::info!(
            peer = %self.peer,
            phone = %head.phone,
            terminal_id = %body.terminal_id,
            plate = body.plate.as_deref().unwrap_or("-"),
            "registration"
        );
        self.acknowledge(w, head)
    }

    fn authentication(
        &mut self,
        w: &mut dyn Write,
        head: &MessageHeader,
        body: &Authentication,
    ) -> jt808_dispatch::Result<()> {
        tracing::info!(peer = %self.peer, phone = %head.phone, code = %body.code, "authentication");
        self.acknowledge(w, head)
    }

    fn location_report(
        &mut self,
        w: &mut dyn Write,
        head: &MessageHeader,
        body: &LocationReport,
    ) -> jt808_dispatch::Result<()> {
        tracing::info!(
            peer = %self.peer,
            phone = %head.phone,
            lat = body.latitude_degrees(),
            lon = body.longitude_degrees(),
            speed_kmh = body.speed_kmh(),
            acc_on = body.acc_on(),
            time = %body.timestamp,
            "location"
        );
        self.acknowledge(w, head)
    }

    fn other(
        &mut self,
        w: &mut dyn Write,
        head: &MessageHeader,
        dec: &mut FieldDecoder<'_>,
    ) -> jt808_dispatch::Result<()> {
        tracing::debug!(
            peer = %self.peer,
            phone = %head.phone,
            message_id = format_args!("0x{:04X}", head.message_id),
            name = message_name(head.message_id),
            len = dec.remaining(),
            "unhandled message"
        );
        self.acknowledge(w, head)
    }
}

fn install_ctrlc_handler(running: Arc<AtomicBool>) -> CliResult<()> {
    ctrlc::set_handler(move || {
        running.store(false, Ordering::SeqCst);
    })
    .map_err(|err| CliError::new(INTERNAL, format!("signal handler setup failed: {err}")))
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;

    use jt808_frame::{restore, stuff, FrameScanner};
    use jt808_message::ids;

    use super::*;

    fn frame(message_id: u16, flow_id: u16, body: &[u8]) -> Vec<u8> {
        let mut header = Vec::with_capacity(12);
        header.extend_from_slice(&message_id.to_be_bytes());
        header.extend_from_slice(&(body.len() as u16).to_be_bytes());
        header.extend_from_slice(&[0x01, 0x38, 0x00, 0x13, 0x80, 0x00]);
        header.extend_from_slice(&flow_id.to_be_bytes());
        stuff(&header[..], body).unwrap().to_vec()
    }

    fn args(extra: &[&str]) -> ServeArgs {
        use clap::Parser;

        #[derive(Parser)]
        struct Wrapper {
            #[command(flatten)]
            serve: ServeArgs,
        }

        let mut argv = vec!["serve"];
        argv.extend_from_slice(extra);
        Wrapper::try_parse_from(argv).unwrap().serve
    }

    #[test]
    fn settings_follow_flags() {
        let settings = ServeSettings::from_args(&args(&[
            "--skip-checksum",
            "--route-session",
            "--sequential-flow-ids",
            "--max-frame-size",
            "512",
            "--idle-timeout",
            "90s",
        ]))
        .unwrap();

        assert_eq!(settings.processor.checksum, ChecksumMode::Skip);
        assert!(settings.processor.route_session_messages);
        assert_eq!(settings.flow_ids, FlowIdMode::Sequential);
        assert_eq!(settings.frame.max_frame_size, 512);
        assert_eq!(settings.frame.read_timeout, Some(Duration::from_secs(90)));
    }

    #[test]
    fn bad_idle_timeout_is_usage_error() {
        let err = ServeSettings::from_args(&args(&["--idle-timeout", "soon"])).unwrap_err();
        assert_eq!(err.code, crate::exit::USAGE);
    }

    #[test]
    fn stream_is_acknowledged_in_order() {
        let mut wire = frame(ids::HEARTBEAT, 5, &[]);
        wire.extend(frame(ids::AUTHENTICATION, 6, b"token"));
        wire.extend(frame(0x0900, 7, &[0x01, 0x02]));
        let settings = ServeSettings {
            flow_ids: FlowIdMode::Sequential,
            ..ServeSettings::default()
        };

        let mut out = Vec::new();
        let stats = serve_stream(
            FrameReader::new(Cursor::new(wire)),
            &mut out,
            "test".to_string(),
            &settings,
        )
        .unwrap();
        assert_eq!(stats.handled, 3);

        let mut scanner = FrameScanner::default();
        scanner.push(&out);
        let mut seen = Vec::new();
        while let Some(raw) = scanner.next_frame().unwrap() {
            let msg = restore(&raw).unwrap();
            seen.push((
                u16::from_be_bytes([msg[10], msg[11]]),
                u16::from_be_bytes([msg[12], msg[13]]),
                u16::from_be_bytes([msg[14], msg[15]]),
            ));
        }
        assert_eq!(
            seen,
            vec![(0, 5, ids::HEARTBEAT), (1, 6, ids::AUTHENTICATION), (2, 7, 0x0900)]
        );
    }
}
