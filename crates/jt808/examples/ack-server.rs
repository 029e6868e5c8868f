//! Minimal platform: accepts terminals and acknowledges every message.
//!
//! Run with:
//!   cargo run --example ack-server
//!
//! In another terminal, send a heartbeat from terminal 013800138000:
//!   printf '\x7e\x00\x02\x00\x00\x01\x38\x00\x13\x80\x00\x00\x01\xa9\x7e' | nc 127.0.0.1 6808 | xxd

use std::net::TcpListener;
use std::thread;

use jt808::dispatch::{process_stream, DefaultHandler, Processor};
use jt808::frame::FrameReader;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let listener = TcpListener::bind("127.0.0.1:6808")?;
    eprintln!("Listening on {}", listener.local_addr()?);

    for stream in listener.incoming() {
        let stream = stream?;
        let peer = stream.peer_addr()?;
        let mut writer = stream.try_clone()?;

        thread::spawn(move || {
            eprintln!("Terminal connected: {peer}");
            let mut reader = FrameReader::new(stream);
            let mut processor = Processor::new(DefaultHandler::new());
            match process_stream(&mut reader, &mut writer, &mut processor) {
                Ok(stats) => eprintln!(
                    "Terminal {peer} disconnected after {} frames ({} answered)",
                    stats.frames, stats.handled
                ),
                Err(e) => eprintln!("Terminal {peer} failed: {e}"),
            }
        });
    }

    Ok(())
}
