//! Message dispatch for JT/T 808 terminal streams.
//!
//! A [`Processor`] takes raw frames, restores and parses them, and routes
//! each message to a [`Handler`] method by type. The default handler answers
//! every message with a platform general response.
//!
//! ```no_run
//! use std::net::TcpListener;
//!
//! use jt808_dispatch::{process_stream, DefaultHandler, Processor};
//! use jt808_frame::FrameReader;
//!
//! let listener = TcpListener::bind("0.0.0.0:6808")?;
//! let (stream, _) = listener.accept()?;
//! let mut writer = stream.try_clone()?;
//! let mut reader = FrameReader::new(stream);
//! let mut processor = Processor::new(DefaultHandler::new());
//! let stats = process_stream(&mut reader, &mut writer, &mut processor)?;
//! println!("{} frames", stats.frames);
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

pub mod error;
pub mod flow_id;
pub mod handler;
pub mod processor;
pub mod stream;

pub use error::{DispatchError, Result};
pub use flow_id::{
    time_of_day_flow_id, FlowIdGenerator, FlowIdMode, FlowIds, Sequential, TimeOfDay,
};
pub use handler::{send_response, DefaultHandler, Handler};
pub use processor::{Disposition, DropReason, Processor, ProcessorConfig};
pub use stream::{process_stream, StreamStats};
