use std::time::Duration;

use clap::{Args, Subcommand};
use jt808_frame::DEFAULT_MAX_FRAME_SIZE;

use crate::exit::{CliError, CliResult, USAGE};
use crate::output::OutputFormat;

pub mod decode;
pub mod serve;
pub mod version;

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Accept terminal connections and acknowledge their messages.
    Serve(ServeArgs),
    /// Decode hex-encoded frames and print the messages.
    Decode(DecodeArgs),
    /// Show version information.
    Version(VersionArgs),
}

pub fn run(command: Command, format: OutputFormat) -> CliResult<i32> {
    match command {
        Command::Serve(args) => serve::run(args),
        Command::Decode(args) => decode::run(args, format),
        Command::Version(args) => version::run(args),
    }
}

#[derive(Args, Debug)]
pub struct ServeArgs {
    /// Address to listen on.
    #[arg(long, short = 'l', env = "JT808_LISTEN", default_value = "0.0.0.0:6808")]
    pub listen: String,
    /// Accept frames whose checksum does not match.
    #[arg(long, env = "JT808_SKIP_CHECKSUM")]
    pub skip_checksum: bool,
    /// Acknowledge registration, logout and terminal responses instead of ignoring them.
    #[arg(long, env = "JT808_ROUTE_SESSION")]
    pub route_session: bool,
    /// Number responses 0, 1, 2... per connection instead of seconds since midnight.
    #[arg(long, env = "JT808_SEQUENTIAL_FLOW_IDS")]
    pub sequential_flow_ids: bool,
    /// Largest raw frame accepted, in bytes.
    #[arg(long, env = "JT808_MAX_FRAME_SIZE", default_value_t = DEFAULT_MAX_FRAME_SIZE)]
    pub max_frame_size: usize,
    /// Close connections idle for this long (e.g. 90s, 5m, 500ms).
    #[arg(long, env = "JT808_IDLE_TIMEOUT")]
    pub idle_timeout: Option<String>,
}

#[derive(Args, Debug)]
pub struct DecodeArgs {
    /// Hex-encoded bytes holding one or more frames. Reads stdin when omitted.
    pub hex: Vec<String>,
    /// Decode frames whose checksum does not match.
    #[arg(long, env = "JT808_SKIP_CHECKSUM")]
    pub skip_checksum: bool,
    /// Only print messages from this terminal phone number.
    #[arg(long)]
    pub phone: Option<String>,
}

#[derive(Args, Debug)]
pub struct VersionArgs {
    /// Show extended build provenance.
    #[arg(long)]
    pub extended: bool,
}

pub(crate) fn parse_duration(input: &str) -> CliResult<Duration> {
    let input = input.trim();
    if input.is_empty() {
        return Err(CliError::new(USAGE, "duration must not be empty"));
    }

    let (number, scale) = if let Some(num) = input.strip_suffix("ms") {
        (num, 1)
    } else if let Some(num) = input.strip_suffix('s') {
        (num, 1_000)
    } else if let Some(num) = input.strip_suffix('m') {
        (num, 60_000)
    } else {
        (input, 1_000)
    };

    let value: u64 = number
        .parse()
        .map_err(|_| CliError::new(USAGE, format!("invalid duration value: {input}")))?;

    if value == 0 {
        return Err(CliError::new(USAGE, "duration must be greater than zero"));
    }

    value
        .checked_mul(scale)
        .map(Duration::from_millis)
        .ok_or_else(|| CliError::new(USAGE, format!("duration too large: {input}")))
}
