use std::io::Read;

use jt808_frame::{
    bcd_to_string, restore_with, string_to_bcd, ChecksumMode, FieldDecoder, FrameScanner,
    DEFAULT_MAX_FRAME_SIZE,
};
use jt808_message::{MessageBody, MessageHeader, DEVICE_ID_LEN};

use crate::cmd::DecodeArgs;
use crate::exit::{
    frame_error, io_error, message_error, CliError, CliResult, DATA_INVALID, FAILURE, SUCCESS,
    USAGE,
};
use crate::output::{print_message, MessageOutput, OutputFormat};

pub fn run(args: DecodeArgs, format: OutputFormat) -> CliResult<i32> {
    let input = if args.hex.is_empty() {
        let mut text = String::new();
        std::io::stdin()
            .read_to_string(&mut text)
            .map_err(|err| io_error("stdin read failed", err))?;
        text
    } else {
        args.hex.concat()
    };

    let phone = args.phone.as_deref().map(normalize_phone).transpose()?;
    let bytes = parse_hex(&input)?;
    let checksum = if args.skip_checksum {
        ChecksumMode::Skip
    } else {
        ChecksumMode::Verify
    };

    let mut messages = decode_all(&bytes, checksum)?;
    if messages.is_empty() {
        return Err(CliError::new(DATA_INVALID, "no complete frame in input"));
    }
    if let Some(phone) = phone {
        messages.retain(|message| message.phone == phone);
        if messages.is_empty() {
            return Err(CliError::new(FAILURE, format!("no message from phone {phone}")));
        }
    }
    for message in &messages {
        print_message(message, format);
    }
    Ok(SUCCESS)
}

fn parse_hex(input: &str) -> CliResult<Vec<u8>> {
    let digits: String = input.split_whitespace().collect();
    let digits = digits
        .strip_prefix("0x")
        .or_else(|| digits.strip_prefix("0X"))
        .unwrap_or(&digits);
    hex::decode(digits).map_err(|err| CliError::new(USAGE, format!("invalid hex input: {err}")))
}

/// Canonical form of a phone number as it appears in decoded headers.
fn normalize_phone(phone: &str) -> CliResult<String> {
    let packed = string_to_bcd(phone.trim(), DEVICE_ID_LEN)
        .map_err(|err| CliError::new(USAGE, format!("invalid phone number: {err}")))?;
    Ok(bcd_to_string(&packed))
}

fn decode_all(bytes: &[u8], checksum: ChecksumMode) -> CliResult<Vec<MessageOutput>> {
    let mut scanner = FrameScanner::new(DEFAULT_MAX_FRAME_SIZE.max(bytes.len()));
    scanner.push(bytes);

    let mut out = Vec::new();
    while let Some(raw) = scanner
        .next_frame()
        .map_err(|err| frame_error("frame scan failed", err))?
    {
        out.push(decode_one(&raw, checksum)?);
    }

    let trailing = scanner.buffered();
    if trailing > 0 {
        tracing::warn!(trailing, "ignoring incomplete trailing frame");
    }
    Ok(out)
}

fn decode_one(raw: &[u8], checksum: ChecksumMode) -> CliResult<MessageOutput> {
    let message = restore_with(raw, checksum).map_err(|err| frame_error("restore failed", err))?;
    let mut dec = FieldDecoder::new(&message);
    let head =
        MessageHeader::decode(&mut dec).map_err(|err| message_error("header decode failed", err))?;

    if head.is_encrypted() {
        return Ok(MessageOutput::encrypted(&head, dec.read_rest()));
    }

    let body = MessageBody::decode(&head, &mut dec)
        .map_err(|err| message_error("body decode failed", err))?;
    Ok(MessageOutput::new(&head, &body))
}
