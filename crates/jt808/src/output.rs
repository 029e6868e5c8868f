use std::io::IsTerminal;

use clap::ValueEnum;
use comfy_table::{presets::UTF8_FULL, ContentArrangement, Table};
use jt808_message::{message_name, MessageBody, MessageHeader, ResultCode};
use serde::Serialize;
use serde_json::{json, Value};

#[derive(Clone, Debug, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Json,
    Table,
    Pretty,
}

impl OutputFormat {
    pub fn default_for_stdout() -> Self {
        if std::io::stdout().is_terminal() {
            Self::Table
        } else {
            Self::Json
        }
    }
}

/// One decoded terminal message, ready for printing.
#[derive(Debug, Serialize)]
pub struct MessageOutput {
    pub message_id: String,
    pub name: &'static str,
    pub phone: String,
    pub flow_id: u16,
    pub body_len: u16,
    pub encrypted: bool,
    pub body: Value,
}

impl MessageOutput {
    pub fn new(head: &MessageHeader, body: &MessageBody) -> Self {
        Self::with_body(head, body_json(body))
    }

    /// Encrypted bodies are shown as hex, undecoded.
    pub fn encrypted(head: &MessageHeader, payload: &[u8]) -> Self {
        Self::with_body(head, json!({ "payload": hex::encode(payload) }))
    }

    fn with_body(head: &MessageHeader, body: Value) -> Self {
        Self {
            message_id: format!("0x{:04X}", head.message_id),
            name: message_name(head.message_id),
            phone: head.phone.clone(),
            flow_id: head.flow_id,
            body_len: head.body_len(),
            encrypted: head.is_encrypted(),
            body,
        }
    }
}

pub fn body_json(body: &MessageBody) -> Value {
    match body {
        MessageBody::TerminalResponse(resp) => json!({
            "flow_id": resp.flow_id,
            "response_id": format!("0x{:04X}", resp.response_id),
            "result": resp.result,
            "outcome": ResultCode::from_u8(resp.result).map(ResultCode::as_str),
        }),
        MessageBody::Heartbeat | MessageBody::Logout => json!({}),
        MessageBody::Registration(reg) => json!({
            "province": reg.province,
            "city": reg.city,
            "manufacturer_id": reg.manufacturer_id,
            "terminal_type": reg.terminal_type,
            "terminal_id": reg.terminal_id,
            "plate_color": reg.plate_color,
            "plate": reg.plate,
        }),
        MessageBody::Authentication(auth) => json!({ "code": auth.code }),
        MessageBody::LocationReport(loc) => json!({
            "alarm": loc.alarm,
            "status": loc.status,
            "acc_on": loc.acc_on(),
            "positioned": loc.is_positioned(),
            "latitude": loc.latitude_degrees(),
            "longitude": loc.longitude_degrees(),
            "elevation": loc.elevation,
            "speed_kmh": loc.speed_kmh(),
            "direction": loc.direction,
            "timestamp": loc.timestamp,
        }),
        MessageBody::Other { payload, .. } => json!({ "payload": hex::encode(payload) }),
    }
}

pub fn render(out: &MessageOutput, format: OutputFormat) -> String {
    match format {
        OutputFormat::Json => {
            serde_json::to_string(out).unwrap_or_else(|_| "{}".to_string())
        }
        OutputFormat::Table => {
            let mut table = Table::new();
            table
                .load_preset(UTF8_FULL)
                .set_content_arrangement(ContentArrangement::Dynamic)
                .set_header(vec!["FIELD", "VALUE"])
                .add_row(vec!["message_id".to_string(), out.message_id.clone()])
                .add_row(vec!["name".to_string(), out.name.to_string()])
                .add_row(vec!["phone".to_string(), out.phone.clone()])
                .add_row(vec!["flow_id".to_string(), out.flow_id.to_string()])
                .add_row(vec!["body_len".to_string(), out.body_len.to_string()])
                .add_row(vec!["encrypted".to_string(), out.encrypted.to_string()]);
            if let Value::Object(fields) = &out.body {
                for (key, value) in fields {
                    table.add_row(vec![format!("body.{key}"), plain(value)]);
                }
            }
            table.to_string()
        }
        OutputFormat::Pretty => format!(
            "{} {} phone={} flow={} len={} body={}",
            out.message_id, out.name, out.phone, out.flow_id, out.body_len, out.body
        ),
    }
}

pub fn print_message(out: &MessageOutput, format: OutputFormat) {
    println!("{}", render(out, format));
}

fn plain(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => "-".to_string(),
        other => other.to_string(),
    }
}
