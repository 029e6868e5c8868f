//! Message identifiers and result codes.
//!
//! Terminal-originated messages live below `0x8000`; platform commands set
//! the high bit.

/// Terminal general response.
pub const TERMINAL_COMMON_RESPONSE: u16 = 0x0001;

/// Terminal heartbeat (empty body).
pub const HEARTBEAT: u16 = 0x0002;

/// Terminal logout (empty body).
pub const LOGOUT: u16 = 0x0003;

/// Terminal registration.
pub const REGISTRATION: u16 = 0x0100;

/// Terminal authentication.
pub const AUTHENTICATION: u16 = 0x0102;

/// Response to a terminal parameter query.
pub const PARAM_QUERY_RESPONSE: u16 = 0x0104;

/// Location report.
pub const LOCATION_REPORT: u16 = 0x0200;

/// Tyre pressure passthrough.
pub const TYRE_PRESSURE: u16 = 0x0600;

/// Platform general response.
pub const PLATFORM_COMMON_RESPONSE: u16 = 0x8001;

/// Registration response.
pub const REGISTRATION_RESPONSE: u16 = 0x8100;

/// Set terminal parameters.
pub const PARAM_SETTINGS: u16 = 0x8103;

/// Query terminal parameters.
pub const PARAM_QUERY: u16 = 0x8104;

/// Result codes carried by common and registration responses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum ResultCode {
    Success = 0,
    Failure = 1,
    Error = 2,
    Unsupported = 3,
    Warning = 4,
}

impl ResultCode {
    pub fn as_u8(self) -> u8 {
        self as u8
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Success => "success",
            Self::Failure => "failure",
            Self::Error => "error",
            Self::Unsupported => "unsupported",
            Self::Warning => "warning",
        }
    }

    /// Map a raw result byte, if it is one of the known codes.
    pub fn from_u8(value: u8) -> Option<Self> {
        match value {
            0 => Some(Self::Success),
            1 => Some(Self::Failure),
            2 => Some(Self::Error),
            3 => Some(Self::Unsupported),
            4 => Some(Self::Warning),
            _ => None,
        }
    }
}

/// Message kinds the dispatcher knows how to route.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageKind {
    TerminalCommonResponse,
    Heartbeat,
    Logout,
    Registration,
    Authentication,
    LocationReport,
    Other(u16),
}

impl MessageKind {
    pub fn from_id(id: u16) -> Self {
        match id {
            TERMINAL_COMMON_RESPONSE => Self::TerminalCommonResponse,
            HEARTBEAT => Self::Heartbeat,
            LOGOUT => Self::Logout,
            REGISTRATION => Self::Registration,
            AUTHENTICATION => Self::Authentication,
            LOCATION_REPORT => Self::LocationReport,
            other => Self::Other(other),
        }
    }
}

/// Returns a human-readable name for a message id.
pub fn message_name(id: u16) -> &'static str {
    match id {
        TERMINAL_COMMON_RESPONSE => "TERMINAL_COMMON_RESPONSE",
        HEARTBEAT => "HEARTBEAT",
        LOGOUT => "LOGOUT",
        REGISTRATION => "REGISTRATION",
        AUTHENTICATION => "AUTHENTICATION",
        PARAM_QUERY_RESPONSE => "PARAM_QUERY_RESPONSE",
        LOCATION_REPORT => "LOCATION_REPORT",
        TYRE_PRESSURE => "TYRE_PRESSURE",
        PLATFORM_COMMON_RESPONSE => "PLATFORM_COMMON_RESPONSE",
        REGISTRATION_RESPONSE => "REGISTRATION_RESPONSE",
        PARAM_SETTINGS => "PARAM_SETTINGS",
        PARAM_QUERY => "PARAM_QUERY",
        id if is_platform_command(id) => "PLATFORM",
        _ => "TERMINAL",
    }
}

/// Returns true if the id is a platform-originated command.
pub fn is_platform_command(id: u16) -> bool {
    id & 0x8000 != 0
}
