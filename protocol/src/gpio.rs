//! GPIO command codec for the pump relay device.
//!
//! Payloads are plain text and must match the device firmware byte for byte:
//! commands `gpio:set:<pin>:<0|1>` and `gpio:get:<pin>`, responses
//! `gpio:set:ok` and `gpio:get:ok:<0|1>`.

const SET_OK: &str = "gpio:set:ok";
const GET_OK_PREFIX: &str = "gpio:get:ok";

/// An outgoing command for the relay's system topic.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GpioCommand {
    Set { pin: u8, on: bool },
    Get { pin: u8 },
}

impl GpioCommand {
    pub fn encode(&self) -> String {
        match *self {
            GpioCommand::Set { pin, on } => format!("gpio:set:{}:{}", pin, on as u8),
            GpioCommand::Get { pin } => format!("gpio:get:{}", pin),
        }
    }
}

/// A decoded payload from the relay's status topic.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusPayload {
    /// A set command was applied.
    SetOk,
    /// Response to a state query, carrying the actual relay state.
    GetState(bool),
    /// Anything else on the status topic signals a failed command.
    Unrecognized,
}

pub fn parse_status(payload: &str) -> StatusPayload {
    if payload == SET_OK {
        return StatusPayload::SetOk;
    }
    if let Some(rest) = payload.strip_prefix(GET_OK_PREFIX) {
        match rest.strip_prefix(':') {
            Some("0") => return StatusPayload::GetState(false),
            Some("1") => return StatusPayload::GetState(true),
            _ => return StatusPayload::Unrecognized,
        }
    }
    StatusPayload::Unrecognized
}
