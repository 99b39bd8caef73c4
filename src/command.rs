//! Remote commands and their wire encoding.
//!
//! The only command is `set-temp`, which carries a 10-bit target value. It
//! reaches the device as two raw bytes, most significant first.

use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Name of the set-point command on the HTTP form and the CLI.
pub const SET_TEMP: &str = "set-temp";

/// Validation failures for an inbound command. All are the caller's fault.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CommandError {
    #[error("unknown command '{0}'")]
    UnknownCommand(String),

    #[error("missing command")]
    MissingCommand,

    #[error("missing value")]
    MissingValue,

    #[error("value '{0}' is not a decimal unsigned integer")]
    InvalidValue(String),

    #[error("value {0} is out of range (max {max})", max = ControlValue::MAX)]
    OutOfRange(u64),

    #[error("malformed request: {0}")]
    MalformedRequest(String),
}

/// A validated set-point in `0..=1023`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct ControlValue(u16);

impl ControlValue {
    pub const MAX: u16 = 1023;

    pub fn new(value: u64) -> Result<Self, CommandError> {
        if value > u64::from(Self::MAX) {
            return Err(CommandError::OutOfRange(value));
        }
        Ok(Self(value as u16))
    }

    pub fn get(self) -> u16 {
        self.0
    }

    /// Wire encoding: big-endian `u16`.
    pub fn to_bytes(self) -> [u8; 2] {
        self.0.to_be_bytes()
    }
}

impl FromStr for ControlValue {
    type Err = CommandError;

    /// Parses a base-10 unsigned integer. Signs and whitespace are rejected.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.is_empty() {
            return Err(CommandError::MissingValue);
        }
        if !s.bytes().all(|b| b.is_ascii_digit()) {
            return Err(CommandError::InvalidValue(s.to_string()));
        }
        let value: u64 = s
            .parse()
            .map_err(|_| CommandError::InvalidValue(s.to_string()))?;
        Self::new(value)
    }
}

impl fmt::Display for ControlValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A decoded, validated command ready to be written to the device.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    SetTemp(ControlValue),
}

impl Command {
    /// Decode the raw `command`/`value` pair from a request.
    pub fn parse(command: Option<&str>, value: Option<&str>) -> Result<Self, CommandError> {
        match command {
            Some(SET_TEMP) => Ok(Self::SetTemp(value.unwrap_or_default().parse()?)),
            Some(other) if !other.is_empty() => Err(CommandError::UnknownCommand(other.to_string())),
            _ => Err(CommandError::MissingCommand),
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::SetTemp(_) => SET_TEMP,
        }
    }

    /// Bytes to put on the wire.
    pub fn encode(&self) -> [u8; 2] {
        match self {
            Self::SetTemp(value) => value.to_bytes(),
        }
    }
}
