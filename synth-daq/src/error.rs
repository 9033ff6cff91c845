//! Error types for synth-daq

use crate::um7::packet::FramingError;
use std::path::PathBuf;

/// Result type alias
pub type Result<T> = std::result::Result<T, Error>;

/// synth-daq error types
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Serial port error
    #[error("Serial port error: {0}")]
    Serial(#[from] serialport::Error),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Output file could not be opened or written
    #[error("Output file {}: {source}", path.display())]
    Output {
        /// File that failed
        path: PathBuf,
        /// Underlying I/O error
        source: std::io::Error,
    },

    /// Configuration file could not be parsed
    #[error("Config parse error: {0}")]
    Config(#[from] toml::de::Error),

    /// Packet framing error (only surfaces where a single frame was expected)
    #[error("Framing error: {0}")]
    Framing(#[from] FramingError),

    /// Invalid packet contents
    #[error("Invalid packet: {0}")]
    InvalidPacket(String),

    /// Sensor never answered a register write
    #[error("No response from UM7 register {address:#04x} after {attempts} attempts")]
    NoResponse {
        /// Register address that was written
        address: u8,
        /// Number of transmissions performed
        attempts: u32,
    },

    /// Sensor acknowledged a command with the COMMAND_FAILED bit set
    #[error("UM7 command {code:#04x} failed")]
    CommandFailed {
        /// Command register address
        code: u8,
    },

    /// Heartbeat did not arrive within the byte budget
    #[error("No health packet within {0} bytes")]
    NoHeartbeat(usize),

    /// Bit field wider than the register bits allocated to it
    #[error("Field {field} needs {width} bits but only {capacity} are allocated")]
    EncodingOverflow {
        /// Field name
        field: &'static str,
        /// Declared field width
        width: u32,
        /// Bits available in the register layout
        capacity: u32,
    },

    /// Register template could not be parsed
    #[error("Template error: {0}")]
    Template(String),

    /// Acquisition backend failure
    #[error("Acquisition backend error: {0}")]
    Backend(String),

    /// Invalid parameter
    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    /// Background thread panicked
    #[error("Thread panicked")]
    ThreadPanic,

    /// Generic error with message
    #[error("{0}")]
    Other(String),
}
