//! Error types for the cm4fan driver

use std::fmt;
use thiserror::Error;

/// Direction of a failed register transaction
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RegisterOp {
    Read,
    Write,
}

impl fmt::Display for RegisterOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RegisterOp::Read => f.write_str("read"),
            RegisterOp::Write => f.write_str("write"),
        }
    }
}

/// Core error type for cm4fan operations
#[derive(Error, Debug)]
pub enum Cm4FanError {
    /// The transport could not open a connection on the given bus
    #[error("Failed to open bus {bus}: {reason}")]
    BusOpen { bus: u8, reason: String },

    /// No candidate bus answered the identity probe
    #[error("Device not found on buses {first}-{last}")]
    DeviceNotFound { first: u8, last: u8 },

    /// A device answered but reported the wrong product id
    #[error("Unexpected product id on bus {bus}: expected 0x{expected:02X}, found 0x{found:02X}")]
    IdentityMismatch { bus: u8, expected: u8, found: u8 },

    /// A register transaction failed on an open connection
    #[error("Register {op} failed at 0x{register:02X}: {reason}")]
    RegisterIo {
        op: RegisterOp,
        register: u8,
        reason: String,
    },

    /// Invalid input or arguments
    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

impl Cm4FanError {
    /// Shorthand for a failed register read
    pub fn read_failed(register: u8, reason: impl Into<String>) -> Self {
        Cm4FanError::RegisterIo {
            op: RegisterOp::Read,
            register,
            reason: reason.into(),
        }
    }

    /// Shorthand for a failed register write
    pub fn write_failed(register: u8, reason: impl Into<String>) -> Self {
        Cm4FanError::RegisterIo {
            op: RegisterOp::Write,
            register,
            reason: reason.into(),
        }
    }
}

/// Result type alias for cm4fan operations
pub type Result<T> = std::result::Result<T, Cm4FanError>;
