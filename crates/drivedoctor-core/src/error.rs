//! Error types for drivedoctor-core

use std::time::Duration;

use thiserror::Error;

/// Channel-level failure while talking to the drive
///
/// The core never retries after one of these; retry policy belongs to the
/// caller or to the transport.
#[derive(Debug, Error)]
pub enum TransportError {
    /// The outbound transfer was rejected
    #[error("transmit failed: {0}")]
    Transmit(String),

    /// The inbound transfer failed
    #[error("receive failed: {0}")]
    Receive(String),

    /// No response arrived within the timeout
    #[error("no response from device after {} ms", .0.as_millis())]
    Timeout(Duration),

    /// The device answered with a payload of unexpected length
    #[error("short read: expected {expected} bytes, got {actual}")]
    ShortRead {
        /// Bytes requested
        expected: usize,
        /// Bytes delivered
        actual: usize,
    },

    /// The device went away
    #[error("device disconnected")]
    Disconnected,
}

/// Failure to decode a raw request payload
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum DecodeError {
    /// Payload is not exactly one command long
    #[error("command must be {expected} bytes, got {actual}")]
    WrongLength {
        /// Required length
        expected: usize,
        /// Length received
        actual: usize,
    },

    /// Magic tag does not match this protocol version
    #[error("bad magic 0x{0:08X}")]
    BadMagic(u32),

    /// Opcode is neither read nor write
    #[error("unknown opcode 0x{0:X}")]
    UnknownOpcode(u32),
}

/// Errors surfaced by composite operations such as region dumps
#[derive(Debug, Error)]
pub enum Error {
    /// Talking to the device failed
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// Appending dumped bytes to the destination failed
    #[error("failed to write dump output: {0}")]
    Sink(#[from] std::io::Error),

    /// Range does not fit the 32-bit address space
    #[error("range 0x{start:08X}+0x{size:X} exceeds the 32-bit address space")]
    AddressOverflow {
        /// First address of the range
        start: u32,
        /// Requested length
        size: u32,
    },
}

/// Result type alias using the crate-level [`Error`]
pub type Result<T> = std::result::Result<T, Error>;

/// Result type alias for single channel operations
pub type TransportResult<T> = std::result::Result<T, TransportError>;
