//! Protocol error types.

use thiserror::Error;

/// Convenience alias used across the crate.
pub type Result<T> = std::result::Result<T, ProtoError>;

/// Structural wire-format failures.
///
/// Every variant maps to "log at debug, drop the packet": nothing here
/// changes session state or stops the bridge.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProtoError {
    /// Buffer shorter than the fixed frame layout requires.
    #[error("frame too short: expected {expected} bytes, got {actual}")]
    FrameTooShort {
        /// Bytes the layout requires.
        expected: usize,
        /// Bytes actually received.
        actual: usize,
    },

    /// Magic prefix did not match.
    #[error("invalid magic")]
    InvalidMagic,

    /// Sync word did not match the YSF frame sync.
    #[error("invalid frame sync")]
    InvalidSync,

    /// FICH checksum failed after error correction.
    #[error("FICH checksum mismatch")]
    FichChecksum,

    /// A callsign field held a character outside `A-Z`, `0-9`, space.
    #[error("invalid callsign character {0:?}")]
    InvalidCallsignChar(char),

    /// A callsign was empty or longer than ten characters.
    #[error("invalid callsign length {0}")]
    InvalidCallsignLength(usize),

    /// A numeric field exceeded its declared width.
    #[error("field value {value} does not fit {field}")]
    FieldOverflow {
        /// Field name for the log line.
        field: &'static str,
        /// Offending value.
        value: u32,
    },
}
