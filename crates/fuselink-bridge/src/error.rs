//! Bridge runtime errors.

use thiserror::Error;

/// Failures surfaced by the runtime layer.
///
/// Configuration and bind failures are fatal at startup (exit code 1);
/// everything else is logged and survived.
#[derive(Debug, Error)]
pub enum BridgeError {
    /// Configuration file missing, malformed, or invalid.
    #[error("configuration error: {0}")]
    Config(String),

    /// Socket setup or I/O failure.
    #[error("transport error: {0}")]
    Transport(#[from] std::io::Error),

    /// DMR ID file could not be read.
    #[error("lookup error: {0}")]
    Lookup(String),
}
