//! Core error types.

use thiserror::Error;

/// Failures in the codec and buffer layer.
///
/// Per the bridge's error design these are all recoverable: buffer
/// errors drop a packet, codec errors drop a frame, and nothing here
/// terminates a stream by itself.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CoreError {
    /// A ring-buffer write did not fit; the buffer was cleared to keep
    /// record boundaries intact.
    #[error("ring buffer overflow: {requested} bytes requested, {free} free")]
    RingOverflow {
        /// Bytes the caller tried to store.
        requested: usize,
        /// Free space at the time of the write.
        free: usize,
    },

    /// A ring-buffer read asked for more than is buffered; state is
    /// untouched.
    #[error("ring buffer underflow: {requested} bytes requested, {available} available")]
    RingUnderflow {
        /// Bytes the caller asked for.
        requested: usize,
        /// Bytes actually buffered.
        available: usize,
    },

    /// Link control failed its Reed-Solomon check after unmasking.
    #[error("link control checksum failure")]
    LinkControl,

    /// The VD-Mode-2 callsign channel failed its checksum.
    #[error("callsign channel checksum failure")]
    CallsignChannel,
}
