//! The 155-byte YSF network frame with zero-copy parsing.
//!
//! Layout on the wire (all fields raw bytes):
//!
//! ```text
//! "YSFD" | source callsign (10) | destination callsign (10)
//!        | reserved (11) | frame sync (5) | FICH (25) | payload (90)
//! ```
//!
//! Also builds the two short datagrams of the reflector dialect: the
//! `YSFP` poll and the `YSFU` unlink, each `magic + callsign`.

use zerocopy::{FromBytes, Immutable, IntoBytes, KnownLayout};

use crate::{
    Callsign,
    errors::{ProtoError, Result},
};

/// Fixed 155-byte YSF data frame.
///
/// Fields are stored as raw byte arrays to avoid alignment issues; the
/// zerocopy derives make casting from untrusted datagrams safe (every
/// 155-byte pattern is a structurally valid bit pattern, validation
/// happens in [`YsfFrame::from_bytes`]).
#[repr(C, packed)]
#[derive(Clone, Copy, FromBytes, IntoBytes, KnownLayout, Immutable)]
pub struct YsfFrame {
    magic: [u8; 4],
    source: [u8; 10],
    destination: [u8; 10],
    reserved: [u8; 11],
    sync: [u8; 5],
    fich: [u8; 25],
    payload: [u8; 90],
}

impl YsfFrame {
    /// Size of the frame on the wire.
    pub const SIZE: usize = 155;

    /// Frame magic, `"YSFD"`.
    pub const MAGIC: [u8; 4] = *b"YSFD";

    /// The frame sync word preceding the FICH.
    pub const SYNC: [u8; 5] = [0xD4, 0x71, 0xC9, 0x63, 0x4D];

    /// Size of the poll / unlink datagrams.
    pub const POLL_SIZE: usize = 14;

    /// Build a frame with validated magic and sync, empty elsewhere.
    #[must_use]
    pub fn new(source: Callsign, destination: Callsign) -> Self {
        Self {
            magic: Self::MAGIC,
            source: *source.as_bytes(),
            destination: *destination.as_bytes(),
            reserved: [0; 11],
            sync: Self::SYNC,
            fich: [0; 25],
            payload: [0; 90],
        }
    }

    /// Parse a frame from a datagram (zero-copy, safe).
    ///
    /// # Errors
    ///
    /// - [`ProtoError::FrameTooShort`] if fewer than 155 bytes
    /// - [`ProtoError::InvalidMagic`] if the magic does not match
    /// - [`ProtoError::InvalidSync`] if the sync word does not match
    pub fn from_bytes(bytes: &[u8]) -> Result<&Self> {
        let frame = Self::ref_from_prefix(bytes)
            .map_err(|_| ProtoError::FrameTooShort { expected: Self::SIZE, actual: bytes.len() })?
            .0;

        if frame.magic != Self::MAGIC {
            return Err(ProtoError::InvalidMagic);
        }
        if frame.sync != Self::SYNC {
            return Err(ProtoError::InvalidSync);
        }

        Ok(frame)
    }

    /// Serialize the frame to its wire bytes.
    #[must_use]
    pub fn to_bytes(&self) -> [u8; Self::SIZE] {
        let mut out = [0u8; Self::SIZE];
        out.copy_from_slice(IntoBytes::as_bytes(self));
        out
    }

    /// Source callsign field.
    #[must_use]
    pub fn source(&self) -> Callsign {
        Callsign::from_wire(&self.source)
    }

    /// Destination callsign field.
    #[must_use]
    pub fn destination(&self) -> Callsign {
        Callsign::from_wire(&self.destination)
    }

    /// The 25-byte encoded FICH region.
    #[must_use]
    pub fn fich_bytes(&self) -> &[u8; 25] {
        &self.fich
    }

    /// The 90-byte voice/data payload.
    #[must_use]
    pub fn payload(&self) -> &[u8; 90] {
        &self.payload
    }

    /// Replace the source callsign.
    pub fn set_source(&mut self, source: Callsign) {
        self.source = *source.as_bytes();
    }

    /// Replace the destination callsign.
    pub fn set_destination(&mut self, destination: Callsign) {
        self.destination = *destination.as_bytes();
    }

    /// Replace the encoded FICH region.
    pub fn set_fich_bytes(&mut self, fich: &[u8; 25]) {
        self.fich = *fich;
    }

    /// Replace the payload.
    pub fn set_payload(&mut self, payload: &[u8; 90]) {
        self.payload = *payload;
    }
}

// Manual PartialEq (can't derive due to packed repr)
impl PartialEq for YsfFrame {
    fn eq(&self, other: &Self) -> bool {
        self.to_bytes() == other.to_bytes()
    }
}

impl Eq for YsfFrame {}

impl std::fmt::Debug for YsfFrame {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("YsfFrame")
            .field("source", &self.source())
            .field("destination", &self.destination())
            .finish_non_exhaustive()
    }
}

/// Build the 14-byte `YSFP` keep-alive poll.
#[must_use]
pub fn poll_packet(callsign: Callsign) -> [u8; YsfFrame::POLL_SIZE] {
    let mut out = [0u8; YsfFrame::POLL_SIZE];
    out[..4].copy_from_slice(b"YSFP");
    out[4..].copy_from_slice(callsign.as_bytes());
    out
}

/// Build the 14-byte `YSFU` unlink sent on graceful shutdown.
#[must_use]
pub fn unlink_packet(callsign: Callsign) -> [u8; YsfFrame::POLL_SIZE] {
    let mut out = [0u8; YsfFrame::POLL_SIZE];
    out[..4].copy_from_slice(b"YSFU");
    out[4..].copy_from_slice(callsign.as_bytes());
    out
}
