//! The 55-byte DMR Homebrew `DMRD` data packet.
//!
//! Layout on the wire (big-endian multi-byte fields):
//!
//! ```text
//! "DMRD" | seq (1) | source id (3) | destination id (3) | repeater id (4)
//!        | flags (1) | stream id (4) | DMR payload (33) | BER (1) | RSSI (1)
//! ```
//!
//! Flags bitfield: bit 7 slot, bit 6 call type, bit 5 data sync, bit 4
//! voice sync, bits 3..0 the voice sequence N or the data type.

use zerocopy::{FromBytes, Immutable, IntoBytes, KnownLayout};

use crate::errors::{ProtoError, Result};

/// DMR time slot selector.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DmrSlot {
    /// Time slot 1.
    Slot1,
    /// Time slot 2.
    Slot2,
}

impl DmrSlot {
    /// Index used for per-slot state arrays.
    #[must_use]
    pub fn index(self) -> usize {
        match self {
            Self::Slot1 => 0,
            Self::Slot2 => 1,
        }
    }
}

/// Data-sync frame content type (flags bits 3..0 when bit 5 is set).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DataType {
    /// Voice link-control header: opens a transmission.
    VoiceLcHeader,
    /// Terminator with link control: closes a transmission.
    TerminatorWithLc,
    /// Any other data type this bridge does not interpret.
    Other(u8),
}

impl DataType {
    fn to_bits(self) -> u8 {
        match self {
            Self::VoiceLcHeader => 1,
            Self::TerminatorWithLc => 2,
            Self::Other(raw) => raw & 0x0F,
        }
    }

    fn from_bits(value: u8) -> Self {
        match value & 0x0F {
            1 => Self::VoiceLcHeader,
            2 => Self::TerminatorWithLc,
            raw => Self::Other(raw),
        }
    }
}

/// What a `DMRD` frame carries, derived from its flags.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameKind {
    /// Voice frame with embedded sync (superframe position A).
    VoiceSync,
    /// Plain voice frame at superframe position `N` (1..=5).
    Voice(u8),
    /// Data-sync frame of the given type.
    DataSync(DataType),
}

/// Fixed 55-byte `DMRD` packet.
#[repr(C, packed)]
#[derive(Clone, Copy, FromBytes, IntoBytes, KnownLayout, Immutable)]
pub struct DmrdPacket {
    magic: [u8; 4],
    sequence: u8,
    source: [u8; 3],
    destination: [u8; 3],
    repeater: [u8; 4],
    flags: u8,
    stream: [u8; 4],
    payload: [u8; 33],
    ber: u8,
    rssi: u8,
}

impl DmrdPacket {
    /// Size of the packet on the wire.
    pub const SIZE: usize = 55;

    /// Packet magic, `"DMRD"`.
    pub const MAGIC: [u8; 4] = *b"DMRD";

    /// An empty packet with valid magic.
    #[must_use]
    pub fn new() -> Self {
        Self {
            magic: Self::MAGIC,
            sequence: 0,
            source: [0; 3],
            destination: [0; 3],
            repeater: [0; 4],
            flags: 0,
            stream: [0; 4],
            payload: [0; 33],
            ber: 0,
            rssi: 0,
        }
    }

    /// Parse a packet from a datagram (zero-copy, safe).
    ///
    /// # Errors
    ///
    /// - [`ProtoError::FrameTooShort`] if fewer than 55 bytes
    /// - [`ProtoError::InvalidMagic`] if the magic does not match
    pub fn from_bytes(bytes: &[u8]) -> Result<&Self> {
        let packet = Self::ref_from_prefix(bytes)
            .map_err(|_| ProtoError::FrameTooShort { expected: Self::SIZE, actual: bytes.len() })?
            .0;

        if packet.magic != Self::MAGIC {
            return Err(ProtoError::InvalidMagic);
        }

        Ok(packet)
    }

    /// Serialize the packet to its wire bytes.
    #[must_use]
    pub fn to_bytes(&self) -> [u8; Self::SIZE] {
        let mut out = [0u8; Self::SIZE];
        out.copy_from_slice(IntoBytes::as_bytes(self));
        out
    }

    /// Wire sequence byte.
    #[must_use]
    pub fn sequence(&self) -> u8 {
        self.sequence
    }

    /// Source DMR ID (24-bit).
    #[must_use]
    pub fn source_id(&self) -> u32 {
        u32::from_be_bytes([0, self.source[0], self.source[1], self.source[2]])
    }

    /// Destination DMR ID / talkgroup (24-bit).
    #[must_use]
    pub fn destination_id(&self) -> u32 {
        u32::from_be_bytes([0, self.destination[0], self.destination[1], self.destination[2]])
    }

    /// Repeater ID (32-bit).
    #[must_use]
    pub fn repeater_id(&self) -> u32 {
        u32::from_be_bytes(self.repeater)
    }

    /// Time slot (flags bit 7).
    #[must_use]
    pub fn slot(&self) -> DmrSlot {
        if self.flags & 0x80 != 0 { DmrSlot::Slot2 } else { DmrSlot::Slot1 }
    }

    /// Whether the call is private (flags bit 6); group otherwise.
    #[must_use]
    pub fn is_private_call(&self) -> bool {
        self.flags & 0x40 != 0
    }

    /// Frame kind derived from the sync and sequence flag bits.
    #[must_use]
    pub fn frame_kind(&self) -> FrameKind {
        if self.flags & 0x20 != 0 {
            FrameKind::DataSync(DataType::from_bits(self.flags))
        } else if self.flags & 0x10 != 0 {
            FrameKind::VoiceSync
        } else {
            FrameKind::Voice(self.flags & 0x0F)
        }
    }

    /// Per-slot stream identifier.
    #[must_use]
    pub fn stream_id(&self) -> u32 {
        u32::from_be_bytes(self.stream)
    }

    /// The 33-byte DMR payload.
    #[must_use]
    pub fn payload(&self) -> &[u8; 33] {
        &self.payload
    }

    /// Reported bit error rate, tenths of a percent.
    #[must_use]
    pub fn ber(&self) -> u8 {
        self.ber
    }

    /// Set the wire sequence byte.
    pub fn set_sequence(&mut self, sequence: u8) {
        self.sequence = sequence;
    }

    /// Set the 24-bit source DMR ID.
    ///
    /// # Errors
    ///
    /// [`ProtoError::FieldOverflow`] if the value exceeds 24 bits.
    pub fn set_source_id(&mut self, id: u32) -> Result<()> {
        if id >= 1 << 24 {
            return Err(ProtoError::FieldOverflow { field: "source id", value: id });
        }
        let be = id.to_be_bytes();
        self.source = [be[1], be[2], be[3]];
        Ok(())
    }

    /// Set the 24-bit destination DMR ID.
    ///
    /// # Errors
    ///
    /// [`ProtoError::FieldOverflow`] if the value exceeds 24 bits.
    pub fn set_destination_id(&mut self, id: u32) -> Result<()> {
        if id >= 1 << 24 {
            return Err(ProtoError::FieldOverflow { field: "destination id", value: id });
        }
        let be = id.to_be_bytes();
        self.destination = [be[1], be[2], be[3]];
        Ok(())
    }

    /// Set the repeater ID.
    pub fn set_repeater_id(&mut self, id: u32) {
        self.repeater = id.to_be_bytes();
    }

    /// Set slot, call type, and frame kind in one pass over the flags.
    pub fn set_flags(&mut self, slot: DmrSlot, private: bool, kind: FrameKind) {
        let mut flags = 0u8;
        if slot == DmrSlot::Slot2 {
            flags |= 0x80;
        }
        if private {
            flags |= 0x40;
        }
        match kind {
            FrameKind::DataSync(data_type) => flags |= 0x20 | data_type.to_bits(),
            FrameKind::VoiceSync => flags |= 0x10,
            FrameKind::Voice(n) => flags |= n & 0x0F,
        }
        self.flags = flags;
    }

    /// Set the per-slot stream identifier.
    pub fn set_stream_id(&mut self, stream: u32) {
        self.stream = stream.to_be_bytes();
    }

    /// Replace the 33-byte payload.
    pub fn set_payload(&mut self, payload: &[u8; 33]) {
        self.payload = *payload;
    }

    /// Set the reported bit error rate.
    pub fn set_ber(&mut self, ber: u8) {
        self.ber = ber;
    }
}

impl Default for DmrdPacket {
    fn default() -> Self {
        Self::new()
    }
}

// Manual PartialEq (can't derive due to packed repr)
impl PartialEq for DmrdPacket {
    fn eq(&self, other: &Self) -> bool {
        self.to_bytes() == other.to_bytes()
    }
}

impl Eq for DmrdPacket {}

impl std::fmt::Debug for DmrdPacket {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DmrdPacket")
            .field("sequence", &self.sequence())
            .field("source", &self.source_id())
            .field("destination", &self.destination_id())
            .field("slot", &self.slot())
            .field("kind", &self.frame_kind())
            .field("stream", &format_args!("{:#010x}", self.stream_id()))
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn packet_size_is_wire_size() {
        assert_eq!(std::mem::size_of::<DmrdPacket>(), DmrdPacket::SIZE);
    }

    #[test]
    fn round_trip() {
        let mut packet = DmrdPacket::new();
        packet.set_sequence(42);
        packet.set_source_id(3_112_233).unwrap();
        packet.set_destination_id(91).unwrap();
        packet.set_repeater_id(123_456);
        packet.set_flags(DmrSlot::Slot2, false, FrameKind::Voice(3));
        packet.set_stream_id(0xDEAD_BEEF);

        let wire = packet.to_bytes();
        let parsed = DmrdPacket::from_bytes(&wire).unwrap();
        assert_eq!(parsed.sequence(), 42);
        assert_eq!(parsed.source_id(), 3_112_233);
        assert_eq!(parsed.destination_id(), 91);
        assert_eq!(parsed.repeater_id(), 123_456);
        assert_eq!(parsed.slot(), DmrSlot::Slot2);
        assert!(!parsed.is_private_call());
        assert_eq!(parsed.frame_kind(), FrameKind::Voice(3));
        assert_eq!(parsed.stream_id(), 0xDEAD_BEEF);
    }

    #[test]
    fn frame_kinds_map_to_flag_bits() {
        let mut packet = DmrdPacket::new();

        packet.set_flags(DmrSlot::Slot1, false, FrameKind::DataSync(DataType::VoiceLcHeader));
        assert_eq!(packet.to_bytes()[15], 0x21);
        assert_eq!(packet.frame_kind(), FrameKind::DataSync(DataType::VoiceLcHeader));

        packet.set_flags(DmrSlot::Slot1, false, FrameKind::DataSync(DataType::TerminatorWithLc));
        assert_eq!(packet.to_bytes()[15], 0x22);

        packet.set_flags(DmrSlot::Slot2, true, FrameKind::VoiceSync);
        assert_eq!(packet.to_bytes()[15], 0xD0);
        assert_eq!(packet.frame_kind(), FrameKind::VoiceSync);
    }

    #[test]
    fn oversized_ids_are_rejected() {
        let mut packet = DmrdPacket::new();
        assert!(packet.set_source_id(1 << 24).is_err());
        assert!(packet.set_destination_id(u32::MAX).is_err());
    }

    #[test]
    fn rejects_bad_magic_and_short_input() {
        let packet = DmrdPacket::new();
        let mut wire = packet.to_bytes();
        assert!(DmrdPacket::from_bytes(&wire[..54]).is_err());
        wire[1..4].copy_from_slice(b"MRX");
        assert_eq!(DmrdPacket::from_bytes(&wire), Err(ProtoError::InvalidMagic));
    }
}
