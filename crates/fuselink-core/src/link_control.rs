//! DMR full link control.
//!
//! The voice LC header and the terminator-with-LC carry nine bytes of
//! link control — opcode, feature set, service options, destination and
//! source IDs — protected by Reed-Solomon(12,9). The three parity bytes
//! are XORed with a role-specific mask so a header can never be mistaken
//! for a terminator, then the twelve bytes ride in the payload's
//! BPTC(196,96) region alongside the data sync pattern.

use fuselink_fec::{bptc, reed_solomon};

use crate::{dmr_payload, errors::CoreError};

/// Parity mask for a voice LC header.
const HEADER_MASK: u8 = 0x96;

/// Parity mask for a terminator with LC.
const TERMINATOR_MASK: u8 = 0x99;

/// Which of the two LC-bearing frames a payload is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LcKind {
    /// Voice LC header, transmission start.
    Header,
    /// Terminator with LC, transmission end.
    Terminator,
}

impl LcKind {
    fn mask(self) -> u8 {
        match self {
            Self::Header => HEADER_MASK,
            Self::Terminator => TERMINATOR_MASK,
        }
    }
}

/// Decoded full link control.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LinkControl {
    /// Whether the call targets a single station rather than a group.
    pub private: bool,
    /// Feature set identifier (zero for standard calls).
    pub feature_id: u8,
    /// Service options byte.
    pub options: u8,
    /// Destination ID / talkgroup (24-bit).
    pub destination: u32,
    /// Source ID (24-bit).
    pub source: u32,
}

impl LinkControl {
    /// Group or unit-to-unit voice call with everything else zero.
    #[must_use]
    pub fn voice(source: u32, destination: u32, private: bool) -> Self {
        Self { private, feature_id: 0, options: 0, destination, source }
    }

    /// The nine-byte wire form.
    #[must_use]
    pub fn to_bytes(&self) -> [u8; 9] {
        let dst = self.destination.to_be_bytes();
        let src = self.source.to_be_bytes();
        [
            if self.private { 0x03 } else { 0x00 },
            self.feature_id,
            self.options,
            dst[1],
            dst[2],
            dst[3],
            src[1],
            src[2],
            src[3],
        ]
    }

    /// Parse the nine-byte wire form.
    #[must_use]
    pub fn from_bytes(bytes: &[u8; 9]) -> Self {
        Self {
            private: bytes[0] & 0x3F == 0x03,
            feature_id: bytes[1],
            options: bytes[2],
            destination: u32::from_be_bytes([0, bytes[3], bytes[4], bytes[5]]),
            source: u32::from_be_bytes([0, bytes[6], bytes[7], bytes[8]]),
        }
    }

    /// The protected form split into three 32-bit fragments for the
    /// embedded signalling field of non-sync voice frames.
    #[must_use]
    pub fn embedded_fragments(&self) -> [u32; 3] {
        let protected = reed_solomon::encode_9(&self.to_bytes());
        let mut fragments = [0u32; 3];
        for (i, fragment) in fragments.iter_mut().enumerate() {
            *fragment = u32::from_be_bytes([
                protected[i * 4],
                protected[i * 4 + 1],
                protected[i * 4 + 2],
                protected[i * 4 + 3],
            ]);
        }
        fragments
    }

    /// Protect the link control and write it into a payload, together
    /// with the data sync pattern.
    pub fn encode_into(&self, kind: LcKind, payload: &mut [u8; 33]) {
        let mut protected = reed_solomon::encode_9(&self.to_bytes());
        for parity in &mut protected[9..] {
            *parity ^= kind.mask();
        }
        bptc::encode(&protected, payload);
        dmr_payload::write_data_sync(payload);
    }

    /// Extract link control from a payload.
    ///
    /// Returns the fields and the BPTC correction count.
    ///
    /// # Errors
    ///
    /// [`CoreError::LinkControl`] when the Reed-Solomon check fails
    /// after unmasking — wrong role mask or damage past repair.
    pub fn decode_from(kind: LcKind, payload: &[u8; 33]) -> Result<(Self, u32), CoreError> {
        let (mut protected, corrections) = bptc::decode(payload);
        for parity in &mut protected[9..] {
            *parity ^= kind.mask();
        }
        if !reed_solomon::check_12(&protected) {
            return Err(CoreError::LinkControl);
        }
        let mut lc = [0u8; 9];
        lc.copy_from_slice(&protected[..9]);
        Ok((Self::from_bytes(&lc), corrections))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trip_header_and_terminator() {
        let lc = LinkControl::voice(3_112_233, 91, false);
        for kind in [LcKind::Header, LcKind::Terminator] {
            let mut payload = [0u8; 33];
            lc.encode_into(kind, &mut payload);
            let (out, corrections) = LinkControl::decode_from(kind, &payload).unwrap();
            assert_eq!(out, lc);
            assert_eq!(corrections, 0);
        }
    }

    #[test]
    fn role_masks_do_not_cross() {
        let lc = LinkControl::voice(1234, 5678, true);
        let mut payload = [0u8; 33];
        lc.encode_into(LcKind::Header, &mut payload);
        assert!(LinkControl::decode_from(LcKind::Terminator, &payload).is_err());
    }

    #[test]
    fn single_bit_error_is_absorbed() {
        let lc = LinkControl::voice(240, 2_345_678, false);
        let mut payload = [0u8; 33];
        lc.encode_into(LcKind::Header, &mut payload);
        payload[7] ^= 0x01;
        let (out, corrections) = LinkControl::decode_from(LcKind::Header, &payload).unwrap();
        assert_eq!(out, lc);
        assert!(corrections >= 1);
    }

    #[test]
    fn data_sync_is_present() {
        let mut payload = [0u8; 33];
        LinkControl::voice(1, 2, false).encode_into(LcKind::Header, &mut payload);
        assert_eq!(payload[13] & 0x0F, 0x0D);
        assert_eq!(payload[14], 0xFF);
        assert_eq!(payload[17], 0x5D);
    }

    #[test]
    fn embedded_fragments_reassemble_the_protected_form() {
        let lc = LinkControl::voice(3_112_233, 91, false);
        let fragments = lc.embedded_fragments();
        let mut reassembled = [0u8; 12];
        for (i, fragment) in fragments.iter().enumerate() {
            reassembled[i * 4..(i + 1) * 4].copy_from_slice(&fragment.to_be_bytes());
        }
        assert!(fuselink_fec::reed_solomon::check_12(&reassembled));
        let mut lc_bytes = [0u8; 9];
        lc_bytes.copy_from_slice(&reassembled[..9]);
        assert_eq!(LinkControl::from_bytes(&lc_bytes), lc);
    }

    #[test]
    fn private_flag_round_trips() {
        let lc = LinkControl::voice(7, 8, true);
        let bytes = lc.to_bytes();
        assert_eq!(bytes[0], 0x03);
        assert_eq!(LinkControl::from_bytes(&bytes), lc);
    }
}
