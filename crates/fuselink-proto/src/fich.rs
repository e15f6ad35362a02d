//! Frame Information CHannel codec.
//!
//! The FICH tells a receiver what the rest of the frame is: header,
//! communications, or terminator, which payload mode is in use, and
//! where the frame sits in the eight-frame cycle. Twenty-five bytes of
//! the frame carry it with heavy protection:
//!
//! 1. the fields pack into a 32-bit word,
//! 2. a CCITT-16 checksum extends it to 48 bits,
//! 3. four 12-bit words are each Golay(24,12) encoded (96 bits),
//! 4. the rate-1/2 convolutional code doubles them (200 bits with
//!    flush),
//! 5. a dibit interleave spreads bursts across the region.
//!
//! Decoding reverses each stage; a checksum mismatch after all that
//! correction rejects the frame.

use fuselink_fec::{ConvEncoder, ViterbiDecoder, bits, crc, golay};

use crate::errors::{ProtoError, Result};

/// Role of the enclosing frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameIndicator {
    /// Stream header: opens a transmission.
    Header,
    /// Communications frame: carries voice and data channels.
    Communications,
    /// Terminator: closes a transmission.
    Terminator,
}

impl FrameIndicator {
    fn to_bits(self) -> u32 {
        match self {
            Self::Header => 0,
            Self::Communications => 1,
            Self::Terminator => 2,
        }
    }

    fn from_bits(value: u32) -> Self {
        match value & 0x3 {
            0 => Self::Header,
            2 => Self::Terminator,
            _ => Self::Communications,
        }
    }
}

/// Call routing mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallMode {
    /// Group call (talkgroup routed).
    Group,
    /// Direct station-to-station call.
    Individual,
}

impl CallMode {
    fn to_bits(self) -> u32 {
        match self {
            Self::Group => 0,
            Self::Individual => 1,
        }
    }

    fn from_bits(value: u32) -> Self {
        if value & 0x3 == 1 { Self::Individual } else { Self::Group }
    }
}

/// Payload framing mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DataType {
    /// Voice/data mode 1.
    VdMode1,
    /// Full-rate data.
    DataFullRate,
    /// Voice/data mode 2 (voice plus callsign channel) — the mode this
    /// bridge transcodes.
    VdMode2,
    /// Full-rate voice.
    VoiceFullRate,
}

impl DataType {
    fn to_bits(self) -> u32 {
        match self {
            Self::VdMode1 => 0,
            Self::DataFullRate => 1,
            Self::VdMode2 => 2,
            Self::VoiceFullRate => 3,
        }
    }

    fn from_bits(value: u32) -> Self {
        match value & 0x3 {
            0 => Self::VdMode1,
            1 => Self::DataFullRate,
            2 => Self::VdMode2,
            _ => Self::VoiceFullRate,
        }
    }
}

/// Decoded FICH field set.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Fich {
    /// Frame role.
    pub frame_indicator: FrameIndicator,
    /// Call routing mode.
    pub call_mode: CallMode,
    /// Frame number within the eight-frame cycle, `0..8`.
    pub frame_number: u8,
    /// Payload framing mode.
    pub data_type: DataType,
    /// Source numeric group ID.
    pub source_id: u8,
    /// Destination numeric group ID.
    pub destination_id: u8,
}

impl Fich {
    /// Size of the encoded FICH region.
    pub const SIZE: usize = 25;

    /// Pack the fields into the protected 32-bit word.
    fn to_word(self) -> u32 {
        (self.frame_indicator.to_bits() << 30)
            | (self.call_mode.to_bits() << 28)
            | (u32::from(self.frame_number & 0x7) << 25)
            | (self.data_type.to_bits() << 23)
            | (u32::from(self.source_id) << 15)
            | (u32::from(self.destination_id) << 7)
    }

    fn from_word(word: u32) -> Self {
        Self {
            frame_indicator: FrameIndicator::from_bits(word >> 30),
            call_mode: CallMode::from_bits(word >> 28),
            frame_number: ((word >> 25) & 0x7) as u8,
            data_type: DataType::from_bits(word >> 23),
            source_id: ((word >> 15) & 0xFF) as u8,
            destination_id: ((word >> 7) & 0xFF) as u8,
        }
    }

    /// Encode the fields into the 25-byte FICH region.
    #[must_use]
    pub fn encode(&self) -> [u8; Self::SIZE] {
        // Field word plus checksum: 48 protected bits
        let mut block = [0u8; 6];
        block[..4].copy_from_slice(&self.to_word().to_be_bytes());
        crc::append(&mut block);

        // Four Golay(24,12) words: 96 bits
        let mut protected = [0u8; 12];
        for i in 0..4 {
            let data = bits::get_field(&block, i * 12, 12) as u16;
            bits::set_field(&mut protected, i * 24, 24, golay::encode_24_12(data));
        }

        // Convolutional pass: 200 coded bits
        let mut coded = [0u8; 25];
        ConvEncoder.encode(&protected, 96, &mut coded);

        // Dibit interleave
        let mut out = [0u8; Self::SIZE];
        for i in 0..100 {
            let n = (i % 20) * 5 + i / 20;
            bits::set(&mut out, 2 * n, bits::get(&coded, 2 * i));
            bits::set(&mut out, 2 * n + 1, bits::get(&coded, 2 * i + 1));
        }
        out
    }

    /// Decode a 25-byte FICH region.
    ///
    /// Returns the fields and the number of bit errors repaired along
    /// the way (Viterbi symbol repairs plus Golay corrections).
    ///
    /// # Errors
    ///
    /// [`ProtoError::FichChecksum`] when the checksum still fails after
    /// correction; the caller drops the frame.
    pub fn decode(region: &[u8; Self::SIZE]) -> Result<(Self, u32)> {
        // De-interleave
        let mut coded = [0u8; Self::SIZE];
        for i in 0..100 {
            let n = (i % 20) * 5 + i / 20;
            bits::set(&mut coded, 2 * i, bits::get(region, 2 * n));
            bits::set(&mut coded, 2 * i + 1, bits::get(region, 2 * n + 1));
        }

        // Viterbi pass back to 96 bits
        let mut protected = [0u8; 12];
        let path_metric = ViterbiDecoder::new().decode(&coded, 96, &mut protected);
        let mut errors = u32::from(path_metric / 2);

        // Golay words back to the 48-bit block
        let mut block = [0u8; 6];
        for i in 0..4 {
            let decoded = golay::decode_24_12(bits::get_field(&protected, i * 24, 24));
            errors += decoded.errors;
            bits::set_field(&mut block, i * 12, 12, u32::from(decoded.data));
        }

        if !crc::check(&block) {
            return Err(ProtoError::FichChecksum);
        }

        let word = u32::from_be_bytes([block[0], block[1], block[2], block[3]]);
        Ok((Self::from_word(word), errors))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Fich {
        Fich {
            frame_indicator: FrameIndicator::Communications,
            call_mode: CallMode::Group,
            frame_number: 5,
            data_type: DataType::VdMode2,
            source_id: 12,
            destination_id: 34,
        }
    }

    #[test]
    fn round_trip() {
        let region = sample().encode();
        let (decoded, errors) = Fich::decode(&region).unwrap();
        assert_eq!(decoded, sample());
        assert_eq!(errors, 0);
    }

    #[test]
    fn every_frame_number_round_trips() {
        for n in 0..8 {
            let fich = Fich { frame_number: n, ..sample() };
            let (decoded, _) = Fich::decode(&fich.encode()).unwrap();
            assert_eq!(decoded.frame_number, n);
        }
    }

    #[test]
    fn single_bit_errors_are_absorbed() {
        let region = sample().encode();
        for pos in 0..200 {
            let mut noisy = region;
            noisy[pos / 8] ^= 0x80 >> (pos % 8);
            let (decoded, errors) = Fich::decode(&noisy).unwrap();
            assert_eq!(decoded, sample(), "bit {pos}");
            assert!(errors >= 1, "bit {pos}");
        }
    }

    #[test]
    fn header_and_terminator_roles_survive() {
        for fi in [FrameIndicator::Header, FrameIndicator::Terminator] {
            let fich = Fich { frame_indicator: fi, ..sample() };
            let (decoded, _) = Fich::decode(&fich.encode()).unwrap();
            assert_eq!(decoded.frame_indicator, fi);
        }
    }
}
