//! YSF V/D Mode 2 payload codec.
//!
//! A 90-byte voice payload is five 18-byte sections, each a 5-byte data
//! channel (DCH) slice followed by a 13-byte, 104-bit voice channel
//! (VCH). On the wire every VCH is bit-interleaved (26 columns by 4
//! rows) and whitened with a cyclic 20-byte XOR pattern; the leading 81
//! bits carry 27 voice bits in triplicate for majority voting.
//!
//! The five DCH slices concatenate into a 25-byte block that carries the
//! source callsign: dibit-interleaved, rate-1/2 convolutionally coded,
//! checksummed, and whitened.

use fuselink_fec::{ConvEncoder, ViterbiDecoder, bits, crc};
use fuselink_proto::Callsign;

use crate::{ambe::AmbeTriple, errors::CoreError};

/// The 20-byte whitening sequence shared by the voice and data channels.
const WHITENING: [u8; 20] = [
    0x93, 0xD7, 0x51, 0x21, 0x9C, 0x2F, 0x6C, 0xD0, 0xEF, 0x0F, 0xF8, 0x3D, 0xF1, 0x73, 0x20,
    0x94, 0xED, 0x1E, 0x7C, 0xD8,
];

/// Bytes per payload section (DCH slice plus VCH).
const SECTION_BYTES: usize = 18;

/// Bytes of DCH at the head of each section.
const DCH_BYTES: usize = 5;

/// Voice bits per VCH section.
const VCH_BITS: usize = 104;

/// Number of majority-voted triples at the head of each VCH.
const VOTED_TRIPLES: usize = 27;

/// VCH interleave: bit `i` of the section maps to transmitted position
/// `(i mod 4) * 26 + (i div 4)`.
#[inline]
fn vch_interleave(i: usize) -> usize {
    (i % 4) * 26 + i / 4
}

/// DCH dibit interleave over the 200-bit block: step `i` reads dibit
/// `(i mod 5) * 40 + (i div 5) * 2`.
#[inline]
fn dch_interleave(i: usize) -> usize {
    (i % 5) * 40 + (i / 5) * 2
}

/// One de-interleaved, de-whitened 104-bit voice channel section.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct VchSection([u8; 13]);

impl VchSection {
    /// Wrap 13 bytes of voice channel.
    #[must_use]
    pub fn from_bytes(bytes: [u8; 13]) -> Self {
        Self(bytes)
    }

    /// The raw 13-byte section.
    #[must_use]
    pub fn as_bytes(&self) -> &[u8; 13] {
        &self.0
    }

    /// Screen for carrier garbage: a section of all-zero or all-one
    /// bytes is not voice.
    #[must_use]
    pub fn is_valid(&self) -> bool {
        !(self.0.iter().all(|&b| b == 0x00) || self.0.iter().all(|&b| b == 0xFF))
    }

    /// Map the section onto a voice parameter triple: bits 0..24 form
    /// A, 24..47 form B, 47..72 form C.
    #[must_use]
    pub fn to_triple(&self) -> AmbeTriple {
        AmbeTriple::new(
            bits::get_field(&self.0, 0, 24),
            bits::get_field(&self.0, 24, 23),
            bits::get_field(&self.0, 47, 25),
        )
    }

    /// Build a section from a triple. Bits past the 72 parameter bits
    /// stay zero.
    #[must_use]
    pub fn from_triple(triple: &AmbeTriple) -> Self {
        let mut bytes = [0u8; 13];
        bits::set_field(&mut bytes, 0, 24, triple.a);
        bits::set_field(&mut bytes, 24, 23, triple.b);
        bits::set_field(&mut bytes, 47, 25, triple.c);
        Self(bytes)
    }

    /// Count minority bits across the 27 replicated voice triples — the
    /// per-section bit-error signal. The section itself is left opaque.
    #[must_use]
    pub fn tribit_errors(&self) -> u32 {
        let mut disagreements = 0;
        for t in 0..VOTED_TRIPLES {
            let b0 = bits::get(&self.0, 3 * t);
            let b1 = bits::get(&self.0, 3 * t + 1);
            let b2 = bits::get(&self.0, 3 * t + 2);
            let majority = (b0 & b1) | (b0 & b2) | (b1 & b2);
            disagreements += u32::from(b0 != majority)
                + u32::from(b1 != majority)
                + u32::from(b2 != majority);
        }
        disagreements
    }
}

/// Extract the five VCH sections from a 90-byte payload.
#[must_use]
pub fn extract_voice(payload: &[u8; 90]) -> [VchSection; 5] {
    let mut sections = [VchSection::default(); 5];
    for (s, section) in sections.iter_mut().enumerate() {
        let start = s * SECTION_BYTES + DCH_BYTES;
        let wire = &payload[start..start + 13];

        let mut bytes = [0u8; 13];
        for i in 0..VCH_BITS {
            bits::set(&mut bytes, i, bits::get(wire, vch_interleave(i)));
        }
        for (i, byte) in bytes.iter_mut().enumerate() {
            *byte ^= WHITENING[(s * 13 + i) % WHITENING.len()];
        }
        *section = VchSection(bytes);
    }
    sections
}

/// Insert five VCH sections into a 90-byte payload, the exact inverse of
/// [`extract_voice`]. DCH bytes are left untouched.
pub fn insert_voice(sections: &[VchSection; 5], payload: &mut [u8; 90]) {
    for (s, section) in sections.iter().enumerate() {
        let mut bytes = *section.as_bytes();
        for (i, byte) in bytes.iter_mut().enumerate() {
            *byte ^= WHITENING[(s * 13 + i) % WHITENING.len()];
        }

        let start = s * SECTION_BYTES + DCH_BYTES;
        let wire = &mut payload[start..start + 13];
        for i in 0..VCH_BITS {
            let bit = bits::get(&bytes, i);
            bits::set(wire, vch_interleave(i), bit);
        }
    }
}

/// Decode the VD-Mode-2 callsign channel from a payload.
///
/// Returns the callsign and the count of repaired symbol errors.
///
/// # Errors
///
/// [`CoreError::CallsignChannel`] when the checksum fails after Viterbi
/// decoding; the text is never returned silently corrupted.
pub fn extract_callsign(payload: &[u8; 90]) -> Result<(Callsign, u32), CoreError> {
    // Gather the five DCH slices into one 25-byte block
    let mut block = [0u8; 25];
    for s in 0..5 {
        block[s * DCH_BYTES..(s + 1) * DCH_BYTES]
            .copy_from_slice(&payload[s * SECTION_BYTES..s * SECTION_BYTES + DCH_BYTES]);
    }

    // De-interleave dibits into convolutional symbol order
    let mut coded = [0u8; 25];
    for i in 0..100 {
        let n = dch_interleave(i);
        bits::set(&mut coded, 2 * i, bits::get(&block, n));
        bits::set(&mut coded, 2 * i + 1, bits::get(&block, n + 1));
    }

    let mut decoded = [0u8; 12];
    let metric = ViterbiDecoder::new().decode(&coded, 96, &mut decoded);

    if !crc::check(&decoded) {
        return Err(CoreError::CallsignChannel);
    }

    let mut field = [0u8; 10];
    for (i, slot) in field.iter_mut().enumerate() {
        *slot = decoded[i] ^ WHITENING[i];
    }
    Ok((Callsign::from_wire(&field), u32::from(metric / 2)))
}

/// Encode a callsign into the payload's DCH slices, the inverse of
/// [`extract_callsign`]. VCH bytes are left untouched.
pub fn insert_callsign(callsign: Callsign, payload: &mut [u8; 90]) {
    let mut block12 = [0u8; 12];
    for (i, slot) in block12.iter_mut().take(10).enumerate() {
        *slot = callsign.as_bytes()[i] ^ WHITENING[i];
    }
    crc::append(&mut block12);

    let mut coded = [0u8; 25];
    ConvEncoder.encode(&block12, 96, &mut coded);

    let mut block = [0u8; 25];
    for i in 0..100 {
        let n = dch_interleave(i);
        bits::set(&mut block, n, bits::get(&coded, 2 * i));
        bits::set(&mut block, n + 1, bits::get(&coded, 2 * i + 1));
    }

    for s in 0..5 {
        payload[s * SECTION_BYTES..s * SECTION_BYTES + DCH_BYTES]
            .copy_from_slice(&block[s * DCH_BYTES..(s + 1) * DCH_BYTES]);
    }
}
