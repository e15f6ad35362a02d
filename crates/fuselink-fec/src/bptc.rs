//! BPTC(196,96) block product code.
//!
//! 196 bits arranged as a 13×15 matrix (plus one unused leading bit):
//! rows are Hamming(15,11,3), columns are Hamming(13,9,3), and the wire
//! order is the interleave `π(a) = (181·a) mod 196`. The 96 data bits sit
//! in nine fixed row ranges; the first data row keeps three reserved
//! zero columns.
//!
//! The codeword occupies bits 0..98 and 166..264 of a 33-byte DMR
//! payload; the 68 bits in between belong to the sync/embedded field and
//! are never touched here.

use crate::{bits, hamming};

/// Matrix positions (inclusive ranges) holding the 96 data bits.
const DATA_RANGES: [(usize, usize); 9] = [
    (4, 11),
    (16, 26),
    (31, 41),
    (46, 56),
    (61, 71),
    (76, 86),
    (91, 101),
    (106, 116),
    (121, 131),
];

/// Maximum row/column passes before the decoder gives up.
const MAX_PASSES: usize = 5;

/// Map a codeword bit index to its payload bit position, skipping the
/// 68-bit sync field.
#[inline]
fn payload_pos(i: usize) -> usize {
    if i < 98 { i } else { i + 68 }
}

fn place_data(data: &[u8; 12], matrix: &mut [bool; 196]) {
    let mut pos = 0;
    for &(start, end) in &DATA_RANGES {
        for cell in start..=end {
            matrix[cell] = bits::get(data, pos);
            pos += 1;
        }
    }
}

fn extract_data(matrix: &[bool; 196]) -> [u8; 12] {
    let mut out = [0u8; 12];
    let mut pos = 0;
    for &(start, end) in &DATA_RANGES {
        for cell in start..=end {
            bits::set(&mut out, pos, matrix[cell]);
            pos += 1;
        }
    }
    out
}

/// Encode 12 data bytes into the BPTC region of a 33-byte payload.
///
/// Only the 196 codeword bit positions are written; the sync field and
/// any other payload content are preserved.
pub fn encode(data: &[u8; 12], payload: &mut [u8; 33]) {
    let mut matrix = [false; 196];
    place_data(data, &mut matrix);

    let mut row = [false; 15];
    for r in 0..9 {
        for c in 0..11 {
            row[c] = matrix[1 + 15 * r + c];
        }
        hamming::encode_15_11(&mut row);
        for c in 11..15 {
            matrix[1 + 15 * r + c] = row[c];
        }
    }

    let mut col = [false; 13];
    for c in 0..15 {
        for r in 0..9 {
            col[r] = matrix[1 + 15 * r + c];
        }
        hamming::encode_13_9(&mut col);
        for r in 9..13 {
            matrix[1 + 15 * r + c] = col[r];
        }
    }

    for (a, &bit) in matrix.iter().enumerate() {
        bits::set(payload, payload_pos((a * 181) % 196), bit);
    }
}

/// Decode the BPTC region of a 33-byte payload.
///
/// Returns the 12 data bytes and the number of bit corrections applied.
/// The decoder iterates column-then-row repair until a full pass makes
/// no change or the pass budget is exhausted; any single-bit error in
/// the codeword is always repaired.
#[must_use]
pub fn decode(payload: &[u8; 33]) -> ([u8; 12], u32) {
    let mut matrix = [false; 196];
    for (a, cell) in matrix.iter_mut().enumerate() {
        *cell = bits::get(payload, payload_pos((a * 181) % 196));
    }

    let mut corrections = 0u32;
    let mut col = [false; 13];
    let mut row = [false; 15];
    for _ in 0..MAX_PASSES {
        let mut changed = false;

        for c in 0..15 {
            for r in 0..13 {
                col[r] = matrix[1 + 15 * r + c];
            }
            if hamming::decode_13_9(&mut col) {
                changed = true;
                corrections += 1;
                for r in 0..13 {
                    matrix[1 + 15 * r + c] = col[r];
                }
            }
        }

        for r in 0..9 {
            for c in 0..15 {
                row[c] = matrix[1 + 15 * r + c];
            }
            if hamming::decode_15_11(&mut row) {
                changed = true;
                corrections += 1;
                for c in 0..15 {
                    matrix[1 + 15 * r + c] = row[c];
                }
            }
        }

        if !changed {
            break;
        }
    }

    (extract_data(&matrix), corrections)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn flip(payload: &mut [u8; 33], pos: usize) {
        payload[pos / 8] ^= 0x80 >> (pos % 8);
    }

    #[test]
    fn round_trip() {
        let data: [u8; 12] = [0x01, 0x23, 0x45, 0x67, 0x89, 0xAB, 0xCD, 0xEF, 0xFE, 0xDC, 0xBA, 0x98];
        let mut payload = [0u8; 33];
        encode(&data, &mut payload);
        let (out, corrections) = decode(&payload);
        assert_eq!(out, data);
        assert_eq!(corrections, 0);
    }

    #[test]
    fn sync_field_is_preserved() {
        let mut payload = [0u8; 33];
        // Paint the sync region (bits 98..166) before encoding
        for pos in 98..166 {
            flip(&mut payload, pos);
        }
        encode(&[0xFFu8; 12], &mut payload);
        for pos in 98..166 {
            assert!(payload[pos / 8] & (0x80 >> (pos % 8)) != 0, "bit {pos} clobbered");
        }
    }

    #[test]
    fn flipped_bit_63_is_repaired() {
        let data: [u8; 12] = [0x01, 0x23, 0x45, 0x67, 0x89, 0xAB, 0xCD, 0xEF, 0xFE, 0xDC, 0xBA, 0x98];
        let mut payload = [0u8; 33];
        encode(&data, &mut payload);
        flip(&mut payload, 63);
        let (out, corrections) = decode(&payload);
        assert_eq!(out, data);
        assert!(corrections >= 1);
    }

    #[test]
    fn every_single_codeword_bit_error_is_repaired() {
        let data: [u8; 12] = *b"fuselink(c)!";
        let mut payload = [0u8; 33];
        encode(&data, &mut payload);
        for i in 0..196 {
            let mut noisy = payload;
            flip(&mut noisy, super::payload_pos((i * 181) % 196));
            let (out, _) = decode(&noisy);
            assert_eq!(out, data, "codeword bit {i}");
        }
    }
}
