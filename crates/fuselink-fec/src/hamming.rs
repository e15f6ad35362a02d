//! Hamming(15,11,3) and Hamming(13,9,3) single-error-correcting codes.
//!
//! These are the row and column codes of the BPTC(196,96) product code.
//! Both operate in place on bool slices: data bits first, parity bits
//! after. The decoders recompute the parity set, form a 4-bit syndrome
//! against the received parity, and flip the single position a fixed
//! syndrome table names.
//!
//! Decoders return whether they changed anything, which is exactly the
//! signal the BPTC iteration loop needs to decide whether another pass
//! is worth running.

/// Syndrome-to-position table for Hamming(15,11,3) variant 2.
///
/// Index is `(s11 << 3) | (s12 << 2) | (s13 << 1) | s14`; entry is the
/// position to flip, `None` for the zero syndrome.
const SYNDROME_15_11: [Option<usize>; 16] = [
    None,
    Some(14),
    Some(13),
    Some(10),
    Some(12),
    Some(6),
    Some(9),
    Some(4),
    Some(11),
    Some(0),
    Some(5),
    Some(7),
    Some(8),
    Some(1),
    Some(3),
    Some(2),
];

/// Syndrome-to-position table for Hamming(13,9,3).
///
/// Two syndromes (9 and 13) are not reachable by a single-bit error and
/// decode to `None` alongside the zero syndrome.
const SYNDROME_13_9: [Option<usize>; 16] = [
    None,
    Some(12),
    Some(11),
    Some(8),
    Some(10),
    Some(4),
    Some(7),
    Some(2),
    Some(9),
    None,
    Some(3),
    Some(5),
    Some(6),
    None,
    Some(1),
    Some(0),
];

fn parity_15_11(d: &[bool]) -> [bool; 4] {
    [
        d[0] ^ d[1] ^ d[2] ^ d[3] ^ d[5] ^ d[7] ^ d[8],
        d[1] ^ d[2] ^ d[3] ^ d[4] ^ d[6] ^ d[8] ^ d[9],
        d[2] ^ d[3] ^ d[4] ^ d[5] ^ d[7] ^ d[9] ^ d[10],
        d[0] ^ d[1] ^ d[2] ^ d[4] ^ d[6] ^ d[7] ^ d[10],
    ]
}

fn parity_13_9(d: &[bool]) -> [bool; 4] {
    [
        d[0] ^ d[1] ^ d[3] ^ d[5] ^ d[6],
        d[0] ^ d[1] ^ d[2] ^ d[4] ^ d[6] ^ d[7],
        d[0] ^ d[1] ^ d[2] ^ d[3] ^ d[5] ^ d[7] ^ d[8],
        d[0] ^ d[2] ^ d[4] ^ d[5] ^ d[8],
    ]
}

/// Fill parity positions 11..15 from data positions 0..11.
///
/// # Panics
///
/// Panics if `bits` is shorter than 15.
pub fn encode_15_11(bits: &mut [bool]) {
    let p = parity_15_11(&bits[..11]);
    bits[11..15].copy_from_slice(&p);
}

/// Correct at most one error anywhere in the 15-bit codeword.
///
/// Returns `true` if a bit was flipped.
pub fn decode_15_11(bits: &mut [bool]) -> bool {
    let p = parity_15_11(&bits[..11]);
    let syndrome = (usize::from(p[0] ^ bits[11]) << 3)
        | (usize::from(p[1] ^ bits[12]) << 2)
        | (usize::from(p[2] ^ bits[13]) << 1)
        | usize::from(p[3] ^ bits[14]);
    match SYNDROME_15_11[syndrome] {
        Some(pos) => {
            bits[pos] = !bits[pos];
            true
        }
        None => false,
    }
}

/// Fill parity positions 9..13 from data positions 0..9.
///
/// # Panics
///
/// Panics if `bits` is shorter than 13.
pub fn encode_13_9(bits: &mut [bool]) {
    let p = parity_13_9(&bits[..9]);
    bits[9..13].copy_from_slice(&p);
}

/// Correct at most one error anywhere in the 13-bit codeword.
///
/// Returns `true` if a bit was flipped. Syndromes with no single-bit
/// explanation leave the word untouched.
pub fn decode_13_9(bits: &mut [bool]) -> bool {
    let p = parity_13_9(&bits[..9]);
    let syndrome = (usize::from(p[0] ^ bits[9]) << 3)
        | (usize::from(p[1] ^ bits[10]) << 2)
        | (usize::from(p[2] ^ bits[11]) << 1)
        | usize::from(p[3] ^ bits[12]);
    match SYNDROME_13_9[syndrome] {
        Some(pos) => {
            bits[pos] = !bits[pos];
            true
        }
        None => false,
    }
}
