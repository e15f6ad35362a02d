//! Rate-1/2, constraint-length-5 convolutional codec.
//!
//! The encoder shifts input bits MSB-first through a four-bit register
//! and emits two symbols per bit (`g1 = d⊕d3⊕d4`, `g2 = d⊕d1⊕d2⊕d4`),
//! then flushes four zero bits so the trellis ends in state zero.
//!
//! The decoder is a 16-state soft-decision Viterbi: symbols live in
//! {0, 2}, branch metrics come from two eight-entry tables, survivor
//! decisions pack into one 64-bit word per step, and traceback walks the
//! decision words backwards from state zero. The four flush steps mean
//! the caller asks for four fewer bits than it fed symbol pairs.
//!
//! This codec carries the VD-Mode-2 callsign channel and the FICH.

use crate::bits;

/// Expected first symbol per branch, indexed by the low three state bits.
const BRANCH_TABLE1: [u16; 8] = [0, 0, 0, 0, 2, 2, 2, 2];

/// Expected second symbol per branch.
const BRANCH_TABLE2: [u16; 8] = [0, 2, 2, 0, 0, 2, 2, 0];

/// Maximum branch metric (both symbols mismatch).
const MAX_METRIC: u16 = 4;

/// Trellis flush length (constraint length minus one).
pub const FLUSH_BITS: usize = 4;

/// Convolutional encoder.
///
/// Stateless between calls; each `encode` starts from the zero state and
/// flushes back to it.
#[derive(Debug, Default, Clone, Copy)]
pub struct ConvEncoder;

impl ConvEncoder {
    /// Encode `count` bits of `data` (MSB first) into `2 * (count + 4)`
    /// output bits written MSB-first into `out`.
    ///
    /// # Panics
    ///
    /// Panics if `out` cannot hold the coded bits.
    pub fn encode(self, data: &[u8], count: usize, out: &mut [u8]) {
        assert!(out.len() * 8 >= 2 * (count + FLUSH_BITS), "output buffer too small");

        let (mut d1, mut d2, mut d3, mut d4) = (false, false, false, false);
        let mut k = 0;
        for i in 0..count + FLUSH_BITS {
            let d = i < count && bits::get(data, i);
            let g1 = d ^ d3 ^ d4;
            let g2 = d ^ d1 ^ d2 ^ d4;
            (d4, d3, d2, d1) = (d3, d2, d1, d);
            bits::set(out, k, g1);
            bits::set(out, k + 1, g2);
            k += 2;
        }
    }
}

/// Soft-decision Viterbi decoder.
///
/// Reusable across frames; `decode` resets all internal state.
#[derive(Debug)]
pub struct ViterbiDecoder {
    metrics_old: [u16; 16],
    metrics_new: [u16; 16],
    decisions: Vec<u64>,
}

impl Default for ViterbiDecoder {
    fn default() -> Self {
        Self::new()
    }
}

impl ViterbiDecoder {
    /// Create a decoder with room for a 100-step trellis.
    #[must_use]
    pub fn new() -> Self {
        Self { metrics_old: [0; 16], metrics_new: [0; 16], decisions: Vec::with_capacity(100) }
    }

    /// Decode `count` data bits from `2 * (count + 4)` coded bits.
    ///
    /// Writes the recovered bits MSB-first into `out` and returns the
    /// survivor path metric (zero for an error-free block, two per
    /// repaired symbol otherwise) as a soft quality signal.
    ///
    /// # Panics
    ///
    /// Panics if `coded` is too short or `out` cannot hold `count` bits.
    pub fn decode(&mut self, coded: &[u8], count: usize, out: &mut [u8]) -> u16 {
        let steps = count + FLUSH_BITS;
        assert!(coded.len() * 8 >= 2 * steps, "coded buffer too small");
        assert!(out.len() * 8 >= count, "output buffer too small");

        self.metrics_old = [0; 16];
        self.decisions.clear();

        for step in 0..steps {
            let s0 = if bits::get(coded, 2 * step) { 2u16 } else { 0 };
            let s1 = if bits::get(coded, 2 * step + 1) { 2u16 } else { 0 };
            self.step(s0, s1);
        }

        self.chainback(count, out)
    }

    /// One trellis step: eight butterflies over the state pairs
    /// `(i, i + 8)`, two survivor decisions each.
    fn step(&mut self, s0: u16, s1: u16) {
        let mut word = 0u64;
        for i in 0..8 {
            let j = i * 2;
            let metric = (BRANCH_TABLE1[i] ^ s0) + (BRANCH_TABLE2[i] ^ s1);

            let m0 = self.metrics_old[i] + metric;
            let m1 = self.metrics_old[i + 8] + (MAX_METRIC - metric);
            let decision0 = m0 >= m1;
            self.metrics_new[j] = if decision0 { m1 } else { m0 };

            let m0 = self.metrics_old[i] + (MAX_METRIC - metric);
            let m1 = self.metrics_old[i + 8] + metric;
            let decision1 = m0 >= m1;
            self.metrics_new[j + 1] = if decision1 { m1 } else { m0 };

            word |= (u64::from(decision1) << (j + 1)) | (u64::from(decision0) << j);
        }
        self.decisions.push(word);
        self.metrics_old = self.metrics_new;
    }

    /// Walk the decision words backwards from state zero, recovering
    /// `count` bits into positions `count - 1 ..= 0`.
    fn chainback(&self, count: usize, out: &mut [u8]) -> u16 {
        let mut state = 0u32;
        let mut index = self.decisions.len();
        let mut n = count;
        while n > 0 {
            index -= 1;
            n -= 1;
            let i = (state >> 4) & 0x0F;
            let bit = (self.decisions[index] >> i) & 1 != 0;
            state = ((u32::from(bit) << 7) | (state >> 1)) & 0xFF;
            bits::set(out, n, bit);
        }
        self.metrics_old[0]
    }
}
