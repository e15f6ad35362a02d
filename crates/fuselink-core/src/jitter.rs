//! Per-slot jitter delay buffer.
//!
//! Inbound DMR frames arrive with network jitter; the outbound side
//! wants one frame per 60 ms tick. This buffer absorbs a configurable
//! window of jitter, reconstructs sequence order, marks gaps as missing
//! so the consumer can synthesize silence, and releases frames only once
//! the build-up window has filled (or the stream has stalled long enough
//! that waiting more cannot help).
//!
//! Time is virtual: the owner advances it with [`DelayBuffer::clock`]
//! from its own tick, which keeps the buffer deterministic under test.

use tracing::debug;

/// Sequence gaps wider than this reset the expected counter instead of
/// back-filling missing frames.
const MAX_GAP: u8 = 20;

/// Extra blocks of capacity beyond the jitter window.
const HEADROOM: usize = 10;

/// Result of a [`DelayBuffer::get`] call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JitterStatus {
    /// Nothing to release this tick.
    NoData,
    /// A real frame was copied out.
    Data,
    /// A gap marker: the block is zeroed, the consumer decides whether
    /// to skip or substitute silence.
    Missing,
}

#[derive(Debug, Clone)]
struct Block {
    data: Vec<u8>,
    missing: bool,
}

/// Fixed-capacity sequence-reconstructing delay buffer.
#[derive(Debug)]
pub struct DelayBuffer {
    label: &'static str,
    block_size: usize,
    jitter_ms: u64,
    slots: usize,
    blocks: Vec<Option<Block>>,
    read: usize,
    write: usize,
    used: usize,
    running: bool,
    expected: u8,
    clock_ms: u64,
    last_store_ms: u64,
}

impl DelayBuffer {
    /// Create a buffer for `block_size`-byte frames arriving every
    /// `block_time_ms`, absorbing up to `jitter_ms` of jitter.
    ///
    /// # Panics
    ///
    /// Panics if any parameter is zero (programmer error).
    #[must_use]
    pub fn new(label: &'static str, block_size: usize, block_time_ms: u64, jitter_ms: u64) -> Self {
        assert!(block_size > 0 && block_time_ms > 0 && jitter_ms > 0);
        let slots = ((jitter_ms / block_time_ms) as usize).max(1);
        Self {
            label,
            block_size,
            jitter_ms,
            slots,
            blocks: vec![None; slots + HEADROOM],
            read: 0,
            write: 0,
            used: 0,
            running: false,
            expected: 0,
            clock_ms: 0,
            last_store_ms: 0,
        }
    }

    /// Blocks currently buffered.
    #[must_use]
    pub fn depth(&self) -> usize {
        self.used
    }

    /// Whether a stream is in progress.
    #[must_use]
    pub fn is_running(&self) -> bool {
        self.running
    }

    /// Advance the virtual clock.
    pub fn clock(&mut self, ms: u64) {
        self.clock_ms += ms;
    }

    /// Drop everything and stop.
    pub fn reset(&mut self) {
        for slot in &mut self.blocks {
            *slot = None;
        }
        self.read = 0;
        self.write = 0;
        self.used = 0;
        self.running = false;
    }

    /// Store a frame under its sequence byte.
    ///
    /// Gaps up to [`MAX_GAP`] emit zeroed missing-markers for the skipped
    /// sequence numbers; larger gaps re-synchronize on the new number.
    /// A full buffer drops the newest frame.
    pub fn add(&mut self, block: &[u8], sequence: u8) {
        debug_assert_eq!(block.len(), self.block_size);

        if !self.running {
            self.running = true;
            self.expected = sequence;
        }

        let gap = sequence.wrapping_sub(self.expected);
        if gap > MAX_GAP {
            debug!(
                buffer = self.label,
                expected = self.expected,
                sequence,
                "sequence jump, resynchronizing"
            );
            self.expected = sequence;
        } else {
            for _ in 0..gap {
                self.store(Block { data: vec![0; self.block_size], missing: true });
            }
        }

        self.store(Block { data: block.to_vec(), missing: false });
        self.expected = sequence.wrapping_add(1);
        self.last_store_ms = self.clock_ms;
    }

    /// Release the next block into `out` if the build-up window allows.
    ///
    /// # Panics
    ///
    /// Panics if `out` is smaller than the block size.
    pub fn get(&mut self, out: &mut [u8]) -> JitterStatus {
        assert!(out.len() >= self.block_size);

        if self.used == 0 {
            return JitterStatus::NoData;
        }
        // Build-up: wait until a jitter window is buffered, or the
        // stream has gone quiet for a whole window
        if self.used < self.slots && self.clock_ms - self.last_store_ms < self.jitter_ms {
            return JitterStatus::NoData;
        }

        let Some(block) = self.blocks[self.read].take() else {
            return JitterStatus::NoData;
        };
        self.read = (self.read + 1) % self.blocks.len();
        self.used -= 1;

        out[..self.block_size].copy_from_slice(&block.data);
        if block.missing { JitterStatus::Missing } else { JitterStatus::Data }
    }

    fn store(&mut self, block: Block) {
        if self.used == self.blocks.len() {
            debug!(buffer = self.label, "delay buffer full, dropping newest frame");
            return;
        }
        self.blocks[self.write] = Some(block);
        self.write = (self.write + 1) % self.blocks.len();
        self.used += 1;
    }
}
