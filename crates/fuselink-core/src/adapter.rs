//! Frame-ratio adaptation between YSF and DMR.
//!
//! Three 90 ms YSF frames and five 60 ms DMR frames both span 270 ms, so
//! fifteen YSF voice channel sections re-bin into ten DMR AMBE frames
//! (and back) without acoustic resampling. Each direction keeps a small
//! FIFO; once a full 270 ms window is buffered it is resampled in one
//! pass — output `i` samples the rounded source index, taken verbatim
//! where the mapping lands on an integer and averaged with its
//! successor where it does not — and the FIFO drains back to empty.

use crate::{
    ambe::AmbeTriple,
    dmr_payload,
    ysf_payload::{self, VchSection},
};

/// Sections per resampling window (three YSF payloads).
const WINDOW_SECTIONS: usize = 15;

/// AMBE frames per resampling window (five DMR payloads).
const WINDOW_FRAMES: usize = 10;

/// YSF → DMR direction.
#[derive(Debug, Default)]
pub struct YsfToDmr {
    fifo: Vec<AmbeTriple>,
}

impl YsfToDmr {
    /// Fresh adapter with an empty FIFO.
    #[must_use]
    pub fn new() -> Self {
        Self { fifo: Vec::with_capacity(WINDOW_SECTIONS) }
    }

    /// Triples currently buffered.
    #[must_use]
    pub fn buffered(&self) -> usize {
        self.fifo.len()
    }

    /// Drop any buffered voice (stream reset).
    pub fn reset(&mut self) {
        self.fifo.clear();
    }

    /// Feed one 90-byte YSF payload. Returns five 33-byte DMR voice
    /// payloads once a full window is buffered, `None` before that.
    pub fn push(&mut self, payload: &[u8; 90]) -> Option<[[u8; 33]; 5]> {
        self.push_sections(&ysf_payload::extract_voice(payload))
    }

    /// Feed five already-extracted sections (lets the caller reuse the
    /// extraction for BER accounting).
    pub fn push_sections(&mut self, sections: &[VchSection; 5]) -> Option<[[u8; 33]; 5]> {
        for section in sections {
            self.fifo.push(section.to_triple());
        }
        if self.fifo.len() < WINDOW_SECTIONS {
            return None;
        }

        let mut frames = [AmbeTriple::SILENCE; WINDOW_FRAMES];
        for (i, frame) in frames.iter_mut().enumerate() {
            // Rounded resampling index
            let base = (i * WINDOW_SECTIONS * 2 + WINDOW_FRAMES) / (2 * WINDOW_FRAMES);
            *frame = if (i * WINDOW_SECTIONS) % WINDOW_FRAMES == 0 {
                self.fifo[base]
            } else {
                self.fifo[base].midpoint(&self.fifo[(base + 1).min(WINDOW_SECTIONS - 1)])
            };
        }
        self.fifo.clear();

        let mut out = [[0u8; 33]; 5];
        for (pair, payload) in out.iter_mut().enumerate() {
            dmr_payload::insert_frame(payload, 0, &frames[pair * 2]);
            dmr_payload::insert_frame(payload, 1, &frames[pair * 2 + 1]);
        }
        Some(out)
    }
}

/// DMR → YSF direction.
#[derive(Debug, Default)]
pub struct DmrToYsf {
    fifo: Vec<AmbeTriple>,
    /// Bit corrections accumulated while extracting the current window.
    corrections: u32,
}

impl DmrToYsf {
    /// Fresh adapter with an empty FIFO.
    #[must_use]
    pub fn new() -> Self {
        Self { fifo: Vec::with_capacity(WINDOW_FRAMES), corrections: 0 }
    }

    /// Triples currently buffered.
    #[must_use]
    pub fn buffered(&self) -> usize {
        self.fifo.len()
    }

    /// Drop any buffered voice (stream reset).
    pub fn reset(&mut self) {
        self.fifo.clear();
        self.corrections = 0;
    }

    /// Feed one 33-byte DMR voice payload. Returns three 90-byte YSF
    /// voice payloads (DCH regions zeroed, for the caller to fill) and
    /// the window's correction count once a full window is buffered.
    pub fn push(&mut self, payload: &[u8; 33]) -> Option<([[u8; 90]; 3], u32)> {
        for frame in 0..2 {
            let (triple, errors) = dmr_payload::extract_frame(payload, frame);
            self.fifo.push(triple);
            self.corrections += errors;
        }
        if self.fifo.len() < WINDOW_FRAMES {
            return None;
        }

        let mut sections = [VchSection::default(); WINDOW_SECTIONS];
        for (i, section) in sections.iter_mut().enumerate() {
            // Rounded resampling index
            let base = (i * WINDOW_FRAMES * 2 + WINDOW_SECTIONS) / (2 * WINDOW_SECTIONS);
            let triple = if (i * WINDOW_FRAMES) % WINDOW_SECTIONS == 0 {
                self.fifo[base]
            } else {
                self.fifo[base].midpoint(&self.fifo[(base + 1).min(WINDOW_FRAMES - 1)])
            };
            *section = VchSection::from_triple(&triple);
        }
        self.fifo.clear();
        let corrections = std::mem::take(&mut self.corrections);

        let mut out = [[0u8; 90]; 3];
        for (chunk, payload) in out.iter_mut().enumerate() {
            let window: [VchSection; 5] =
                sections[chunk * 5..chunk * 5 + 5].try_into().unwrap_or_default();
            ysf_payload::insert_voice(&window, payload);
        }
        Some((out, corrections))
    }
}
