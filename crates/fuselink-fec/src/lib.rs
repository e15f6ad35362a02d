//! Fuselink Forward Error Correction
//!
//! Bit primitives and the FEC codecs shared by the YSF and DMR payload
//! layers. Pure functions over byte slices and small integers: nothing in
//! this crate allocates on the hot path, suspends, or touches I/O.
//!
//! # Correction model
//!
//! Decoders never fail. Every decoder returns the best-effort corrected
//! value together with a flag or count describing what was repaired, so
//! callers can accumulate bit-error-rate estimates and keep the voice
//! pipeline flowing (a dropped frame is worse than a noisy one).
//!
//! # Bit order
//!
//! All tables and all pack/unpack helpers use big-endian bit order: bit
//! position `p` in a byte slice is byte `p / 8`, mask `0x80 >> (p % 8)`.

#![forbid(unsafe_code)]

pub mod bits;
pub mod bptc;
pub mod convolution;
pub mod crc;
pub mod golay;
pub mod hamming;
pub mod qr;
pub mod reed_solomon;

pub use convolution::{ConvEncoder, ViterbiDecoder};
