//! Fuselink wire formats.
//!
//! The fixed-layout packets both networks speak: the 155-byte YSF frame
//! with its FICH, the 55-byte DMR Homebrew `DMRD` packet, and the
//! Homebrew signaling vocabulary (`RPTL`, `RPTK`, `RPTC`, ...). Packet
//! headers are raw binary parsed zero-copy; every multi-byte integer is
//! big-endian network order.
//!
//! Parsing is structural only: a frame that parses has the right magic,
//! length, and field ranges, nothing more. Voice payload semantics live
//! in `fuselink-core`.

#![forbid(unsafe_code)]

pub mod callsign;
pub mod dmrd;
pub mod errors;
pub mod fich;
pub mod homebrew;
pub mod ysf;

pub use callsign::Callsign;
pub use dmrd::{DataType, DmrSlot, DmrdPacket, FrameKind};
pub use errors::{ProtoError, Result};
pub use fich::{CallMode, DataType as FichDataType, Fich, FrameIndicator};
pub use ysf::YsfFrame;
