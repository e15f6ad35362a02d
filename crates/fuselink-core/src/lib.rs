//! Fuselink core.
//!
//! Everything between the wire formats and the sockets: the payload
//! codecs that move voice between YSF and DMR framing, the frame-ratio
//! adapter, the jitter delay buffer, the byte ring buffer the endpoints
//! queue packets through, and the Homebrew authentication state machine.
//!
//! Nothing here performs I/O or suspends. State machines follow the
//! action pattern: methods take the current time as a parameter and
//! return actions for the runtime to execute, which keeps them pure and
//! directly testable.

#![forbid(unsafe_code)]

pub mod adapter;
pub mod ambe;
pub mod dmr_payload;
pub mod errors;
pub mod jitter;
pub mod link_control;
pub mod ring;
pub mod session;
pub mod ysf_payload;

pub use adapter::{DmrToYsf, YsfToDmr};
pub use ambe::AmbeTriple;
pub use dmr_payload::Emb;
pub use errors::CoreError;
pub use jitter::{DelayBuffer, JitterStatus};
pub use link_control::{LcKind, LinkControl};
pub use ring::RingBuffer;
pub use session::{HomebrewSession, SessionAction, SessionConfig, SessionState};
pub use ysf_payload::VchSection;
