//! Fuselink bridge runtime.
//!
//! Ties the codec pipeline to two UDP endpoints: a YSF reflector link
//! and a DMR Homebrew master session. Each endpoint runs reader, writer,
//! and keep-alive/state-machine tasks; the bridge controller consumes
//! both inbound queues, drives the frame-ratio adapters, and releases
//! DMR voice through a jitter delay buffer on a 60 ms tick.
//!
//! All tasks hang off one cancellation token; cancelling it unlinks from
//! the reflector, closes the master session, and drains the runtime.

#![forbid(unsafe_code)]

pub mod bridge;
pub mod config;
pub mod dmr_endpoint;
pub mod error;
pub mod lookup;
pub mod ysf_endpoint;

pub use bridge::Bridge;
pub use config::Config;
pub use error::BridgeError;
pub use lookup::IdLookup;
