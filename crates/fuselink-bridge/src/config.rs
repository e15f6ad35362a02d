//! Bridge configuration.
//!
//! One TOML file with `[ysf]`, `[dmr]`, and `[bridge]` tables. Loading
//! validates everything a typo can break — callsign charsets, the
//! jitter window range, field widths — so a bad deployment dies at
//! startup with a field-precise message instead of limping on air.

use std::{fs, path::Path, time::Duration};

use fuselink_core::session::{DEFAULT_CONNECT_TIMEOUT, DEFAULT_RETRY_INTERVAL, SessionConfig};
use fuselink_proto::{Callsign, homebrew::RepeaterConfig};
use serde::Deserialize;

use crate::error::BridgeError;

/// Allowed jitter window, milliseconds.
const JITTER_RANGE: std::ops::RangeInclusive<u64> = 120..=500;

fn default_jitter_ms() -> u64 {
    300
}

fn default_inactivity_ms() -> u64 {
    1000
}

fn default_slot() -> u8 {
    2
}

/// YSF reflector side.
#[derive(Debug, Clone, Deserialize)]
pub struct YsfConfig {
    /// Reflector host name or address.
    pub remote_addr: String,
    /// Reflector port.
    pub remote_port: u16,
    /// Local UDP port to bind.
    pub local_port: u16,
    /// Callsign announced in polls and outbound frames.
    pub callsign: String,
}

impl YsfConfig {
    /// The reflector address in `host:port` form.
    #[must_use]
    pub fn remote(&self) -> String {
        format!("{}:{}", self.remote_addr, self.remote_port)
    }
}

/// DMR Homebrew master side.
#[derive(Debug, Clone, Deserialize)]
pub struct DmrConfig {
    /// Master host name or address.
    pub server_addr: String,
    /// Master port.
    pub server_port: u16,
    /// Local UDP port to bind.
    pub local_port: u16,
    /// Registered repeater ID.
    pub repeater_id: u32,
    /// Master password.
    pub password: String,
    /// Station callsign.
    pub callsign: String,
    /// Receive frequency, Hz.
    pub rx_frequency: u32,
    /// Transmit frequency, Hz.
    pub tx_frequency: u32,
    /// Transmit power, watts.
    pub power: u8,
    /// DMR color code.
    pub color_code: u8,
    /// Station latitude, degrees.
    pub latitude: f64,
    /// Station longitude, degrees.
    pub longitude: f64,
    /// Antenna height, meters.
    pub height: u16,
    /// Free-form location.
    pub location: String,
    /// Free-form description.
    pub description: String,
    /// Station URL.
    #[serde(default)]
    pub url: String,
    /// Master options string (empty skips `RPTO`).
    #[serde(default)]
    pub options: String,
    /// Talkgroup YSF traffic is routed to.
    pub talkgroup: u32,
    /// Time slot for bridged traffic (1 or 2).
    #[serde(default = "default_slot")]
    pub slot: u8,
    /// Source ID used when a YSF callsign has no DMR ID.
    pub default_source_id: u32,
}

impl DmrConfig {
    /// The master address in `host:port` form.
    #[must_use]
    pub fn remote(&self) -> String {
        format!("{}:{}", self.server_addr, self.server_port)
    }
}

/// Bridge-level knobs.
#[derive(Debug, Clone, Deserialize)]
pub struct BridgeSection {
    /// Jitter absorption window, milliseconds (120..=500).
    #[serde(default = "default_jitter_ms")]
    pub jitter_ms: u64,
    /// Stream inactivity timeout before a synthetic terminator.
    #[serde(default = "default_inactivity_ms")]
    pub inactivity_ms: u64,
    /// Optional `id callsign` text file for DMR ID resolution.
    #[serde(default)]
    pub id_file: Option<String>,
}

impl Default for BridgeSection {
    fn default() -> Self {
        Self {
            jitter_ms: default_jitter_ms(),
            inactivity_ms: default_inactivity_ms(),
            id_file: None,
        }
    }
}

/// Complete bridge configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    /// YSF reflector side.
    pub ysf: YsfConfig,
    /// DMR master side.
    pub dmr: DmrConfig,
    /// Bridge-level knobs.
    #[serde(default)]
    pub bridge: BridgeSection,
}

impl Config {
    /// Load and validate a configuration file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, BridgeError> {
        let path = path.as_ref();
        let text = fs::read_to_string(path)
            .map_err(|e| BridgeError::Config(format!("cannot read {}: {e}", path.display())))?;
        let config: Self =
            toml::from_str(&text).map_err(|e| BridgeError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Parse from TOML text (used by tests and `--dump-config`).
    pub fn from_toml(text: &str) -> Result<Self, BridgeError> {
        let config: Self = toml::from_str(text).map_err(|e| BridgeError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), BridgeError> {
        Callsign::new(&self.ysf.callsign)
            .map_err(|e| BridgeError::Config(format!("ysf.callsign: {e}")))?;
        Callsign::new(&self.dmr.callsign)
            .map_err(|e| BridgeError::Config(format!("dmr.callsign: {e}")))?;

        if self.dmr.repeater_id == 0 {
            return Err(BridgeError::Config("dmr.repeater_id must be non-zero".into()));
        }
        if self.dmr.talkgroup == 0 || self.dmr.talkgroup >= 1 << 24 {
            return Err(BridgeError::Config("dmr.talkgroup must fit 24 bits".into()));
        }
        if self.dmr.default_source_id == 0 || self.dmr.default_source_id >= 1 << 24 {
            return Err(BridgeError::Config("dmr.default_source_id must fit 24 bits".into()));
        }
        if !matches!(self.dmr.slot, 1 | 2) {
            return Err(BridgeError::Config(format!("dmr.slot must be 1 or 2, got {}", self.dmr.slot)));
        }
        if self.dmr.color_code > 15 {
            return Err(BridgeError::Config("dmr.color_code must be 0..=15".into()));
        }
        if !JITTER_RANGE.contains(&self.bridge.jitter_ms) {
            return Err(BridgeError::Config(format!(
                "bridge.jitter_ms must be within {JITTER_RANGE:?}, got {}",
                self.bridge.jitter_ms
            )));
        }
        Ok(())
    }

    /// The station description sent in `RPTC`.
    #[must_use]
    pub fn repeater_config(&self) -> RepeaterConfig {
        RepeaterConfig {
            repeater_id: self.dmr.repeater_id,
            callsign: self.dmr.callsign.clone(),
            rx_frequency: self.dmr.rx_frequency,
            tx_frequency: self.dmr.tx_frequency,
            power: self.dmr.power,
            color_code: self.dmr.color_code,
            latitude: self.dmr.latitude,
            longitude: self.dmr.longitude,
            height: self.dmr.height,
            location: self.dmr.location.clone(),
            description: self.dmr.description.clone(),
            slots: match self.dmr.slot {
                1 => '1',
                _ => '2',
            },
            url: self.dmr.url.clone(),
            software_id: concat!("fuselink-", env!("CARGO_PKG_VERSION")).to_string(),
            package_id: "fuselink".to_string(),
        }
    }

    /// Session parameters for the Homebrew state machine.
    #[must_use]
    pub fn session_config(&self) -> SessionConfig {
        SessionConfig {
            repeater_id: self.dmr.repeater_id,
            password: self.dmr.password.clone(),
            repeater: self.repeater_config(),
            options: self.dmr.options.clone(),
            retry_interval: DEFAULT_RETRY_INTERVAL,
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
        }
    }

    /// Stream inactivity timeout.
    #[must_use]
    pub fn inactivity(&self) -> Duration {
        Duration::from_millis(self.bridge.inactivity_ms)
    }
}
