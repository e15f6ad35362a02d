//! DMR Homebrew signaling vocabulary.
//!
//! Every packet to or from the master starts with a short ASCII magic.
//! Outbound packets are built here; inbound ones are classified by
//! prefix and handed to the session state machine. The repeater never
//! parses master packets beyond the prefix and the `RPTACK` salt.

use sha2::{Digest, Sha256};

/// `RPTL` login request: magic plus big-endian repeater ID.
#[must_use]
pub fn login(repeater_id: u32) -> [u8; 8] {
    let mut out = [0u8; 8];
    out[..4].copy_from_slice(b"RPTL");
    out[4..].copy_from_slice(&repeater_id.to_be_bytes());
    out
}

/// `RPTK` authorization: magic, repeater ID, and the salted hash
/// `SHA-256(salt ‖ password)`.
#[must_use]
pub fn auth_key(repeater_id: u32, salt: [u8; 4], password: &str) -> [u8; 40] {
    let mut hasher = Sha256::new();
    hasher.update(salt);
    hasher.update(password.as_bytes());
    let digest = hasher.finalize();

    let mut out = [0u8; 40];
    out[..4].copy_from_slice(b"RPTK");
    out[4..8].copy_from_slice(&repeater_id.to_be_bytes());
    out[8..].copy_from_slice(&digest);
    out
}

/// Station description carried in the `RPTC` configuration packet.
///
/// String fields are space-padded, numeric fields zero-padded ASCII
/// decimal; anything longer than its field is truncated.
#[derive(Debug, Clone)]
pub struct RepeaterConfig {
    /// Repeater ID registered with the master.
    pub repeater_id: u32,
    /// Station callsign (8 chars).
    pub callsign: String,
    /// Receive frequency in Hz.
    pub rx_frequency: u32,
    /// Transmit frequency in Hz.
    pub tx_frequency: u32,
    /// Transmit power in watts (0..=99).
    pub power: u8,
    /// DMR color code (0..=15).
    pub color_code: u8,
    /// Station latitude in degrees.
    pub latitude: f64,
    /// Station longitude in degrees.
    pub longitude: f64,
    /// Antenna height in meters.
    pub height: u16,
    /// Free-form location (20 chars).
    pub location: String,
    /// Free-form description (19 chars).
    pub description: String,
    /// Advertised time slots: `'1'`, `'2'`, or `'3'` (both).
    pub slots: char,
    /// Station URL (124 chars).
    pub url: String,
    /// Software version (40 chars).
    pub software_id: String,
    /// Hardware / package identifier (40 chars).
    pub package_id: String,
}

fn put_str(out: &mut [u8], value: &str) {
    for slot in out.iter_mut() {
        *slot = b' ';
    }
    for (slot, byte) in out.iter_mut().zip(value.bytes()) {
        *slot = byte;
    }
}

/// `RPTC` configuration packet (302 bytes).
#[must_use]
pub fn config(cfg: &RepeaterConfig) -> [u8; 302] {
    let mut out = [0u8; 302];
    out[..4].copy_from_slice(b"RPTC");
    out[4..8].copy_from_slice(&cfg.repeater_id.to_be_bytes());
    put_str(&mut out[8..16], &cfg.callsign);
    put_str(&mut out[16..25], &format!("{:09}", cfg.rx_frequency));
    put_str(&mut out[25..34], &format!("{:09}", cfg.tx_frequency));
    put_str(&mut out[34..36], &format!("{:02}", cfg.power.min(99)));
    put_str(&mut out[36..38], &format!("{:02}", cfg.color_code.min(15)));
    put_str(&mut out[38..46], &format!("{:+08.4}", cfg.latitude));
    put_str(&mut out[46..55], &format!("{:+09.4}", cfg.longitude));
    put_str(&mut out[55..58], &format!("{:03}", cfg.height.min(999)));
    put_str(&mut out[58..78], &cfg.location);
    put_str(&mut out[78..97], &cfg.description);
    out[97] = cfg.slots as u8;
    put_str(&mut out[98..222], &cfg.url);
    put_str(&mut out[222..262], &cfg.software_id);
    put_str(&mut out[262..302], &cfg.package_id);
    out
}

/// `RPTO` options packet: magic, repeater ID, options text, NUL.
#[must_use]
pub fn options(repeater_id: u32, options: &str) -> Vec<u8> {
    let mut out = Vec::with_capacity(9 + options.len());
    out.extend_from_slice(b"RPTO");
    out.extend_from_slice(&repeater_id.to_be_bytes());
    out.extend_from_slice(options.as_bytes());
    out.push(0);
    out
}

/// `RPTPING` keep-alive (11 bytes).
#[must_use]
pub fn ping(repeater_id: u32) -> [u8; 11] {
    let mut out = [0u8; 11];
    out[..7].copy_from_slice(b"RPTPING");
    out[7..].copy_from_slice(&repeater_id.to_be_bytes());
    out
}

/// `RPTCL` graceful close (9 bytes).
#[must_use]
pub fn close(repeater_id: u32) -> [u8; 9] {
    let mut out = [0u8; 9];
    out[..5].copy_from_slice(b"RPTCL");
    out[5..].copy_from_slice(&repeater_id.to_be_bytes());
    out
}

/// Classified inbound master packet.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Signaling {
    /// `RPTACK`, optionally carrying the four-byte login salt.
    Ack {
        /// Salt bytes when the master attached them (login phase).
        salt: Option<[u8; 4]>,
    },
    /// `MSTNAK` rejection.
    Nak,
    /// `MSTPONG` keep-alive response.
    Pong,
    /// `MSTCL` master closing.
    Closing,
    /// `DMRD` voice/data payload (parse separately).
    Dmrd,
    /// `RPTSBKN` site beacon request.
    Beacon,
    /// Recognized-but-unhandled or unknown prefix.
    Other,
}

/// Classify an inbound datagram by its ASCII prefix.
///
/// Longer prefixes are matched first so `RPTSBKN` is not mistaken for a
/// hypothetical `RPTS`.
#[must_use]
pub fn classify(datagram: &[u8]) -> Signaling {
    if datagram.starts_with(b"RPTSBKN") {
        Signaling::Beacon
    } else if datagram.starts_with(b"MSTPONG") {
        Signaling::Pong
    } else if datagram.starts_with(b"MSTNAK") {
        Signaling::Nak
    } else if datagram.starts_with(b"MSTCL") {
        Signaling::Closing
    } else if datagram.starts_with(b"RPTACK") {
        let salt = datagram.get(6..10).map(|bytes| {
            let mut salt = [0u8; 4];
            salt.copy_from_slice(bytes);
            salt
        });
        Signaling::Ack { salt }
    } else if datagram.starts_with(b"DMRD") {
        Signaling::Dmrd
    } else {
        Signaling::Other
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn login_layout() {
        let pkt = login(123_456);
        assert_eq!(&pkt[..4], b"RPTL");
        assert_eq!(pkt[4..], [0x00, 0x01, 0xE2, 0x40]);
    }

    #[test]
    fn auth_key_matches_reference_hash() {
        // Known vector: salt 12 34 56 78, password "TEST", ID 123456
        let pkt = auth_key(123_456, [0x12, 0x34, 0x56, 0x78], "TEST");
        assert_eq!(&pkt[..4], b"RPTK");
        assert_eq!(pkt[4..8], [0x00, 0x01, 0xE2, 0x40]);

        let mut hasher = Sha256::new();
        hasher.update([0x12, 0x34, 0x56, 0x78]);
        hasher.update(b"TEST");
        assert_eq!(pkt[8..], hasher.finalize()[..]);
    }

    #[test]
    fn config_layout() {
        let cfg = RepeaterConfig {
            repeater_id: 123_456,
            callsign: "KJ4ABC".into(),
            rx_frequency: 435_000_000,
            tx_frequency: 430_000_000,
            power: 1,
            color_code: 1,
            latitude: 35.1234,
            longitude: -80.5678,
            height: 10,
            location: "Somewhere".into(),
            description: "Fuselink bridge".into(),
            slots: '2',
            url: "https://example.org".into(),
            software_id: "fuselink-0.1.0".into(),
            package_id: "fuselink".into(),
        };
        let pkt = config(&cfg);
        assert_eq!(pkt.len(), 302);
        assert_eq!(&pkt[..4], b"RPTC");
        assert_eq!(&pkt[8..16], b"KJ4ABC  ");
        assert_eq!(&pkt[16..25], b"435000000");
        assert_eq!(&pkt[34..36], b"01");
        assert_eq!(&pkt[38..46], b"+35.1234");
        assert_eq!(&pkt[46..55], b"-080.5678");
        assert_eq!(pkt[97], b'2');
    }

    #[test]
    fn ping_and_close_layout() {
        assert_eq!(&ping(1)[..7], b"RPTPING");
        assert_eq!(ping(1).len(), 11);
        assert_eq!(&close(1)[..5], b"RPTCL");
        assert_eq!(close(1).len(), 9);
    }

    #[test]
    fn options_is_nul_terminated() {
        let pkt = options(99, "TS2=505");
        assert_eq!(&pkt[..4], b"RPTO");
        assert_eq!(pkt.last(), Some(&0));
        assert_eq!(&pkt[8..15], b"TS2=505");
    }

    #[test]
    fn classification() {
        assert_eq!(classify(b"RPTACK\x12\x34\x56\x78"), Signaling::Ack {
            salt: Some([0x12, 0x34, 0x56, 0x78])
        });
        assert_eq!(classify(b"RPTACK"), Signaling::Ack { salt: None });
        assert_eq!(classify(b"MSTNAK"), Signaling::Nak);
        assert_eq!(classify(b"MSTPONG"), Signaling::Pong);
        assert_eq!(classify(b"MSTCL"), Signaling::Closing);
        assert_eq!(classify(b"RPTSBKN"), Signaling::Beacon);
        assert_eq!(classify(b"DMRDxxxx"), Signaling::Dmrd);
        assert_eq!(classify(b"BOGUS"), Signaling::Other);
    }
}
