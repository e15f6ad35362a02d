//! DMR ID to callsign resolution.
//!
//! Backed by the common whitespace-separated dump format, one
//! `id callsign [name...]` record per line. Resolution never fails:
//! unknown IDs render as their decimal text and unknown callsigns fall
//! back to the configured default ID, so a missing database degrades
//! identification instead of dropping voice.

use std::{collections::HashMap, fs, path::Path};

use tracing::info;

use crate::error::BridgeError;

/// Bidirectional ID / callsign store.
#[derive(Debug, Default)]
pub struct IdLookup {
    by_id: HashMap<u32, String>,
    by_callsign: HashMap<String, u32>,
    default_id: u32,
}

impl IdLookup {
    /// An empty store that always falls back.
    #[must_use]
    pub fn empty(default_id: u32) -> Self {
        Self { by_id: HashMap::new(), by_callsign: HashMap::new(), default_id }
    }

    /// Load a dump file.
    ///
    /// Lines that do not start with a numeric ID are skipped, so the
    /// usual CSV-ish headers pass through harmlessly.
    pub fn load(path: impl AsRef<Path>, default_id: u32) -> Result<Self, BridgeError> {
        let path = path.as_ref();
        let text = fs::read_to_string(path)
            .map_err(|e| BridgeError::Lookup(format!("cannot read {}: {e}", path.display())))?;

        let mut lookup = Self::empty(default_id);
        for line in text.lines() {
            let mut fields = line.split_whitespace();
            let (Some(id), Some(callsign)) = (fields.next(), fields.next()) else {
                continue;
            };
            let Ok(id) = id.parse::<u32>() else {
                continue;
            };
            let callsign = callsign.to_ascii_uppercase();
            lookup.by_id.entry(id).or_insert_with(|| callsign.clone());
            lookup.by_callsign.entry(callsign).or_insert(id);
        }
        info!(records = lookup.by_id.len(), file = %path.display(), "DMR ID database loaded");
        Ok(lookup)
    }

    /// Number of records loaded.
    #[must_use]
    pub fn len(&self) -> usize {
        self.by_id.len()
    }

    /// Whether the store is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.by_id.is_empty()
    }

    /// Callsign for an ID, or its decimal form when unknown.
    #[must_use]
    pub fn find_callsign(&self, id: u32) -> String {
        self.by_id.get(&id).cloned().unwrap_or_else(|| id.to_string())
    }

    /// ID for a callsign, or the configured default when unknown.
    #[must_use]
    pub fn find_id(&self, callsign: &str) -> u32 {
        self.by_callsign
            .get(&callsign.trim_end().to_ascii_uppercase())
            .copied()
            .unwrap_or(self.default_id)
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;

    #[test]
    fn resolves_both_directions() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "# comment line").unwrap();
        writeln!(file, "3112233 KJ4ABC John").unwrap();
        writeln!(file, "2345678 n0call").unwrap();
        file.flush().unwrap();

        let lookup = IdLookup::load(file.path(), 999).unwrap();
        assert_eq!(lookup.len(), 2);
        assert_eq!(lookup.find_callsign(3_112_233), "KJ4ABC");
        assert_eq!(lookup.find_id("KJ4ABC"), 3_112_233);
        assert_eq!(lookup.find_id("n0call  "), 2_345_678);
    }

    #[test]
    fn unknowns_fall_back() {
        let lookup = IdLookup::empty(42);
        assert_eq!(lookup.find_callsign(777), "777");
        assert_eq!(lookup.find_id("NOBODY"), 42);
    }
}
