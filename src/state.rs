//! Persistent "processed since" cursor between distribution runs.

use crate::checksum::Checksum;
use crate::error::{IncentiveError, Result};
use crate::io::{now_millis, read_json, write_json_atomic};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Schema tag written into every state file.
pub const STATE_SCHEMA: &str = "incentive_batch.distribution-state.v1";

/// Cursor and bookkeeping of the last successful run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DistributionState {
    /// Schema tag.
    #[serde(default)]
    pub schema: String,
    /// Observations at or before this timestamp are already distributed.
    #[serde(default)]
    pub since_timestamp: u64,
    /// Last write time in milliseconds.
    #[serde(default)]
    pub updated_at_ms: u64,
    /// Checksum of the last emitted batch.
    #[serde(default)]
    pub last_checksum: Option<Checksum>,
}

impl Default for DistributionState {
    fn default() -> Self {
        Self {
            schema: STATE_SCHEMA.to_string(),
            since_timestamp: 0,
            updated_at_ms: 0,
            last_checksum: None,
        }
    }
}

impl DistributionState {
    /// Loads the state; a missing file starts from the beginning.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let mut state: Self = read_json(path).map_err(|err| {
            IncentiveError::Config(format!("invalid state {}: {err}", path.display()))
        })?;
        if state.schema.trim().is_empty() {
            state.schema = STATE_SCHEMA.to_string();
        }
        if state.schema != STATE_SCHEMA {
            return Err(IncentiveError::Config(format!(
                "unexpected state schema '{}' in {}",
                state.schema,
                path.display()
            )));
        }
        Ok(state)
    }

    /// Persists the state atomically.
    pub fn save(&self, path: &Path) -> Result<()> {
        write_json_atomic(path, self)
    }

    /// Moves the cursor past a completed run.
    pub fn advance(&mut self, watermark: u64, checksum: Checksum) {
        self.schema = STATE_SCHEMA.to_string();
        self.since_timestamp = self.since_timestamp.max(watermark);
        self.last_checksum = Some(checksum);
        self.updated_at_ms = now_millis();
    }
}

#[cfg(test)]
mod tests {
    use super::{DistributionState, STATE_SCHEMA};
    use crate::checksum::Checksum;
    use std::fs;

    fn temp_path(name: &str) -> std::path::PathBuf {
        let ts = std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .unwrap_or_default()
            .as_nanos();
        std::env::temp_dir().join(format!("{name}_{ts}"))
    }

    #[test]
    fn missing_state_starts_at_zero_and_roundtrips() {
        let path = temp_path("incentive_state.json");
        let mut state = DistributionState::load(&path).unwrap();
        assert_eq!(state.since_timestamp, 0);
        assert_eq!(state.schema, STATE_SCHEMA);

        state.advance(1_700_000, Checksum::from_bytes([1u8; 32]));
        state.save(&path).unwrap();
        let back = DistributionState::load(&path).unwrap();
        assert_eq!(back, state);

        let mut older = back.clone();
        older.advance(5, Checksum::from_bytes([2u8; 32]));
        assert_eq!(older.since_timestamp, 1_700_000);
        let _ = fs::remove_file(path);
    }

    #[test]
    fn advance_stamps_wall_clock_time() {
        let before = crate::io::now_millis();
        let mut state = DistributionState::default();
        state.advance(10, Checksum::from_bytes([3u8; 32]));
        assert!(state.updated_at_ms >= before);
        assert!(state.updated_at_ms <= crate::io::now_millis());
    }

    #[test]
    fn foreign_schema_is_rejected() {
        let path = temp_path("incentive_state_foreign.json");
        fs::write(&path, br#"{"schema":"something.else.v9","since_timestamp":3}"#).unwrap();
        assert!(DistributionState::load(&path).is_err());
        let _ = fs::remove_file(path);
    }
}
