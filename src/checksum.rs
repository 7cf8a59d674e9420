//! Keccak-256 checksum over the canonical encoding of a transaction batch.

use crate::canonical::canonical_string;
use crate::error::{IncentiveError, Result};
use alloy_primitives::B256;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::{Map, Value};
use sha3::{Digest, Keccak256};
use std::fmt;
use std::str::FromStr;

/// 32-byte batch digest, displayed as `0x` followed by 64 lowercase hex digits.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct Checksum(B256);

impl Checksum {
    /// Wraps raw digest bytes.
    pub fn from_bytes(bytes: [u8; 32]) -> Self {
        Self(B256::new(bytes))
    }

    /// Raw digest bytes.
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0 .0
    }
}

impl From<Checksum> for B256 {
    fn from(checksum: Checksum) -> Self {
        checksum.0
    }
}

impl fmt::Display for Checksum {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{}", hex::encode(self.0))
    }
}

impl fmt::Debug for Checksum {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Checksum({self})")
    }
}

impl FromStr for Checksum {
    type Err = IncentiveError;

    fn from_str(raw: &str) -> Result<Self> {
        raw.trim()
            .parse::<B256>()
            .map(Self)
            .map_err(|err| IncentiveError::InvalidBatch(format!("checksum '{raw}': {err}")))
    }
}

impl Serialize for Checksum {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for Checksum {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

/// Keccak-256 of `bytes`.
pub fn keccak256(bytes: &[u8]) -> [u8; 32] {
    let mut hasher = Keccak256::new();
    hasher.update(bytes);
    hasher.finalize().into()
}

/// Copy of `batch` as it is hashed: `meta.checksum` removed, `meta.name` set to null.
///
/// A missing or non-object `meta` becomes `{"name": null}`, so a batch built
/// without metadata hashes the same as the artifact that later carries its
/// checksum.
pub fn checksum_shadow(batch: &Value) -> Result<Value> {
    let mut shadow = batch.clone();
    let map = shadow
        .as_object_mut()
        .ok_or_else(|| IncentiveError::InvalidBatch("batch must be a JSON object".to_string()))?;
    let meta = map
        .entry("meta")
        .or_insert_with(|| Value::Object(Map::new()));
    if !meta.is_object() {
        *meta = Value::Object(Map::new());
    }
    if let Value::Object(meta) = meta {
        meta.remove("checksum");
        meta.insert("name".to_string(), Value::Null);
    }
    Ok(shadow)
}

/// Checksum of a batch-shaped JSON value.
pub fn calculate_checksum(batch: &Value) -> Result<Checksum> {
    let shadow = checksum_shadow(batch)?;
    let encoded = canonical_string(&shadow)?;
    Ok(Checksum::from_bytes(keccak256(encoded.as_bytes())))
}

/// Checksum of any value that serializes into the batch shape.
pub fn checksum_of<T: Serialize + ?Sized>(batch: &T) -> Result<Checksum> {
    let value =
        serde_json::to_value(batch).map_err(|err| IncentiveError::Serialization(err.to_string()))?;
    calculate_checksum(&value)
}

/// Outcome of recomputing a stored checksum.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChecksumVerdict {
    /// The stored checksum matches the recomputed one.
    Match(Checksum),
    /// The batch content no longer matches its stored checksum.
    Mismatch {
        /// Checksum found in `meta.checksum`.
        stored: Checksum,
        /// Checksum recomputed from the batch content.
        recomputed: Checksum,
    },
}

impl ChecksumVerdict {
    /// Whether the stored checksum is valid.
    pub fn is_match(&self) -> bool {
        matches!(self, Self::Match(_))
    }
}

/// Recomputes the checksum of a persisted batch and compares it with `meta.checksum`.
///
/// A missing or unparsable stored checksum is an error.
pub fn verify_checksum(batch: &Value) -> Result<ChecksumVerdict> {
    let stored = batch
        .get("meta")
        .and_then(|meta| meta.get("checksum"))
        .and_then(Value::as_str)
        .ok_or_else(|| IncentiveError::InvalidBatch("meta.checksum is missing".to_string()))?
        .parse::<Checksum>()?;
    let recomputed = calculate_checksum(batch)?;
    if recomputed == stored {
        Ok(ChecksumVerdict::Match(recomputed))
    } else {
        Ok(ChecksumVerdict::Mismatch { stored, recomputed })
    }
}
