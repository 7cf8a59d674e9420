//! Time-weighted observations delivered by the data source.

use crate::units;
use alloy_primitives::U256;
use serde::{Deserialize, Serialize};

/// A time-stamped, already time-weighted average (balance or supply).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Observation {
    /// Weighted average as an exact integer.
    #[serde(with = "units::decimal")]
    pub value: U256,
    /// Period timestamp (seconds).
    pub timestamp: u64,
}

impl Observation {
    /// Convenience constructor.
    pub fn new(value: U256, timestamp: u64) -> Self {
        Self { value, timestamp }
    }
}

/// Deposited-balance and market-supply series of one token, newest first.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeriesPair {
    /// Deposited-balance observations of the incentivised account.
    #[serde(default)]
    pub deposits: Vec<Observation>,
    /// Market-supply observations of the whole market.
    #[serde(default)]
    pub supplies: Vec<Observation>,
}

impl SeriesPair {
    /// Keeps observations newer than `since`, newest first, at most `limit` per series.
    pub fn normalized(mut self, since: u64, limit: usize) -> Self {
        for series in [&mut self.deposits, &mut self.supplies] {
            series.retain(|obs| obs.timestamp > since);
            series.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
            series.truncate(limit);
        }
        self
    }
}
