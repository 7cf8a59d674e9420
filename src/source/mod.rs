//! Providers of observation series.
//!
//! The distribution workflow only sees [`ObservationSource`]; where the
//! numbers come from (a recorded JSON file, the statistics subgraph) is
//! decided by the caller.

use crate::config::TokenConfig;
use crate::error::Result;
use crate::observation::SeriesPair;
use std::collections::BTreeMap;

mod file;
#[cfg(feature = "net")]
mod subgraph;

pub use file::{FileSource, ObservationFile};
#[cfg(feature = "net")]
pub use subgraph::SubgraphSource;

/// Supplies deposit and supply series per token symbol.
pub trait ObservationSource {
    /// Fetches observations newer than `since`, newest first, at most `limit` per series.
    ///
    /// Every requested symbol is present in the result; a token without data
    /// maps to empty series.
    fn fetch(
        &self,
        tokens: &[TokenConfig],
        since: u64,
        limit: usize,
    ) -> Result<BTreeMap<String, SeriesPair>>;
}
