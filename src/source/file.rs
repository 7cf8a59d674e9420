use super::ObservationSource;
use crate::config::TokenConfig;
use crate::error::{IncentiveError, Result};
use crate::io::read_json;
use crate::observation::SeriesPair;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// On-disk layout read by [`FileSource`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ObservationFile {
    /// Series keyed by token symbol.
    pub tokens: BTreeMap<String, SeriesPair>,
}

/// Observations recorded in a JSON file, e.g. a saved subgraph export.
#[derive(Debug, Clone)]
pub struct FileSource {
    path: PathBuf,
}

impl FileSource {
    /// Reads from `path` on every fetch.
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }
}

impl ObservationSource for FileSource {
    fn fetch(
        &self,
        tokens: &[TokenConfig],
        since: u64,
        limit: usize,
    ) -> Result<BTreeMap<String, SeriesPair>> {
        let mut recorded: ObservationFile = read_json(&self.path).map_err(|err| {
            IncentiveError::Source(format!("{}: {err}", self.path.display()))
        })?;
        let mut out = BTreeMap::new();
        for token in tokens {
            let series = match recorded.tokens.remove(&token.symbol) {
                Some(series) => series.normalized(since, limit),
                None => {
                    warn!(symbol = %token.symbol, path = %self.path.display(), "no recorded observations");
                    SeriesPair::default()
                }
            };
            debug!(
                symbol = %token.symbol,
                deposits = series.deposits.len(),
                supplies = series.supplies.len(),
                "loaded observations"
            );
            out.insert(token.symbol.clone(), series);
        }
        Ok(out)
    }
}
