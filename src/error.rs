//! Error taxonomy shared by the batch-construction core and the distribution workflow.

use thiserror::Error;

/// Crate-wide result alias.
pub type Result<T> = std::result::Result<T, IncentiveError>;

/// Every failure surfaced by the crate.
///
/// None of these are recovered locally; a run either produces a complete,
/// checksummed batch or nothing at all.
#[derive(Debug, Error)]
pub enum IncentiveError {
    /// More deposit observations than supply observations for a token.
    #[error(
        "inconsistent observation series for {token}: {deposits} deposit observations exceed {supplies} supply observations"
    )]
    InconsistentSeries {
        /// Token symbol the series belong to.
        token: String,
        /// Number of deposited-balance observations.
        deposits: usize,
        /// Number of market-supply observations.
        supplies: usize,
    },

    /// A transaction was assembled from contradictory or incomplete parts.
    #[error("malformed transaction: {0}")]
    MalformedTransaction(String),

    /// A value could not be brought into canonical form.
    #[error("canonical serialization failed: {0}")]
    Serialization(String),

    /// Batch-level fields failed validation.
    #[error("invalid batch: {0}")]
    InvalidBatch(String),

    /// An account address was not 20 bytes of hex.
    #[error("invalid address '{0}'")]
    InvalidAddress(String),

    /// An amount was not a non-negative integer (or decimal token amount).
    #[error("invalid amount '{0}'")]
    InvalidAmount(String),

    /// The averaged market supply for a token is zero.
    #[error("market supply average for {token} is zero")]
    ZeroSupply {
        /// Token symbol.
        token: String,
    },

    /// 256-bit arithmetic overflowed.
    #[error("arithmetic overflow while computing {0}")]
    Overflow(&'static str),

    /// Configuration file is missing fields or holds invalid values.
    #[error("invalid configuration: {0}")]
    Config(String),

    /// The observation source failed or returned an unusable response.
    #[error("observation source error: {0}")]
    Source(String),

    /// Filesystem failure.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON encoding or decoding failure.
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
}
