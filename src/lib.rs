#![deny(missing_docs)]

//! # incentive_batch
//!
//! **incentive_batch** computes periodic reward distributions for liquidity
//! incentive programs and emits them as a checksummed transaction batch that a
//! multisignature wallet can import, verify and execute.
//!
//! The batch checksum is what makes the artifact reviewable: the wallet
//! recomputes it independently, so the encoding feeding the hash must be
//! byte-identical across implementations no matter how object keys were
//! ordered on the way in.
//!
//! ## Features
//!
//! * **Canonical encoding** via [`canonical`](canonical/index.html): a sorted-key,
//!   JavaScript-compatible text form of any JSON value.
//! * **Checksums** via [`checksum`](checksum/index.html): Keccak-256 over the
//!   canonical form of a batch with `meta.checksum` removed and `meta.name`
//!   nulled.
//! * **Transactions and batches** via [`Transaction`] and [`Batch`], validated
//!   once at construction and immutable afterwards.
//! * **Distributions** via [`distribution`](distribution/index.html): exact
//!   integer averaging of deposit and supply series into reward amounts.
//! * **Workflow** via [`commands::distribute`]: observations in, artifact and
//!   cursor out. The `net` feature adds the HTTP subgraph source.
//!
//! ## Usage
//!
//! ```rust
//! use incentive_batch::{Batch, ContractMethod, Transaction};
//! use alloy_primitives::U256;
//!
//! let token = "0x912ce59144191c1204e64559fe8253a0e49e6548".parse().unwrap();
//! let approve = Transaction::builder(token, U256::ZERO)
//!     .with_method(
//!         ContractMethod::new("approve")
//!             .with_input("spender", "address")
//!             .with_input("amount", "uint256"),
//!     )
//!     .with_input("spender", "0x00000000000000000000000000000000000000d1")
//!     .with_input("amount", "1000000000000000000")
//!     .build()
//!     .unwrap();
//!
//! let batch = Batch::builder("42161")
//!     .with_transaction(approve)
//!     .with_created_at(1_700_000_000_000)
//!     .build()
//!     .unwrap();
//! assert!(batch.verify().unwrap().is_match());
//! ```

pub mod batch;
pub mod canonical;
pub mod checksum;
pub mod commands;
pub mod config;
pub mod distribution;
mod error;
mod io;
pub mod observation;
pub mod query;
pub mod source;
pub mod state;
pub mod transaction;
pub mod units;

pub use batch::{build_batch, Batch, BatchBuilder, BatchMeta, DEFAULT_VERSION};
pub use canonical::{canonical_string, canonicalize};
pub use checksum::{calculate_checksum, checksum_of, verify_checksum, Checksum, ChecksumVerdict};
pub use config::{IncentivesConfig, TokenConfig};
pub use distribution::{
    compute_distribution, plan_distributions, DistributionPlan, TokenDistribution, TokenInput,
};
pub use error::{IncentiveError, Result};
pub use io::{read_json, write_json_atomic};
pub use observation::{Observation, SeriesPair};
pub use state::DistributionState;
pub use transaction::{
    build_transaction, Address, CallData, ContractMethod, MethodInput, Transaction,
    TransactionBuilder,
};
