use crate::batch::{Batch, BatchMeta};
use crate::checksum::Checksum;
use crate::config::{IncentivesConfig, TokenConfig};
use crate::distribution::{plan_distributions, DistributionPlan, TokenDistribution, TokenInput};
use crate::error::{IncentiveError, Result};
use crate::io::{now_millis, write_json_atomic};
use crate::observation::SeriesPair;
use crate::source::ObservationSource;
use crate::state::DistributionState;
use crate::transaction::{ContractMethod, Transaction};
use alloy_primitives::U256;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Options of a distribution run.
#[derive(Debug, Clone)]
pub struct DistributeOptions {
    /// State file holding the "processed since" cursor.
    pub state_path: PathBuf,
    /// Directory receiving `incentives_batch_<createdAt>.json`.
    pub output_dir: PathBuf,
    /// Pinned `createdAt`; defaults to the current time.
    pub created_at: Option<u64>,
    /// Compute and log without writing the batch or the state.
    pub dry_run: bool,
}

/// What a run produced.
#[derive(Debug, Clone)]
pub struct DistributeSummary {
    /// Tokens with a non-zero amount, in configuration order.
    pub distributed: Vec<TokenDistribution>,
    /// The batch, when at least one token had something to distribute.
    pub batch: Option<Batch>,
    /// Cursor for the next run; unchanged when nothing was distributed.
    pub watermark: u64,
    /// Artifact path, when one was written.
    pub written: Option<PathBuf>,
}

impl DistributeSummary {
    /// Checksum of the emitted batch.
    pub fn checksum(&self) -> Option<Checksum> {
        self.batch.as_ref().and_then(Batch::checksum)
    }
}

/// Artifact path for a batch created at `created_at`.
pub fn batch_path(output_dir: &Path, created_at: u64) -> PathBuf {
    output_dir.join(format!("incentives_batch_{created_at}.json"))
}

/// The approval and notification calls paying `amount` of `token`'s reward.
pub fn distribution_calls(
    token: &TokenConfig,
    notify_method: &str,
    amount: U256,
) -> Result<[Transaction; 2]> {
    let approve = Transaction::builder(token.reward_token, U256::ZERO)
        .with_method(
            ContractMethod::new("approve")
                .with_input("spender", "address")
                .with_input("amount", "uint256"),
        )
        .with_input("spender", token.distributor.to_string())
        .with_input("amount", amount.to_string())
        .build()?;
    let notify = Transaction::builder(token.distributor, U256::ZERO)
        .with_method(ContractMethod::new(notify_method).with_input("reward", "uint256"))
        .with_input("reward", amount.to_string())
        .build()?;
    Ok([approve, notify])
}

fn plan(
    config: &IncentivesConfig,
    series: &std::collections::BTreeMap<String, SeriesPair>,
) -> Result<DistributionPlan> {
    let empty = SeriesPair::default();
    let mut inputs = Vec::with_capacity(config.tokens.len());
    for token in &config.tokens {
        inputs.push(TokenInput {
            symbol: &token.symbol,
            series: series.get(&token.symbol).unwrap_or(&empty),
            reward_units: token.reward_units()?,
        });
    }
    plan_distributions(inputs)
}

fn batch_meta(config: &IncentivesConfig) -> BatchMeta {
    BatchMeta {
        name: config.batch_name.clone(),
        description: config.description.clone(),
        tx_builder_version: Some(format!("incentive_batch-{}", env!("CARGO_PKG_VERSION"))),
        created_from_safe_address: config.safe_address,
        checksum: None,
    }
}

/// Runs one distribution: observations → amounts → batch → artifact → cursor.
///
/// Any error aborts before anything is written. When no token has a non-zero
/// amount no batch is emitted and the cursor stays where it was.
pub fn run_distribute(
    config: &IncentivesConfig,
    source: &dyn ObservationSource,
    opts: &DistributeOptions,
) -> Result<DistributeSummary> {
    let mut state = DistributionState::load(&opts.state_path)?;
    let since = state.since_timestamp;
    info!(since, tokens = config.tokens.len(), "starting distribution run");

    let series = source.fetch(&config.tokens, since, config.max_observations)?;
    let plan = plan(config, &series)?;
    for token in &plan.tokens {
        debug!(
            symbol = %token.symbol,
            window = token.window,
            deposit_avg = %token.deposit_avg,
            supply_avg = %token.supply_avg,
            ratio = %token.ratio_display(),
            amount = %token.amount,
            "token distribution"
        );
    }

    let distributed = plan.non_zero().cloned().collect::<Vec<_>>();
    let watermark = match plan.watermark {
        Some(watermark) if !distributed.is_empty() => watermark,
        _ => {
            warn!(since, "nothing to distribute; no batch emitted");
            return Ok(DistributeSummary {
                distributed,
                batch: None,
                watermark: since,
                written: None,
            });
        }
    };

    let mut transactions = Vec::with_capacity(distributed.len() * 2);
    for dist in &distributed {
        let token = config
            .tokens
            .iter()
            .find(|token| token.symbol == dist.symbol)
            .ok_or_else(|| {
                IncentiveError::Config(format!("token {} vanished from config", dist.symbol))
            })?;
        info!(symbol = %dist.symbol, amount = %dist.amount, ratio = %dist.ratio_display(), "distributing");
        transactions.extend(distribution_calls(token, &config.notify_method, dist.amount)?);
    }

    let created_at = opts.created_at.unwrap_or_else(now_millis);
    let batch = Batch::builder(config.chain_id.clone())
        .with_transactions(transactions)
        .with_created_at(created_at)
        .with_meta(batch_meta(config))
        .build()?;
    let checksum = batch
        .checksum()
        .ok_or_else(|| IncentiveError::InvalidBatch("built batch has no checksum".to_string()))?;
    info!(%checksum, transactions = batch.transactions().len(), watermark, "batch built");

    if opts.dry_run {
        info!("dry run; nothing written");
        return Ok(DistributeSummary {
            distributed,
            batch: Some(batch),
            watermark,
            written: None,
        });
    }

    let path = batch_path(&opts.output_dir, created_at);
    write_json_atomic(&path, &batch)?;
    state.advance(watermark, checksum);
    state.save(&opts.state_path)?;
    info!(path = %path.display(), "batch written");

    Ok(DistributeSummary {
        distributed,
        batch: Some(batch),
        watermark,
        written: Some(path),
    })
}
