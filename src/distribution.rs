//! Reward amounts from deposited-balance and market-supply averages.
//!
//! For one token with `d` deposit and `m` supply observations (newest first):
//! `d > m` is an inconsistency, `d = 0` distributes nothing, otherwise
//!
//! ```text
//! depositAvg = floor(sum(deposits) / d)
//! supplyAvg  = floor(sum(supplies[..d]) / d)
//! amount     = floor(rewardUnits * depositAvg / supplyAvg)
//! ```
//!
//! The supply series is cut to the first `d` entries by position; timestamps
//! are not matched. Everything is exact 256-bit integer arithmetic.

use crate::error::{IncentiveError, Result};
use crate::observation::{Observation, SeriesPair};
use alloy_primitives::U256;

const RATIO_SCALE: u64 = 1_000_000;

/// Outcome for a single token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenDistribution {
    /// Token symbol.
    pub symbol: String,
    /// Amount to distribute, in token base units.
    pub amount: U256,
    /// Mean deposited balance over the window.
    pub deposit_avg: U256,
    /// Mean market supply over the aligned window.
    pub supply_avg: U256,
    /// Number of observations averaged (`d`).
    pub window: usize,
    /// Timestamp of the newest supply observation, if any.
    pub latest_supply_timestamp: Option<u64>,
}

impl TokenDistribution {
    /// Whether anything is distributed for this token.
    pub fn is_zero(&self) -> bool {
        self.amount.is_zero()
    }

    /// `depositAvg / supplyAvg` rendered with six decimals, for logs only.
    pub fn ratio_display(&self) -> String {
        if self.supply_avg.is_zero() {
            return "0.000000".to_string();
        }
        let scale = U256::from(RATIO_SCALE);
        let scaled = self
            .deposit_avg
            .checked_mul(scale)
            .map(|n| n / self.supply_avg)
            .unwrap_or(U256::MAX);
        format!("{}.{:0>6}", scaled / scale, (scaled % scale).to_string())
    }
}

/// Truncating integer mean; `None` for an empty slice.
pub fn integer_mean(values: &[Observation]) -> Result<Option<U256>> {
    if values.is_empty() {
        return Ok(None);
    }
    let mut sum = U256::ZERO;
    for obs in values {
        sum = sum
            .checked_add(obs.value)
            .ok_or(IncentiveError::Overflow("observation sum"))?;
    }
    Ok(Some(sum / U256::from(values.len())))
}

/// Computes the distribution of one token.
///
/// `reward_units` is the total reward already scaled to base units
/// (`totalReward * 10^18` for an integral reward).
pub fn compute_distribution(
    symbol: &str,
    series: &SeriesPair,
    reward_units: U256,
) -> Result<TokenDistribution> {
    let d = series.deposits.len();
    let m = series.supplies.len();
    if d > m {
        return Err(IncentiveError::InconsistentSeries {
            token: symbol.to_string(),
            deposits: d,
            supplies: m,
        });
    }
    let latest_supply_timestamp = series.supplies.first().map(|obs| obs.timestamp);
    let (deposit_avg, supply_avg) = match (
        integer_mean(&series.deposits)?,
        integer_mean(&series.supplies[..d])?,
    ) {
        (Some(deposit), Some(supply)) => (deposit, supply),
        _ => {
            return Ok(TokenDistribution {
                symbol: symbol.to_string(),
                amount: U256::ZERO,
                deposit_avg: U256::ZERO,
                supply_avg: U256::ZERO,
                window: 0,
                latest_supply_timestamp,
            })
        }
    };
    if supply_avg.is_zero() {
        return Err(IncentiveError::ZeroSupply {
            token: symbol.to_string(),
        });
    }
    let amount = reward_units
        .checked_mul(deposit_avg)
        .ok_or(IncentiveError::Overflow("reward * deposit average"))?
        / supply_avg;
    Ok(TokenDistribution {
        symbol: symbol.to_string(),
        amount,
        deposit_avg,
        supply_avg,
        window: d,
        latest_supply_timestamp,
    })
}

/// Series and reward of one token fed into [`plan_distributions`].
#[derive(Debug, Clone, Copy)]
pub struct TokenInput<'a> {
    /// Token symbol.
    pub symbol: &'a str,
    /// Observations for the token.
    pub series: &'a SeriesPair,
    /// Total reward in base units.
    pub reward_units: U256,
}

/// Distributions of a whole run plus the next watermark.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DistributionPlan {
    /// Per-token outcomes in input order, zero amounts included.
    pub tokens: Vec<TokenDistribution>,
    /// Newest supply timestamp among tokens with a non-zero amount.
    pub watermark: Option<u64>,
}

impl DistributionPlan {
    /// Tokens that actually receive a distribution.
    pub fn non_zero(&self) -> impl Iterator<Item = &TokenDistribution> {
        self.tokens.iter().filter(|token| !token.is_zero())
    }
}

/// Computes every token; the first error aborts the whole plan.
pub fn plan_distributions<'a>(
    inputs: impl IntoIterator<Item = TokenInput<'a>>,
) -> Result<DistributionPlan> {
    let tokens = inputs
        .into_iter()
        .map(|input| compute_distribution(input.symbol, input.series, input.reward_units))
        .collect::<Result<Vec<_>>>()?;
    let watermark = tokens
        .iter()
        .filter(|token| !token.is_zero())
        .filter_map(|token| token.latest_supply_timestamp)
        .max();
    Ok(DistributionPlan { tokens, watermark })
}

#[cfg(test)]
mod tests {
    use super::{compute_distribution, plan_distributions, TokenInput};
    use crate::error::IncentiveError;
    use crate::observation::{Observation, SeriesPair};
    use crate::units::{parse_units, TOKEN_DECIMALS};
    use alloy_primitives::U256;

    fn series(deposits: &[(u64, u64)], supplies: &[(u64, u64)]) -> SeriesPair {
        let map = |items: &[(u64, u64)]| {
            items
                .iter()
                .map(|(v, ts)| Observation::new(U256::from(*v), *ts))
                .collect()
        };
        SeriesPair {
            deposits: map(deposits),
            supplies: map(supplies),
        }
    }

    fn ten_tokens() -> U256 {
        parse_units("10", TOKEN_DECIMALS).unwrap()
    }

    #[test]
    fn worked_example() {
        let pair = series(&[(100, 300), (200, 200)], &[(1000, 300), (2000, 200), (3000, 100)]);
        let dist = compute_distribution("ARB", &pair, ten_tokens()).unwrap();
        assert_eq!(dist.deposit_avg, U256::from(150u64));
        assert_eq!(dist.supply_avg, U256::from(1500u64));
        assert_eq!(dist.amount, U256::from(1_000_000_000_000_000_000u64));
        assert_eq!(dist.ratio_display(), "0.100000");
        assert_eq!(dist.window, 2);
        assert_eq!(dist.latest_supply_timestamp, Some(300));
    }

    #[test]
    fn no_deposits_means_nothing_to_distribute() {
        let pair = series(&[], &[(1000, 300)]);
        let dist = compute_distribution("ETH", &pair, ten_tokens()).unwrap();
        assert!(dist.is_zero());
        assert_eq!(dist.window, 0);

        let empty = compute_distribution("ETH", &SeriesPair::default(), ten_tokens()).unwrap();
        assert!(empty.is_zero());
    }

    #[test]
    fn more_deposits_than_supplies_is_inconsistent() {
        let pair = series(&[(1, 3), (1, 2)], &[(10, 3)]);
        let err = compute_distribution("BTC", &pair, ten_tokens()).unwrap_err();
        assert!(matches!(
            err,
            IncentiveError::InconsistentSeries { deposits: 2, supplies: 1, .. }
        ));
    }

    #[test]
    fn means_truncate_and_multiply_before_dividing() {
        // depositAvg = floor(5/2) = 2, supplyAvg = floor(7/2) = 3
        let pair = series(&[(2, 2), (3, 1)], &[(3, 2), (4, 1)]);
        let dist = compute_distribution("SOL", &pair, U256::from(10u64)).unwrap();
        assert_eq!(dist.deposit_avg, U256::from(2u64));
        assert_eq!(dist.supply_avg, U256::from(3u64));
        // 10 * 2 / 3 = 6, whereas 10 * (2 / 3) would be 0.
        assert_eq!(dist.amount, U256::from(6u64));
    }

    #[test]
    fn zero_supply_is_an_error() {
        let pair = series(&[(5, 1)], &[(0, 1)]);
        assert!(matches!(
            compute_distribution("ARB", &pair, ten_tokens()),
            Err(IncentiveError::ZeroSupply { .. })
        ));
    }

    #[test]
    fn huge_balances_stay_exact() {
        let balance = U256::from(u128::MAX);
        let pair = SeriesPair {
            deposits: vec![Observation::new(balance, 1)],
            supplies: vec![Observation::new(balance * U256::from(4u64), 1)],
        };
        let dist = compute_distribution("ETH", &pair, ten_tokens()).unwrap();
        assert_eq!(dist.amount, ten_tokens() / U256::from(4u64));
    }

    #[test]
    fn watermark_uses_tokens_with_distributions() {
        let arb = series(&[(100, 300)], &[(1000, 300)]);
        let eth = series(&[], &[(1000, 500)]);
        let btc = series(&[(1, 400)], &[(10, 400), (10, 100)]);
        let plan = plan_distributions([
            TokenInput { symbol: "ARB", series: &arb, reward_units: ten_tokens() },
            TokenInput { symbol: "ETH", series: &eth, reward_units: ten_tokens() },
            TokenInput { symbol: "BTC", series: &btc, reward_units: ten_tokens() },
        ])
        .unwrap();
        assert_eq!(plan.tokens.len(), 3);
        assert_eq!(plan.non_zero().count(), 2);
        assert_eq!(plan.watermark, Some(400));
    }

    #[test]
    fn any_inconsistency_aborts_the_plan() {
        let good = series(&[(100, 300)], &[(1000, 300)]);
        let bad = series(&[(1, 2), (1, 1)], &[(1, 2)]);
        let result = plan_distributions([
            TokenInput { symbol: "ARB", series: &good, reward_units: ten_tokens() },
            TokenInput { symbol: "BTC", series: &bad, reward_units: ten_tokens() },
        ]);
        assert!(result.is_err());
    }

    #[test]
    fn nothing_distributed_leaves_no_watermark() {
        let eth = series(&[], &[(1000, 500)]);
        let plan = plan_distributions([TokenInput {
            symbol: "ETH",
            series: &eth,
            reward_units: ten_tokens(),
        }])
        .unwrap();
        assert_eq!(plan.watermark, None);
    }
}
