//! Distribution run configuration, loaded from JSON.

use crate::error::{IncentiveError, Result};
use crate::io::read_json;
use crate::transaction::Address;
use crate::units::{parse_units, TOKEN_DECIMALS};
use alloy_primitives::U256;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::path::Path;

/// Incentive statistics subgraph queried when no other URL is configured.
pub const DEFAULT_SUBGRAPH_URL: &str =
    "https://subgraph.satsuma-prod.com/gmx/synthetics-arbitrum-stats/api";

/// Method called on each distributor after the approval.
pub const DEFAULT_NOTIFY_METHOD: &str = "notifyRewardAmount";

fn default_subgraph_url() -> String {
    DEFAULT_SUBGRAPH_URL.to_string()
}

fn default_notify_method() -> String {
    DEFAULT_NOTIFY_METHOD.to_string()
}

fn default_max_observations() -> usize {
    1
}

/// One incentivised market.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenConfig {
    /// Short symbol, also used as the query alias prefix.
    pub symbol: String,
    /// Market token address the statistics are keyed by.
    pub market: Address,
    /// ERC-20 paid out as the reward.
    pub reward_token: Address,
    /// Contract that receives the approval and the reward notification.
    pub distributor: Address,
    /// Reward for the period as a decimal token amount (`"10"`, `"2.5"`).
    pub total_reward: String,
}

impl TokenConfig {
    /// Total reward in base units.
    pub fn reward_units(&self) -> Result<U256> {
        parse_units(&self.total_reward, TOKEN_DECIMALS)
    }
}

/// Everything a distribution run needs besides observations and state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IncentivesConfig {
    /// Decimal chain id of the target network.
    pub chain_id: String,
    /// Display name written into `meta.name`.
    #[serde(default)]
    pub batch_name: Option<String>,
    /// Description written into `meta.description`.
    #[serde(default)]
    pub description: Option<String>,
    /// Multisig wallet executing the batch.
    #[serde(default)]
    pub safe_address: Option<Address>,
    /// Liquidity-provider account whose deposits are measured.
    pub account: Address,
    /// Statistics endpoint.
    #[serde(default = "default_subgraph_url")]
    pub subgraph_url: String,
    /// Observations fetched per series (N).
    #[serde(default = "default_max_observations")]
    pub max_observations: usize,
    /// Distributor method taking the reward amount.
    #[serde(default = "default_notify_method")]
    pub notify_method: String,
    /// Markets processed in this order.
    pub tokens: Vec<TokenConfig>,
}

impl IncentivesConfig {
    /// Loads and validates a configuration file.
    pub fn load(path: &Path) -> Result<Self> {
        let config: Self = read_json(path)
            .map_err(|err| IncentiveError::Config(format!("{}: {err}", path.display())))?;
        config.validate()?;
        Ok(config)
    }

    /// Checks cross-field constraints serde cannot express.
    pub fn validate(&self) -> Result<()> {
        if self.chain_id.is_empty() || !self.chain_id.bytes().all(|b| b.is_ascii_digit()) {
            return Err(IncentiveError::Config(format!(
                "chain_id '{}' is not a decimal number",
                self.chain_id
            )));
        }
        if self.max_observations == 0 {
            return Err(IncentiveError::Config(
                "max_observations must be at least 1".to_string(),
            ));
        }
        if !is_identifier(&self.notify_method) {
            return Err(IncentiveError::Config(format!(
                "notify_method '{}' is not a valid identifier",
                self.notify_method
            )));
        }
        if self.tokens.is_empty() {
            return Err(IncentiveError::Config("no tokens configured".to_string()));
        }
        let mut seen = BTreeSet::new();
        for token in &self.tokens {
            if !is_identifier(&token.symbol) {
                return Err(IncentiveError::Config(format!(
                    "token symbol '{}' must be alphanumeric",
                    token.symbol
                )));
            }
            if !seen.insert(token.symbol.as_str()) {
                return Err(IncentiveError::Config(format!(
                    "token symbol '{}' listed twice",
                    token.symbol
                )));
            }
            token.reward_units().map_err(|err| {
                IncentiveError::Config(format!("total_reward of {}: {err}", token.symbol))
            })?;
        }
        Ok(())
    }
}

fn is_identifier(raw: &str) -> bool {
    let mut chars = raw.chars();
    match chars.next() {
        Some(first) if first.is_ascii_alphabetic() || first == '_' => {
            chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
        }
        _ => false,
    }
}
