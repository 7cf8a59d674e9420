//! GraphQL document for the incentive statistics subgraph and its response shape.
//!
//! Each token contributes two aliased selections: `<symbol>Market` over
//! `marketIncentivesStats` (market supply) and `<symbol>Deposit` over
//! `liquidityProviderIncentivesStats` (the account's balance). The newest
//! period is skipped because it is still accumulating.

use crate::config::TokenConfig;
use crate::error::{IncentiveError, Result};
use crate::observation::{Observation, SeriesPair};
use crate::transaction::Address;
use crate::units::parse_amount;
use serde::Deserialize;
use std::collections::BTreeMap;

/// Alias of a token's market-supply selection.
pub fn market_alias(symbol: &str) -> String {
    format!("{symbol}Market")
}

/// Alias of a token's deposited-balance selection.
pub fn deposit_alias(symbol: &str) -> String {
    format!("{symbol}Deposit")
}

/// Builds one query covering every token, restricted to periods after `since`.
pub fn build_query(account: &Address, tokens: &[TokenConfig], since: u64, first: usize) -> String {
    let mut query = String::from("query {\n");
    for token in tokens {
        query.push_str(&format!(
            r#"    {alias}: marketIncentivesStats(
        skip: 1
        first: {first}
        where: {{ marketAddress: "{market}", timestamp_gt: {since} }}
        orderBy: timestamp
        orderDirection: desc
    ) {{
        weightedAverageMarketTokensSupply
        timestamp
    }}
"#,
            alias = market_alias(&token.symbol),
            market = token.market,
        ));
        query.push_str(&format!(
            r#"    {alias}: liquidityProviderIncentivesStats(
        skip: 1
        first: {first}
        where: {{ account: "{account}", marketAddress: "{market}", timestamp_gt: {since} }}
        orderBy: timestamp
        orderDirection: desc
    ) {{
        weightedAverageMarketTokensBalance
        timestamp
    }}
"#,
            alias = deposit_alias(&token.symbol),
            market = token.market,
        ));
    }
    query.push('}');
    query
}

#[derive(Debug, Deserialize)]
struct GraphResponse {
    #[serde(default)]
    data: Option<BTreeMap<String, Vec<RawStat>>>,
    #[serde(default)]
    errors: Option<Vec<GraphError>>,
}

#[derive(Debug, Deserialize)]
struct GraphError {
    message: String,
}

#[derive(Debug, Deserialize)]
struct RawStat {
    #[serde(
        rename = "weightedAverageMarketTokensSupply",
        alias = "weightedAverageMarketTokensBalance"
    )]
    value: String,
    #[serde(deserialize_with = "timestamp_from_number_or_string")]
    timestamp: u64,
}

fn timestamp_from_number_or_string<'de, D>(deserializer: D) -> std::result::Result<u64, D::Error>
where
    D: serde::Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Number(u64),
        Text(String),
    }
    match Raw::deserialize(deserializer)? {
        Raw::Number(n) => Ok(n),
        Raw::Text(s) => s.trim().parse().map_err(serde::de::Error::custom),
    }
}

fn to_observations(alias: &str, stats: Vec<RawStat>) -> Result<Vec<Observation>> {
    stats
        .into_iter()
        .map(|stat| {
            let value = parse_amount(&stat.value)
                .map_err(|err| IncentiveError::Source(format!("{alias}: {err}")))?;
            Ok(Observation::new(value, stat.timestamp))
        })
        .collect()
}

/// Splits a subgraph response body into per-symbol series.
///
/// GraphQL errors and missing aliases are reported as [`IncentiveError::Source`].
pub fn parse_response(body: &str, tokens: &[TokenConfig]) -> Result<BTreeMap<String, SeriesPair>> {
    let response: GraphResponse = serde_json::from_str(body)
        .map_err(|err| IncentiveError::Source(format!("unexpected response: {err}")))?;
    if let Some(errors) = response.errors.filter(|errors| !errors.is_empty()) {
        let messages = errors
            .into_iter()
            .map(|err| err.message)
            .collect::<Vec<_>>()
            .join("; ");
        return Err(IncentiveError::Source(messages));
    }
    let mut data = response
        .data
        .ok_or_else(|| IncentiveError::Source("response carries no data".to_string()))?;

    let mut out = BTreeMap::new();
    for token in tokens {
        let mut take = |alias: String| -> Result<Vec<Observation>> {
            let stats = data
                .remove(&alias)
                .ok_or_else(|| IncentiveError::Source(format!("response lacks {alias}")))?;
            to_observations(&alias, stats)
        };
        let supplies = take(market_alias(&token.symbol))?;
        let deposits = take(deposit_alias(&token.symbol))?;
        out.insert(token.symbol.clone(), SeriesPair { deposits, supplies });
    }
    Ok(out)
}
