use super::ObservationSource;
use crate::config::TokenConfig;
use crate::error::{IncentiveError, Result};
use crate::observation::SeriesPair;
use crate::query::{build_query, parse_response};
use crate::transaction::Address;
use reqwest::blocking::Client;
use reqwest::header::{CONTENT_TYPE, ORIGIN, REFERER};
use reqwest::Url;
use std::collections::BTreeMap;
use std::time::Duration;
use tracing::{debug, info};

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

fn transport(err: reqwest::Error) -> IncentiveError {
    IncentiveError::Source(format!("subgraph request failed: {err}"))
}

/// Incentive statistics subgraph reached over HTTP.
///
/// One POST per fetch; retries are left to the caller's schedule.
#[derive(Debug, Clone)]
pub struct SubgraphSource {
    url: Url,
    account: Address,
    client: Client,
}

impl SubgraphSource {
    /// Targets `url` for deposits of `account`.
    pub fn new(url: &str, account: Address) -> Result<Self> {
        let url = Url::parse(url)
            .map_err(|err| IncentiveError::Config(format!("subgraph url '{url}': {err}")))?;
        let client = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(transport)?;
        Ok(Self {
            url,
            account,
            client,
        })
    }

    fn referer(&self) -> String {
        let raw = self.url.as_str();
        match raw.strip_suffix("/api") {
            Some(base) => format!("{base}/playground"),
            None => raw.to_string(),
        }
    }
}

impl ObservationSource for SubgraphSource {
    fn fetch(
        &self,
        tokens: &[TokenConfig],
        since: u64,
        limit: usize,
    ) -> Result<BTreeMap<String, SeriesPair>> {
        let query = build_query(&self.account, tokens, since, limit);
        debug!(%query, "subgraph query");
        info!(url = %self.url, tokens = tokens.len(), since, "fetching observations");

        let response = self
            .client
            .post(self.url.clone())
            .header(CONTENT_TYPE, "application/json")
            .header(ORIGIN, self.url.origin().ascii_serialization())
            .header(REFERER, self.referer())
            .json(&serde_json::json!({ "query": query }))
            .send()
            .map_err(transport)?;
        let status = response.status();
        let body = response.text().map_err(transport)?;
        if !status.is_success() {
            return Err(IncentiveError::Source(format!(
                "subgraph answered {status}: {body}"
            )));
        }

        let parsed = parse_response(&body, tokens)?;
        Ok(parsed
            .into_iter()
            .map(|(symbol, series)| (symbol, series.normalized(since, limit)))
            .collect())
    }
}
