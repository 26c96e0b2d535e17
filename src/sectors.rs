//! Sectors API access.
//!
//! Endpoint URL construction and the authenticated JSON fetcher used by
//! the agent tools.

use crate::config::{Credentials, SectorsConfig};
use crate::error::{Result, ScoutError};
use crate::models::Market;
use async_trait::async_trait;
use serde_json::Value;
use std::time::Duration;
use tracing::debug;

/// Fetches a JSON document from a fully-formed URL.
#[async_trait]
pub trait Fetcher: Send + Sync {
    async fn fetch(&self, url: &str) -> Result<Value>;
}

/// Builds the company report URL for a ticker on the given market.
pub fn company_overview_url(base_url: &str, ticker: &str, market: Market) -> String {
    match market {
        Market::Indonesia => format!("{}/v1/company/report/{}/?sections=overview", base_url, ticker),
        Market::Singapore => format!("{}/v1/sgx/company/report/{}/", base_url, ticker),
        Market::Malaysia => format!("{}/v1/klse/company/report/{}/", base_url, ticker),
    }
}

/// Builds the top-companies URL. The dimension is passed through verbatim.
pub fn top_companies_url(base_url: &str, dimension: &str, n_stock: usize) -> String {
    format!(
        "{}/v1/companies/top/?classifications={}&n_stock={}",
        base_url, dimension, n_stock
    )
}

/// reqwest-backed fetcher carrying the static `Authorization` header.
pub struct SectorsClient {
    http_client: reqwest::Client,
    api_key: Option<String>,
}

impl SectorsClient {
    pub fn new(config: &SectorsConfig, credentials: &Credentials) -> Result<Self> {
        let http_client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .build()?;

        Ok(Self {
            http_client,
            api_key: credentials.sectors_api_key.clone(),
        })
    }
}

#[async_trait]
impl Fetcher for SectorsClient {
    async fn fetch(&self, url: &str) -> Result<Value> {
        debug!("GET {}", url);

        let mut request = self.http_client.get(url);
        if let Some(ref key) = self.api_key {
            request = request.header(reqwest::header::AUTHORIZATION, key);
        }

        let response = request.send().await?;

        let status = response.status();
        if !status.is_success() {
            return Err(ScoutError::Transport {
                status: status.as_u16(),
                url: url.to_string(),
            });
        }

        Ok(response.json::<Value>().await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const BASE: &str = "https://api.sectors.app";

    #[test]
    fn test_indonesia_url() {
        assert_eq!(
            company_overview_url(BASE, "BBCA", Market::Indonesia),
            "https://api.sectors.app/v1/company/report/BBCA/?sections=overview"
        );
    }

    #[test]
    fn test_singapore_url() {
        assert_eq!(
            company_overview_url(BASE, "D05", Market::Singapore),
            "https://api.sectors.app/v1/sgx/company/report/D05/"
        );
    }

    #[test]
    fn test_malaysia_url() {
        assert_eq!(
            company_overview_url(BASE, "1155", Market::Malaysia),
            "https://api.sectors.app/v1/klse/company/report/1155/"
        );
    }

    #[test]
    fn test_top_companies_url() {
        assert_eq!(
            top_companies_url(BASE, "market_cap", 3),
            "https://api.sectors.app/v1/companies/top/?classifications=market_cap&n_stock=3"
        );
    }

    #[test]
    fn test_client_builds_without_key() {
        let client = SectorsClient::new(&SectorsConfig::default(), &Credentials::default());
        assert!(client.is_ok());
    }
}
