use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde_json::Value;
use shared::{
    domain::Record,
    error::ApiError,
    protocol::{FilterSpec, SortMap},
};

const PROCUREMENTS_PATH: &str = "/procurements";

/// Remote source of procurement rows. Each call yields exactly one outcome.
#[async_trait]
pub trait DataSource: Send + Sync {
    async fn fetch(&self, limit: u32, filters: &FilterSpec, sort: &SortMap) -> Result<Vec<Record>>;
}

pub struct MissingDataSource;

#[async_trait]
impl DataSource for MissingDataSource {
    async fn fetch(
        &self,
        _limit: u32,
        _filters: &FilterSpec,
        _sort: &SortMap,
    ) -> Result<Vec<Record>> {
        Err(anyhow!("procurement data source is unavailable"))
    }
}

/// Fetches rows from the procurement HTTP API.
///
/// The query goes out as `GET {base_url}/procurements?limit=..&filters=..&sort=..`
/// with `filters` and `sort` JSON-encoded; the response body is a JSON array of rows.
pub struct HttpDataSource {
    http: Client,
    base_url: String,
}

impl HttpDataSource {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self::with_client(Client::new(), base_url)
    }

    pub fn with_client(http: Client, base_url: impl Into<String>) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Self { http, base_url }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }
}

#[async_trait]
impl DataSource for HttpDataSource {
    async fn fetch(&self, limit: u32, filters: &FilterSpec, sort: &SortMap) -> Result<Vec<Record>> {
        let filters_json = serde_json::to_string(filters).context("failed to encode filters")?;
        let sort_json = serde_json::to_string(sort).context("failed to encode sort")?;

        let response = self
            .http
            .get(format!("{}{PROCUREMENTS_PATH}", self.base_url))
            .query(&[
                ("limit", limit.to_string()),
                ("filters", filters_json),
                ("sort", sort_json),
            ])
            .send()
            .await
            .context("procurement request failed")?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(match ApiError::from_body(&body) {
                Some(api_error) => anyhow::Error::new(api_error)
                    .context(format!("procurement API responded with {status}")),
                None => anyhow!("procurement API responded with {status}"),
            });
        }

        let rows: Vec<Value> = response
            .json()
            .await
            .context("invalid procurement payload")?;
        rows.into_iter()
            .enumerate()
            .map(|(index, row)| {
                Record::try_from(row)
                    .with_context(|| format!("invalid procurement payload at row {index}"))
            })
            .collect()
    }
}

#[cfg(test)]
#[path = "tests/data_source_tests.rs"]
mod tests;
