use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use std::time::Duration;
use tracing::debug;
use url::Url;

use super::models::{FixturesEnvelope, Match};
use super::provider::{FixtureProvider, FixtureQuery, ProviderError};

pub const DEFAULT_BASE_URL: &str = "https://api-football-v1.p.rapidapi.com/v3";

/// Fixture provider backed by API-Football v3 (RapidAPI).
/// Docs: <https://www.api-football.com/documentation-v3>
pub struct ApiFootball {
    http: Client,
    api_key: Option<String>,
    /// Base URL for overriding in tests
    base_url: String,
    /// Value of the `X-RapidAPI-Host` header
    host: String,
}

impl ApiFootball {
    pub fn new(api_key: Option<&str>, base_url: Option<&str>, timeout: Duration) -> Result<Self> {
        let base_url = base_url.unwrap_or(DEFAULT_BASE_URL);
        let parsed = Url::parse(base_url)
            .with_context(|| format!("Invalid football API URL: {}", base_url))?;
        let host = parsed
            .host_str()
            .context("Football API URL has no host")?
            .to_string();
        let http = Client::builder()
            .timeout(timeout)
            .build()
            .context("Failed to build HTTP client")?;
        Ok(ApiFootball {
            http,
            // An empty key is as good as none
            api_key: api_key
                .map(str::trim)
                .filter(|k| !k.is_empty())
                .map(str::to_string),
            base_url: base_url.trim_end_matches('/').to_string(),
            host,
        })
    }

    pub fn has_api_key(&self) -> bool {
        self.api_key.is_some()
    }
}

#[async_trait]
impl FixtureProvider for ApiFootball {
    fn name(&self) -> &str {
        "API-Football"
    }

    async fn fetch_fixtures(&self, query: FixtureQuery) -> Result<Vec<Match>, ProviderError> {
        let api_key = self.api_key.as_deref().ok_or(ProviderError::MissingApiKey)?;

        let url = format!("{}/fixtures", self.base_url);
        let (key, value) = query.param();
        debug!("Fetching fixtures from {} ({})", url, query);

        let resp = self
            .http
            .get(&url)
            .query(&[(key, value.as_str())])
            .header("X-RapidAPI-Key", api_key)
            .header("X-RapidAPI-Host", &self.host)
            .send()
            .await
            .map_err(ProviderError::Request)?;

        if !resp.status().is_success() {
            return Err(ProviderError::Status(resp.status()));
        }

        let body = resp.text().await.map_err(ProviderError::Request)?;
        parse_fixtures_response(&body)
    }
}

fn parse_fixtures_response(body: &str) -> Result<Vec<Match>, ProviderError> {
    let envelope: FixturesEnvelope =
        serde_json::from_str(body).map_err(|e| ProviderError::Payload(e.to_string()))?;

    if envelope.has_errors() {
        return Err(ProviderError::Reported(envelope.errors));
    }

    debug!(
        "Provider answered {} with {} result(s) (page {}/{})",
        envelope.get,
        envelope.response.len(),
        envelope.paging.current,
        envelope.paging.total
    );
    Ok(envelope.response)
}
