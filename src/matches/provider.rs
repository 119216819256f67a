use async_trait::async_trait;
use chrono::NaiveDate;
use std::fmt;

use super::models::Match;

/// One request shape understood by the fixtures endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FixtureQuery {
    /// `live=all`, the provider's default query
    Live,
    /// `date=YYYY-MM-DD`
    Date(NaiveDate),
    /// `id=<fixture id>`
    Id(u64),
}

impl FixtureQuery {
    /// Query-string pair sent to the provider.
    pub fn param(&self) -> (&'static str, String) {
        match self {
            FixtureQuery::Live => ("live", "all".to_string()),
            FixtureQuery::Date(day) => ("date", day.format("%Y-%m-%d").to_string()),
            FixtureQuery::Id(id) => ("id", id.to_string()),
        }
    }
}

impl fmt::Display for FixtureQuery {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let (k, v) = self.param();
        write!(f, "{}={}", k, v)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ProviderError {
    #[error("no API key configured")]
    MissingApiKey,
    #[error("request failed: {0}")]
    Request(#[source] reqwest::Error),
    #[error("provider returned HTTP {0}")]
    Status(reqwest::StatusCode),
    #[error("malformed payload: {0}")]
    Payload(String),
    #[error("provider reported errors: {0}")]
    Reported(serde_json::Value),
    #[error("timed out after {0:?}")]
    Timeout(std::time::Duration),
}

/// Trait that every fixture-data provider must implement.
#[async_trait]
pub trait FixtureProvider: Send + Sync {
    /// Issue exactly one request and return the provider's match list.
    async fn fetch_fixtures(&self, query: FixtureQuery) -> Result<Vec<Match>, ProviderError>;

    /// Human-readable name for logging.
    fn name(&self) -> &str;
}
