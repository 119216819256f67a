use chrono::{FixedOffset, Local, Offset, Utc};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

use super::fallback::fallback_snapshot;
use super::filters::{filter_by_range, DateRange};
use super::models::{FetchResult, Match, MatchSnapshot};
use super::provider::{FixtureProvider, FixtureQuery, ProviderError};

pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Single entry point for match data. Every call issues one provider request
/// and degrades to the fixed fallback snapshot instead of failing.
pub struct Gateway {
    provider: Arc<dyn FixtureProvider>,
    fallback: MatchSnapshot,
    timeout: Duration,
    /// Pinned offset for calendar days; `None` follows the host's local
    /// offset, resolved on every call so DST changes are picked up
    offset: Option<FixedOffset>,
}

impl Gateway {
    pub fn new(provider: Arc<dyn FixtureProvider>, timeout: Duration) -> Self {
        Gateway {
            provider,
            fallback: fallback_snapshot(Utc::now()),
            timeout,
            offset: None,
        }
    }

    /// Pin the calendar-day offset (the host's local offset by default).
    pub fn with_offset(mut self, offset: FixedOffset) -> Self {
        self.offset = Some(offset);
        self
    }

    pub fn provider_name(&self) -> &str {
        self.provider.name()
    }

    /// Offset that decides which calendar day a kick-off falls on.
    pub fn offset(&self) -> FixedOffset {
        self.offset.unwrap_or_else(|| Local::now().offset().fix())
    }

    /// The snapshot handed out on every failure.
    pub fn fallback(&self) -> &MatchSnapshot {
        &self.fallback
    }

    /// Fetch matches, optionally bounded by an inclusive day range.
    ///
    /// A single-day range asks the provider for that date; wider ranges use
    /// the default query and are narrowed locally. The fallback snapshot is
    /// returned unfiltered.
    pub async fn fetch(&self, range: Option<&DateRange>) -> FetchResult {
        let query = match range {
            Some(r) if r.is_single_day() => FixtureQuery::Date(r.start()),
            _ => FixtureQuery::Live,
        };

        match self.request(query).await {
            Ok(matches) => {
                let matches = match range {
                    Some(r) => filter_by_range(&matches, r, &self.offset()),
                    None => matches,
                };
                debug!(
                    "{} returned {} match(es) for {}",
                    self.provider.name(),
                    matches.len(),
                    query
                );
                FetchResult::Live(MatchSnapshot::new(matches))
            }
            Err(e) => self.degrade(query, &e),
        }
    }

    /// Fetch one fixture by id. On failure the fallback snapshot is returned
    /// so callers can still look the id up in it.
    pub async fn fetch_fixture(&self, id: u64) -> FetchResult {
        let query = FixtureQuery::Id(id);
        match self.request(query).await {
            Ok(matches) => FetchResult::Live(MatchSnapshot::new(matches)),
            Err(e) => self.degrade(query, &e),
        }
    }

    async fn request(&self, query: FixtureQuery) -> Result<Vec<Match>, ProviderError> {
        match tokio::time::timeout(self.timeout, self.provider.fetch_fixtures(query)).await {
            Ok(result) => result,
            Err(_) => Err(ProviderError::Timeout(self.timeout)),
        }
    }

    fn degrade(&self, query: FixtureQuery, err: &ProviderError) -> FetchResult {
        warn!(
            "Provider '{}' failed for {}: {}; serving fallback data",
            self.provider.name(),
            query,
            err
        );
        FetchResult::Fallback(self.fallback.clone())
    }
}
