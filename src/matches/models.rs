use chrono::{DateTime, FixedOffset, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::Deref;
use std::sync::Arc;

/// A single fixture as returned by the football-data provider.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Match {
    pub fixture: Fixture,
    pub league: League,
    pub teams: Teams,
    pub goals: Goals,
    pub score: ScoreBreakdown,
    /// Timeline events, passed through untouched for detail views
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub events: Option<serde_json::Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub statistics: Option<serde_json::Value>,
}

impl Match {
    pub fn id(&self) -> u64 {
        self.fixture.id
    }

    pub fn status(&self) -> &StatusCode {
        &self.fixture.status.short
    }

    pub fn is_live(&self) -> bool {
        self.fixture.status.short.is_live()
    }

    /// "Home vs Away" label used in logs and notifications.
    pub fn title(&self) -> String {
        format!("{} vs {}", self.teams.home.name, self.teams.away.name)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Fixture {
    pub id: u64,
    #[serde(default)]
    pub referee: Option<String>,
    #[serde(default)]
    pub timezone: String,
    /// Kick-off instant with the provider's offset
    pub date: DateTime<FixedOffset>,
    /// Kick-off as unix seconds
    #[serde(default)]
    pub timestamp: i64,
    #[serde(default)]
    pub periods: Periods,
    #[serde(default)]
    pub venue: Venue,
    pub status: FixtureStatus,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Periods {
    pub first: Option<i64>,
    pub second: Option<i64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Venue {
    pub id: Option<u64>,
    pub name: Option<String>,
    pub city: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FixtureStatus {
    /// e.g. "Second Half"
    pub long: String,
    pub short: StatusCode,
    /// Minutes played so far
    pub elapsed: Option<u32>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct League {
    pub id: u64,
    pub name: String,
    #[serde(default)]
    pub country: String,
    #[serde(default)]
    pub logo: String,
    #[serde(default)]
    pub flag: Option<String>,
    pub season: i32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Teams {
    pub home: Team,
    pub away: Team,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Team {
    pub id: u64,
    pub name: String,
    #[serde(default)]
    pub logo: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
}

/// Current goal counts; `None` before kick-off.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Goals {
    pub home: Option<u32>,
    pub away: Option<u32>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ScoreBreakdown {
    #[serde(default)]
    pub halftime: Goals,
    #[serde(default)]
    pub fulltime: Goals,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub extratime: Option<Goals>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub penalty: Option<Goals>,
}

/// Short fixture status code as used by API-Football.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum StatusCode {
    /// Time to be defined
    ToBeDefined,
    NotStarted,
    FirstHalf,
    HalfTime,
    SecondHalf,
    ExtraTime,
    /// Break before extra time
    BreakTime,
    PenaltiesInProgress,
    Suspended,
    Interrupted,
    FullTime,
    AfterExtraTime,
    Penalties,
    Postponed,
    Cancelled,
    Abandoned,
    TechnicalLoss,
    WalkOver,
    /// In progress without period detail
    Live,
    Other(String),
}

impl StatusCode {
    pub fn as_str(&self) -> &str {
        match self {
            StatusCode::ToBeDefined => "TBD",
            StatusCode::NotStarted => "NS",
            StatusCode::FirstHalf => "1H",
            StatusCode::HalfTime => "HT",
            StatusCode::SecondHalf => "2H",
            StatusCode::ExtraTime => "ET",
            StatusCode::BreakTime => "BT",
            StatusCode::PenaltiesInProgress => "P",
            StatusCode::Suspended => "SUSP",
            StatusCode::Interrupted => "INT",
            StatusCode::FullTime => "FT",
            StatusCode::AfterExtraTime => "AET",
            StatusCode::Penalties => "PEN",
            StatusCode::Postponed => "PST",
            StatusCode::Cancelled => "CANC",
            StatusCode::Abandoned => "ABD",
            StatusCode::TechnicalLoss => "AWD",
            StatusCode::WalkOver => "WO",
            StatusCode::Live => "LIVE",
            StatusCode::Other(s) => s,
        }
    }

    /// First half, half-time or second half.
    pub fn is_live(&self) -> bool {
        matches!(
            self,
            StatusCode::FirstHalf | StatusCode::HalfTime | StatusCode::SecondHalf
        )
    }

    pub fn is_finished(&self) -> bool {
        matches!(
            self,
            StatusCode::FullTime | StatusCode::AfterExtraTime | StatusCode::Penalties
        )
    }

    pub fn is_scheduled(&self) -> bool {
        matches!(self, StatusCode::NotStarted | StatusCode::ToBeDefined)
    }

    /// Human-readable status; running halves show the elapsed minute.
    pub fn label(&self, elapsed: Option<u32>) -> String {
        match self {
            StatusCode::NotStarted => "Not Started".to_string(),
            StatusCode::FirstHalf | StatusCode::SecondHalf => match elapsed {
                Some(min) => format!("{}'", min),
                None => self.as_str().to_string(),
            },
            StatusCode::HalfTime => "Half Time".to_string(),
            StatusCode::FullTime => "Full Time".to_string(),
            StatusCode::AfterExtraTime => "Extra Time".to_string(),
            StatusCode::Penalties => "Penalties".to_string(),
            StatusCode::Suspended => "Suspended".to_string(),
            StatusCode::Cancelled => "Cancelled".to_string(),
            other => other.as_str().to_string(),
        }
    }
}

impl From<String> for StatusCode {
    fn from(s: String) -> Self {
        match s.as_str() {
            "TBD" => StatusCode::ToBeDefined,
            "NS" => StatusCode::NotStarted,
            "1H" => StatusCode::FirstHalf,
            "HT" => StatusCode::HalfTime,
            "2H" => StatusCode::SecondHalf,
            "ET" => StatusCode::ExtraTime,
            "BT" => StatusCode::BreakTime,
            "P" => StatusCode::PenaltiesInProgress,
            "SUSP" => StatusCode::Suspended,
            "INT" => StatusCode::Interrupted,
            "FT" => StatusCode::FullTime,
            "AET" => StatusCode::AfterExtraTime,
            "PEN" => StatusCode::Penalties,
            "PST" => StatusCode::Postponed,
            "CANC" => StatusCode::Cancelled,
            "ABD" => StatusCode::Abandoned,
            "AWD" => StatusCode::TechnicalLoss,
            "WO" => StatusCode::WalkOver,
            "LIVE" => StatusCode::Live,
            _ => StatusCode::Other(s),
        }
    }
}

impl From<&str> for StatusCode {
    fn from(s: &str) -> Self {
        StatusCode::from(s.to_string())
    }
}

impl From<StatusCode> for String {
    fn from(code: StatusCode) -> Self {
        code.as_str().to_string()
    }
}

impl fmt::Display for StatusCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The full result set of one fetch cycle. Replaced wholesale, never merged.
#[derive(Debug, Clone)]
pub struct MatchSnapshot {
    matches: Arc<Vec<Match>>,
    fetched_at: DateTime<Utc>,
}

impl MatchSnapshot {
    pub fn new(matches: Vec<Match>) -> Self {
        MatchSnapshot {
            matches: Arc::new(matches),
            fetched_at: Utc::now(),
        }
    }

    pub fn fetched_at(&self) -> DateTime<Utc> {
        self.fetched_at
    }

    pub fn matches(&self) -> &[Match] {
        &self.matches
    }
}

impl Deref for MatchSnapshot {
    type Target = [Match];

    fn deref(&self) -> &[Match] {
        &self.matches
    }
}

impl PartialEq for MatchSnapshot {
    fn eq(&self, other: &Self) -> bool {
        self.matches == other.matches
    }
}

impl Serialize for MatchSnapshot {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.matches.serialize(serializer)
    }
}

/// Where a snapshot came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DataSource {
    Live,
    Fallback,
}

/// Outcome of one gateway fetch, tagged so consumers can tell real data from
/// the degraded fallback.
#[derive(Debug, Clone, PartialEq)]
pub enum FetchResult {
    Live(MatchSnapshot),
    Fallback(MatchSnapshot),
}

impl FetchResult {
    pub fn snapshot(&self) -> &MatchSnapshot {
        match self {
            FetchResult::Live(s) | FetchResult::Fallback(s) => s,
        }
    }

    pub fn into_snapshot(self) -> MatchSnapshot {
        match self {
            FetchResult::Live(s) | FetchResult::Fallback(s) => s,
        }
    }

    pub fn source(&self) -> DataSource {
        match self {
            FetchResult::Live(_) => DataSource::Live,
            FetchResult::Fallback(_) => DataSource::Fallback,
        }
    }

    pub fn is_fallback(&self) -> bool {
        matches!(self, FetchResult::Fallback(_))
    }
}

/// Response envelope of the provider's `/fixtures` endpoint.
#[derive(Debug, Clone, Deserialize)]
pub struct FixturesEnvelope {
    #[serde(default)]
    pub get: String,
    #[serde(default)]
    pub parameters: serde_json::Value,
    /// API-Football reports errors as either `[]` or `{"token": "..."}`
    #[serde(default)]
    pub errors: serde_json::Value,
    #[serde(default)]
    pub results: u32,
    #[serde(default)]
    pub paging: Paging,
    pub response: Vec<Match>,
}

impl FixturesEnvelope {
    pub fn has_errors(&self) -> bool {
        match &self.errors {
            serde_json::Value::Null => false,
            serde_json::Value::Array(a) => !a.is_empty(),
            serde_json::Value::Object(o) => !o.is_empty(),
            serde_json::Value::String(s) => !s.is_empty(),
            _ => true,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, Deserialize)]
pub struct Paging {
    pub current: u32,
    pub total: u32,
}
