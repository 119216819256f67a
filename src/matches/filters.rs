//! Views over an already-fetched snapshot. Nothing in here performs I/O.

use chrono::{Datelike, Duration, NaiveDate, TimeZone};
use serde::Serialize;
use std::collections::HashSet;

use super::models::Match;

/// Bad input supplied by a caller. Raised at the boundary instead of
/// degrading into an empty result.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum InputError {
    #[error("malformed date '{input}': expected YYYY-MM-DD")]
    MalformedDate { input: String },
    #[error("date range starts on {start} after it ends on {end}")]
    InvertedRange { start: NaiveDate, end: NaiveDate },
    #[error("invalid calendar month {year}-{month}")]
    InvalidMonth { year: i32, month: u32 },
    #[error("malformed fixture id '{0}'")]
    MalformedFixtureId(String),
    #[error("unknown status filter '{0}': expected all, live or finished")]
    UnknownStatusFilter(String),
    #[error("search query is empty")]
    EmptySearch,
}

/// Parse a calendar day in ISO form (`2024-03-10`).
pub fn parse_day(input: &str) -> Result<NaiveDate, InputError> {
    NaiveDate::parse_from_str(input.trim(), "%Y-%m-%d").map_err(|_| InputError::MalformedDate {
        input: input.to_string(),
    })
}

pub fn parse_fixture_id(input: &str) -> Result<u64, InputError> {
    input
        .trim()
        .parse()
        .map_err(|_| InputError::MalformedFixtureId(input.to_string()))
}

/// Inclusive range of calendar days.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateRange {
    start: NaiveDate,
    end: NaiveDate,
}

impl DateRange {
    pub fn new(start: NaiveDate, end: NaiveDate) -> Result<Self, InputError> {
        if start > end {
            return Err(InputError::InvertedRange { start, end });
        }
        Ok(DateRange { start, end })
    }

    pub fn parse(start: &str, end: &str) -> Result<Self, InputError> {
        DateRange::new(parse_day(start)?, parse_day(end)?)
    }

    pub fn single_day(day: NaiveDate) -> Self {
        DateRange {
            start: day,
            end: day,
        }
    }

    pub fn start(&self) -> NaiveDate {
        self.start
    }

    pub fn end(&self) -> NaiveDate {
        self.end
    }

    pub fn is_single_day(&self) -> bool {
        self.start == self.end
    }

    pub fn contains(&self, day: NaiveDate) -> bool {
        self.start <= day && day <= self.end
    }
}

/// Calendar day of the match kick-off in `tz`.
pub fn match_day<Tz: TimeZone>(m: &Match, tz: &Tz) -> NaiveDate {
    m.fixture.date.with_timezone(tz).date_naive()
}

pub fn filter_by_day<Tz: TimeZone>(matches: &[Match], day: NaiveDate, tz: &Tz) -> Vec<Match> {
    matches
        .iter()
        .filter(|m| match_day(m, tz) == day)
        .cloned()
        .collect()
}

pub fn filter_by_range<Tz: TimeZone>(matches: &[Match], range: &DateRange, tz: &Tz) -> Vec<Match> {
    matches
        .iter()
        .filter(|m| range.contains(match_day(m, tz)))
        .cloned()
        .collect()
}

/// Matches currently in play, in their original order.
pub fn filter_live(matches: &[Match]) -> Vec<Match> {
    matches.iter().filter(|m| m.is_live()).cloned().collect()
}

pub fn filter_finished(matches: &[Match]) -> Vec<Match> {
    matches
        .iter()
        .filter(|m| m.status().is_finished())
        .cloned()
        .collect()
}

pub fn find_by_fixture_id(matches: &[Match], id: u64) -> Option<&Match> {
    matches.iter().find(|m| m.id() == id)
}

/// Tab filter of the match list.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum StatusFilter {
    #[default]
    All,
    Live,
    Finished,
}

impl StatusFilter {
    pub fn parse(input: &str) -> Result<Self, InputError> {
        match input.trim().to_lowercase().as_str() {
            "all" | "" => Ok(StatusFilter::All),
            "live" => Ok(StatusFilter::Live),
            "finished" => Ok(StatusFilter::Finished),
            _ => Err(InputError::UnknownStatusFilter(input.to_string())),
        }
    }

    pub fn apply(&self, matches: &[Match]) -> Vec<Match> {
        match self {
            StatusFilter::All => matches.to_vec(),
            StatusFilter::Live => filter_live(matches),
            StatusFilter::Finished => filter_finished(matches),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SearchKind {
    Team,
    League,
    Match,
}

/// A team, league or match from the snapshot that matched a search.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SearchResult {
    #[serde(rename = "type")]
    pub kind: SearchKind,
    pub id: u64,
    pub name: String,
    /// League name for teams and matches, country for leagues
    pub subtitle: String,
}

impl SearchResult {
    fn hits(&self, needle: &str) -> bool {
        self.name.to_lowercase().contains(needle) || self.subtitle.to_lowercase().contains(needle)
    }
}

/// Case-insensitive substring search over the teams, leagues and matches of
/// a snapshot. Each team or league appears once; teams come first, then
/// leagues, then matches, each in snapshot order.
pub fn search(matches: &[Match], query: &str) -> Result<Vec<SearchResult>, InputError> {
    let needle = query.trim().to_lowercase();
    if needle.is_empty() {
        return Err(InputError::EmptySearch);
    }

    let mut seen = HashSet::new();
    let mut teams = Vec::new();
    let mut leagues = Vec::new();
    let mut fixtures = Vec::new();
    for m in matches {
        for team in [&m.teams.home, &m.teams.away] {
            if seen.insert((SearchKind::Team, team.id)) {
                teams.push(SearchResult {
                    kind: SearchKind::Team,
                    id: team.id,
                    name: team.name.clone(),
                    subtitle: m.league.name.clone(),
                });
            }
        }
        if seen.insert((SearchKind::League, m.league.id)) {
            leagues.push(SearchResult {
                kind: SearchKind::League,
                id: m.league.id,
                name: m.league.name.clone(),
                subtitle: m.league.country.clone(),
            });
        }
        if seen.insert((SearchKind::Match, m.id())) {
            fixtures.push(SearchResult {
                kind: SearchKind::Match,
                id: m.id(),
                name: m.title(),
                subtitle: m.league.name.clone(),
            });
        }
    }

    Ok(teams
        .into_iter()
        .chain(leagues)
        .chain(fixtures)
        .filter(|r| r.hits(&needle))
        .collect())
}

/// One cell of the month grid.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CalendarDay {
    pub date: NaiveDate,
    pub matches: Vec<Match>,
    pub is_today: bool,
    pub is_current_month: bool,
}

const CALENDAR_CELLS: i64 = 42;

/// Six Sunday-first weeks covering `month` (1-12), each day carrying its
/// matches in `tz`.
pub fn calendar_month<Tz: TimeZone>(
    year: i32,
    month: u32,
    matches: &[Match],
    tz: &Tz,
    today: NaiveDate,
) -> Result<Vec<CalendarDay>, InputError> {
    let first =
        NaiveDate::from_ymd_opt(year, month, 1).ok_or(InputError::InvalidMonth { year, month })?;
    let grid_start = first - Duration::days(first.weekday().num_days_from_sunday() as i64);

    let days = (0..CALENDAR_CELLS)
        .map(|offset| {
            let date = grid_start + Duration::days(offset);
            CalendarDay {
                date,
                matches: filter_by_day(matches, date, tz),
                is_today: date == today,
                is_current_month: date.month() == month && date.year() == year,
            }
        })
        .collect();
    Ok(days)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::matches::testing::sample_match;
    use chrono::{FixedOffset, Utc};

    fn day(s: &str) -> NaiveDate {
        parse_day(s).unwrap()
    }

    #[test]
    fn test_parse_day_fails_fast_on_garbage() {
        assert_eq!(day("2024-03-10"), NaiveDate::from_ymd_opt(2024, 3, 10).unwrap());
        assert_eq!(
            parse_day("10/03/2024"),
            Err(InputError::MalformedDate {
                input: "10/03/2024".into()
            })
        );
        assert!(parse_day("2024-02-30").is_err());
    }

    #[test]
    fn test_range_rejects_inverted_bounds() {
        assert!(matches!(
            DateRange::parse("2024-03-11", "2024-03-10"),
            Err(InputError::InvertedRange { .. })
        ));
        let r = DateRange::parse("2024-03-10", "2024-03-12").unwrap();
        assert!(r.contains(day("2024-03-12")));
        assert!(!r.contains(day("2024-03-13")));
        assert!(!r.is_single_day());
    }

    #[test]
    fn test_filter_by_day_uses_local_calendar_day() {
        let late = sample_match(1, "FT", "2024-03-10T23:30:00+00:00", 0, 0);
        let early = sample_match(2, "NS", "2024-03-10T08:00:00+00:00", 0, 0);
        let matches = vec![late, early];

        let utc_hits = filter_by_day(&matches, day("2024-03-10"), &Utc);
        assert_eq!(utc_hits.len(), 2);

        // In UTC+2 the late kick-off belongs to the next day
        let plus_two = FixedOffset::east_opt(2 * 3600).unwrap();
        let ids: Vec<u64> = filter_by_day(&matches, day("2024-03-10"), &plus_two)
            .iter()
            .map(Match::id)
            .collect();
        assert_eq!(ids, vec![2]);
        let ids: Vec<u64> = filter_by_day(&matches, day("2024-03-11"), &plus_two)
            .iter()
            .map(Match::id)
            .collect();
        assert_eq!(ids, vec![1]);
    }

    #[test]
    fn test_filter_live_keeps_only_live_and_preserves_order() {
        let matches = vec![
            sample_match(1, "HT", "2024-03-10T15:00:00+00:00", 1, 0),
            sample_match(2, "FT", "2024-03-10T12:00:00+00:00", 2, 2),
            sample_match(3, "1H", "2024-03-10T16:00:00+00:00", 0, 0),
            sample_match(4, "NS", "2024-03-10T18:00:00+00:00", 0, 0),
            sample_match(5, "2H", "2024-03-10T14:00:00+00:00", 3, 1),
        ];
        let ids: Vec<u64> = filter_live(&matches).iter().map(Match::id).collect();
        assert_eq!(ids, vec![1, 3, 5]);
    }

    #[test]
    fn test_live_filter_on_second_half_and_full_time() {
        let matches = vec![
            sample_match(10, "2H", "2024-03-10T15:00:00+00:00", 1, 1),
            sample_match(11, "FT", "2024-03-10T12:00:00+00:00", 0, 2),
        ];
        let live = filter_live(&matches);
        assert_eq!(live.len(), 1);
        assert_eq!(live[0].id(), 10);
    }

    #[test]
    fn test_status_filter() {
        let matches = vec![
            sample_match(1, "AET", "2024-03-10T15:00:00+00:00", 1, 1),
            sample_match(2, "1H", "2024-03-10T12:00:00+00:00", 0, 2),
        ];
        assert_eq!(StatusFilter::parse("Finished").unwrap().apply(&matches)[0].id(), 1);
        assert_eq!(StatusFilter::parse("all").unwrap().apply(&matches).len(), 2);
        assert!(StatusFilter::parse("postponed").is_err());
    }

    #[test]
    fn test_find_by_fixture_id() {
        let matches = vec![sample_match(7, "NS", "2024-03-10T15:00:00+00:00", 0, 0)];
        assert!(find_by_fixture_id(&matches, 7).is_some());
        assert!(find_by_fixture_id(&matches, 8).is_none());
        assert_eq!(parse_fixture_id(" 42 "), Ok(42));
        assert!(parse_fixture_id("abc").is_err());
    }

    #[test]
    fn test_search_matches_teams_leagues_and_countries() {
        let matches = vec![
            sample_match(1, "NS", "2024-03-10T15:00:00+00:00", 0, 0),
            sample_match(2, "FT", "2024-03-10T12:00:00+00:00", 1, 0),
        ];

        let hits = search(&matches, "HOME 2").unwrap();
        let found: Vec<(SearchKind, u64)> = hits.iter().map(|r| (r.kind, r.id)).collect();
        assert_eq!(found, vec![(SearchKind::Team, 20), (SearchKind::Match, 2)]);
        assert_eq!(hits[1].name, "Home 2 vs Away 2");

        // The league is listed once even though both matches belong to it
        let leagues: Vec<SearchResult> = search(&matches, " england ")
            .unwrap()
            .into_iter()
            .filter(|r| r.kind == SearchKind::League)
            .collect();
        assert_eq!(leagues.len(), 1);
        assert_eq!(leagues[0].name, "Premier League");
        assert_eq!(leagues[0].subtitle, "England");

        // League name hits every team and match through the subtitle
        assert_eq!(search(&matches, "premier").unwrap().len(), 4 + 1 + 2);
        assert!(search(&matches, "bundesliga").unwrap().is_empty());
    }

    #[test]
    fn test_search_rejects_blank_query() {
        let matches = vec![sample_match(1, "NS", "2024-03-10T15:00:00+00:00", 0, 0)];
        assert_eq!(search(&matches, "   "), Err(InputError::EmptySearch));
        assert_eq!(search(&[], ""), Err(InputError::EmptySearch));
    }

    #[test]
    fn test_calendar_month_grid() {
        let matches = vec![sample_match(1, "NS", "2024-03-10T15:00:00+00:00", 0, 0)];
        let today = day("2024-03-05");
        let grid = calendar_month(2024, 3, &matches, &Utc, today).unwrap();

        assert_eq!(grid.len(), 42);
        // March 1st 2024 is a Friday, so the grid opens on Sunday Feb 25th
        assert_eq!(grid[0].date, day("2024-02-25"));
        assert!(!grid[0].is_current_month);
        assert!(grid.iter().filter(|d| d.is_today).all(|d| d.date == today));

        let tenth = grid.iter().find(|d| d.date == day("2024-03-10")).unwrap();
        assert_eq!(tenth.matches.len(), 1);

        assert!(matches!(
            calendar_month(2024, 13, &matches, &Utc, today),
            Err(InputError::InvalidMonth { .. })
        ));
    }
}
