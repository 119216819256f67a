//! Static substitute data returned when the provider is unreachable.

use chrono::{DateTime, FixedOffset, Utc};

use super::models::{
    Fixture, FixtureStatus, Goals, League, Match, MatchSnapshot, Periods, ScoreBreakdown,
    StatusCode, Team, Teams, Venue,
};

const PREMIER_LEAGUE_LOGO: &str = "https://media.api-sports.io/football/leagues/39.png";
const ENGLAND_FLAG: &str = "https://media.api-sports.io/flags/gb.svg";

/// Build the two-match fallback snapshot, kicked off at `kickoff`.
///
/// The gateway calls this once at construction so every failure within a run
/// yields the same snapshot.
pub fn fallback_snapshot(kickoff: DateTime<Utc>) -> MatchSnapshot {
    MatchSnapshot::new(fallback_matches(kickoff))
}

pub fn fallback_matches(kickoff: DateTime<Utc>) -> Vec<Match> {
    let date: DateTime<FixedOffset> = kickoff.fixed_offset();
    vec![
        Match {
            fixture: Fixture {
                id: 1,
                referee: None,
                timezone: "UTC".to_string(),
                date,
                timestamp: kickoff.timestamp(),
                periods: Periods {
                    first: Some(1693834800),
                    second: Some(1693838400),
                },
                venue: Venue {
                    id: Some(1),
                    name: Some("Old Trafford".to_string()),
                    city: Some("Manchester".to_string()),
                },
                status: FixtureStatus {
                    long: "Match Finished".to_string(),
                    short: StatusCode::FullTime,
                    elapsed: Some(90),
                },
            },
            league: premier_league(),
            teams: Teams {
                home: team(33, "Manchester United"),
                away: team(40, "Liverpool"),
            },
            goals: goals(2, 1),
            score: ScoreBreakdown {
                halftime: goals(1, 0),
                fulltime: goals(2, 1),
                extratime: None,
                penalty: None,
            },
            events: None,
            statistics: None,
        },
        Match {
            fixture: Fixture {
                id: 2,
                referee: None,
                timezone: "UTC".to_string(),
                date,
                timestamp: kickoff.timestamp(),
                periods: Periods {
                    first: Some(1693834800),
                    second: None,
                },
                venue: Venue {
                    id: Some(2),
                    name: Some("Etihad Stadium".to_string()),
                    city: Some("Manchester".to_string()),
                },
                status: FixtureStatus {
                    long: "Second Half".to_string(),
                    short: StatusCode::SecondHalf,
                    elapsed: Some(67),
                },
            },
            league: premier_league(),
            teams: Teams {
                home: team(50, "Manchester City"),
                away: team(49, "Chelsea"),
            },
            goals: goals(1, 1),
            score: ScoreBreakdown {
                halftime: goals(0, 1),
                fulltime: Goals::default(),
                extratime: None,
                penalty: None,
            },
            events: None,
            statistics: None,
        },
    ]
}

fn premier_league() -> League {
    League {
        id: 39,
        name: "Premier League".to_string(),
        country: "England".to_string(),
        logo: PREMIER_LEAGUE_LOGO.to_string(),
        flag: Some(ENGLAND_FLAG.to_string()),
        season: 2024,
    }
}

fn team(id: u64, name: &str) -> Team {
    Team {
        id,
        name: name.to_string(),
        logo: format!("https://media.api-sports.io/football/teams/{}.png", id),
        code: None,
    }
}

fn goals(home: u32, away: u32) -> Goals {
    Goals {
        home: Some(home),
        away: Some(away),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fallback_has_two_fixed_fixtures() {
        let snap = fallback_snapshot(Utc::now());
        let ids: Vec<u64> = snap.iter().map(Match::id).collect();
        assert_eq!(ids, vec![1, 2]);
        assert_eq!(snap[0].status(), &StatusCode::FullTime);
        assert_eq!(snap[1].status(), &StatusCode::SecondHalf);
        assert_eq!(snap[1].title(), "Manchester City vs Chelsea");
    }

    #[test]
    fn test_fallback_is_deterministic_for_a_given_kickoff() {
        let kickoff = Utc::now();
        assert_eq!(fallback_matches(kickoff), fallback_matches(kickoff));
    }
}
