use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TeamRef {
    pub id: u32,
    pub name: String,
}

/// A scheduled fixture as handed to the engine by the fixture store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Fixture {
    pub id: u64,
    pub league_id: u32,
    #[serde(default)]
    pub season: Option<i32>,
    #[serde(default)]
    pub week: Option<u32>,
    #[serde(default)]
    pub kickoff: Option<String>,
    pub home: TeamRef,
    pub away: TeamRef,
}

impl Fixture {
    pub fn label(&self) -> String {
        format!("{} vs {}", self.home.name, self.away.name)
    }
}

/// A played (or abandoned) match, used for form and league baselines.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchResult {
    pub id: u64,
    #[serde(default)]
    pub utc_time: String,
    #[serde(default)]
    pub league_id: u32,
    pub home_id: u32,
    pub away_id: u32,
    pub home_goals: u8,
    pub away_goals: u8,
    #[serde(default = "default_true")]
    pub finished: bool,
    #[serde(default)]
    pub cancelled: bool,
}

fn default_true() -> bool {
    true
}

impl MatchResult {
    pub fn is_countable(&self) -> bool {
        self.finished && !self.cancelled
    }

    /// Goals (scored, conceded) from `team_id`'s point of view, or `None` when the team did
    /// not play in this match.
    pub fn goals_for(&self, team_id: u32) -> Option<(u8, u8)> {
        if self.home_id == team_id {
            Some((self.home_goals, self.away_goals))
        } else if self.away_id == team_id {
            Some((self.away_goals, self.home_goals))
        } else {
            None
        }
    }
}

/// Parses one fixture item in the provider's `{fixture, league, teams}` layout.
pub fn parse_fixture(v: &Value) -> Option<Fixture> {
    let info = v.get("fixture")?;
    let id = info.get("id")?.as_u64()?;
    let kickoff = info
        .get("date")
        .and_then(|x| x.as_str())
        .map(|s| s.to_string());

    let league = v.get("league");
    let league_id = league
        .and_then(|l| l.get("id"))
        .and_then(|x| x.as_u64())
        .unwrap_or(0) as u32;
    let season = league
        .and_then(|l| l.get("season"))
        .and_then(|x| x.as_i64())
        .map(|s| s as i32);
    let week = league
        .and_then(|l| l.get("round"))
        .and_then(|x| x.as_str())
        .and_then(parse_round_number);

    let teams = v.get("teams")?;
    let home = parse_team(teams.get("home")?)?;
    let away = parse_team(teams.get("away")?)?;

    Some(Fixture {
        id,
        league_id,
        season,
        week,
        kickoff,
        home,
        away,
    })
}

/// Parses a finished match in the same layout. Items without a final score are skipped.
pub fn parse_match_result(v: &Value) -> Option<MatchResult> {
    let fixture = parse_fixture(v)?;
    let goals = v.get("goals")?;
    let home_goals = goals.get("home")?.as_u64()?;
    let away_goals = goals.get("away")?.as_u64()?;

    let status = v
        .get("fixture")
        .and_then(|f| f.get("status"))
        .and_then(|s| s.get("short"))
        .and_then(|s| s.as_str())
        .unwrap_or("FT")
        .to_ascii_uppercase();
    let finished = matches!(status.as_str(), "FT" | "AET" | "PEN");
    let cancelled = matches!(status.as_str(), "CANC" | "ABD" | "AWD" | "WO");

    Some(MatchResult {
        id: fixture.id,
        utc_time: fixture.kickoff.unwrap_or_default(),
        league_id: fixture.league_id,
        home_id: fixture.home.id,
        away_id: fixture.away.id,
        home_goals: u8::try_from(home_goals).ok()?,
        away_goals: u8::try_from(away_goals).ok()?,
        finished,
        cancelled,
    })
}

fn parse_team(v: &Value) -> Option<TeamRef> {
    let id = v.get("id")?.as_u64()? as u32;
    let name = v
        .get("name")
        .and_then(|x| x.as_str())
        .unwrap_or_default()
        .to_string();
    Some(TeamRef { id, name })
}

// "Regular Season - 14" -> 14
fn parse_round_number(raw: &str) -> Option<u32> {
    raw.rsplit(|c: char| !c.is_ascii_digit())
        .find(|part| !part.is_empty())
        .and_then(|part| part.parse::<u32>().ok())
}

#[cfg(test)]
mod tests {
    use super::*;

    const ITEM: &str = r#"{
        "fixture": {"id": 1035, "date": "2025-03-01T15:00:00+00:00", "status": {"short": "FT"}},
        "league": {"id": 39, "season": 2024, "round": "Regular Season - 27"},
        "teams": {"home": {"id": 40, "name": "Liverpool"}, "away": {"id": 50, "name": "Manchester City"}},
        "goals": {"home": 2, "away": 1}
    }"#;

    #[test]
    fn parses_fixture_layout() {
        let v: Value = serde_json::from_str(ITEM).unwrap();
        let f = parse_fixture(&v).unwrap();
        assert_eq!(f.id, 1035);
        assert_eq!(f.league_id, 39);
        assert_eq!(f.week, Some(27));
        assert_eq!(f.home.name, "Liverpool");
        assert_eq!(f.label(), "Liverpool vs Manchester City");
    }

    #[test]
    fn parses_finished_result() {
        let v: Value = serde_json::from_str(ITEM).unwrap();
        let m = parse_match_result(&v).unwrap();
        assert!(m.is_countable());
        assert_eq!(m.goals_for(40), Some((2, 1)));
        assert_eq!(m.goals_for(50), Some((1, 2)));
        assert_eq!(m.goals_for(7), None);
    }

    #[test]
    fn unplayed_fixture_has_no_result() {
        let raw = r#"{"fixture": {"id": 9}, "teams": {"home": {"id": 1}, "away": {"id": 2}},
                      "goals": {"home": null, "away": null}}"#;
        let v: Value = serde_json::from_str(raw).unwrap();
        assert!(parse_fixture(&v).is_some());
        assert!(parse_match_result(&v).is_none());
    }
}
