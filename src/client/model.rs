use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use std::collections::BTreeMap;

pub const DEFAULT_SEASON: &str = "2024-2025";

fn normalize_code(code: &str) -> String {
    code.trim().to_uppercase()
}

fn validate_pair(first: &str, second: &str) -> Result<(), String> {
    if first.is_empty() || second.is_empty() {
        return Err("both team codes are required".to_string());
    }
    if first == second {
        return Err("teams must be different".to_string());
    }
    Ok(())
}

/// Payload for `POST /api/predict-teams`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct PredictionRequest {
    pub home_team: String,
    pub away_team: String,
    pub season: String,
}

impl PredictionRequest {
    pub fn new(home_team: &str, away_team: &str, season: Option<String>) -> Self {
        Self {
            home_team: normalize_code(home_team),
            away_team: normalize_code(away_team),
            season: season.unwrap_or_else(|| DEFAULT_SEASON.to_string()),
        }
    }

    pub fn validate(&self) -> Result<(), String> {
        validate_pair(&self.home_team, &self.away_team)
    }
}

/// Parameters for `GET /api/compare-teams`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ComparisonRequest {
    pub team1: String,
    pub team2: String,
    pub season: String,
}

impl ComparisonRequest {
    pub fn new(team1: &str, team2: &str, season: Option<String>) -> Self {
        Self {
            team1: normalize_code(team1),
            team2: normalize_code(team2),
            season: season.unwrap_or_else(|| DEFAULT_SEASON.to_string()),
        }
    }

    pub fn validate(&self) -> Result<(), String> {
        validate_pair(&self.team1, &self.team2)
    }
}

#[derive(Clone, Debug, Deserialize)]
pub struct PredictionResponse {
    pub prediction: PredictedOutcome,
    #[serde(default)]
    pub teams: Option<MatchupTeams>,
    #[serde(default)]
    pub matchup: Option<BTreeMap<String, f64>>,
    #[serde(default)]
    pub model_info: Option<ModelInfo>,
}

#[derive(Clone, Debug, Deserialize)]
pub struct PredictedOutcome {
    pub winner: String,
    pub probability: WinProbability,
    #[serde(default)]
    pub confidence: Option<f64>,
}

/// Per-side win probabilities as they arrived on the wire. The service's
/// revisions disagree on the range, so `as_fractions` is the one place
/// that settles it.
#[derive(Clone, Copy, Debug, Deserialize, PartialEq)]
pub struct WinProbability {
    pub home: f64,
    pub away: f64,
}

impl WinProbability {
    /// Both sides as 0-1 fractions. Payloads in the 0-100 range are
    /// scaled down; values are clamped to [0, 1].
    pub fn as_fractions(self) -> (f64, f64) {
        let scale = if self.home > 1.0 || self.away > 1.0 {
            100.0
        } else {
            1.0
        };
        (
            (self.home / scale).clamp(0.0, 1.0),
            (self.away / scale).clamp(0.0, 1.0),
        )
    }
}

#[derive(Clone, Debug, Deserialize)]
pub struct MatchupTeams {
    pub home: TeamSeason,
    pub away: TeamSeason,
}

#[derive(Clone, Debug, Deserialize)]
pub struct TeamSeason {
    pub name: String,
    #[serde(default)]
    pub stats: BTreeMap<String, f64>,
}

#[derive(Clone, Debug, Deserialize)]
pub struct ModelInfo {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub features_used: Option<JsonValue>,
}

/// Response of `GET /api/compare-teams`: team codes map to stat records
/// with no fixed schema, so the team entries are captured generically.
#[derive(Clone, Debug, Deserialize)]
pub struct ComparisonResponse {
    #[serde(rename = "headToHead", default)]
    pub head_to_head: Option<BTreeMap<String, f64>>,
    #[serde(flatten)]
    pub teams: BTreeMap<String, TeamStats>,
}

#[derive(Clone, Debug, Default, Deserialize)]
pub struct TeamStats {
    #[serde(flatten)]
    pub stats: BTreeMap<String, f64>,
}

impl ComparisonResponse {
    /// Union of stat names across all teams, sorted.
    pub fn stat_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self
            .teams
            .values()
            .flat_map(|team| team.stats.keys().cloned())
            .collect();
        names.sort();
        names.dedup();
        names
    }

    /// A single stat value, zero when the team or stat is absent.
    pub fn stat(&self, team: &str, name: &str) -> f64 {
        self.teams
            .get(team)
            .and_then(|stats| stats.stats.get(name))
            .copied()
            .unwrap_or(0.0)
    }
}

#[derive(Clone, Debug, Deserialize)]
pub struct TeamDirectory {
    pub teams: Vec<TeamEntry>,
}

#[derive(Clone, Debug, Deserialize)]
pub struct TeamEntry {
    pub abbreviation: String,
    pub name: String,
    #[serde(default)]
    pub conference: Option<String>,
}

/// Error body the service attaches to non-2xx responses.
#[derive(Clone, Debug, Deserialize)]
pub struct ErrorBody {
    pub error: String,
    #[serde(default)]
    pub details: Option<String>,
}

impl ErrorBody {
    pub fn message(self) -> String {
        match self.details {
            Some(details) => format!("{}: {}", self.error, details),
            None => self.error,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn request_codes_are_normalized() {
        let request = PredictionRequest::new(" lal ", "bos", None);
        assert_eq!(request.home_team, "LAL");
        assert_eq!(request.away_team, "BOS");
        assert_eq!(request.season, DEFAULT_SEASON);
        assert!(request.validate().is_ok());
    }

    #[test]
    fn equal_teams_fail_validation() {
        let request = PredictionRequest::new("LAL", "lal", None);
        assert_eq!(
            request.validate(),
            Err("teams must be different".to_string())
        );
    }

    #[test]
    fn missing_team_fails_validation() {
        let request = ComparisonRequest::new("", "BOS", None);
        assert_eq!(
            request.validate(),
            Err("both team codes are required".to_string())
        );
    }

    #[test]
    fn fractional_probabilities_pass_through() {
        let probability = WinProbability {
            home: 0.62,
            away: 0.38,
        };
        assert_eq!(probability.as_fractions(), (0.62, 0.38));
    }

    #[test]
    fn percentage_probabilities_scale_down() {
        let probability = WinProbability {
            home: 85.0,
            away: 15.0,
        };
        assert_eq!(probability.as_fractions(), (0.85, 0.15));
    }

    #[test]
    fn out_of_range_probabilities_clamp() {
        let probability = WinProbability {
            home: 120.0,
            away: -5.0,
        };
        assert_eq!(probability.as_fractions(), (1.0, 0.0));
    }

    #[test]
    fn comparison_separates_head_to_head_from_team_keys() {
        let response: ComparisonResponse = serde_json::from_value(json!({
            "LAL": {"wins": 50.0, "ppg": 114.2},
            "BOS": {"wins": 57.0},
            "headToHead": {"LAL": 2, "BOS": 1}
        }))
        .expect("comparison decodes");

        assert_eq!(response.teams.len(), 2);
        assert_eq!(response.stat_names(), vec!["ppg", "wins"]);
        assert_eq!(response.stat("LAL", "ppg"), 114.2);
        assert_eq!(response.stat("BOS", "ppg"), 0.0);
        assert_eq!(response.stat("MIA", "wins"), 0.0);

        let head_to_head = response.head_to_head.expect("head to head present");
        assert_eq!(head_to_head.get("LAL"), Some(&2.0));
    }

    #[test]
    fn prediction_response_decodes_canonical_schema() {
        let response: PredictionResponse = serde_json::from_value(json!({
            "prediction": {
                "winner": "LOS ANGELES LAKERS",
                "probability": {"home": 0.62, "away": 0.38},
                "confidence": 0.24
            },
            "teams": {
                "home": {"name": "LOS ANGELES LAKERS", "stats": {"wins": 50.0}},
                "away": {"name": "BOSTON CELTICS", "stats": {"wins": 57.0}}
            },
            "matchup": {"home_wins": 2.0, "away_wins": 1.0},
            "model_info": {"type": "RandomForestClassifier"}
        }))
        .expect("prediction decodes");

        assert_eq!(response.prediction.winner, "LOS ANGELES LAKERS");
        assert_eq!(response.prediction.probability.as_fractions(), (0.62, 0.38));
        let teams = response.teams.expect("teams present");
        assert_eq!(teams.home.stats.get("wins"), Some(&50.0));
    }

    #[test]
    fn prediction_response_tolerates_missing_optionals() {
        let response: PredictionResponse = serde_json::from_value(json!({
            "prediction": {
                "winner": "BOSTON CELTICS",
                "probability": {"home": 40.0, "away": 60.0}
            }
        }))
        .expect("sparse prediction decodes");

        assert!(response.teams.is_none());
        assert!(response.matchup.is_none());
        assert_eq!(response.prediction.probability.as_fractions(), (0.4, 0.6));
    }

    #[test]
    fn error_body_formats_details() {
        let body = ErrorBody {
            error: "Invalid team abbreviation".to_string(),
            details: None,
        };
        assert_eq!(body.message(), "Invalid team abbreviation");

        let body = ErrorBody {
            error: "Internal server error".to_string(),
            details: Some("model not loaded".to_string()),
        };
        assert_eq!(body.message(), "Internal server error: model not loaded");
    }
}
