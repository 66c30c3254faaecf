use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum EngineError {
    #[error("invalid odds: {0} (decimal odds must be positive)")]
    InvalidOdds(f64),

    #[error("no team statistics for team {team_id}")]
    MissingTeamStats { team_id: u32 },

    #[error("analysis store error: {0}")]
    Store(String),

    #[error("provider error: {0}")]
    Provider(String),
}

impl EngineError {
    /// Missing upstream data is reported per fixture; everything else points at a bug or a
    /// broken collaborator.
    pub fn is_missing_data(&self) -> bool {
        matches!(self, EngineError::MissingTeamStats { .. })
    }
}
