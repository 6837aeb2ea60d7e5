use thiserror::Error;

#[derive(Error, Debug)]
pub enum GdcError {
    #[error("invalid coordinate: {axis} = {value} ({reason})")]
    InvalidCoordinate {
        axis: &'static str,
        value: f64,
        reason: &'static str,
    },

    #[error("insufficient candidates: requested {requested}, got {available}")]
    InsufficientCandidates { requested: usize, available: usize },

    #[error("invalid score for guest '{guest_id}' on thematic '{thematic_id}': {score}")]
    InvalidScore {
        guest_id: String,
        thematic_id: String,
        score: f64,
    },

    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

pub type GdcResult<T> = Result<T, GdcError>;
