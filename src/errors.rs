use crate::router::Intent;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("embedding backend unavailable")]
    Unavailable,
    #[error("http error: {0}")]
    Http(String),
    #[error("malformed response: {0}")]
    Malformed(String),
    #[error("distance {0} outside [0, 2]")]
    OutOfRange(f64),
}

#[derive(Debug, Error)]
pub enum RouteError {
    #[error("input text is empty")]
    EmptyInput,
    #[error("embedding provider unavailable")]
    ProviderUnavailable,
    #[error("provider contract violation: distance {distance} outside [0, 2]")]
    ContractViolation { distance: f64 },
    #[error("request superseded by a newer one")]
    Superseded,
}

impl From<ProviderError> for RouteError {
    fn from(e: ProviderError) -> Self {
        match e {
            ProviderError::OutOfRange(distance) => RouteError::ContractViolation { distance },
            ProviderError::Unavailable | ProviderError::Http(_) | ProviderError::Malformed(_) => {
                RouteError::ProviderUnavailable
            }
        }
    }
}

#[derive(Debug, Error)]
pub enum HistoryError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("history file is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("history writer task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

/// Invalid intent anchor set; fatal at startup.
#[derive(Debug, Error)]
pub enum AnchorError {
    #[error("at least one intent anchor is required")]
    Empty,
    #[error("Unknown is a fallback and cannot have an anchor")]
    UnknownIntent,
    #[error("anchor for {0:?} is empty")]
    BlankDescription(Intent),
    #[error("duplicate anchor for {0:?}")]
    Duplicate(Intent),
    #[error("cannot read anchors file: {0}")]
    Io(#[from] std::io::Error),
    #[error("anchors file is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),
}
