use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use crate::vitals::VitalField;

/// A single reason an assessment submission was refused.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Error)]
#[serde(tag = "kind", content = "field", rename_all = "snake_case")]
pub enum ValidationError {
    #[error("invalid value for field `{0}`")]
    InvalidField(VitalField),

    #[error("a condition must be selected, or named when `Other` is chosen")]
    MissingCondition,
}

/// Failure reported by a scoring collaborator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Error)]
#[serde(tag = "kind", content = "message", rename_all = "snake_case")]
pub enum ScoringError {
    /// Worth retrying as-is (timeouts, unavailable backends).
    #[error("transient scoring failure: {0}")]
    Transient(String),

    #[error("permanent scoring failure: {0}")]
    Permanent(String),
}

#[derive(Error, Debug)]
pub enum AssessmentError {
    #[error("validation failed: {}", summarize(.0))]
    Validation(Vec<ValidationError>),

    #[error("an analysis is already running")]
    AnalysisInProgress,

    #[error("scoring failed: {0}")]
    ScoringFailure(#[from] ScoringError),

    #[error("analysis was cancelled")]
    AnalysisCancelled,

    #[error("no tokio runtime is available to run the analysis")]
    NoRuntime,

    #[error("unknown option `{value}` for field `{field}`")]
    UnknownOption { field: &'static str, value: String },

    #[error("session not found: {0}")]
    SessionNotFound(Uuid),

    #[error("configuration error: {0}")]
    Config(String),
}

fn summarize(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

pub type Result<T> = std::result::Result<T, AssessmentError>;
