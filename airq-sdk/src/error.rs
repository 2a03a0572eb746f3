use thiserror::Error;

use crate::Metric;

/// Failure of one report run. Every variant aborts the whole report.
#[derive(Debug, Error)]
pub enum ReportError {
    #[error("unable to fetch readings: {0}")]
    Fetch(String),
    #[error("malformed response: {0}")]
    Decode(#[from] serde_json::Error),
    #[error("record {index}: field {field} has invalid value {value:?}")]
    Parse {
        index: usize,
        field: &'static str,
        value: String,
    },
    #[error("failed to render {metric} chart: {message}")]
    Render { metric: Metric, message: String },
    #[error("unable to create chart artifact: {0}")]
    Artifact(#[from] std::io::Error),
    #[error("unknown alert policy {requested:?} (available: {available})")]
    UnknownPolicy {
        requested: String,
        available: String,
    },
}

impl ReportError {
    pub fn render(metric: Metric, error: impl std::fmt::Display) -> Self {
        ReportError::Render {
            metric,
            message: error.to_string(),
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            ReportError::Fetch(_) => "fetch",
            ReportError::Decode(_) => "decode",
            ReportError::Parse { .. } => "parse",
            ReportError::Render { .. } => "render",
            ReportError::Artifact(_) => "artifact",
            ReportError::UnknownPolicy { .. } => "config",
        }
    }
}
