use crate::report::{PartialFailure, RunState};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Run-level failures. Everything else is recorded in the report.
#[derive(Debug, Clone, Error)]
pub enum OrchestrationError {
    #[error("no usable data for target {url}: every performance audit and the content score failed")]
    FatalDataUnavailable {
        url: String,
        failures: Vec<PartialFailure>,
    },

    #[error("analysis cancelled during {stage}")]
    Cancelled { stage: RunState },
}

/// Non-fatal findings of the competitor selector.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SelectorWarning {
    #[error("requested {requested} competitors but only {found} qualified")]
    InsufficientCompetitors { requested: usize, found: usize },
}

pub type Result<T> = std::result::Result<T, OrchestrationError>;
