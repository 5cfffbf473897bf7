use std::path::PathBuf;

use thiserror::Error;

use crate::error::{PortalError, ReportsError, StorageError};
use crate::status::Step;

#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("{step} failed: {source}")]
    Step {
        step: Step,
        #[source]
        source: ReportsError,
    },

    #[error("No report dated {date} appeared after {attempts} checks")]
    NotFound { date: String, attempts: u32 },

    #[error("Cancelled during {step}")]
    Cancelled { step: Step },
}

impl PipelineError {
    pub fn portal(step: Step, error: PortalError) -> Self {
        Self::Step {
            step,
            source: error.into(),
        }
    }

    pub fn storage(step: Step, error: StorageError) -> Self {
        Self::Step {
            step,
            source: error.into(),
        }
    }

    pub fn step(&self) -> Step {
        match self {
            Self::Step { step, .. } | Self::Cancelled { step } => *step,
            Self::NotFound { .. } => Step::AwaitReport,
        }
    }

    /// Company selection sometimes fails on a stale ERP session; a fresh
    /// browser usually gets past it.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::Step {
                step: Step::SelectCompany,
                ..
            }
        )
    }
}

/// Non-fatal problems collected while processing one target.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PipelineWarning {
    CleanupFailed { error: String },
    RefreshFailed { attempt: u32, error: String },
    TempRemovalFailed { path: PathBuf, error: String },
}
