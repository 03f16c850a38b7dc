//! Error taxonomy for a pipeline run.
//!
//! Every variant is fatal to the run. The orchestrator never retries; it
//! wraps whichever error surfaced into a [`crate::PipelineFailure`].

use std::fmt;
use std::path::PathBuf;

use thiserror::Error;

use crate::client::ErrorKind;
use crate::plan::PlanGenerationError;

/// The stage an error originated from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Plan,
    Generate,
    Persist,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Plan => "plan",
            Self::Generate => "generate",
            Self::Persist => "persist",
        };
        f.write_str(s)
    }
}

/// Errors raised by the pipeline stages.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// The plan stage could not obtain a schema-conformant, valid plan.
    #[error("plan generation failed")]
    PlanGeneration(#[from] PlanGenerationError),

    /// A stage ran without its upstream state, or tried to overwrite a
    /// field a previous stage already set.
    #[error("{stage} stage ran out of sequence: {reason}")]
    StateSequence { stage: Stage, reason: String },

    /// The generation call for one file failed.
    #[error("code generation failed for {path:?}")]
    CodeGeneration {
        path: String,
        #[source]
        source: ErrorKind,
    },

    /// Creating a directory or writing a file failed.
    #[error("failed to write {}", path.display())]
    Persistence {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl PipelineError {
    pub(crate) fn sequence(stage: Stage, reason: impl Into<String>) -> Self {
        Self::StateSequence {
            stage,
            reason: reason.into(),
        }
    }

    /// The stage this error belongs to.
    pub fn stage(&self) -> Stage {
        match self {
            Self::PlanGeneration(_) => Stage::Plan,
            Self::StateSequence { stage, .. } => *stage,
            Self::CodeGeneration { .. } => Stage::Generate,
            Self::Persistence { .. } => Stage::Persist,
        }
    }

    /// The file path the error concerns, when there is one.
    pub fn path(&self) -> Option<String> {
        match self {
            Self::CodeGeneration { path, .. } => Some(path.clone()),
            Self::Persistence { path, .. } => Some(path.display().to_string()),
            Self::PlanGeneration(PlanGenerationError::InvalidPath { path, .. })
            | Self::PlanGeneration(PlanGenerationError::DuplicatePath(path))
            | Self::PlanGeneration(PlanGenerationError::PathConflict { path, .. }) => {
                Some(path.clone())
            }
            _ => None,
        }
    }
}
