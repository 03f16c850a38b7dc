//! Plan stage: turn the user prompt into an architectural summary and an
//! ordered list of files to generate.

pub mod prompt;
pub mod schema;
pub mod stage;

use thiserror::Error;

use crate::client::ErrorKind;
use crate::state::PathRejection;

pub use prompt::build_architect_prompt;
pub use schema::ArchitectPlan;
pub use stage::run_plan_stage;

/// Reasons the plan stage could not produce a usable plan.
#[derive(Debug, Error)]
pub enum PlanGenerationError {
    #[error("user prompt is empty")]
    EmptyPrompt,

    #[error("generation service did not return a plan")]
    Service(#[source] ErrorKind),

    #[error("plan summary is empty")]
    EmptyPlan,

    #[error("plan lists no files")]
    NoFiles,

    #[error("invalid file path {path:?}: {reason}")]
    InvalidPath { path: String, reason: PathRejection },

    #[error("duplicate file path {0:?}")]
    DuplicatePath(String),

    #[error("file path {path:?} overlaps {conflicts_with:?}: one would have to be a directory")]
    PathConflict {
        path: String,
        conflicts_with: String,
    },
}
