//! Structured reply requested from the generation service.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Always use this structure to describe the project architecture.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct ArchitectPlan {
    /// The architecture of the project in 2-3 short, plain sentences.
    pub plan: String,
    /// Files to create, as relative paths in a conventional source layout,
    /// e.g. ["app/main.py", "models/jobs.py"].
    pub files: Vec<String>,
}
