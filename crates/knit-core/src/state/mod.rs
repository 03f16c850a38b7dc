//! Pipeline state and its status machine.
//!
//! A [`PipelineState`] is created once per run and handed from stage to
//! stage by value. Each stage consumes the state it was given and returns a
//! new one extended with its own fields, so a field can only be written by
//! the transition that owns it:
//!
//! ```text
//! created   -> planned    (with_plan)
//! planned   -> generated  (with_codebase)
//! generated -> persisted  (mark_persisted)
//! *         -> failed     (into_failed, from any non-terminal status)
//! ```

pub mod codebase;
pub mod path;

use std::fmt;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{PipelineError, Stage};
use crate::plan::PlanGenerationError;

pub use codebase::{Codebase, SourceFile};
pub use path::{PathRejection, is_nested_under, normalize_relative_path};

// ---------------------------------------------------------------------------
// Status
// ---------------------------------------------------------------------------

/// Where a run currently sits in the pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PipelineStatus {
    Created,
    Planned,
    Generated,
    Persisted,
    Failed,
}

impl PipelineStatus {
    /// Check whether `from -> to` is an edge of the status graph.
    pub fn is_valid_transition(from: Self, to: Self) -> bool {
        matches!(
            (from, to),
            (Self::Created, Self::Planned)
                | (Self::Planned, Self::Generated)
                | (Self::Generated, Self::Persisted)
                | (Self::Created, Self::Failed)
                | (Self::Planned, Self::Failed)
                | (Self::Generated, Self::Failed)
        )
    }

    /// `Persisted` and `Failed` have no outgoing edges.
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Persisted | Self::Failed)
    }
}

impl fmt::Display for PipelineStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Created => "created",
            Self::Planned => "planned",
            Self::Generated => "generated",
            Self::Persisted => "persisted",
            Self::Failed => "failed",
        };
        f.write_str(s)
    }
}

// ---------------------------------------------------------------------------
// Request
// ---------------------------------------------------------------------------

/// Caller input for one pipeline run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PipelineRequest {
    /// Natural-language description of the project to build.
    pub user_prompt: String,
    /// Root directory the generated files are written under.
    pub output_directory: PathBuf,
}

impl PipelineRequest {
    pub fn new(user_prompt: impl Into<String>, output_directory: impl Into<PathBuf>) -> Self {
        Self {
            user_prompt: user_prompt.into(),
            output_directory: output_directory.into(),
        }
    }
}

// ---------------------------------------------------------------------------
// State
// ---------------------------------------------------------------------------

/// The record threaded through every stage of a run.
///
/// Fields are private; the only way to set `plan`, `file_list` or
/// `codebase` is through the consuming transitions below, each of which
/// refuses to run twice.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PipelineState {
    user_prompt: String,
    output_directory: PathBuf,
    plan: Option<String>,
    file_list: Option<Vec<String>>,
    codebase: Option<Codebase>,
    status: PipelineStatus,
}

impl From<PipelineRequest> for PipelineState {
    fn from(request: PipelineRequest) -> Self {
        Self::new(request.user_prompt, request.output_directory)
    }
}

impl PipelineState {
    /// Create a fresh state in the `created` status.
    pub fn new(user_prompt: impl Into<String>, output_directory: impl Into<PathBuf>) -> Self {
        Self {
            user_prompt: user_prompt.into(),
            output_directory: output_directory.into(),
            plan: None,
            file_list: None,
            codebase: None,
            status: PipelineStatus::Created,
        }
    }

    pub fn user_prompt(&self) -> &str {
        &self.user_prompt
    }

    pub fn output_directory(&self) -> &Path {
        &self.output_directory
    }

    /// Architectural summary, set by the plan stage.
    pub fn plan(&self) -> Option<&str> {
        self.plan.as_deref()
    }

    /// Planned relative file paths in generation order.
    pub fn file_list(&self) -> Option<&[String]> {
        self.file_list.as_deref()
    }

    /// Generated sources, set by the generation stage.
    pub fn codebase(&self) -> Option<&Codebase> {
        self.codebase.as_ref()
    }

    pub fn status(&self) -> PipelineStatus {
        self.status
    }

    /// Record the plan and file list: `created -> planned`.
    ///
    /// Paths are normalized (`./a//b.py` becomes `a/b.py`). The plan is
    /// rejected if the summary is blank, the list is empty, or any entry
    /// is absolute, escapes the root, or repeats an earlier entry. A path
    /// that another entry needs as a directory (`app` next to
    /// `app/main.py`) is refused too.
    pub fn with_plan(
        self,
        plan: impl Into<String>,
        files: Vec<String>,
    ) -> Result<Self, PipelineError> {
        if self.plan.is_some() || self.file_list.is_some() {
            return Err(PipelineError::sequence(Stage::Plan, "plan has already been set"));
        }
        self.expect_status(Stage::Plan, PipelineStatus::Created)?;

        let plan = plan.into();
        if plan.trim().is_empty() {
            return Err(PlanGenerationError::EmptyPlan.into());
        }
        if files.is_empty() {
            return Err(PlanGenerationError::NoFiles.into());
        }

        let mut file_list: Vec<String> = Vec::with_capacity(files.len());
        for raw in files {
            let normalized = normalize_relative_path(&raw).map_err(|reason| {
                PlanGenerationError::InvalidPath {
                    path: raw.clone(),
                    reason,
                }
            })?;
            if file_list.contains(&normalized) {
                return Err(PlanGenerationError::DuplicatePath(normalized).into());
            }
            let clash = file_list.iter().find(|earlier| {
                is_nested_under(&normalized, earlier) || is_nested_under(earlier, &normalized)
            });
            if let Some(earlier) = clash {
                return Err(PlanGenerationError::PathConflict {
                    path: normalized,
                    conflicts_with: earlier.clone(),
                }
                .into());
            }
            file_list.push(normalized);
        }

        let mut next = self.advance(Stage::Plan, PipelineStatus::Planned)?;
        next.plan = Some(plan);
        next.file_list = Some(file_list);
        Ok(next)
    }

    /// Record the generated sources: `planned -> generated`.
    ///
    /// The codebase must hold exactly one entry per planned file.
    pub fn with_codebase(self, codebase: Codebase) -> Result<Self, PipelineError> {
        if self.codebase.is_some() {
            return Err(PipelineError::sequence(
                Stage::Generate,
                "codebase has already been set",
            ));
        }
        self.expect_status(Stage::Generate, PipelineStatus::Planned)?;

        let files = self.file_list.as_deref().unwrap_or_default();
        let covers_plan = codebase.len() == files.len()
            && files.iter().all(|path| codebase.get(path).is_some());
        if !covers_plan {
            return Err(PipelineError::sequence(
                Stage::Generate,
                format!(
                    "codebase holds {} file(s) but the plan lists {}",
                    codebase.len(),
                    files.len()
                ),
            ));
        }

        let mut next = self.advance(Stage::Generate, PipelineStatus::Generated)?;
        next.codebase = Some(codebase);
        Ok(next)
    }

    /// Mark every file as written: `generated -> persisted`.
    pub fn mark_persisted(self) -> Result<Self, PipelineError> {
        self.expect_status(Stage::Persist, PipelineStatus::Generated)?;
        self.advance(Stage::Persist, PipelineStatus::Persisted)
    }

    /// Move the run into the terminal `failed` status.
    ///
    /// A state that is already terminal is returned unchanged.
    pub fn into_failed(mut self) -> Self {
        if !self.status.is_terminal() {
            self.status = PipelineStatus::Failed;
        }
        self
    }

    fn expect_status(&self, stage: Stage, expected: PipelineStatus) -> Result<(), PipelineError> {
        if self.status != expected {
            return Err(PipelineError::sequence(
                stage,
                format!("state is {}, expected {}", self.status, expected),
            ));
        }
        Ok(())
    }

    fn advance(mut self, stage: Stage, to: PipelineStatus) -> Result<Self, PipelineError> {
        if !PipelineStatus::is_valid_transition(self.status, to) {
            return Err(PipelineError::sequence(
                stage,
                format!("invalid transition {} -> {}", self.status, to),
            ));
        }
        self.status = to;
        Ok(self)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn planned() -> PipelineState {
        PipelineState::new("a todo api", "out")
            .with_plan(
                "A small REST API.",
                vec!["app/main.py".to_string(), "app/models.py".to_string()],
            )
            .unwrap()
    }

    fn codebase_for(paths: &[&str]) -> Codebase {
        let mut codebase = Codebase::new();
        for path in paths {
            codebase.insert(*path, format!("# {path}"));
        }
        codebase
    }

    // -- transition graph --

    #[test]
    fn valid_transitions() {
        use PipelineStatus::*;
        assert!(PipelineStatus::is_valid_transition(Created, Planned));
        assert!(PipelineStatus::is_valid_transition(Planned, Generated));
        assert!(PipelineStatus::is_valid_transition(Generated, Persisted));
        for from in [Created, Planned, Generated] {
            assert!(PipelineStatus::is_valid_transition(from, Failed));
        }
    }

    #[test]
    fn invalid_transitions() {
        use PipelineStatus::*;
        assert!(!PipelineStatus::is_valid_transition(Created, Generated));
        assert!(!PipelineStatus::is_valid_transition(Planned, Persisted));
        assert!(!PipelineStatus::is_valid_transition(Generated, Planned));
        assert!(!PipelineStatus::is_valid_transition(Persisted, Failed));
        assert!(!PipelineStatus::is_valid_transition(Failed, Created));
        assert!(!PipelineStatus::is_valid_transition(Planned, Planned));
    }

    #[test]
    fn terminal_statuses() {
        assert!(PipelineStatus::Persisted.is_terminal());
        assert!(PipelineStatus::Failed.is_terminal());
        assert!(!PipelineStatus::Generated.is_terminal());
    }

    #[test]
    fn status_serializes_snake_case() {
        let json = serde_json::to_string(&PipelineStatus::Persisted).unwrap();
        assert_eq!(json, "\"persisted\"");
    }

    // -- with_plan --

    #[test]
    fn new_state_is_created_and_empty() {
        let state = PipelineState::from(PipelineRequest::new("hello", "out"));
        assert_eq!(state.status(), PipelineStatus::Created);
        assert_eq!(state.user_prompt(), "hello");
        assert_eq!(state.output_directory(), Path::new("out"));
        assert!(state.plan().is_none());
        assert!(state.file_list().is_none());
        assert!(state.codebase().is_none());
    }

    #[test]
    fn with_plan_sets_fields_and_advances() {
        let state = planned();
        assert_eq!(state.status(), PipelineStatus::Planned);
        assert_eq!(state.plan(), Some("A small REST API."));
        assert_eq!(
            state.file_list().unwrap(),
            &["app/main.py".to_string(), "app/models.py".to_string()]
        );
    }

    #[test]
    fn with_plan_normalizes_paths() {
        let state = PipelineState::new("p", "out")
            .with_plan("plan", vec!["./app//main.py".to_string()])
            .unwrap();
        assert_eq!(state.file_list().unwrap(), &["app/main.py".to_string()]);
    }

    #[test]
    fn with_plan_twice_is_a_sequence_error() {
        let err = planned()
            .with_plan("again", vec!["x.py".to_string()])
            .unwrap_err();
        assert!(matches!(
            err,
            PipelineError::StateSequence {
                stage: Stage::Plan,
                ..
            }
        ));
    }

    #[test]
    fn with_plan_rejects_blank_plan() {
        let err = PipelineState::new("p", "out")
            .with_plan("   ", vec!["x.py".to_string()])
            .unwrap_err();
        assert!(matches!(
            err,
            PipelineError::PlanGeneration(PlanGenerationError::EmptyPlan)
        ));
    }

    #[test]
    fn with_plan_rejects_empty_file_list() {
        let err = PipelineState::new("p", "out")
            .with_plan("plan", vec![])
            .unwrap_err();
        assert!(matches!(
            err,
            PipelineError::PlanGeneration(PlanGenerationError::NoFiles)
        ));
    }

    #[test]
    fn with_plan_rejects_traversal() {
        let err = PipelineState::new("p", "out")
            .with_plan("plan", vec!["../etc/passwd".to_string()])
            .unwrap_err();
        match err {
            PipelineError::PlanGeneration(PlanGenerationError::InvalidPath { path, reason }) => {
                assert_eq!(path, "../etc/passwd");
                assert_eq!(reason, PathRejection::Traversal);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn with_plan_rejects_duplicates_after_normalizing() {
        let err = PipelineState::new("p", "out")
            .with_plan(
                "plan",
                vec!["app/main.py".to_string(), "./app/main.py".to_string()],
            )
            .unwrap_err();
        assert!(matches!(
            err,
            PipelineError::PlanGeneration(PlanGenerationError::DuplicatePath(ref p)) if p == "app/main.py"
        ));
    }

    #[test]
    fn with_plan_rejects_file_used_as_directory() {
        for files in [["app", "app/main.py"], ["app/main.py", "app"]] {
            let err = PipelineState::new("p", "out")
                .with_plan("plan", files.iter().map(|f| f.to_string()).collect())
                .unwrap_err();
            match err {
                PipelineError::PlanGeneration(PlanGenerationError::PathConflict {
                    path,
                    conflicts_with,
                }) => {
                    assert_eq!(path, files[1]);
                    assert_eq!(conflicts_with, files[0]);
                }
                other => panic!("unexpected error: {other}"),
            }
        }
    }

    #[test]
    fn with_plan_allows_shared_name_prefixes() {
        let state = PipelineState::new("p", "out")
            .with_plan(
                "plan",
                vec!["app.py".to_string(), "app/main.py".to_string(), "application.py".to_string()],
            )
            .unwrap();
        assert_eq!(state.file_list().unwrap().len(), 3);
    }

    // -- with_codebase --

    #[test]
    fn with_codebase_requires_plan() {
        let err = PipelineState::new("p", "out")
            .with_codebase(codebase_for(&["a.py"]))
            .unwrap_err();
        assert!(matches!(
            err,
            PipelineError::StateSequence {
                stage: Stage::Generate,
                ..
            }
        ));
    }

    #[test]
    fn with_codebase_must_cover_file_list() {
        let err = planned()
            .with_codebase(codebase_for(&["app/main.py"]))
            .unwrap_err();
        assert!(err.to_string().contains("holds 1 file(s) but the plan lists 2"));

        let err = planned()
            .with_codebase(codebase_for(&["app/main.py", "app/other.py"]))
            .unwrap_err();
        assert!(matches!(err, PipelineError::StateSequence { .. }));
    }

    #[test]
    fn with_codebase_advances_to_generated() {
        let state = planned()
            .with_codebase(codebase_for(&["app/main.py", "app/models.py"]))
            .unwrap();
        assert_eq!(state.status(), PipelineStatus::Generated);
        assert_eq!(state.codebase().unwrap().len(), 2);
        // Earlier fields are carried through untouched.
        assert_eq!(state.plan(), Some("A small REST API."));
    }

    // -- mark_persisted / into_failed --

    #[test]
    fn mark_persisted_requires_generated() {
        let err = planned().mark_persisted().unwrap_err();
        assert!(matches!(
            err,
            PipelineError::StateSequence {
                stage: Stage::Persist,
                ..
            }
        ));
    }

    #[test]
    fn into_failed_from_non_terminal() {
        let failed = planned().into_failed();
        assert_eq!(failed.status(), PipelineStatus::Failed);
        assert_eq!(failed.plan(), Some("A small REST API."));
    }

    #[test]
    fn into_failed_leaves_terminal_state_alone() {
        let persisted = planned()
            .with_codebase(codebase_for(&["app/main.py", "app/models.py"]))
            .unwrap()
            .mark_persisted()
            .unwrap();
        assert_eq!(persisted.into_failed().status(), PipelineStatus::Persisted);
    }
}
