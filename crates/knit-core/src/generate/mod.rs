//! Generation stage: one plain-text call per planned file.

pub mod prompt;

use tracing::{debug, info};

use crate::client::GenerationClient;
use crate::error::{PipelineError, Stage};
use crate::state::{Codebase, PipelineState, PipelineStatus};

pub use prompt::build_file_prompt;

/// Run the generation stage: `planned -> generated`.
///
/// Files are generated strictly in `file_list` order, one awaited call at
/// a time. The returned text is stored verbatim. If any call fails the
/// stage returns [`PipelineError::CodeGeneration`] naming that file and
/// the sources generated so far are dropped.
///
/// A state without a plan or file list is rejected with
/// [`PipelineError::StateSequence`] before any call is made.
pub async fn run_generation_stage(
    client: &dyn GenerationClient,
    state: PipelineState,
) -> Result<PipelineState, PipelineError> {
    let Some(plan) = state.plan() else {
        return Err(PipelineError::sequence(
            Stage::Generate,
            "plan has not been set",
        ));
    };
    let Some(files) = state.file_list() else {
        return Err(PipelineError::sequence(
            Stage::Generate,
            "file list has not been set",
        ));
    };
    if state.status() != PipelineStatus::Planned {
        return Err(PipelineError::sequence(
            Stage::Generate,
            format!("state is {}, expected planned", state.status()),
        ));
    }

    let total = files.len();
    let mut codebase = Codebase::new();

    for (index, path) in files.iter().enumerate() {
        info!(path = %path, file = index + 1, total, "generating code");
        let prompt = build_file_prompt(plan, files, path);
        debug!(path = %path, prompt_len = prompt.len(), "sending file prompt");

        let code = client
            .invoke(&prompt)
            .await
            .into_text()
            .map_err(|source| PipelineError::CodeGeneration {
                path: path.clone(),
                source,
            })?;

        info!(path = %path, bytes = code.len(), "code generated");
        codebase.insert(path.clone(), code);
    }

    info!(
        file_count = codebase.len(),
        bytes = codebase.total_bytes(),
        "codebase generated"
    );
    state.with_codebase(codebase)
}
