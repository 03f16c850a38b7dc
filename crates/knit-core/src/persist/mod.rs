//! Persistence stage: write the generated codebase under the output
//! directory.
//!
//! Each file is written in codebase order, creating missing parent
//! directories first and overwriting anything already at the target path.
//! Writes are not atomic across files: when one fails, the files written
//! before it stay on disk.

use std::path::{Path, PathBuf};

use tracing::info;

use crate::error::{PipelineError, Stage};
use crate::state::{Codebase, PipelineState, PipelineStatus};

/// Result of a successful persistence stage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PersistReport {
    /// The state, now `persisted`.
    pub state: PipelineState,
    /// Every file written, in write order.
    pub written: Vec<PathBuf>,
}

/// Run the persistence stage: `generated -> persisted`.
pub async fn run_persistence_stage(state: PipelineState) -> Result<PersistReport, PipelineError> {
    let Some(codebase) = state.codebase() else {
        return Err(PipelineError::sequence(
            Stage::Persist,
            "codebase has not been generated",
        ));
    };
    if state.output_directory().as_os_str().is_empty() {
        return Err(PipelineError::sequence(
            Stage::Persist,
            "output directory is not set",
        ));
    }
    if state.status() != PipelineStatus::Generated {
        return Err(PipelineError::sequence(
            Stage::Persist,
            format!("state is {}, expected generated", state.status()),
        ));
    }

    let written = write_codebase(state.output_directory(), codebase).await?;
    info!(
        output_dir = %state.output_directory().display(),
        files = written.len(),
        "project written"
    );

    let state = state.mark_persisted()?;
    Ok(PersistReport { state, written })
}

/// Write every file of `codebase` under `root`.
///
/// Returns the written paths in order.
pub async fn write_codebase(root: &Path, codebase: &Codebase) -> Result<Vec<PathBuf>, PipelineError> {
    let mut written = Vec::with_capacity(codebase.len());

    for file in codebase.iter() {
        let target = root.join(&file.path);

        if let Some(parent) = target.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|source| PipelineError::Persistence {
                    path: target.clone(),
                    source,
                })?;
        }

        info!(path = %target.display(), bytes = file.content.len(), "writing file");
        tokio::fs::write(&target, file.content.as_bytes())
            .await
            .map_err(|source| PipelineError::Persistence {
                path: target.clone(),
                source,
            })?;

        written.push(target);
    }

    Ok(written)
}
