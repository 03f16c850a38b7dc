//! Linear orchestrator: runs plan, generate and persist in a fixed order.
//!
//! ```text
//! created --plan--> planned --generate--> generated --persist--> persisted
//!    \                 \                      \
//!     `-----------------`----------------------`----------------> failed
//! ```
//!
//! No stage is retried, skipped or repeated. The first error ends the run.

use std::path::PathBuf;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use thiserror::Error;
use tracing::{Instrument, error, info, info_span};
use uuid::Uuid;

use crate::client::GenerationClient;
use crate::error::PipelineError;
use crate::generate::run_generation_stage;
use crate::persist::run_persistence_stage;
use crate::plan::run_plan_stage;
use crate::state::{PipelineRequest, PipelineState, PipelineStatus};

/// A run that reached `persisted`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PipelineRun {
    pub run_id: Uuid,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    /// Final state, status `persisted`.
    pub state: PipelineState,
    /// Files written, in write order.
    pub written: Vec<PathBuf>,
}

/// A run that ended in `failed`.
#[derive(Debug, Error)]
#[error("pipeline run {run_id} failed in the {} stage after reaching {failed_from}", .error.stage())]
pub struct PipelineFailure {
    pub run_id: Uuid,
    /// Status the run held when the failing stage started.
    pub failed_from: PipelineStatus,
    /// The last good state, moved into `failed`.
    pub state: Box<PipelineState>,
    #[source]
    pub error: PipelineError,
}

/// Runs pipelines against one generation client.
#[derive(Clone)]
pub struct Orchestrator {
    client: Arc<dyn GenerationClient>,
}

impl std::fmt::Debug for Orchestrator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Orchestrator")
            .field("client", &self.client.name())
            .finish()
    }
}

impl Orchestrator {
    pub fn new(client: Arc<dyn GenerationClient>) -> Self {
        Self { client }
    }

    /// Run all three stages to `persisted` or `failed`.
    pub async fn run(&self, request: PipelineRequest) -> Result<PipelineRun, PipelineFailure> {
        let run_id = Uuid::new_v4();
        let span = info_span!("pipeline", run_id = %run_id);
        self.run_stages(run_id, request).instrument(span).await
    }

    /// Run only the plan stage.
    ///
    /// Returns the `planned` state without generating or writing anything.
    pub async fn plan_only(&self, request: PipelineRequest) -> Result<PipelineState, PipelineFailure> {
        let run_id = Uuid::new_v4();
        let span = info_span!("pipeline", run_id = %run_id, dry_run = true);
        async {
            let state = PipelineState::from(request);
            run_plan_stage(self.client.as_ref(), state.clone())
                .await
                .map_err(|e| fail(run_id, state, e))
        }
        .instrument(span)
        .await
    }

    async fn run_stages(
        &self,
        run_id: Uuid,
        request: PipelineRequest,
    ) -> Result<PipelineRun, PipelineFailure> {
        let started_at = Utc::now();
        let client = self.client.as_ref();

        info!(
            client = client.name(),
            output_dir = %request.output_directory.display(),
            "starting pipeline run"
        );

        let created = PipelineState::from(request);

        // created -> planned
        let planned = run_plan_stage(client, created.clone())
            .await
            .map_err(|e| fail(run_id, created, e))?;

        // planned -> generated
        let generated = run_generation_stage(client, planned.clone())
            .await
            .map_err(|e| fail(run_id, planned, e))?;

        // generated -> persisted
        let report = run_persistence_stage(generated.clone())
            .await
            .map_err(|e| fail(run_id, generated, e))?;

        let finished_at = Utc::now();
        info!(
            files = report.written.len(),
            elapsed_ms = (finished_at - started_at).num_milliseconds(),
            "project successfully generated"
        );

        Ok(PipelineRun {
            run_id,
            started_at,
            finished_at,
            state: report.state,
            written: report.written,
        })
    }
}

/// Move `last_good` into `failed` and wrap the error.
fn fail(run_id: Uuid, last_good: PipelineState, error: PipelineError) -> PipelineFailure {
    let failed_from = last_good.status();
    error!(
        stage = %error.stage(),
        path = error.path().as_deref().unwrap_or("-"),
        failed_from = %failed_from,
        error = &error as &(dyn std::error::Error + 'static),
        "pipeline run failed"
    );
    PipelineFailure {
        run_id,
        failed_from,
        state: Box::new(last_good.into_failed()),
        error,
    }
}
