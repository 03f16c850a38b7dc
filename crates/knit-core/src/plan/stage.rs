//! Plan stage execution.

use tracing::{debug, info};

use crate::client::{GenerationClient, invoke_typed};
use crate::error::{PipelineError, Stage};
use crate::state::{PipelineState, PipelineStatus};

use super::PlanGenerationError;
use super::prompt::build_architect_prompt;
use super::schema::ArchitectPlan;

/// Run the plan stage: `created -> planned`.
///
/// Makes exactly one structured call. Any service failure, schema
/// violation, or invalid file list is returned as
/// [`PipelineError::PlanGeneration`]; there is no retry and no fallback
/// plan.
pub async fn run_plan_stage(
    client: &dyn GenerationClient,
    state: PipelineState,
) -> Result<PipelineState, PipelineError> {
    if state.status() != PipelineStatus::Created || state.plan().is_some() {
        return Err(PipelineError::sequence(
            Stage::Plan,
            format!("state is {}, expected created", state.status()),
        ));
    }
    if state.user_prompt().trim().is_empty() {
        return Err(PlanGenerationError::EmptyPrompt.into());
    }

    let prompt = build_architect_prompt(state.user_prompt());
    debug!(client = client.name(), prompt_len = prompt.len(), "requesting plan");

    let plan = invoke_typed::<ArchitectPlan>(client, &prompt)
        .await
        .into_structured()
        .map_err(PlanGenerationError::Service)?;

    let state = state.with_plan(plan.plan, plan.files)?;
    info!(
        file_count = state.file_list().map_or(0, <[String]>::len),
        "architect generated a plan and file list"
    );
    Ok(state)
}
