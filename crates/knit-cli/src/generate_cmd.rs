//! `knit generate` and `knit plan`: drive the pipeline and render results.

use std::fmt::Write as _;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};

use knit_core::client::{OpenAiCompatClient, ProviderConfig};
use knit_core::plan::ArchitectPlan;
use knit_core::{Orchestrator, PipelineRequest, PipelineRun, PipelineState};

/// Build an orchestrator backed by the HTTP client.
pub fn build_orchestrator(provider: ProviderConfig) -> Result<Orchestrator> {
    let client = OpenAiCompatClient::new(provider).context("failed to build generation client")?;
    Ok(Orchestrator::new(Arc::new(client)))
}

/// Run the full pipeline, or only the plan stage when `dry_run` is set.
///
/// Returns the text to print on success.
pub async fn run_generate(
    orchestrator: &Orchestrator,
    prompt: &str,
    output: &Path,
    dry_run: bool,
) -> Result<String> {
    let request = PipelineRequest::new(prompt, output);

    if dry_run {
        let state = orchestrator.plan_only(request).await?;
        return Ok(render_plan(&state));
    }

    let run = orchestrator.run(request).await?;
    Ok(render_summary(&run))
}

/// Run the plan stage and return the plan as pretty JSON.
pub async fn run_plan(orchestrator: &Orchestrator, prompt: &str) -> Result<String> {
    let request = PipelineRequest::new(prompt, PathBuf::from("."));
    let state = orchestrator.plan_only(request).await?;

    let plan = ArchitectPlan {
        plan: state.plan().unwrap_or_default().to_string(),
        files: state.file_list().map(<[String]>::to_vec).unwrap_or_default(),
    };
    serde_json::to_string_pretty(&plan).context("failed to serialize plan")
}

// -----------------------------------------------------------------------
// Rendering
// -----------------------------------------------------------------------

fn render_plan(state: &PipelineState) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "Plan: {}", state.plan().unwrap_or("-"));
    let _ = writeln!(out, "Files:");
    for path in state.file_list().unwrap_or_default() {
        let _ = writeln!(out, "  {path}");
    }
    let _ = write!(out, "Dry run: nothing generated or written.");
    out
}

fn render_summary(run: &PipelineRun) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "Run {} {}", run.run_id, run.state.status());
    let _ = writeln!(
        out,
        "Output directory: {}",
        run.state.output_directory().display()
    );
    let bytes = run.state.codebase().map_or(0, |c| c.total_bytes());
    let _ = writeln!(out, "Files written ({}, {bytes} bytes):", run.written.len());
    for path in &run.written {
        let _ = writeln!(out, "  {}", path.display());
    }
    let elapsed = run.finished_at - run.started_at;
    let _ = write!(out, "Elapsed: {:.1}s", elapsed.num_milliseconds() as f64 / 1000.0);
    out
}
