//! Integration tests for the plan stage's output guarantees.
//!
//! Whatever the architect replies, a `planned` state carries a non-empty
//! summary and a non-empty list of relative paths. Anything else fails the
//! stage before a single file is generated.

use std::path::Path;

use serde_json::json;

use knit_core::client::Generation;
use knit_core::plan::{PlanGenerationError, run_plan_stage};
use knit_core::{PipelineError, PipelineState, PipelineStatus};
use knit_test_utils::ScriptedClient;

fn created() -> PipelineState {
    PipelineState::new("a todo api", "out")
}

async fn plan_error(client: &ScriptedClient) -> PlanGenerationError {
    match run_plan_stage(client, created()).await {
        Err(PipelineError::PlanGeneration(err)) => err,
        Err(other) => panic!("unexpected error: {other}"),
        Ok(state) => panic!("plan unexpectedly accepted: {:?}", state.file_list()),
    }
}

#[tokio::test]
async fn empty_plan_summary_is_rejected() {
    let client = ScriptedClient::new().with_plan("", &["app/main.py"]);

    let err = plan_error(&client).await;

    assert!(matches!(err, PlanGenerationError::EmptyPlan), "got: {err}");
    assert_eq!(client.call_count(), 1);
    assert!(client.plain_prompts().is_empty());
}

#[tokio::test]
async fn blank_plan_summary_is_rejected() {
    let client = ScriptedClient::new().with_plan("  \n ", &["app/main.py"]);

    let err = plan_error(&client).await;

    assert!(matches!(err, PlanGenerationError::EmptyPlan), "got: {err}");
}

#[tokio::test]
async fn empty_file_list_is_rejected() {
    let client = ScriptedClient::new().with_plan("A small API.", &[]);

    let err = plan_error(&client).await;

    assert!(matches!(err, PlanGenerationError::NoFiles), "got: {err}");
    assert_eq!(client.call_count(), 1);
    assert!(client.plain_prompts().is_empty());
}

#[tokio::test]
async fn absolute_path_is_rejected() {
    let client = ScriptedClient::new().with_plan("A small API.", &["app/main.py", "/etc/hosts"]);

    let err = plan_error(&client).await;

    assert!(
        matches!(err, PlanGenerationError::InvalidPath { ref path, .. } if path == "/etc/hosts"),
        "got: {err}"
    );
}

#[tokio::test]
async fn non_string_file_entry_is_a_service_error() {
    let client = ScriptedClient::new().with_structured(Generation::Structured(json!({
        "plan": "A small API.",
        "files": "app/main.py"
    })));

    let err = plan_error(&client).await;

    assert!(matches!(err, PlanGenerationError::Service(_)), "got: {err}");
}

#[tokio::test]
async fn accepted_plan_is_non_empty_and_relative() {
    let client = ScriptedClient::new().with_plan(
        "A small API. Models live apart from routes.",
        &["./app/main.py", "app//models.py", "README.md"],
    );

    let state = run_plan_stage(&client, created()).await.unwrap();

    assert_eq!(state.status(), PipelineStatus::Planned);
    assert!(!state.plan().unwrap().trim().is_empty());
    let files = state.file_list().unwrap();
    assert_eq!(files, ["app/main.py", "app/models.py", "README.md"]);
    for file in files {
        assert!(!file.is_empty());
        assert!(Path::new(file).is_relative(), "{file} is not relative");
        assert!(!file.split('/').any(|part| part == ".." || part == "."), "{file}");
    }
}
