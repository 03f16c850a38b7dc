//! The [`GenerationClient`] trait.
//!
//! Each text-generation backend implements this trait. It is object-safe so
//! the orchestrator can hold an `Arc<dyn GenerationClient>`.

use async_trait::async_trait;
use schemars::JsonSchema;
use serde::de::DeserializeOwned;
use serde_json::Value;

use super::types::{ErrorKind, Generation, SchemaDescriptor};

/// Single-turn access to a text-generation service.
///
/// Implementations never panic on service failures; they report them as
/// [`Generation::Error`].
#[async_trait]
pub trait GenerationClient: Send + Sync {
    /// Human-readable backend name (e.g. "openai-compat").
    fn name(&self) -> &str;

    /// Free-form completion. Should yield [`Generation::PlainText`].
    async fn invoke(&self, prompt: &str) -> Generation<Value>;

    /// Completion constrained to `schema`. Should yield
    /// [`Generation::Structured`] holding a value that passes
    /// [`SchemaDescriptor::check`], or [`ErrorKind::SchemaViolation`].
    async fn invoke_structured(&self, prompt: &str, schema: &SchemaDescriptor)
    -> Generation<Value>;
}

// Compile-time assertion: GenerationClient must be object-safe.
const _: () = {
    fn _assert_object_safe(_: &dyn GenerationClient) {}
};

/// Run a structured call for `T` and deserialize the result.
///
/// The schema is derived from `T`. A structured value that does not
/// deserialize into `T` is reported as a schema violation.
pub async fn invoke_typed<T>(client: &dyn GenerationClient, prompt: &str) -> Generation<T>
where
    T: DeserializeOwned + JsonSchema,
{
    let schema = SchemaDescriptor::for_type::<T>();
    match client.invoke_structured(prompt, &schema).await {
        Generation::Structured(value) => serde_json::from_value::<T>(value)
            .map_err(|e| schema.violation(e.to_string()))
            .into(),
        Generation::PlainText(_) => Generation::Error(ErrorKind::UnexpectedShape {
            expected: "structured",
            actual: "plain text",
        }),
        Generation::Error(kind) => Generation::Error(kind),
    }
}
