//! Shared test utilities for knit integration tests.
//!
//! Provides [`ScriptedClient`], a [`GenerationClient`] that replays queued
//! replies and records every call it receives, so pipeline runs can be
//! driven without a network.

use std::collections::VecDeque;
use std::sync::Mutex;

use async_trait::async_trait;
use serde_json::{Value, json};

use knit_core::client::{ErrorKind, Generation, GenerationClient, SchemaDescriptor};

/// Which trait method a recorded call went through.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CallKind {
    Plain,
    /// Carries the schema name that was requested.
    Structured(String),
}

/// One call received by a [`ScriptedClient`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedCall {
    pub kind: CallKind,
    pub prompt: String,
}

/// A client that answers from two scripts: one for structured calls and
/// one for plain calls. Replies are consumed in order. An exhausted script
/// answers with an API error.
#[derive(Debug, Default)]
pub struct ScriptedClient {
    structured: Mutex<VecDeque<Generation<Value>>>,
    plain: Mutex<VecDeque<Generation<Value>>>,
    calls: Mutex<Vec<RecordedCall>>,
}

impl ScriptedClient {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a conforming architect reply.
    pub fn with_plan(self, plan: &str, files: &[&str]) -> Self {
        self.with_structured(Generation::Structured(plan_reply(plan, files)))
    }

    /// Queue a raw reply for the next structured call.
    pub fn with_structured(self, reply: Generation<Value>) -> Self {
        push(&self.structured, reply);
        self
    }

    /// Queue a plain-text reply.
    pub fn then_text(self, text: impl Into<String>) -> Self {
        push(&self.plain, Generation::PlainText(text.into()));
        self
    }

    /// Queue a failing plain call.
    pub fn then_error(self, kind: ErrorKind) -> Self {
        push(&self.plain, Generation::Error(kind));
        self
    }

    /// Every call received so far, in order.
    pub fn calls(&self) -> Vec<RecordedCall> {
        lock(&self.calls).clone()
    }

    pub fn call_count(&self) -> usize {
        lock(&self.calls).len()
    }

    /// Prompts of the plain calls only.
    pub fn plain_prompts(&self) -> Vec<String> {
        lock(&self.calls)
            .iter()
            .filter(|c| c.kind == CallKind::Plain)
            .map(|c| c.prompt.clone())
            .collect()
    }

    fn record(&self, kind: CallKind, prompt: &str) {
        lock(&self.calls).push(RecordedCall {
            kind,
            prompt: prompt.to_string(),
        });
    }
}

#[async_trait]
impl GenerationClient for ScriptedClient {
    fn name(&self) -> &str {
        "scripted"
    }

    async fn invoke(&self, prompt: &str) -> Generation<Value> {
        self.record(CallKind::Plain, prompt);
        next(&self.plain)
    }

    async fn invoke_structured(&self, prompt: &str, schema: &SchemaDescriptor) -> Generation<Value> {
        self.record(CallKind::Structured(schema.name.clone()), prompt);
        match next(&self.structured) {
            Generation::Structured(value) => match schema.check(&value) {
                Ok(()) => Generation::Structured(value),
                Err(kind) => Generation::Error(kind),
            },
            other => other,
        }
    }
}

/// JSON body of an architect reply.
pub fn plan_reply(plan: &str, files: &[&str]) -> Value {
    json!({ "plan": plan, "files": files })
}

fn push(queue: &Mutex<VecDeque<Generation<Value>>>, reply: Generation<Value>) {
    lock(queue).push_back(reply);
}

fn next(queue: &Mutex<VecDeque<Generation<Value>>>) -> Generation<Value> {
    lock(queue).pop_front().unwrap_or_else(|| {
        Generation::Error(ErrorKind::Api {
            status: 500,
            message: "scripted client has no reply left".to_string(),
        })
    })
}

fn lock<T>(mutex: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}
