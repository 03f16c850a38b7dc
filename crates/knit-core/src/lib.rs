//! Core of knit: a three-stage pipeline that turns a project description
//! into a generated source tree.
//!
//! ```text
//! PipelineRequest
//!     |
//!     v
//! Orchestrator --plan--> --generate--> --persist--> Persisted
//!     |            \___________\____________\______> Failed
//!     v
//! GenerationClient (plan: structured, generate: plain text)
//! ```

pub mod client;
pub mod error;
pub mod generate;
pub mod orchestrator;
pub mod persist;
pub mod plan;
pub mod state;

pub use client::{ErrorKind, Generation, GenerationClient, SchemaDescriptor};
pub use error::{PipelineError, Stage};
pub use orchestrator::{Orchestrator, PipelineFailure, PipelineRun};
pub use state::{Codebase, PipelineRequest, PipelineState, PipelineStatus, SourceFile};
