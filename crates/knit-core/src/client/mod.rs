//! Generation service client interface.
//!
//! The pipeline talks to the text-generation service only through the
//! [`GenerationClient`] trait. Results come back as a tagged
//! [`Generation`] value:
//!
//! ```text
//! Plan stage ------invoke_structured(prompt, schema)--> Generation::Structured(json)
//!                                                     \-> Generation::Error(kind)
//! Generate stage --invoke(prompt)---------------------> Generation::PlainText(text)
//!                                                     \-> Generation::Error(kind)
//! ```

pub mod openai;
pub mod trait_def;
pub mod types;
pub mod wire;

pub use openai::{ClientBuildError, OpenAiCompatClient, ProviderConfig};
pub use trait_def::{GenerationClient, invoke_typed};
pub use types::{ErrorKind, Generation, SchemaDescriptor};
