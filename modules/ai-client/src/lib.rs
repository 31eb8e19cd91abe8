//! Minimal OpenAI client.
//!
//! Two call shapes: plain chat completion and strict structured output
//! against a JSON schema derived from a Rust type via [`StructuredOutput`].

pub mod openai;

pub use openai::{OpenAi, StructuredOutput};
