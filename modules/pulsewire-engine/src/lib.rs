//! PulseWire engine: synthetic post generation and incident watching.
//!
//! Two workers share one Postgres-backed post store. The generation worker
//! fans seed reports out into persona-voiced synthetic posts on a Poisson
//! schedule; the classification poller drains unprocessed posts, asks an LLM
//! whether each one describes a real incident, and records the confident
//! positives.

pub mod classifier;
pub mod composer;
pub mod generator;
pub mod personas;
pub mod poller;
pub mod prompt;
pub mod sampler;
pub mod schedule;
pub mod traits;

#[cfg(any(test, feature = "test-support"))]
pub mod testing;
