//! Post and incident persistence, backed by Postgres.
//!
//! Rows are plain data. The engine crate defines the trait seam it consumes
//! them through; this crate only knows SQL.

pub mod store;
pub mod types;

pub use store::PgStore;
pub use types::{ConfirmedIncident, NewIncident, NewPost, Post};
