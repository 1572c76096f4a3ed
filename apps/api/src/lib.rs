//! CV / job-description compatibility scoring.
//!
//! The scoring core ranks a parsed résumé against a parsed job description using
//! hybrid keyword + embedding similarity. Embeddings flow through a two-tier
//! cache and a circuit-breaker-guarded provider chain; every infrastructure
//! fault degrades to zero vectors instead of surfacing as an error.

pub mod cache;
pub mod config;
pub mod context;
pub mod embedding;
pub mod errors;
pub mod matching;
pub mod models;
pub mod resilience;
pub mod routes;
pub mod state;

#[cfg(test)]
pub(crate) mod testing;

pub use context::CoreContext;
pub use matching::compatibility::CompatibilityReport;
