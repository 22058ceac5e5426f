pub mod adapter;
pub mod decode;
pub mod error;
pub mod index;
pub mod model;
pub mod pipeline;
pub mod scoring;

use async_trait::async_trait;

pub use error::{TimetableError, ValidationError};
pub use index::{build as build_indices, validate as validate_request, GroupRec, Indices};
pub use types::{Request, SolveEnvelope, SolveResult, SolverConfig};

/// Thin re-export kept for callers that only care about pass/fail, matching
/// the shape `/v1/validate` reports.
pub fn validate(req: &Request, cfg: &SolverConfig) -> Result<(), ValidationError> {
    validate_request(req, cfg)
}

#[async_trait]
pub trait Solver: Send + Sync + 'static {
    async fn solve(&self, env: SolveEnvelope) -> anyhow::Result<SolveResult>;
}

#[cfg(test)]
mod tests;
