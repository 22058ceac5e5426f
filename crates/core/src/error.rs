use thiserror::Error;

/// The taxonomy from the design doc: `Infeasible` and `TimeLimit` are
/// semantically equivalent "no solution found" results to a caller, but are
/// kept distinct here for diagnostics.
#[derive(Debug, Error)]
pub enum TimetableError {
    #[error("invalid config at {0}")]
    InvalidConfig(String),
    #[error("infeasible: no assignment satisfies the constraints")]
    Infeasible,
    #[error("time limit exceeded without a feasible solution")]
    TimeLimit,
    #[error("solver error: {0}")]
    SolverError(String),
    #[error("decode error: {0}")]
    DecodeError(String),
}

#[derive(Debug, Error)]
pub enum ValidationError {
    #[error("invalid request: {0}")]
    Msg(String),
}
