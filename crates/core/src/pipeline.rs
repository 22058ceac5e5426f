use std::time::Duration;

use tracing::{info, instrument};
use types::{Grid, SolverConfig};

use crate::adapter::{SolverAdapter, Status};
use crate::error::TimetableError;
use crate::{decode, index, model, scoring};

/// A feasible (or optimal) solve, decoded into a grid.
pub struct Solved {
    pub grid: Grid,
    pub objective: f64,
}

/// Runs Index Builder -> Model Builder -> `adapter.solve()` -> Decoder against
/// a concrete [`SolverAdapter`]. This is the synchronous core the async
/// `Solver` trait impls in the solver-milp/solver-heur crates wrap.
#[instrument(skip(req, cfg, adapter))]
pub fn solve_sync(
    req: &types::Request,
    cfg: &SolverConfig,
    adapter: &mut dyn SolverAdapter,
) -> Result<Solved, TimetableError> {
    let idx = index::build(req, cfg)?;
    info!(
        classes = idx.num_classes,
        groups = idx.groups.len(),
        periods_per_day = idx.periods_per_day,
        "built indices"
    );

    let handles = model::build(&idx, cfg, adapter);

    let time_limit = cfg.timeLimitSec.map(Duration::from_secs);
    let status = adapter.solve(time_limit, cfg.deterministic);

    match status {
        Status::Optimal | Status::Feasible => {
            let grid = decode::decode(&idx, &handles, adapter)?;
            let objective = scoring::compute_adjacency_score(idx.periods_per_day, &grid).pairs_total as f64;
            Ok(Solved { grid, objective })
        }
        Status::Infeasible => Err(TimetableError::Infeasible),
        Status::Unknown => Err(TimetableError::TimeLimit),
        Status::Unbounded => Err(TimetableError::SolverError(
            "solver reported unbounded on a model with only binary variables".into(),
        )),
    }
}
