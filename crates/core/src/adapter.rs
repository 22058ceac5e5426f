use std::time::Duration;

/// Opaque handle to a decision variable, returned by [`SolverAdapter::add_bool_var`].
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, Ord, PartialOrd)]
pub struct VarId(pub usize);

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Sense {
    Le,
    Eq,
    Ge,
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ObjSense {
    Min,
    Max,
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Status {
    Optimal,
    Feasible,
    Infeasible,
    Unbounded,
    Unknown,
}

impl Status {
    pub fn is_success(self) -> bool {
        matches!(self, Status::Optimal | Status::Feasible)
    }
}

/// The minimal capability surface the Model Builder depends on. Every
/// constraint in the design doc is a weighted sum of binary variables
/// against an integer constant, so both a MILP branch-and-cut backend and a
/// CP-SAT style engine can realise this contract.
pub trait SolverAdapter {
    fn add_bool_var(&mut self, name: &str) -> VarId;
    fn add_linear(&mut self, coefficients: &[(VarId, i64)], sense: Sense, rhs: i64, name: &str);
    fn set_objective(&mut self, coefficients: &[(VarId, f64)], sense: ObjSense);
    fn solve(&mut self, time_limit: Option<Duration>, deterministic: bool) -> Status;
    fn value_of(&self, var: VarId) -> u8;
}
