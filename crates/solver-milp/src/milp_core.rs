use std::collections::HashMap;
use std::time::Duration;

use good_lp::{variable, Expression, ProblemVariables, Solution, SolverModel, Variable};
use tracing::warn;

use sched_core::adapter::{ObjSense, Sense, SolverAdapter, Status, VarId};

struct BufferedConstraint {
    coefficients: Vec<(VarId, i64)>,
    sense: Sense,
    rhs: i64,
}

/// Translates the Model Builder's [`SolverAdapter`] calls onto `good_lp`.
/// `good_lp`'s `ProblemVariables`/`SolverModel` builders consume themselves
/// as they go, which doesn't match the Model Builder's "declare things in
/// any order, solve once at the end" contract -- so this adapter buffers
/// every variable/constraint/objective it's handed and only constructs the
/// real `good_lp` problem inside [`GoodLpAdapter::solve`].
pub struct GoodLpAdapter {
    var_names: Vec<String>,
    constraints: Vec<BufferedConstraint>,
    objective: Vec<(VarId, f64)>,
    objective_sense: ObjSense,
    values: HashMap<usize, u8>,
}

impl GoodLpAdapter {
    pub fn new() -> Self {
        Self {
            var_names: Vec::new(),
            constraints: Vec::new(),
            objective: Vec::new(),
            objective_sense: ObjSense::Max,
            values: HashMap::new(),
        }
    }
}

fn linear_expr(vars: &[Variable], coefficients: &[(VarId, f64)]) -> Expression {
    let mut expr = Expression::from(0.0);
    for &(v, coef) in coefficients {
        expr += vars[v.0] * coef;
    }
    expr
}

impl SolverAdapter for GoodLpAdapter {
    fn add_bool_var(&mut self, name: &str) -> VarId {
        let id = VarId(self.var_names.len());
        self.var_names.push(name.to_string());
        id
    }

    fn add_linear(&mut self, coefficients: &[(VarId, i64)], sense: Sense, rhs: i64, _name: &str) {
        self.constraints.push(BufferedConstraint {
            coefficients: coefficients.to_vec(),
            sense,
            rhs,
        });
    }

    fn set_objective(&mut self, coefficients: &[(VarId, f64)], sense: ObjSense) {
        self.objective = coefficients.to_vec();
        self.objective_sense = sense;
    }

    fn solve(&mut self, time_limit: Option<Duration>, _deterministic: bool) -> Status {
        if time_limit.is_some() {
            warn!("coin_cbc time limit is not wired up, solving to completion regardless");
        }

        let mut pvars = ProblemVariables::new();
        let vars: Vec<Variable> = (0..self.var_names.len())
            .map(|_| pvars.add(variable().binary()))
            .collect();

        let obj_coeffs: Vec<(VarId, f64)> = self.objective.clone();
        let obj_expr = linear_expr(&vars, &obj_coeffs);

        let mut model = match self.objective_sense {
            ObjSense::Max => pvars.maximise(obj_expr),
            ObjSense::Min => pvars.minimise(obj_expr),
        }
        .using(good_lp::default_solver);

        for c in &self.constraints {
            let coeffs: Vec<(VarId, f64)> = c.coefficients.iter().map(|&(v, k)| (v, k as f64)).collect();
            let expr = linear_expr(&vars, &coeffs);
            model = match c.sense {
                Sense::Le => model.with(expr.leq(c.rhs as f64)),
                Sense::Eq => model.with(expr.eq(c.rhs as f64)),
                Sense::Ge => model.with(expr.geq(c.rhs as f64)),
            };
        }

        match model.solve() {
            Ok(solution) => {
                for (i, &v) in vars.iter().enumerate() {
                    let val = solution.value(v);
                    self.values.insert(i, if val > 0.5 { 1 } else { 0 });
                }
                Status::Optimal
            }
            Err(err) => {
                warn!(error = %err, "coin_cbc returned no solution");
                Status::Infeasible
            }
        }
    }

    fn value_of(&self, var: VarId) -> u8 {
        *self.values.get(&var.0).unwrap_or(&0)
    }
}
