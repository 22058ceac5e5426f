#[cfg(feature = "with-milp")]
mod milp_core;

use async_trait::async_trait;
use sched_core::{pipeline, Solver, TimetableError};
use tracing::{info, warn};
use types::{Cell, ClassId, Grid, Request, SolveEnvelope, SolveResult, SolverConfig, SubjectId, TeacherId};

use std::collections::{HashMap, HashSet};

pub struct MilpSolver;

impl MilpSolver {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Solver for MilpSolver {
    async fn solve(&self, env: SolveEnvelope) -> anyhow::Result<SolveResult> {
        info!(
            classes = env.request.numClasses,
            groups = env.request.groupClasses.len(),
            "received solve request"
        );

        #[cfg(feature = "with-milp")]
        {
            let mut adapter = milp_core::GoodLpAdapter::new();
            match pipeline::solve_sync(&env.request, &env.config, &mut adapter) {
                Ok(solved) => {
                    return Ok(SolveResult {
                        status: "solved".into(),
                        objective: solved.objective,
                        schedule: Some(solved.grid),
                        stats: serde_json::json!({ "method": "milp" }),
                    });
                }
                Err(TimetableError::Infeasible) => {
                    warn!("MILP backend reported infeasible, falling back to greedy");
                }
                Err(err) => {
                    warn!(error = %err, "MILP backend failed, falling back to greedy");
                }
            }
        }

        Ok(solve_greedy(&env.request, &env.config))
    }
}

/// Deterministic constructive fallback used when the `with-milp` feature is
/// off, or when the MILP backend itself fails. Walks groups first (since
/// tying several classes together is the most constrained placement), then
/// individual (class, subject) demand, greedily picking the first open
/// period that doesn't violate I4/I5/I7/I8/I9. Not objective-optimal -- it
/// never tries to maximise adjacency -- but it's a real constraint-respecting
/// placement, not a stub.
fn solve_greedy(req: &Request, cfg: &SolverConfig) -> SolveResult {
    let idx = match sched_core::build_indices(req, cfg) {
        Ok(idx) => idx,
        Err(err) => {
            return SolveResult {
                status: "failed".into(),
                objective: 0.0,
                schedule: None,
                stats: serde_json::json!({ "method": "greedy", "error": err.to_string() }),
            };
        }
    };

    let total_periods = idx.total_periods();
    let group_day_cap = if cfg.strictSpacing { 1u32 } else { u32::MAX };
    let subject_day_cap = if cfg.strictSpacing { cfg.maxSameSubjectPerDay } else { u32::MAX };

    let mut class_occ: HashSet<(ClassId, usize)> = HashSet::new();
    let mut teacher_occ: HashSet<(TeacherId, usize)> = HashSet::new();
    let mut group_day_count: HashMap<(usize, usize), u32> = HashMap::new();
    let mut subject_day_count: HashMap<(ClassId, SubjectId, usize), u32> = HashMap::new();

    let mut grid = Grid::empty(idx.periods_per_day, idx.num_classes);
    let mut infeasible = false;

    for (gi, group) in idx.groups.iter().enumerate() {
        let mut admissible: Vec<usize> = group.admissible.iter().copied().collect();
        admissible.sort_unstable();

        let mut placed = 0u32;
        for &p in &admissible {
            if placed == group.periods_per_week {
                break;
            }
            let d = idx.day_of(p);
            if *group_day_count.get(&(gi, d)).unwrap_or(&0) >= group_day_cap {
                continue;
            }
            if teacher_occ.contains(&(group.teacher.clone(), p)) {
                continue;
            }
            if group.classes.iter().any(|c| class_occ.contains(&(*c, p))) {
                continue;
            }

            let k = idx.slot_of(p);
            for &c in &group.classes {
                class_occ.insert((c, p));
                grid.0[d][k][(c.0 - 1) as usize] = Some(Cell {
                    subject: group.subject.clone(),
                    teacher: group.teacher.clone(),
                });
            }
            teacher_occ.insert((group.teacher.clone(), p));
            *group_day_count.entry((gi, d)).or_default() += 1;
            placed += 1;
        }

        if placed < group.periods_per_week {
            infeasible = true;
        }
    }

    for (c, s, t) in idx.non_group_assignments() {
        let demand = idx.demand.get(&(c, s.clone())).copied().unwrap_or(0);
        let mut placed = 0u32;

        for p in 0..total_periods {
            if placed == demand {
                break;
            }
            if class_occ.contains(&(c, p)) || teacher_occ.contains(&(t.clone(), p)) {
                continue;
            }
            let d = idx.day_of(p);
            if *subject_day_count.get(&(c, s.clone(), d)).unwrap_or(&0) >= subject_day_cap {
                continue;
            }

            let k = idx.slot_of(p);
            class_occ.insert((c, p));
            teacher_occ.insert((t.clone(), p));
            *subject_day_count.entry((c, s.clone(), d)).or_default() += 1;
            grid.0[d][k][(c.0 - 1) as usize] = Some(Cell {
                subject: s.clone(),
                teacher: t.clone(),
            });
            placed += 1;
        }

        if placed < demand {
            infeasible = true;
        }
    }

    let objective = sched_core::scoring::compute_adjacency_score(idx.periods_per_day, &grid).pairs_total as f64;

    SolveResult {
        status: if infeasible { "infeasible".into() } else { "solved".into() },
        objective,
        schedule: Some(grid),
        stats: serde_json::json!({
            "method": "greedy",
            "classes": idx.num_classes,
            "groups": idx.groups.len(),
        }),
    }
}
