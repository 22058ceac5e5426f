use std::collections::HashMap;

use types::{ClassId, SolverConfig, SubjectId};

use crate::adapter::{ObjSense, Sense, SolverAdapter, VarId};
use crate::index::Indices;

/// Handles needed by the Decoder: the `x[c,s,p]` variables this model built.
/// `g[i,p]` variables aren't needed separately for decoding since I3 ties
/// them to their classes' `x` variables.
pub struct ModelHandles {
    pub x: HashMap<(ClassId, SubjectId, usize), VarId>,
}

/// Builds the model in the fixed order the design doc prescribes, so
/// constraint names/indices are reproducible given the same request.
pub fn build(idx: &Indices, cfg: &SolverConfig, adapter: &mut dyn SolverAdapter) -> ModelHandles {
    let total_periods = idx.total_periods();

    // 1. x[c,s,p] for every (c,s) with s in S[c].
    let mut x: HashMap<(ClassId, SubjectId, usize), VarId> = HashMap::new();
    for (&c, subs) in &idx.subjects_per_class {
        for s in subs.keys() {
            for p in 0..total_periods {
                let name = format!("x[{c},{s},{p}]");
                x.insert((c, s.clone(), p), adapter.add_bool_var(&name));
            }
        }
    }

    // 2. I1: demand equality for non-group (c,s).
    for (c, s, _t) in idx.non_group_assignments() {
        let demand = idx.demand.get(&(c, s.clone())).copied().unwrap_or(0);
        let coeffs: Vec<(VarId, i64)> = (0..total_periods)
            .map(|p| (x[&(c, s.clone(), p)], 1))
            .collect();
        adapter.add_linear(
            &coeffs,
            Sense::Eq,
            demand as i64,
            &format!("demand_eq[{c},{s}]"),
        );
    }

    // 3. Groups: g[i,p], I6 admissibility, I3 tying, I2 count.
    let mut g: HashMap<(usize, usize), VarId> = HashMap::new();
    for (gi, group) in idx.groups.iter().enumerate() {
        let mut group_vars = Vec::with_capacity(total_periods);
        for p in 0..total_periods {
            let gvar = adapter.add_bool_var(&format!("g[{gi},{p}]"));
            g.insert((gi, p), gvar);
            group_vars.push(gvar);

            if !group.admissible.contains(&p) {
                adapter.add_linear(&[(gvar, 1)], Sense::Eq, 0, &format!("group_admissible[{gi},{p}]"));
            }

            for &c in &group.classes {
                let xvar = x[&(c, group.subject.clone(), p)];
                adapter.add_linear(
                    &[(xvar, 1), (gvar, -1)],
                    Sense::Eq,
                    0,
                    &format!("group_tie[{gi},{c},{p}]"),
                );
            }
        }
        let coeffs: Vec<(VarId, i64)> = group_vars.iter().map(|&v| (v, 1)).collect();
        adapter.add_linear(
            &coeffs,
            Sense::Eq,
            group.periods_per_week as i64,
            &format!("group_count[{gi}]"),
        );
    }

    // 4. I7: at most one group session per day.
    if cfg.strictSpacing {
        for (gi, _group) in idx.groups.iter().enumerate() {
            for d in 0..6 {
                let coeffs: Vec<(VarId, i64)> = idx
                    .periods_of_day(d)
                    .map(|p| (g[&(gi, p)], 1))
                    .collect();
                adapter.add_linear(&coeffs, Sense::Le, 1, &format!("group_per_day[{gi},{d}]"));
            }
        }
    }

    // 5. I4: at most one subject per class per period.
    for (&c, subs) in &idx.subjects_per_class {
        for p in 0..total_periods {
            let coeffs: Vec<(VarId, i64)> = subs
                .keys()
                .map(|s| (x[&(c, s.clone(), p)], 1))
                .collect();
            if !coeffs.is_empty() {
                adapter.add_linear(&coeffs, Sense::Le, 1, &format!("class_capacity[{c},{p}]"));
            }
        }
    }

    // 6. I5: teacher non-overlap, individual + group sessions combined.
    for t in idx.all_teachers() {
        let individual = idx.teacher_individual.get(&t).cloned().unwrap_or_default();
        let owned_groups: Vec<usize> = idx
            .teacher_group
            .get(&t)
            .map(|s| s.iter().copied().collect())
            .unwrap_or_default();
        for p in 0..total_periods {
            let mut coeffs: Vec<(VarId, i64)> = individual
                .iter()
                .map(|(c, s)| (x[&(*c, s.clone(), p)], 1))
                .collect();
            coeffs.extend(owned_groups.iter().map(|&gi| (g[&(gi, p)], 1)));
            adapter.add_linear(&coeffs, Sense::Le, 1, &format!("teacher_capacity[{t},{p}]"));
        }
    }

    // 7. I8/I9: per-day repetition caps.
    if cfg.strictSpacing {
        for (c, s, _t) in idx.non_group_assignments() {
            for d in 0..6 {
                let coeffs: Vec<(VarId, i64)> = idx
                    .periods_of_day(d)
                    .map(|p| (x[&(c, s.clone(), p)], 1))
                    .collect();
                adapter.add_linear(
                    &coeffs,
                    Sense::Le,
                    cfg.maxSameSubjectPerDay as i64,
                    &format!("day_cap_subject[{c},{s},{d}]"),
                );
            }
        }
        for (gi, _group) in idx.groups.iter().enumerate() {
            for d in 0..6 {
                let coeffs: Vec<(VarId, i64)> = idx
                    .periods_of_day(d)
                    .map(|p| (g[&(gi, p)], 1))
                    .collect();
                adapter.add_linear(
                    &coeffs,
                    Sense::Le,
                    cfg.maxSameSubjectPerDay as i64,
                    &format!("day_cap_group[{gi},{d}]"),
                );
            }
        }
    }

    // 8. Objective: maximise adjacent same-subject pairs via a linearised AND.
    let mut objective_vars: Vec<VarId> = Vec::new();
    if cfg.enableAdjacency {
        for (c, s, _t) in idx.non_group_assignments() {
            for d in 0..6 {
                for k in idx.periods_of_day(d).take(idx.periods_per_day as usize - 1) {
                    let k1 = k + 1;
                    let x1 = x[&(c, s.clone(), k)];
                    let x2 = x[&(c, s.clone(), k1)];
                    let y = adapter.add_bool_var(&format!("y_x[{c},{s},{d},{k}]"));
                    adapter.add_linear(&[(y, 1), (x1, -1)], Sense::Le, 0, &format!("adj_le1_x[{c},{s},{d},{k}]"));
                    adapter.add_linear(&[(y, 1), (x2, -1)], Sense::Le, 0, &format!("adj_le2_x[{c},{s},{d},{k}]"));
                    adapter.add_linear(
                        &[(y, 1), (x1, -1), (x2, -1)],
                        Sense::Ge,
                        -1,
                        &format!("adj_ge_x[{c},{s},{d},{k}]"),
                    );
                    objective_vars.push(y);
                }
            }
        }
        for (gi, _group) in idx.groups.iter().enumerate() {
            for d in 0..6 {
                for k in idx.periods_of_day(d).take(idx.periods_per_day as usize - 1) {
                    let k1 = k + 1;
                    let g1 = g[&(gi, k)];
                    let g2 = g[&(gi, k1)];
                    let y = adapter.add_bool_var(&format!("y_g[{gi},{d},{k}]"));
                    adapter.add_linear(&[(y, 1), (g1, -1)], Sense::Le, 0, &format!("adj_le1_g[{gi},{d},{k}]"));
                    adapter.add_linear(&[(y, 1), (g2, -1)], Sense::Le, 0, &format!("adj_le2_g[{gi},{d},{k}]"));
                    adapter.add_linear(
                        &[(y, 1), (g1, -1), (g2, -1)],
                        Sense::Ge,
                        -1,
                        &format!("adj_ge_g[{gi},{d},{k}]"),
                    );
                    objective_vars.push(y);
                }
            }
        }
    }

    let obj_coeffs: Vec<(VarId, f64)> = objective_vars.into_iter().map(|v| (v, 1.0)).collect();
    adapter.set_objective(&obj_coeffs, ObjSense::Max);

    ModelHandles { x }
}
