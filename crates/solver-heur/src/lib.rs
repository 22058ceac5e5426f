use std::collections::{HashMap, HashSet};

use async_trait::async_trait;
use rand::{seq::SliceRandom, Rng};
use rand_chacha::rand_core::SeedableRng;
use rand_chacha::ChaCha8Rng;
use sched_core::{build_indices, scoring::compute_adjacency_score, Indices, Solver};
use types::{Cell, ClassId, Grid, SolveEnvelope, SolveResult, SolverConfig, SubjectId, TeacherId};

/// Randomized-construction + local-search fallback/alternative backend, used
/// when `SolverConfig.solver == Heuristic` and as a repair pass over a MILP
/// solution when `repairLocalSearch` is set. Grounded in the teacher's
/// population/tournament/mutate GA shape, retargeted from room/course
/// assignment lists onto this core's `(group, subject) -> periods` maps.
pub struct HeurSolver;

impl HeurSolver {
    pub fn new() -> Self {
        Self
    }
}

impl Default for HeurSolver {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Solver for HeurSolver {
    async fn solve(&self, env: SolveEnvelope) -> anyhow::Result<SolveResult> {
        let idx = build_indices(&env.request, &env.config)?;
        let mut rng = ChaCha8Rng::seed_from_u64(env.config.seed);

        let pop_size = pop_size_for(&idx);
        let iters = 200usize;
        let max_attempts = pop_size * 20;

        let mut population: Vec<Candidate> = Vec::new();
        let mut attempts = 0;
        while population.len() < pop_size && attempts < max_attempts {
            attempts += 1;
            if let Some(c) = construct_candidate(&idx, &env.config, &mut rng) {
                population.push(c);
            }
        }

        if population.is_empty() {
            return Ok(SolveResult {
                status: "infeasible".into(),
                objective: 0.0,
                schedule: None,
                stats: serde_json::json!({
                    "method": "heuristic",
                    "note": "failed to construct a feasible schedule within attempt budget",
                }),
            });
        }

        population.sort_by(|a, b| b.objective.total_cmp(&a.objective));

        for _ in 0..iters {
            let parent = tournament_best(&population, 3, &mut rng).clone();
            let mut child = parent.clone();
            mutate_one(&idx, &env.config, &mut child.group_periods, &mut child.subject_periods, &mut rng);
            child.evaluate(&idx);

            if let Some(worst) = population.last() {
                if child.objective > worst.objective {
                    population.pop();
                    insert_sorted_desc(&mut population, child);
                }
            }
        }

        let best = &population[0];
        let grid = render_grid(&idx, &best.group_periods, &best.subject_periods);

        Ok(SolveResult {
            status: "solved".into(),
            objective: best.objective,
            schedule: Some(grid),
            stats: serde_json::json!({
                "method": "heuristic",
                "pop": population.len(),
                "best": best.objective,
            }),
        })
    }
}

impl HeurSolver {
    /// Hill-climbs `steps` single-move mutations over an already-decoded
    /// grid, keeping every move that doesn't reduce the adjacency objective.
    /// Used as the "repair" pass the dispatcher runs over a MILP solution
    /// when `repairLocalSearch` is enabled.
    pub fn repair(
        &self,
        idx: &Indices,
        cfg: &SolverConfig,
        grid: &Grid,
        steps: usize,
        seed: u64,
    ) -> (Grid, f64) {
        let mut rng = ChaCha8Rng::seed_from_u64(seed ^ 0x9E37_79B9_7F4A_7C15);
        let (mut group_periods, mut subject_periods) = grid_to_maps(idx, grid);
        let mut best = compute_adjacency_score(idx.periods_per_day, grid).pairs_total as f64;

        for _ in 0..steps {
            let snapshot_g = group_periods.clone();
            let snapshot_s = subject_periods.clone();

            mutate_one(idx, cfg, &mut group_periods, &mut subject_periods, &mut rng);

            let candidate_grid = render_grid(idx, &group_periods, &subject_periods);
            let score = compute_adjacency_score(idx.periods_per_day, &candidate_grid).pairs_total as f64;

            if score >= best {
                best = score;
            } else {
                group_periods = snapshot_g;
                subject_periods = snapshot_s;
            }
        }

        (render_grid(idx, &group_periods, &subject_periods), best)
    }
}

fn pop_size_for(idx: &Indices) -> usize {
    let assignment_count = idx.groups.len()
        + idx
            .subjects_per_class
            .values()
            .map(|subs| subs.len())
            .sum::<usize>();
    (4 + assignment_count).min(24)
}

#[derive(Clone)]
struct Candidate {
    group_periods: HashMap<usize, Vec<usize>>,
    subject_periods: HashMap<(ClassId, SubjectId), Vec<usize>>,
    objective: f64,
}

impl Candidate {
    fn evaluate(&mut self, idx: &Indices) {
        let grid = render_grid(idx, &self.group_periods, &self.subject_periods);
        self.objective = compute_adjacency_score(idx.periods_per_day, &grid).pairs_total as f64;
    }
}

fn insert_sorted_desc(pop: &mut Vec<Candidate>, c: Candidate) {
    let pos = pop.partition_point(|x| x.objective >= c.objective);
    pop.insert(pos, c);
}

fn tournament_best<'a>(pop: &'a [Candidate], k: usize, rng: &mut ChaCha8Rng) -> &'a Candidate {
    let mut best: Option<&Candidate> = None;
    for _ in 0..k {
        let i = rng.gen_range(0..pop.len());
        let c = &pop[i];
        if best.map_or(true, |b| c.objective > b.objective) {
            best = Some(c);
        }
    }
    best.unwrap()
}

/// Builds one feasible candidate from scratch by placing groups (most
/// constrained by admissible-set size first), then individual (class,
/// subject) demand, each time shuffling the candidate periods so repeated
/// calls explore different parts of the feasible region. Mirrors the
/// teacher's `randomized_construct`: sort by constraint tightness, shuffle,
/// greedily place, bail out (`None`) if any requirement can't be met.
fn construct_candidate(idx: &Indices, cfg: &SolverConfig, rng: &mut ChaCha8Rng) -> Option<Candidate> {
    let group_day_cap = if cfg.strictSpacing { 1u32 } else { u32::MAX };
    let subject_day_cap = if cfg.strictSpacing { cfg.maxSameSubjectPerDay } else { u32::MAX };
    let total_periods = idx.total_periods();

    let mut class_occ: HashSet<(ClassId, usize)> = HashSet::new();
    let mut teacher_occ: HashSet<(TeacherId, usize)> = HashSet::new();
    let mut group_day_count: HashMap<(usize, usize), u32> = HashMap::new();
    let mut subject_day_count: HashMap<(ClassId, SubjectId, usize), u32> = HashMap::new();

    let mut group_order: Vec<usize> = (0..idx.groups.len()).collect();
    group_order.sort_by_key(|&gi| idx.groups[gi].admissible.len());

    let mut group_periods: HashMap<usize, Vec<usize>> = HashMap::new();
    for gi in group_order {
        let group = &idx.groups[gi];
        let mut candidates: Vec<usize> = group.admissible.iter().copied().collect();
        candidates.shuffle(rng);

        let mut placed = Vec::new();
        for p in candidates {
            if placed.len() as u32 == group.periods_per_week {
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

            for &c in &group.classes {
                class_occ.insert((c, p));
            }
            teacher_occ.insert((group.teacher.clone(), p));
            *group_day_count.entry((gi, d)).or_default() += 1;
            placed.push(p);
        }

        if placed.len() as u32 != group.periods_per_week {
            return None;
        }
        group_periods.insert(gi, placed);
    }

    let mut assignments: Vec<(ClassId, SubjectId, TeacherId)> = idx.non_group_assignments().collect();
    assignments.shuffle(rng);

    let mut subject_periods: HashMap<(ClassId, SubjectId), Vec<usize>> = HashMap::new();
    for (c, s, t) in assignments {
        let demand = idx.demand.get(&(c, s.clone())).copied().unwrap_or(0);
        let mut candidates: Vec<usize> = (0..total_periods).collect();
        candidates.shuffle(rng);

        let mut placed = Vec::new();
        for p in candidates {
            if placed.len() as u32 == demand {
                break;
            }
            if class_occ.contains(&(c, p)) || teacher_occ.contains(&(t.clone(), p)) {
                continue;
            }
            let d = idx.day_of(p);
            if *subject_day_count.get(&(c, s.clone(), d)).unwrap_or(&0) >= subject_day_cap {
                continue;
            }

            class_occ.insert((c, p));
            teacher_occ.insert((t.clone(), p));
            *subject_day_count.entry((c, s.clone(), d)).or_default() += 1;
            placed.push(p);
        }

        if placed.len() as u32 != demand {
            return None;
        }
        subject_periods.insert((c, s), placed);
    }

    let mut cand = Candidate {
        group_periods,
        subject_periods,
        objective: 0.0,
    };
    cand.evaluate(idx);
    Some(cand)
}

/// Recomputes occupancy from the current maps, leaving out one group's or
/// one subject's own periods so a mutation can consider moving them without
/// colliding with itself.
fn occupancy_excluding(
    idx: &Indices,
    group_periods: &HashMap<usize, Vec<usize>>,
    subject_periods: &HashMap<(ClassId, SubjectId), Vec<usize>>,
    exclude_group: Option<usize>,
    exclude_subject: Option<&(ClassId, SubjectId)>,
) -> (
    HashSet<(ClassId, usize)>,
    HashSet<(TeacherId, usize)>,
    HashMap<(usize, usize), u32>,
    HashMap<(ClassId, SubjectId, usize), u32>,
) {
    let mut class_occ: HashSet<(ClassId, usize)> = HashSet::new();
    let mut teacher_occ: HashSet<(TeacherId, usize)> = HashSet::new();
    let mut group_day_count: HashMap<(usize, usize), u32> = HashMap::new();
    let mut subject_day_count: HashMap<(ClassId, SubjectId, usize), u32> = HashMap::new();

    for (&gi, periods) in group_periods {
        if Some(gi) == exclude_group {
            continue;
        }
        let group = &idx.groups[gi];
        for &p in periods {
            for &c in &group.classes {
                class_occ.insert((c, p));
            }
            teacher_occ.insert((group.teacher.clone(), p));
            *group_day_count.entry((gi, idx.day_of(p))).or_default() += 1;
        }
    }

    for (key, periods) in subject_periods {
        if exclude_subject == Some(key) {
            continue;
        }
        let (c, s) = key;
        let teacher = idx.subjects_per_class[c][s].clone();
        for &p in periods {
            class_occ.insert((*c, p));
            teacher_occ.insert((teacher.clone(), p));
            *subject_day_count.entry((*c, s.clone(), idx.day_of(p))).or_default() += 1;
        }
    }

    (class_occ, teacher_occ, group_day_count, subject_day_count)
}

/// Tries to relocate one randomly chosen group session or (class, subject)
/// occurrence to a different feasible period. Leaves the maps untouched if
/// no free slot is found -- the caller decides whether to keep the result.
fn mutate_one(
    idx: &Indices,
    cfg: &SolverConfig,
    group_periods: &mut HashMap<usize, Vec<usize>>,
    subject_periods: &mut HashMap<(ClassId, SubjectId), Vec<usize>>,
    rng: &mut ChaCha8Rng,
) {
    let has_groups = !group_periods.is_empty();
    let has_subjects = !subject_periods.is_empty();
    if !has_groups && !has_subjects {
        return;
    }
    let mutate_group = if has_groups && has_subjects {
        rng.gen_bool(0.5)
    } else {
        has_groups
    };

    let group_day_cap = if cfg.strictSpacing { 1u32 } else { u32::MAX };
    let subject_day_cap = if cfg.strictSpacing { cfg.maxSameSubjectPerDay } else { u32::MAX };

    if mutate_group {
        let gi = *group_periods.keys().collect::<Vec<_>>().choose(rng).copied().unwrap();
        let group = &idx.groups[gi];
        let (class_occ, teacher_occ, group_day_count, _) =
            occupancy_excluding(idx, group_periods, subject_periods, Some(gi), None);

        let periods = group_periods.get_mut(&gi).unwrap();
        if periods.is_empty() {
            return;
        }
        let slot_ix = rng.gen_range(0..periods.len());
        let old_p = periods[slot_ix];

        let mut candidates: Vec<usize> = group.admissible.iter().copied().filter(|&p| p != old_p).collect();
        candidates.shuffle(rng);

        for p in candidates {
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
            periods[slot_ix] = p;
            return;
        }
    } else {
        let key = subject_periods.keys().collect::<Vec<_>>().choose(rng).map(|k| (*k).clone()).unwrap();
        let teacher = idx.subjects_per_class[&key.0][&key.1].clone();
        let (class_occ, teacher_occ, _, subject_day_count) =
            occupancy_excluding(idx, group_periods, subject_periods, None, Some(&key));

        let periods = subject_periods.get_mut(&key).unwrap();
        if periods.is_empty() {
            return;
        }
        let slot_ix = rng.gen_range(0..periods.len());
        let old_p = periods[slot_ix];

        let total_periods = idx.total_periods();
        let mut candidates: Vec<usize> = (0..total_periods).filter(|&p| p != old_p).collect();
        candidates.shuffle(rng);

        for p in candidates {
            if class_occ.contains(&(key.0, p)) || teacher_occ.contains(&(teacher.clone(), p)) {
                continue;
            }
            let d = idx.day_of(p);
            if *subject_day_count.get(&(key.0, key.1.clone(), d)).unwrap_or(&0) >= subject_day_cap {
                continue;
            }
            periods[slot_ix] = p;
            return;
        }
    }
}

fn render_grid(
    idx: &Indices,
    group_periods: &HashMap<usize, Vec<usize>>,
    subject_periods: &HashMap<(ClassId, SubjectId), Vec<usize>>,
) -> Grid {
    let mut grid = Grid::empty(idx.periods_per_day, idx.num_classes);

    for (&gi, periods) in group_periods {
        let group = &idx.groups[gi];
        for &p in periods {
            let d = idx.day_of(p);
            let k = idx.slot_of(p);
            for &c in &group.classes {
                grid.0[d][k][(c.0 - 1) as usize] = Some(Cell {
                    subject: group.subject.clone(),
                    teacher: group.teacher.clone(),
                });
            }
        }
    }

    for ((c, s), periods) in subject_periods {
        let teacher = idx.subjects_per_class[c][s].clone();
        for &p in periods {
            let d = idx.day_of(p);
            let k = idx.slot_of(p);
            grid.0[d][k][(c.0 - 1) as usize] = Some(Cell {
                subject: s.clone(),
                teacher: teacher.clone(),
            });
        }
    }

    grid
}

/// Reconstructs `(group, subject) -> periods` maps from an already-decoded
/// grid, so the repair pass can resume local search from a MILP solution
/// without re-solving anything.
fn grid_to_maps(
    idx: &Indices,
    grid: &Grid,
) -> (HashMap<usize, Vec<usize>>, HashMap<(ClassId, SubjectId), Vec<usize>>) {
    let mut group_periods = HashMap::new();
    for (gi, group) in idx.groups.iter().enumerate() {
        let Some(&anchor) = group.classes.first() else {
            continue;
        };
        let mut periods = Vec::new();
        for p in 0..idx.total_periods() {
            let d = idx.day_of(p);
            let k = idx.slot_of(p);
            if let Some(cell) = &grid.0[d][k][(anchor.0 - 1) as usize] {
                if cell.subject == group.subject && cell.teacher == group.teacher {
                    periods.push(p);
                }
            }
        }
        group_periods.insert(gi, periods);
    }

    let mut subject_periods = HashMap::new();
    for (c, s, _t) in idx.non_group_assignments() {
        let mut periods = Vec::new();
        for p in 0..idx.total_periods() {
            let d = idx.day_of(p);
            let k = idx.slot_of(p);
            if let Some(cell) = &grid.0[d][k][(c.0 - 1) as usize] {
                if cell.subject == s {
                    periods.push(p);
                }
            }
        }
        subject_periods.insert((c, s), periods);
    }

    (group_periods, subject_periods)
}

#[cfg(test)]
mod tests {
    use super::*;
    use types::{GroupClass, Request, SubjectPeriodMapping, SubjectTeacherMapping};

    fn single_class_math(demand: i64) -> Request {
        Request {
            numClasses: 1,
            subjectTeacherMappings: vec![SubjectTeacherMapping {
                class: ClassId(1),
                subject: "Math".into(),
                teacher: "Alice".into(),
            }],
            subjectPeriodMappings: vec![SubjectPeriodMapping {
                class: ClassId(1),
                subject: "Math".into(),
                periodsPerWeek: demand,
            }],
            groupClasses: vec![],
        }
    }

    #[tokio::test]
    async fn solves_a_single_class_single_subject_instance() {
        let req = single_class_math(3);
        let cfg = SolverConfig::default();
        let idx = build_indices(&req, &cfg).unwrap();

        let mut rng = ChaCha8Rng::seed_from_u64(7);
        let cand = construct_candidate(&idx, &cfg, &mut rng).expect("constructible");

        let filled: usize = cand
            .subject_periods
            .values()
            .map(|periods| periods.len())
            .sum();
        assert_eq!(filled, 3);
    }

    #[tokio::test]
    async fn teacher_clash_across_classes_is_infeasible_to_construct() {
        let req = Request {
            numClasses: 2,
            subjectTeacherMappings: vec![
                SubjectTeacherMapping { class: ClassId(1), subject: "M".into(), teacher: "Alice".into() },
                SubjectTeacherMapping { class: ClassId(2), subject: "H".into(), teacher: "Alice".into() },
            ],
            subjectPeriodMappings: vec![
                SubjectPeriodMapping { class: ClassId(1), subject: "M".into(), periodsPerWeek: 36 },
                SubjectPeriodMapping { class: ClassId(2), subject: "H".into(), periodsPerWeek: 36 },
            ],
            groupClasses: vec![],
        };
        let cfg = SolverConfig { strictSpacing: false, ..SolverConfig::default() };
        let idx = build_indices(&req, &cfg).unwrap();

        let mut rng = ChaCha8Rng::seed_from_u64(1);
        for _ in 0..20 {
            assert!(construct_candidate(&idx, &cfg, &mut rng).is_none());
        }
    }

    #[tokio::test]
    async fn group_ties_both_classes_to_the_same_periods() {
        let req = Request {
            numClasses: 2,
            subjectTeacherMappings: vec![
                SubjectTeacherMapping { class: ClassId(1), subject: "PE".into(), teacher: "Bob".into() },
                SubjectTeacherMapping { class: ClassId(2), subject: "PE".into(), teacher: "Bob".into() },
            ],
            subjectPeriodMappings: vec![],
            groupClasses: vec![GroupClass {
                subject: "PE".into(),
                classes: vec![ClassId(1), ClassId(2)],
                teacher: "Bob".into(),
                periodsPerWeek: 2,
                selectedDays: None,
                selectedSlots: None,
            }],
        };
        let cfg = SolverConfig::default();
        let idx = build_indices(&req, &cfg).unwrap();

        let mut rng = ChaCha8Rng::seed_from_u64(3);
        let cand = construct_candidate(&idx, &cfg, &mut rng).expect("constructible");
        let grid = render_grid(&idx, &cand.group_periods, &cand.subject_periods);

        for periods in cand.group_periods.values() {
            assert_eq!(periods.len(), 2);
            let days: HashSet<usize> = periods.iter().map(|&p| idx.day_of(p)).collect();
            assert_eq!(days.len(), 2, "group sessions must land on distinct days");
            for &p in periods {
                let d = idx.day_of(p);
                let k = idx.slot_of(p);
                assert_eq!(grid.0[d][k][0].as_ref().unwrap().subject, types::SubjectId::from("PE"));
                assert_eq!(grid.0[d][k][1].as_ref().unwrap().subject, types::SubjectId::from("PE"));
            }
        }
    }

    #[tokio::test]
    async fn repair_never_reduces_the_objective() {
        let req = single_class_math(2);
        let cfg = SolverConfig { enableAdjacency: true, ..SolverConfig::default() };
        let idx = build_indices(&req, &cfg).unwrap();

        let mut rng = ChaCha8Rng::seed_from_u64(11);
        let cand = construct_candidate(&idx, &cfg, &mut rng).unwrap();
        let grid = render_grid(&idx, &cand.group_periods, &cand.subject_periods);
        let before = compute_adjacency_score(idx.periods_per_day, &grid).pairs_total as f64;

        let solver = HeurSolver::new();
        let (_improved_grid, after) = solver.repair(&idx, &cfg, &grid, 100, 42);
        assert!(after >= before);
    }
}
