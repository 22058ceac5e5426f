use std::collections::{HashMap, HashSet};

use tracing::warn;
use types::{ClassId, Request, SolverConfig, SubjectId, TeacherId};

use crate::error::{TimetableError, ValidationError};

/// A co-taught group session: `G` in the design doc, `g_idx` is its position
/// in [`Indices::groups`].
#[derive(Clone, Debug)]
pub struct GroupRec {
    pub subject: SubjectId,
    pub classes: Vec<ClassId>,
    pub teacher: TeacherId,
    pub periods_per_week: u32,
    /// `A_i`: admissible periods, already intersected with selectedDays/selectedSlots.
    pub admissible: HashSet<usize>,
}

/// Derived indices built once from a validated [`Request`], per the design's
/// Index Builder component.
#[derive(Clone, Debug)]
pub struct Indices {
    pub num_classes: u32,
    pub periods_per_day: u32,
    /// `S[c]`: subject -> teacher for class c.
    pub subjects_per_class: HashMap<ClassId, HashMap<SubjectId, TeacherId>>,
    /// `D[c][s]`: weekly demand for non-group (c,s). Absent entries are 0.
    pub demand: HashMap<(ClassId, SubjectId), u32>,
    pub group_assignments: HashSet<(ClassId, SubjectId)>,
    pub groups: Vec<GroupRec>,
    pub teacher_individual: HashMap<TeacherId, Vec<(ClassId, SubjectId)>>,
    pub teacher_group: HashMap<TeacherId, HashSet<usize>>,
}

impl Indices {
    pub fn total_periods(&self) -> usize {
        6 * self.periods_per_day as usize
    }

    pub fn day_of(&self, p: usize) -> usize {
        p / self.periods_per_day as usize
    }

    pub fn slot_of(&self, p: usize) -> usize {
        p % self.periods_per_day as usize
    }

    pub fn periods_of_day(&self, d: usize) -> std::ops::Range<usize> {
        let p = self.periods_per_day as usize;
        (d * p)..(d * p + p)
    }

    /// Every (class, subject) this class has, whether group-tied or not.
    pub fn non_group_assignments(&self) -> impl Iterator<Item = (ClassId, SubjectId, TeacherId)> + '_ {
        self.subjects_per_class.iter().flat_map(|(&c, subs)| {
            subs.iter().filter_map(move |(s, t)| {
                if self.group_assignments.contains(&(c, s.clone())) {
                    None
                } else {
                    Some((c, s.clone(), t.clone()))
                }
            })
        })
    }

    pub fn all_teachers(&self) -> HashSet<TeacherId> {
        self.teacher_individual
            .keys()
            .cloned()
            .chain(self.teacher_group.keys().cloned())
            .collect()
    }
}

/// Validates a request against the contract in the design doc's Index Builder
/// section. Collects every error instead of failing fast, so a caller can
/// report the whole picture at once.
pub fn validate(req: &Request, cfg: &SolverConfig) -> Result<(), ValidationError> {
    let mut errors: Vec<String> = Vec::new();

    if req.numClasses == 0 {
        errors.push("numClasses must be positive".into());
    }
    if cfg.periodsPerDay == 0 {
        errors.push("periodsPerDay must be positive".into());
    }

    let valid_classes = types::valid_class_ids(req.numClasses);
    let in_range = |c: ClassId, errors: &mut Vec<String>, ctx: &str| {
        if !valid_classes.contains(&c) {
            errors.push(format!("{ctx}: class {c} is outside 1..{}", req.numClasses));
        }
    };

    for m in &req.subjectTeacherMappings {
        in_range(m.class, &mut errors, "subjectTeacherMappings");
    }
    for m in &req.subjectPeriodMappings {
        in_range(m.class, &mut errors, "subjectPeriodMappings");
        if m.periodsPerWeek < 0 {
            errors.push(format!(
                "subjectPeriodMappings: demand for (class {}, subject {}) is negative",
                m.class, m.subject
            ));
        }
    }

    let declared_pairs: HashSet<(ClassId, SubjectId)> = req
        .subjectTeacherMappings
        .iter()
        .map(|m| (m.class, m.subject.clone()))
        .collect();

    for (gi, g) in req.groupClasses.iter().enumerate() {
        if g.classes.is_empty() {
            errors.push(format!("groupClasses[{gi}]: classes is empty"));
        }
        for &c in &g.classes {
            in_range(c, &mut errors, &format!("groupClasses[{gi}]"));
            if !declared_pairs.contains(&(c, g.subject.clone())) {
                errors.push(format!(
                    "groupClasses[{gi}]: (class {c}, subject {}) is not declared in subjectTeacherMappings",
                    g.subject
                ));
            }
        }
        if g.periodsPerWeek < 0 {
            errors.push(format!("groupClasses[{gi}]: periodsPerWeek is negative"));
        }
        if let Some(days) = &g.selectedDays {
            for &d in days {
                if !(1..=6).contains(&d) {
                    errors.push(format!(
                        "groupClasses[{gi}]: selectedDays entry {d} is outside 1..6"
                    ));
                }
            }
        }
        if let Some(slots) = &g.selectedSlots {
            for &s in slots {
                if !(1..=cfg.periodsPerDay as u8).contains(&s) {
                    errors.push(format!(
                        "groupClasses[{gi}]: selectedSlots entry {s} is outside 1..{}",
                        cfg.periodsPerDay
                    ));
                }
            }
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(ValidationError::Msg(errors.join("; ")))
    }
}

fn admissible_periods(
    periods_per_day: u32,
    selected_days: &Option<Vec<u8>>,
    selected_slots: &Option<Vec<u8>>,
) -> HashSet<usize> {
    let p = periods_per_day as usize;
    let days: Option<HashSet<usize>> = selected_days
        .as_ref()
        .filter(|d| !d.is_empty())
        .map(|d| d.iter().map(|&x| (x - 1) as usize).collect());
    let slots: Option<HashSet<usize>> = selected_slots
        .as_ref()
        .filter(|s| !s.is_empty())
        .map(|s| s.iter().map(|&x| (x - 1) as usize).collect());

    (0..6 * p)
        .filter(|&period| {
            let d = period / p;
            let s = period % p;
            days.as_ref().map_or(true, |set| set.contains(&d))
                && slots.as_ref().map_or(true, |set| set.contains(&s))
        })
        .collect()
}

/// Builds the derived indices from a validated request. Duplicate (c,s) in
/// either mapping: last write wins, matching `subjects_per_class[class_id][subject] = teacher`
/// style dict assignment in the reference implementation this core descends from.
pub fn build(req: &Request, cfg: &SolverConfig) -> Result<Indices, TimetableError> {
    validate(req, cfg).map_err(|ValidationError::Msg(m)| TimetableError::InvalidConfig(m))?;

    let mut subjects_per_class: HashMap<ClassId, HashMap<SubjectId, TeacherId>> = req
        .class_ids()
        .map(|c| (c, HashMap::new()))
        .collect();
    for m in &req.subjectTeacherMappings {
        subjects_per_class
            .entry(m.class)
            .or_default()
            .insert(m.subject.clone(), m.teacher.clone());
    }

    let mut demand: HashMap<(ClassId, SubjectId), u32> = HashMap::new();
    for m in &req.subjectPeriodMappings {
        demand.insert((m.class, m.subject.clone()), m.periodsPerWeek.max(0) as u32);
    }

    for (&c, subs) in &subjects_per_class {
        for s in subs.keys() {
            if !demand.contains_key(&(c, s.clone())) {
                warn!(class = %c, subject = %s, "subject has a teacher but no declared demand; treating as 0 periods/week");
            }
        }
    }

    let mut groups = Vec::with_capacity(req.groupClasses.len());
    let mut group_assignments: HashSet<(ClassId, SubjectId)> = HashSet::new();
    let mut teacher_group: HashMap<TeacherId, HashSet<usize>> = HashMap::new();

    for (gi, g) in req.groupClasses.iter().enumerate() {
        for &c in &g.classes {
            group_assignments.insert((c, g.subject.clone()));
        }
        teacher_group.entry(g.teacher.clone()).or_default().insert(gi);
        groups.push(GroupRec {
            subject: g.subject.clone(),
            classes: g.classes.clone(),
            teacher: g.teacher.clone(),
            periods_per_week: g.periodsPerWeek.max(0) as u32,
            admissible: admissible_periods(cfg.periodsPerDay, &g.selectedDays, &g.selectedSlots),
        });
    }

    let mut teacher_individual: HashMap<TeacherId, Vec<(ClassId, SubjectId)>> = HashMap::new();
    for (&c, subs) in &subjects_per_class {
        for (s, t) in subs {
            if !group_assignments.contains(&(c, s.clone())) {
                teacher_individual
                    .entry(t.clone())
                    .or_default()
                    .push((c, s.clone()));
            }
        }
    }

    Ok(Indices {
        num_classes: req.numClasses,
        periods_per_day: cfg.periodsPerDay,
        subjects_per_class,
        demand,
        group_assignments,
        groups,
        teacher_individual,
        teacher_group,
    })
}
