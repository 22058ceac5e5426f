use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;
use utoipa::ToSchema;

macro_rules! id_newtype {
    ($name:ident) => {
        #[derive(
            Clone, Debug, Serialize, Deserialize, ToSchema, JsonSchema, Eq, PartialEq, Hash, Ord, PartialOrd,
        )]
        #[serde(transparent)]
        pub struct $name(pub String);

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                self.0.fmt(f)
            }
        }

        impl From<&str> for $name {
            fn from(s: &str) -> Self {
                Self(s.to_string())
            }
        }
    };
}
id_newtype!(TeacherId);
id_newtype!(SubjectId);

#[derive(
    Clone, Copy, Debug, Serialize, Deserialize, ToSchema, JsonSchema, Eq, PartialEq, Hash, Ord, PartialOrd,
)]
#[serde(transparent)]
pub struct ClassId(pub u32);

impl fmt::Display for ClassId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

#[derive(Clone, Copy, Debug, Serialize, Deserialize, ToSchema, JsonSchema, Eq, PartialEq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum DayOfWeek {
    Mon,
    Tue,
    Wed,
    Thu,
    Fri,
    Sat,
}

impl DayOfWeek {
    pub const ALL: [DayOfWeek; 6] = [
        DayOfWeek::Mon,
        DayOfWeek::Tue,
        DayOfWeek::Wed,
        DayOfWeek::Thu,
        DayOfWeek::Fri,
        DayOfWeek::Sat,
    ];

    /// 1-based day number, matching the wire format of `selectedDays`.
    pub fn from_one_based(n: u8) -> Option<Self> {
        Self::ALL.get((n as usize).checked_sub(1)?).copied()
    }
}

#[derive(Clone, Debug, Serialize, Deserialize, ToSchema, JsonSchema)]
pub struct SubjectTeacherMapping {
    pub class: ClassId,
    pub subject: SubjectId,
    pub teacher: TeacherId,
}

#[derive(Clone, Debug, Serialize, Deserialize, ToSchema, JsonSchema)]
pub struct SubjectPeriodMapping {
    pub class: ClassId,
    pub subject: SubjectId,
    pub periodsPerWeek: i64,
}

#[derive(Clone, Debug, Serialize, Deserialize, ToSchema, JsonSchema)]
pub struct GroupClass {
    pub subject: SubjectId,
    pub classes: Vec<ClassId>,
    pub teacher: TeacherId,
    pub periodsPerWeek: i64,
    #[serde(default)]
    pub selectedDays: Option<Vec<u8>>,
    #[serde(default)]
    pub selectedSlots: Option<Vec<u8>>,
}

#[derive(Clone, Debug, Serialize, Deserialize, ToSchema, JsonSchema)]
pub struct Request {
    pub numClasses: u32,
    #[serde(default)]
    pub subjectTeacherMappings: Vec<SubjectTeacherMapping>,
    #[serde(default)]
    pub subjectPeriodMappings: Vec<SubjectPeriodMapping>,
    #[serde(default)]
    pub groupClasses: Vec<GroupClass>,
}

impl Request {
    pub fn class_ids(&self) -> impl Iterator<Item = ClassId> {
        (1..=self.numClasses).map(ClassId)
    }

    pub fn timeslot_count(&self, periods_per_day: u32) -> usize {
        6 * periods_per_day as usize
    }
}

#[derive(Clone, Copy, Debug, Serialize, Deserialize, ToSchema, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum SolverKind {
    Milp,
    Heuristic,
}

#[derive(Clone, Debug, Serialize, Deserialize, ToSchema, JsonSchema)]
pub struct SolverConfig {
    /// Periods per day (P). The full I7-I9 constraint set is only coherent with P=6,
    /// but the core never assumes a value silently -- callers must set it.
    pub periodsPerDay: u32,
    #[serde(default = "default_max_same_subject_per_day")]
    pub maxSameSubjectPerDay: u32,
    #[serde(default = "default_true")]
    pub strictSpacing: bool,
    #[serde(default)]
    pub enableAdjacency: bool,
    #[serde(default = "default_solver_kind")]
    pub solver: SolverKind,
    #[serde(default)]
    pub timeLimitSec: Option<u64>,
    #[serde(default)]
    pub deterministic: bool,
    #[serde(default)]
    pub seed: u64,
    #[serde(default)]
    pub repairLocalSearch: bool,
    #[serde(default)]
    pub repairSteps: Option<u32>,
}

fn default_max_same_subject_per_day() -> u32 {
    2
}
fn default_true() -> bool {
    true
}
fn default_solver_kind() -> SolverKind {
    SolverKind::Milp
}

impl Default for SolverConfig {
    fn default() -> Self {
        Self {
            periodsPerDay: 6,
            maxSameSubjectPerDay: default_max_same_subject_per_day(),
            strictSpacing: true,
            enableAdjacency: false,
            solver: SolverKind::Milp,
            timeLimitSec: None,
            deterministic: false,
            seed: 0,
            repairLocalSearch: false,
            repairSteps: None,
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize, ToSchema, JsonSchema)]
pub struct SolveEnvelope {
    pub request: Request,
    pub config: SolverConfig,
}

#[derive(Clone, Debug, Serialize, Deserialize, ToSchema, JsonSchema)]
pub struct Cell {
    pub subject: SubjectId,
    pub teacher: TeacherId,
}

/// `grid.0[day][slot][class_index]`, outer length 6, middle length P, inner length N.
#[derive(Clone, Debug, Default, Serialize, Deserialize, ToSchema, JsonSchema)]
#[serde(transparent)]
pub struct Grid(pub Vec<Vec<Vec<Option<Cell>>>>);

impl Grid {
    pub fn empty(periods_per_day: u32, num_classes: u32) -> Self {
        let p = periods_per_day as usize;
        let n = num_classes as usize;
        Grid(vec![vec![vec![None; n]; p]; 6])
    }
}

#[derive(Clone, Debug, Serialize, Deserialize, ToSchema, JsonSchema)]
pub struct SolveResult {
    pub status: String,
    pub objective: f64,
    #[serde(default)]
    pub schedule: Option<Grid>,
    pub stats: serde_json::Value,
}

/// Convenience used by validation: the set of valid class ids for this request.
pub fn valid_class_ids(num_classes: u32) -> HashSet<ClassId> {
    (1..=num_classes).map(ClassId).collect()
}
