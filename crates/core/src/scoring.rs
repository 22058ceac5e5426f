use std::collections::HashMap;

use types::{ClassId, Grid};

/// Diagnostic breakdown of the soft adjacency objective for an already-decoded
/// grid -- lets `/v1/explain` (and tests) check a schedule's score without
/// re-solving, the way the teacher's soft-penalty breakdown works for its own
/// objective terms.
#[derive(Clone, Debug, Default)]
pub struct AdjacencyScore {
    pub pairs_total: i64,
    pub pairs_by_class: HashMap<ClassId, i64>,
}

pub fn compute_adjacency_score(periods_per_day: u32, grid: &Grid) -> AdjacencyScore {
    let p = periods_per_day as usize;
    let mut pairs_by_class: HashMap<ClassId, i64> = HashMap::new();
    let mut pairs_total = 0i64;

    if grid.0.is_empty() || grid.0[0].is_empty() {
        return AdjacencyScore::default();
    }
    let num_classes = grid.0[0][0].len();

    for day in &grid.0 {
        for class_idx in 0..num_classes {
            for k in 0..p.saturating_sub(1) {
                let a = &day[k][class_idx];
                let b = &day[k + 1][class_idx];
                if let (Some(a), Some(b)) = (a, b) {
                    if a.subject == b.subject {
                        pairs_total += 1;
                        *pairs_by_class
                            .entry(ClassId((class_idx + 1) as u32))
                            .or_default() += 1;
                    }
                }
            }
        }
    }

    AdjacencyScore {
        pairs_total,
        pairs_by_class,
    }
}
