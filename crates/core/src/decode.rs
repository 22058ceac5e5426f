use types::{Cell, Grid};

use crate::adapter::SolverAdapter;
use crate::error::TimetableError;
use crate::index::Indices;
use crate::model::ModelHandles;

/// Maps solved variable values back into a day x period x class grid.
/// Fails only on conditions that indicate an adapter bug (a non-binary
/// value, or a cell that would be overwritten) -- I4 and I3 guarantee
/// exactly one non-empty cell per class per period and that grouped classes
/// share identical cells, so either failure means the solver or adapter lied
/// about its own solution.
pub fn decode(
    idx: &Indices,
    handles: &ModelHandles,
    adapter: &dyn SolverAdapter,
) -> Result<Grid, TimetableError> {
    let mut grid = Grid::empty(idx.periods_per_day, idx.num_classes);

    for ((c, s, p), &var) in &handles.x {
        let val = adapter.value_of(var);
        if val > 1 {
            return Err(TimetableError::DecodeError(format!(
                "value_of(x[{c},{s},{p}]) returned non-binary value {val}"
            )));
        }
        if val == 0 {
            continue;
        }

        let teacher = idx
            .subjects_per_class
            .get(c)
            .and_then(|subs| subs.get(s))
            .cloned()
            .ok_or_else(|| {
                TimetableError::DecodeError(format!("no teacher recorded for (class {c}, subject {s})"))
            })?;

        let d = idx.day_of(*p);
        let k = idx.slot_of(*p);
        let cell_slot = &mut grid.0[d][k][(c.0 - 1) as usize];
        if cell_slot.is_some() {
            return Err(TimetableError::DecodeError(format!(
                "cell (day {d}, slot {k}, class {c}) was assigned twice"
            )));
        }
        *cell_slot = Some(Cell {
            subject: s.clone(),
            teacher,
        });
    }

    Ok(grid)
}
