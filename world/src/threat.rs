//! Danger field builder used by the world crate.

use arena_core::{CellCoord, Grid};

use crate::towers::TowerState;

/// Rebuilds every cell's danger cost from the provided towers.
///
/// Costs are reset to zero first, so repeated rebuilds over the same tower
/// set produce the same field. Each tower contributes
/// `damage × level × (1 − d / range) / 10` to every cell at Euclidean
/// distance `d ≤ range`; contributions from several towers add up.
pub(crate) fn rebuild<'a, I>(grid: &mut Grid, towers: I)
where
    I: IntoIterator<Item = &'a TowerState>,
{
    grid.clear_costs();
    let size = grid.size();

    for tower in towers {
        if tower.range == 0 || size == 0 {
            continue;
        }

        let range = f64::from(tower.range);
        let strength = f64::from(tower.damage) * f64::from(tower.level);
        let first_column = tower.cell.column().saturating_sub(tower.range);
        let last_column = tower.cell.column().saturating_add(tower.range).min(size - 1);
        let first_row = tower.cell.row().saturating_sub(tower.range);
        let last_row = tower.cell.row().saturating_add(tower.range).min(size - 1);

        for row in first_row..=last_row {
            for column in first_column..=last_column {
                let cell = CellCoord::new(column, row);
                let distance = tower.cell.euclidean_distance(cell);
                if distance > range {
                    continue;
                }
                grid.add_cost(cell, strength * (1.0 - distance / range) / 10.0);
            }
        }
    }

    grid.bump_version();
}
