use crate::{CellCoord, TowerId};

/// State of a single cell on the tower-defence grid.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct GridCell {
    cell: CellCoord,
    walkable: bool,
    cost: f64,
    tower: Option<TowerId>,
}

impl GridCell {
    fn empty(cell: CellCoord) -> Self {
        Self {
            cell,
            walkable: true,
            cost: 0.0,
            tower: None,
        }
    }

    /// Coordinate of the cell.
    #[must_use]
    pub const fn cell(&self) -> CellCoord {
        self.cell
    }

    /// Whether enemies may traverse the cell.
    #[must_use]
    pub const fn is_walkable(&self) -> bool {
        self.walkable
    }

    /// Accumulated danger cost contributed by nearby towers.
    #[must_use]
    pub const fn cost(&self) -> f64 {
        self.cost
    }

    /// Tower occupying the cell, if any.
    #[must_use]
    pub const fn tower(&self) -> Option<TowerId> {
        self.tower
    }
}

/// Square grid of cells carrying walkability, danger cost and tower occupancy.
///
/// The version counter increases on every mutation so cached paths computed
/// against an older layout can be recognised as stale.
#[derive(Clone, Debug, PartialEq)]
pub struct Grid {
    size: u32,
    cells: Vec<GridCell>,
    version: u64,
}

impl Grid {
    /// Creates a fully walkable grid with zero cost everywhere.
    #[must_use]
    pub fn new(size: u32) -> Self {
        let mut cells = Vec::with_capacity((size as usize) * (size as usize));
        for row in 0..size {
            for column in 0..size {
                cells.push(GridCell::empty(CellCoord::new(column, row)));
            }
        }
        Self {
            size,
            cells,
            version: 0,
        }
    }

    /// Number of cells along each edge.
    #[must_use]
    pub const fn size(&self) -> u32 {
        self.size
    }

    /// Monotonic counter bumped on every mutation.
    #[must_use]
    pub const fn version(&self) -> u64 {
        self.version
    }

    /// Reports whether the coordinate lies inside the grid.
    #[must_use]
    pub const fn contains(&self, cell: CellCoord) -> bool {
        cell.column() < self.size && cell.row() < self.size
    }

    fn index(&self, cell: CellCoord) -> Option<usize> {
        if !self.contains(cell) {
            return None;
        }
        Some(cell.row() as usize * self.size as usize + cell.column() as usize)
    }

    /// Returns the cell at the coordinate when it lies inside the grid.
    #[must_use]
    pub fn cell(&self, cell: CellCoord) -> Option<&GridCell> {
        self.index(cell).and_then(|index| self.cells.get(index))
    }

    /// Whether the cell can be traversed; cells outside the grid never can.
    #[must_use]
    pub fn is_walkable(&self, cell: CellCoord) -> bool {
        self.cell(cell).is_some_and(GridCell::is_walkable)
    }

    /// Danger cost of the cell, or `None` outside the grid.
    #[must_use]
    pub fn cost(&self, cell: CellCoord) -> Option<f64> {
        self.cell(cell).map(GridCell::cost)
    }

    /// Tower occupying the cell, if any.
    #[must_use]
    pub fn tower_at(&self, cell: CellCoord) -> Option<TowerId> {
        self.cell(cell).and_then(GridCell::tower)
    }

    /// Iterator over all cells in row-major order.
    pub fn iter(&self) -> impl Iterator<Item = &GridCell> {
        self.cells.iter()
    }

    /// Changes walkability of a cell. Returns `false` when the cell lies outside the grid.
    pub fn set_walkable(&mut self, cell: CellCoord, walkable: bool) -> bool {
        let Some(index) = self.index(cell) else {
            return false;
        };
        self.cells[index].walkable = walkable;
        self.version += 1;
        true
    }

    /// Records tower occupancy. Returns `false` when the cell lies outside the grid.
    pub fn set_tower(&mut self, cell: CellCoord, tower: Option<TowerId>) -> bool {
        let Some(index) = self.index(cell) else {
            return false;
        };
        self.cells[index].tower = tower;
        self.version += 1;
        true
    }

    /// Resets every danger cost to zero without bumping the version.
    pub fn clear_costs(&mut self) {
        for cell in &mut self.cells {
            cell.cost = 0.0;
        }
    }

    /// Adds danger to a cell. Cells outside the grid are ignored.
    pub fn add_cost(&mut self, cell: CellCoord, amount: f64) {
        if let Some(index) = self.index(cell) {
            self.cells[index].cost += amount;
        }
    }

    /// Marks the grid as changed.
    pub fn bump_version(&mut self) {
        self.version += 1;
    }

    /// Up to eight neighbours of the cell that lie inside the grid.
    pub fn neighbours(&self, cell: CellCoord) -> impl Iterator<Item = CellCoord> + '_ {
        const OFFSETS: [(i64, i64); 8] = [
            (-1, -1),
            (0, -1),
            (1, -1),
            (-1, 0),
            (1, 0),
            (-1, 1),
            (0, 1),
            (1, 1),
        ];
        OFFSETS.iter().filter_map(move |(dx, dy)| {
            let column = i64::from(cell.column()) + dx;
            let row = i64::from(cell.row()) + dy;
            let column = u32::try_from(column).ok()?;
            let row = u32::try_from(row).ok()?;
            let neighbour = CellCoord::new(column, row);
            self.contains(neighbour).then_some(neighbour)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_grid_is_walkable_and_free_of_danger() {
        let grid = Grid::new(4);
        assert_eq!(grid.iter().count(), 16);
        assert!(grid.iter().all(|cell| cell.is_walkable()));
        assert!(grid.iter().all(|cell| cell.cost() == 0.0));
        assert_eq!(grid.version(), 0);
    }

    #[test]
    fn cells_outside_grid_are_never_walkable() {
        let grid = Grid::new(3);
        assert!(!grid.is_walkable(CellCoord::new(3, 0)));
        assert!(grid.cost(CellCoord::new(0, 3)).is_none());
    }

    #[test]
    fn mutations_bump_version() {
        let mut grid = Grid::new(3);
        assert!(grid.set_walkable(CellCoord::new(1, 1), false));
        assert!(!grid.is_walkable(CellCoord::new(1, 1)));
        assert_eq!(grid.version(), 1);
        assert!(!grid.set_walkable(CellCoord::new(9, 9), false));
        assert_eq!(grid.version(), 1, "out-of-bounds writes leave the grid untouched");
    }

    #[test]
    fn corner_cells_have_three_neighbours() {
        let grid = Grid::new(5);
        assert_eq!(grid.neighbours(CellCoord::new(0, 0)).count(), 3);
        assert_eq!(grid.neighbours(CellCoord::new(2, 2)).count(), 8);
        assert_eq!(grid.neighbours(CellCoord::new(4, 2)).count(), 5);
    }

    #[test]
    fn add_cost_accumulates() {
        let mut grid = Grid::new(3);
        grid.add_cost(CellCoord::new(1, 2), 1.5);
        grid.add_cost(CellCoord::new(1, 2), 0.5);
        grid.add_cost(CellCoord::new(7, 2), 9.0);
        assert_eq!(grid.cost(CellCoord::new(1, 2)), Some(2.0));
        grid.clear_costs();
        assert_eq!(grid.cost(CellCoord::new(1, 2)), Some(0.0));
    }
}
