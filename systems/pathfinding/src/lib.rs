#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Danger-aware A* search over the tower-defence grid.
//!
//! The [`Pathfinder`] owns a copy of the grid handed to it by the
//! orchestrator after every threat rebuild. Searches are 8-connected, use the
//! Euclidean distance to the goal as heuristic and charge each step its base
//! length plus the entered cell's danger scaled by the requested
//! [`PathStrategy`].

mod cache;

use std::{cmp::Reverse, collections::BinaryHeap, f64::consts::SQRT_2};

use arena_core::{CellCoord, Grid, PathStrategy};

use cache::{PathCache, PathKey};

/// Number of memoised paths kept between grid updates.
pub const DEFAULT_CACHE_CAPACITY: usize = 256;

/// Cost charged for moving from `from` into the adjacent cell `to`.
///
/// Returns `None` when `to` lies outside the grid.
#[must_use]
pub fn step_cost(
    grid: &Grid,
    from: CellCoord,
    to: CellCoord,
    strategy: PathStrategy,
) -> Option<f64> {
    let danger = grid.cost(to)?;
    let base = if from.is_diagonal_to(to) { SQRT_2 } else { 1.0 };
    Some(base + strategy.danger_weight() * danger)
}

/// Total cost of walking the path under the provided strategy.
///
/// Paths with fewer than two cells cost nothing.
#[must_use]
pub fn path_cost(grid: &Grid, path: &[CellCoord], strategy: PathStrategy) -> f64 {
    path.windows(2)
        .filter_map(|pair| step_cost(grid, pair[0], pair[1], strategy))
        .sum()
}

/// A* pathfinder that keeps the most recent grid and a bounded path cache.
#[derive(Debug)]
pub struct Pathfinder {
    grid: Grid,
    cache: PathCache,
    nodes: Vec<Node>,
    node_index: Vec<Option<usize>>,
    frontier: BinaryHeap<Reverse<(u64, u64, usize)>>,
}

impl Pathfinder {
    /// Creates a pathfinder searching the provided grid.
    #[must_use]
    pub fn new(grid: Grid) -> Self {
        Self::with_cache_capacity(grid, DEFAULT_CACHE_CAPACITY)
    }

    /// Creates a pathfinder that memoises at most `capacity` paths.
    #[must_use]
    pub fn with_cache_capacity(grid: Grid, capacity: usize) -> Self {
        Self {
            grid,
            cache: PathCache::new(capacity),
            nodes: Vec::new(),
            node_index: Vec::new(),
            frontier: BinaryHeap::new(),
        }
    }

    /// Grid currently used for searches.
    #[must_use]
    pub fn grid(&self) -> &Grid {
        &self.grid
    }

    /// Number of paths currently memoised.
    #[must_use]
    pub fn cached_paths(&self) -> usize {
        self.cache.len()
    }

    /// Replaces the searched grid and forgets every memoised path.
    pub fn update_grid(&mut self, grid: Grid) {
        self.grid = grid;
        self.cache.clear();
    }

    /// Finds the cheapest path from `start` to `goal`, both inclusive.
    ///
    /// Returns an empty path when either endpoint lies outside the grid or is
    /// blocked, or when the goal cannot be reached.
    pub fn find_path(
        &mut self,
        start: CellCoord,
        goal: CellCoord,
        strategy: PathStrategy,
    ) -> Vec<CellCoord> {
        if !self.grid.is_walkable(start) || !self.grid.is_walkable(goal) {
            return Vec::new();
        }
        if start == goal {
            return vec![start];
        }

        let key = PathKey {
            start,
            goal,
            strategy,
            version: self.grid.version(),
        };
        if let Some(path) = self.cache.get(&key) {
            return path.to_vec();
        }

        let path = self.search(start, goal, strategy);
        self.cache.insert(key, path.clone());
        path
    }

    fn search(
        &mut self,
        start: CellCoord,
        goal: CellCoord,
        strategy: PathStrategy,
    ) -> Vec<CellCoord> {
        let size = self.grid.size() as usize;
        self.nodes.clear();
        self.frontier.clear();
        self.node_index.clear();
        self.node_index.resize(size * size, None);

        self.open(start, 0.0, heuristic(start, goal), None);

        while let Some(Reverse((f_bits, _, current))) = self.frontier.pop() {
            let node = self.nodes[current];
            if node.closed || node.f.to_bits() != f_bits {
                continue;
            }
            if node.cell == goal {
                return self.reconstruct(current);
            }
            self.nodes[current].closed = true;

            let neighbours: Vec<CellCoord> = self.grid.neighbours(node.cell).collect();
            for neighbour in neighbours {
                if !self.grid.is_walkable(neighbour) {
                    continue;
                }
                let Some(step) = step_cost(&self.grid, node.cell, neighbour, strategy) else {
                    continue;
                };
                let tentative = node.g + step;

                match self.index_of(neighbour) {
                    Some(existing) => {
                        let known = &mut self.nodes[existing];
                        if known.closed || tentative >= known.g {
                            continue;
                        }
                        known.g = tentative;
                        known.f = tentative + heuristic(neighbour, goal);
                        known.parent = Some(current);
                        self.frontier
                            .push(Reverse((known.f.to_bits(), known.discovered, existing)));
                    }
                    None => {
                        self.open(neighbour, tentative, heuristic(neighbour, goal), Some(current));
                    }
                }
            }
        }

        Vec::new()
    }

    fn grid_slot(&self, cell: CellCoord) -> usize {
        cell.row() as usize * self.grid.size() as usize + cell.column() as usize
    }

    fn index_of(&self, cell: CellCoord) -> Option<usize> {
        self.node_index
            .get(self.grid_slot(cell))
            .copied()
            .flatten()
    }

    fn open(&mut self, cell: CellCoord, g: f64, h: f64, parent: Option<usize>) {
        let index = self.nodes.len();
        let discovered = index as u64;
        let f = g + h;
        self.nodes.push(Node {
            cell,
            g,
            f,
            parent,
            discovered,
            closed: false,
        });
        let slot = self.grid_slot(cell);
        if let Some(entry) = self.node_index.get_mut(slot) {
            *entry = Some(index);
        }
        self.frontier.push(Reverse((f.to_bits(), discovered, index)));
    }

    fn reconstruct(&self, mut index: usize) -> Vec<CellCoord> {
        let mut path = Vec::new();
        loop {
            let node = &self.nodes[index];
            path.push(node.cell);
            match node.parent {
                Some(parent) => index = parent,
                None => break,
            }
        }
        path.reverse();
        path
    }
}

/// Search node stored in the arena; `parent` indexes into the same arena.
#[derive(Clone, Copy, Debug)]
struct Node {
    cell: CellCoord,
    g: f64,
    f: f64,
    parent: Option<usize>,
    discovered: u64,
    closed: bool,
}

fn heuristic(from: CellCoord, to: CellCoord) -> f64 {
    from.euclidean_distance(to)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn start_equal_to_goal_yields_single_cell() {
        let mut pathfinder = Pathfinder::new(Grid::new(5));
        let cell = CellCoord::new(2, 2);
        assert_eq!(pathfinder.find_path(cell, cell, PathStrategy::Shortest), vec![cell]);
    }

    #[test]
    fn blocked_or_outside_endpoints_yield_empty_paths() {
        let mut grid = Grid::new(5);
        let _ = grid.set_walkable(CellCoord::new(4, 4), false);
        let mut pathfinder = Pathfinder::new(grid);

        assert!(pathfinder
            .find_path(CellCoord::new(0, 0), CellCoord::new(4, 4), PathStrategy::Adaptive)
            .is_empty());
        assert!(pathfinder
            .find_path(CellCoord::new(7, 0), CellCoord::new(1, 1), PathStrategy::Adaptive)
            .is_empty());
    }

    #[test]
    fn walled_off_goal_is_unreachable() {
        let mut grid = Grid::new(5);
        for row in 0..5 {
            let _ = grid.set_walkable(CellCoord::new(2, row), false);
        }
        let mut pathfinder = Pathfinder::new(grid);

        let path = pathfinder.find_path(
            CellCoord::new(0, 2),
            CellCoord::new(4, 2),
            PathStrategy::Shortest,
        );
        assert!(path.is_empty());
    }

    #[test]
    fn diagonal_moves_are_preferred_on_open_grids() {
        let mut pathfinder = Pathfinder::new(Grid::new(6));
        let path = pathfinder.find_path(
            CellCoord::new(0, 0),
            CellCoord::new(5, 5),
            PathStrategy::Shortest,
        );
        assert_eq!(path.len(), 6);
        let cost = path_cost(pathfinder.grid(), &path, PathStrategy::Shortest);
        assert!((cost - 5.0 * SQRT_2).abs() < 1e-9);
    }

    #[test]
    fn paths_detour_around_blocked_cells() {
        let mut grid = Grid::new(5);
        for row in 0..4 {
            let _ = grid.set_walkable(CellCoord::new(2, row), false);
        }
        let mut pathfinder = Pathfinder::new(grid);

        let path = pathfinder.find_path(
            CellCoord::new(0, 0),
            CellCoord::new(4, 0),
            PathStrategy::Shortest,
        );
        assert!(path.contains(&CellCoord::new(2, 4)));
        assert!(path.iter().all(|cell| pathfinder.grid().is_walkable(*cell)));
        for pair in path.windows(2) {
            assert!(pair[0].column().abs_diff(pair[1].column()) <= 1);
            assert!(pair[0].row().abs_diff(pair[1].row()) <= 1);
        }
    }

    #[test]
    fn cache_is_cleared_when_the_grid_changes() {
        let mut pathfinder = Pathfinder::new(Grid::new(8));
        let _ = pathfinder.find_path(
            CellCoord::new(0, 0),
            CellCoord::new(7, 7),
            PathStrategy::Safest,
        );
        assert_eq!(pathfinder.cached_paths(), 1);

        pathfinder.update_grid(Grid::new(8));
        assert_eq!(pathfinder.cached_paths(), 0);
    }
}
