#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Deterministic movement system that keeps enemy paths fresh.
//!
//! The world moves enemies along whatever path they hold; this system decides
//! when a path has gone stale and asks the pathfinder for a new one using the
//! enemy's own strategy.

use std::time::Duration;

use arena_core::{CellCoord, Command, EnemyId, EnemyView, Event, PathStrategy};
use arena_system_pathfinding::Pathfinder;

/// Pure system that reacts to world events and emits path assignments.
#[derive(Debug, Default)]
pub struct Movement {
    requests: Vec<PathRequest>,
}

impl Movement {
    /// Creates a movement system with an empty request buffer.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Consumes world events and the enemy view to emit `AssignPath` commands.
    ///
    /// Enemies are considered after time advanced or after new enemies
    /// spawned. Each enemy whose path is empty or older than the refresh
    /// interval is routed from the cell under it to `goal`. Searches that come
    /// back empty emit nothing, so the enemy keeps its previous path.
    pub fn handle(
        &mut self,
        events: &[Event],
        enemies: &EnemyView,
        now: Duration,
        goal: CellCoord,
        pathfinder: &mut Pathfinder,
        out: &mut Vec<Command>,
    ) {
        let relevant = events.iter().any(|event| {
            matches!(
                event,
                Event::TimeAdvanced { .. } | Event::EnemySpawned { .. }
            )
        });
        if !relevant || enemies.is_empty() {
            return;
        }

        let size = pathfinder.grid().size();
        self.requests.clear();
        for enemy in enemies.iter() {
            if !enemy.needs_path(now) {
                continue;
            }
            let Some(start) = CellCoord::clamped(enemy.position, size) else {
                continue;
            };
            self.requests.push(PathRequest {
                enemy: enemy.id,
                start,
                strategy: enemy.strategy,
            });
        }

        for request in &self.requests {
            let path = pathfinder.find_path(request.start, goal, request.strategy);
            if path.is_empty() {
                continue;
            }
            out.push(Command::AssignPath {
                enemy: request.enemy,
                path,
            });
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
struct PathRequest {
    enemy: EnemyId,
    start: CellCoord,
    strategy: PathStrategy,
}

#[cfg(test)]
mod tests {
    use super::*;
    use arena_core::{EnemyKind, EnemySnapshot, Grid};

    fn enemy(
        id: u32,
        cell: CellCoord,
        path_len: usize,
        updated: Option<Duration>,
    ) -> EnemySnapshot {
        let kind = EnemyKind::Stealth;
        EnemySnapshot {
            id: EnemyId::new(id),
            kind,
            position: cell.position(),
            health: 80,
            max_health: 80,
            strategy: kind.profile().strategy,
            path_len,
            path_index: 0,
            last_path_update: updated,
        }
    }

    fn tick_events() -> Vec<Event> {
        vec![Event::TimeAdvanced {
            dt: Duration::from_millis(16),
        }]
    }

    #[test]
    fn ignores_batches_without_time_or_spawns() {
        let mut movement = Movement::new();
        let mut pathfinder = Pathfinder::new(Grid::new(5));
        let enemies = EnemyView::from_snapshots(vec![enemy(0, CellCoord::new(0, 2), 0, None)]);
        let mut out = Vec::new();

        movement.handle(
            &[Event::WorldReset],
            &enemies,
            Duration::ZERO,
            CellCoord::new(4, 2),
            &mut pathfinder,
            &mut out,
        );

        assert!(out.is_empty());
    }

    #[test]
    fn only_stale_paths_are_recomputed() {
        let mut movement = Movement::new();
        let mut pathfinder = Pathfinder::new(Grid::new(5));
        let enemies = EnemyView::from_snapshots(vec![
            enemy(0, CellCoord::new(0, 2), 0, None),
            enemy(1, CellCoord::new(1, 2), 4, Some(Duration::from_secs(1))),
            enemy(2, CellCoord::new(2, 2), 3, Some(Duration::ZERO)),
        ]);
        let mut out = Vec::new();

        movement.handle(
            &tick_events(),
            &enemies,
            Duration::from_millis(2_500),
            CellCoord::new(4, 2),
            &mut pathfinder,
            &mut out,
        );

        let assigned: Vec<EnemyId> = out
            .iter()
            .filter_map(|command| match command {
                Command::AssignPath { enemy, .. } => Some(*enemy),
                _ => None,
            })
            .collect();
        assert_eq!(assigned, vec![EnemyId::new(0), EnemyId::new(2)]);
    }

    #[test]
    fn unreachable_goals_emit_nothing() {
        let mut movement = Movement::new();
        let mut grid = Grid::new(5);
        let _ = grid.set_walkable(CellCoord::new(4, 2), false);
        let mut pathfinder = Pathfinder::new(grid);
        let enemies = EnemyView::from_snapshots(vec![enemy(0, CellCoord::new(0, 2), 0, None)]);
        let mut out = Vec::new();

        movement.handle(
            &tick_events(),
            &enemies,
            Duration::ZERO,
            CellCoord::new(4, 2),
            &mut pathfinder,
            &mut out,
        );

        assert!(out.is_empty());
    }
}
