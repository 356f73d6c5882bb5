#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Pure system that picks the closest enemy in range for every tower.

use arena_core::{EnemyId, EnemyView, TowerTarget, TowerView};
use glam::Vec2;

/// Tower targeting system that reuses scratch buffers to avoid repeated allocations.
#[derive(Debug, Default)]
pub struct TowerTargeting {
    enemy_workspace: Vec<EnemyCandidate>,
}

impl TowerTargeting {
    /// Creates a new tower targeting system with empty scratch buffers.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Computes tower targets for the provided world snapshot.
    ///
    /// The output buffer is cleared before populating it. Each tower receives
    /// at most one target: the enemy with the smallest Euclidean distance not
    /// exceeding the tower's range, ties going to the lower enemy id.
    pub fn handle(&mut self, towers: &TowerView, enemies: &EnemyView, out: &mut Vec<TowerTarget>) {
        out.clear();

        if enemies.is_empty() {
            return;
        }

        self.enemy_workspace.clear();
        self.enemy_workspace.reserve(enemies.len());
        for snapshot in enemies.iter() {
            if snapshot.health == 0 {
                continue;
            }
            self.enemy_workspace.push(EnemyCandidate {
                id: snapshot.id,
                position: snapshot.position,
            });
        }

        for tower in towers.iter() {
            let origin = tower.cell.position();
            let range = tower.range as f32;
            let mut best: Option<BestCandidate> = None;

            for candidate in &self.enemy_workspace {
                let distance = origin.distance(candidate.position);
                if !distance.is_finite() || distance > range {
                    continue;
                }

                let current = BestCandidate {
                    distance,
                    enemy: candidate.id,
                    position: candidate.position,
                };
                match &mut best {
                    Some(existing) => {
                        if current.precedes(existing) {
                            *existing = current;
                        }
                    }
                    None => best = Some(current),
                }
            }

            if let Some(best) = best {
                out.push(TowerTarget {
                    tower: tower.id,
                    enemy: best.enemy,
                    tower_position: origin,
                    enemy_position: best.position,
                });
            }
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
struct EnemyCandidate {
    id: EnemyId,
    position: Vec2,
}

#[derive(Clone, Copy, Debug, PartialEq)]
struct BestCandidate {
    distance: f32,
    enemy: EnemyId,
    position: Vec2,
}

impl BestCandidate {
    fn precedes(&self, other: &Self) -> bool {
        if self.distance != other.distance {
            return self.distance < other.distance;
        }

        self.enemy < other.enemy
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use arena_core::{CellCoord, EnemyKind, EnemySnapshot, TowerId, TowerKind, TowerSnapshot};

    fn target_of(targets: &[TowerTarget], tower: TowerId) -> Option<&TowerTarget> {
        targets.iter().find(|target| target.tower == tower)
    }

    fn tower_snapshot(id: u32, cell: (u32, u32), range: u32) -> TowerSnapshot {
        let profile = TowerKind::Basic.profile();
        TowerSnapshot {
            id: TowerId::new(id),
            kind: TowerKind::Basic,
            cell: CellCoord::new(cell.0, cell.1),
            level: 1,
            damage: profile.damage,
            range,
            upgrade_cost: profile.upgrade_cost,
        }
    }

    fn enemy_snapshot(id: u32, position: (f32, f32)) -> EnemySnapshot {
        let kind = EnemyKind::Fast;
        let profile = kind.profile();
        EnemySnapshot {
            id: EnemyId::new(id),
            kind,
            position: Vec2::new(position.0, position.1),
            health: profile.health,
            max_health: profile.health,
            strategy: profile.strategy,
            path_len: 0,
            path_index: 0,
            last_path_update: None,
        }
    }

    #[test]
    fn targets_enemy_within_range() {
        let mut system = TowerTargeting::new();
        let towers = TowerView::from_snapshots(vec![tower_snapshot(1, (4, 4), 3)]);
        let enemies = EnemyView::from_snapshots(vec![enemy_snapshot(2, (6.0, 5.0))]);

        let mut out = Vec::new();
        system.handle(&towers, &enemies, &mut out);

        assert_eq!(
            out,
            vec![TowerTarget {
                tower: TowerId::new(1),
                enemy: EnemyId::new(2),
                tower_position: Vec2::new(4.0, 4.0),
                enemy_position: Vec2::new(6.0, 5.0),
            }]
        );
    }

    #[test]
    fn range_boundary_is_inclusive() {
        let mut system = TowerTargeting::new();
        let towers = TowerView::from_snapshots(vec![tower_snapshot(1, (0, 0), 3)]);
        let enemies = EnemyView::from_snapshots(vec![
            enemy_snapshot(1, (3.0, 0.0)),
            enemy_snapshot(2, (3.1, 0.0)),
        ]);

        let mut out = Vec::new();
        system.handle(&towers, &enemies, &mut out);

        assert_eq!(out.len(), 1);
        assert_eq!(out[0].enemy, EnemyId::new(1));
    }

    #[test]
    fn closest_enemy_wins_over_lower_id() {
        let mut system = TowerTargeting::new();
        let towers = TowerView::from_snapshots(vec![tower_snapshot(1, (5, 5), 5)]);
        let enemies = EnemyView::from_snapshots(vec![
            enemy_snapshot(1, (9.0, 5.0)),
            enemy_snapshot(7, (6.0, 6.0)),
        ]);

        let mut out = Vec::new();
        system.handle(&towers, &enemies, &mut out);

        assert_eq!(out[0].enemy, EnemyId::new(7));
    }

    #[test]
    fn smaller_enemy_id_is_preferred_when_distances_match() {
        let mut system = TowerTargeting::new();
        let towers = TowerView::from_snapshots(vec![tower_snapshot(1, (5, 5), 3)]);
        let enemies = EnemyView::from_snapshots(vec![
            enemy_snapshot(20, (7.0, 5.0)),
            enemy_snapshot(10, (3.0, 5.0)),
        ]);

        let mut out = Vec::new();
        system.handle(&towers, &enemies, &mut out);

        assert_eq!(out.len(), 1);
        assert_eq!(out[0].enemy, EnemyId::new(10));
    }

    #[test]
    fn dead_and_distant_enemies_are_ignored() {
        let mut system = TowerTargeting::new();
        let towers = TowerView::from_snapshots(vec![tower_snapshot(1, (0, 0), 3)]);
        let mut dead = enemy_snapshot(1, (1.0, 0.0));
        dead.health = 0;
        let enemies = EnemyView::from_snapshots(vec![dead, enemy_snapshot(2, (20.0, 20.0))]);

        let mut out = vec![TowerTarget {
            tower: TowerId::new(99),
            enemy: EnemyId::new(99),
            tower_position: Vec2::ZERO,
            enemy_position: Vec2::ZERO,
        }];
        system.handle(&towers, &enemies, &mut out);

        assert!(out.is_empty());
    }

    #[test]
    fn every_tower_gets_its_own_target() {
        let mut system = TowerTargeting::new();
        let towers = TowerView::from_snapshots(vec![
            tower_snapshot(2, (10, 0), 2),
            tower_snapshot(1, (0, 0), 2),
        ]);
        let enemies = EnemyView::from_snapshots(vec![
            enemy_snapshot(1, (1.0, 1.0)),
            enemy_snapshot(2, (9.0, 0.0)),
        ]);

        let mut out = Vec::new();
        system.handle(&towers, &enemies, &mut out);

        assert_eq!(out.len(), 2);
        assert_eq!(
            target_of(&out, TowerId::new(1)).map(|target| target.enemy),
            Some(EnemyId::new(1))
        );
        assert_eq!(
            target_of(&out, TowerId::new(2)).map(|target| target.enemy),
            Some(EnemyId::new(2))
        );
        assert!(target_of(&out, TowerId::new(3)).is_none());
    }
}
