//! Enemy records and their movement along assigned paths.

use std::time::Duration;

use arena_core::{CellCoord, EnemyId, EnemyKind, EnemySnapshot, PathStrategy};
use glam::Vec2;

/// Distance below which an enemy counts as standing on its waypoint.
const WAYPOINT_EPSILON: f32 = 0.1;

/// How an enemy left, or is about to leave, the grid.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum Fate {
    Alive,
    Killed,
    Escaped,
}

#[derive(Clone, Debug)]
pub(crate) struct Enemy {
    pub(crate) id: EnemyId,
    pub(crate) kind: EnemyKind,
    pub(crate) position: Vec2,
    pub(crate) health: u32,
    pub(crate) max_health: u32,
    pub(crate) speed: f32,
    pub(crate) reward: u32,
    pub(crate) strategy: PathStrategy,
    pub(crate) path: Vec<CellCoord>,
    pub(crate) path_index: usize,
    pub(crate) last_path_update: Option<Duration>,
    pub(crate) fate: Fate,
}

impl Enemy {
    pub(crate) fn spawn(id: EnemyId, kind: EnemyKind, position: Vec2) -> Self {
        let profile = kind.profile();
        Self {
            id,
            kind,
            position,
            health: profile.health,
            max_health: profile.health,
            speed: profile.speed,
            reward: profile.reward,
            strategy: profile.strategy,
            path: Vec::new(),
            path_index: 0,
            last_path_update: None,
            fate: Fate::Alive,
        }
    }

    pub(crate) fn is_alive(&self) -> bool {
        self.fate == Fate::Alive
    }

    pub(crate) fn assign_path(&mut self, path: Vec<CellCoord>, now: Duration) {
        self.path = path;
        self.path_index = 0;
        self.last_path_update = Some(now);
    }

    /// Applies damage and records a kill once health is exhausted.
    pub(crate) fn take_damage(&mut self, damage: u32) {
        self.health = self.health.saturating_sub(damage);
        if self.health == 0 {
            self.fate = Fate::Killed;
        }
    }

    /// Walks along the path for `dt` seconds without passing any waypoint.
    ///
    /// Moving past the final waypoint marks the enemy escaped.
    pub(crate) fn advance(&mut self, dt: f32) {
        if !self.is_alive() || self.path.is_empty() {
            return;
        }

        let mut budget = self.speed * dt;
        while let Some(waypoint) = self.path.get(self.path_index) {
            let delta = waypoint.position() - self.position;
            let distance = delta.length();

            if distance < WAYPOINT_EPSILON {
                self.path_index += 1;
                continue;
            }
            if budget <= 0.0 {
                break;
            }

            let step = budget.min(distance);
            self.position += delta / distance * step;
            budget -= step;
            if step < distance {
                break;
            }
        }

        if self.path_index >= self.path.len() {
            self.health = 0;
            self.fate = Fate::Escaped;
        }
    }

    pub(crate) fn snapshot(&self) -> EnemySnapshot {
        EnemySnapshot {
            id: self.id,
            kind: self.kind,
            position: self.position,
            health: self.health,
            max_health: self.max_health,
            strategy: self.strategy,
            path_len: self.path.len(),
            path_index: self.path_index,
            last_path_update: self.last_path_update,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn straight_path() -> Vec<CellCoord> {
        (0..4).map(|column| CellCoord::new(column, 2)).collect()
    }

    #[test]
    fn enemy_without_path_holds_position() {
        let mut enemy = Enemy::spawn(EnemyId::new(0), EnemyKind::Fast, Vec2::new(-1.6, 2.0));
        enemy.advance(0.05);
        assert_eq!(enemy.position, Vec2::new(-1.6, 2.0));
        assert!(enemy.is_alive());
    }

    #[test]
    fn movement_never_overshoots_waypoints() {
        let mut enemy = Enemy::spawn(EnemyId::new(0), EnemyKind::Fast, Vec2::new(0.0, 2.0));
        enemy.assign_path(straight_path(), Duration::ZERO);

        enemy.advance(0.25);
        assert!((enemy.position.x - 0.5).abs() < 1e-5);
        assert_eq!(enemy.path_index, 1);

        enemy.advance(0.75);
        assert!((enemy.position.x - 2.0).abs() < 1e-5);
        assert!(enemy.position.y == 2.0);
        assert!(enemy.is_alive());
    }

    #[test]
    fn reaching_the_last_waypoint_marks_escape() {
        let mut enemy = Enemy::spawn(EnemyId::new(0), EnemyKind::Fast, Vec2::new(0.0, 2.0));
        enemy.assign_path(straight_path(), Duration::ZERO);

        for _ in 0..40 {
            enemy.advance(0.1);
        }

        assert_eq!(enemy.fate, Fate::Escaped);
        assert_eq!(enemy.health, 0);
        assert!(enemy.position.distance(Vec2::new(3.0, 2.0)) < 1e-4);
    }

    #[test]
    fn damage_records_kill() {
        let mut enemy = Enemy::spawn(EnemyId::new(3), EnemyKind::Fast, Vec2::ZERO);
        enemy.take_damage(20);
        assert!(enemy.is_alive());
        enemy.take_damage(40);
        assert_eq!(enemy.fate, Fate::Killed);
        assert_eq!(enemy.health, 0);
    }
}
