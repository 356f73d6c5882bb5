//! Authoritative tower state management utilities.

use std::{collections::BTreeMap, time::Duration};

use arena_core::{
    CellCoord, TowerCooldownSnapshot, TowerId, TowerKind, TowerSnapshot, UpgradeError,
    MAX_TOWER_LEVEL, MAX_TOWER_RANGE,
};

/// Mutable tower record stored inside the world.
#[derive(Clone, Debug, PartialEq)]
pub(crate) struct TowerState {
    pub(crate) id: TowerId,
    pub(crate) kind: TowerKind,
    pub(crate) cell: CellCoord,
    pub(crate) level: u8,
    pub(crate) damage: u32,
    pub(crate) range: u32,
    pub(crate) fire_rate: Duration,
    pub(crate) upgrade_cost: u32,
    pub(crate) last_fired: Option<Duration>,
}

impl TowerState {
    fn new(id: TowerId, kind: TowerKind, cell: CellCoord) -> Self {
        let profile = kind.profile();
        Self {
            id,
            kind,
            cell,
            level: 1,
            damage: profile.damage,
            range: profile.range,
            fire_rate: profile.fire_rate,
            upgrade_cost: profile.upgrade_cost,
            last_fired: None,
        }
    }

    /// Checks whether an upgrade is allowed with the provided amount of gold.
    pub(crate) fn check_upgrade(&self, gold: u32) -> Result<u32, UpgradeError> {
        if self.level >= MAX_TOWER_LEVEL {
            return Err(UpgradeError::MaxLevel);
        }
        if gold < self.upgrade_cost {
            return Err(UpgradeError::InsufficientFunds {
                required: self.upgrade_cost,
                available: gold,
            });
        }
        Ok(self.upgrade_cost)
    }

    /// Raises the level by one, scaling damage, range and the next upgrade cost.
    pub(crate) fn upgrade(&mut self) {
        self.level += 1;
        self.damage = self.damage * 3 / 2;
        self.range = (self.range + 1).min(MAX_TOWER_RANGE);
        self.upgrade_cost = self.upgrade_cost * 7 / 5;
    }

    /// Time left before the tower may fire again at simulated time `now`.
    pub(crate) fn ready_in(&self, now: Duration) -> Duration {
        match self.last_fired {
            None => Duration::ZERO,
            Some(fired) => {
                let elapsed = now.saturating_sub(fired);
                self.fire_rate.saturating_sub(elapsed)
            }
        }
    }

    pub(crate) fn snapshot(&self) -> TowerSnapshot {
        TowerSnapshot {
            id: self.id,
            kind: self.kind,
            cell: self.cell,
            level: self.level,
            damage: self.damage,
            range: self.range,
            upgrade_cost: self.upgrade_cost,
        }
    }

    pub(crate) fn cooldown(&self, now: Duration) -> TowerCooldownSnapshot {
        TowerCooldownSnapshot {
            tower: self.id,
            kind: self.kind,
            ready_in: self.ready_in(now),
        }
    }
}

/// Registry that stores towers and manages identifier allocation.
#[derive(Debug)]
pub(crate) struct TowerRegistry {
    entries: BTreeMap<TowerId, TowerState>,
    next_tower_id: TowerId,
}

impl TowerRegistry {
    /// Creates an empty tower registry with a reset identifier counter.
    pub(crate) fn new() -> Self {
        Self {
            entries: BTreeMap::new(),
            next_tower_id: TowerId::new(0),
        }
    }

    /// Builds a level one tower and returns its freshly allocated identifier.
    pub(crate) fn insert(&mut self, kind: TowerKind, cell: CellCoord) -> TowerId {
        let id = self.next_tower_id;
        self.next_tower_id = TowerId::new(id.get().saturating_add(1));
        let _ = self.entries.insert(id, TowerState::new(id, kind, cell));
        id
    }

    pub(crate) fn get(&self, id: TowerId) -> Option<&TowerState> {
        self.entries.get(&id)
    }

    pub(crate) fn get_mut(&mut self, id: TowerId) -> Option<&mut TowerState> {
        self.entries.get_mut(&id)
    }

    /// Towers in identifier order.
    pub(crate) fn iter(&self) -> impl Iterator<Item = &TowerState> {
        self.entries.values()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn registry_allocates_sequential_identifiers() {
        let mut registry = TowerRegistry::new();
        let first = registry.insert(TowerKind::Basic, CellCoord::new(1, 1));
        let second = registry.insert(TowerKind::Laser, CellCoord::new(2, 1));

        assert_eq!(first, TowerId::new(0));
        assert_eq!(second, TowerId::new(1));
        let ids: Vec<TowerId> = registry.iter().map(|tower| tower.id).collect();
        assert_eq!(ids, vec![first, second]);
    }

    #[test]
    fn new_tower_copies_profile() {
        let mut registry = TowerRegistry::new();
        let id = registry.insert(TowerKind::Missile, CellCoord::new(4, 4));
        let tower = registry.get(id).expect("tower exists");

        assert_eq!(tower.level, 1);
        assert_eq!(tower.damage, 60);
        assert_eq!(tower.range, 5);
        assert_eq!(tower.upgrade_cost, 75);
        assert_eq!(tower.last_fired, None);
    }

    #[test]
    fn upgrade_scales_stats_with_floors() {
        let mut registry = TowerRegistry::new();
        let id = registry.insert(TowerKind::Laser, CellCoord::new(0, 0));
        let tower = registry.get_mut(id).expect("tower exists");

        tower.upgrade();
        assert_eq!(tower.level, 2);
        assert_eq!(tower.damage, 52, "35 * 1.5 floors to 52");
        assert_eq!(tower.range, 5);
        assert_eq!(tower.upgrade_cost, 70);
    }

    #[test]
    fn range_growth_is_capped() {
        let mut registry = TowerRegistry::new();
        let id = registry.insert(TowerKind::Missile, CellCoord::new(0, 0));
        let tower = registry.get_mut(id).expect("tower exists");

        for _ in 0..4 {
            tower.upgrade();
        }
        assert_eq!(tower.level, MAX_TOWER_LEVEL);
        assert_eq!(tower.range, MAX_TOWER_RANGE);
        assert_eq!(tower.check_upgrade(u32::MAX), Err(UpgradeError::MaxLevel));
    }

    #[test]
    fn upgrade_requires_gold() {
        let mut registry = TowerRegistry::new();
        let id = registry.insert(TowerKind::Basic, CellCoord::new(0, 0));
        let tower = registry.get(id).expect("tower exists");

        assert_eq!(
            tower.check_upgrade(29),
            Err(UpgradeError::InsufficientFunds {
                required: 30,
                available: 29
            })
        );
        assert_eq!(tower.check_upgrade(30), Ok(30));
    }

    #[test]
    fn cooldown_counts_down_from_last_shot() {
        let mut registry = TowerRegistry::new();
        let id = registry.insert(TowerKind::Basic, CellCoord::new(0, 0));
        let tower = registry.get_mut(id).expect("tower exists");

        assert_eq!(tower.ready_in(Duration::from_secs(5)), Duration::ZERO);
        tower.last_fired = Some(Duration::from_secs(5));
        assert_eq!(
            tower.ready_in(Duration::from_millis(5_400)),
            Duration::from_millis(600)
        );
        assert_eq!(tower.ready_in(Duration::from_secs(6)), Duration::ZERO);
    }
}
