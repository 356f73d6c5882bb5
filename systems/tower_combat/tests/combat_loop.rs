use std::time::Duration;

use arena_core::{CellCoord, Command, EnemyId, EnemyKind, Event, TowerKind, TowerTarget};
use arena_system_tower_combat::TowerCombat;
use arena_system_tower_targeting::TowerTargeting;
use arena_world::{self as world, query, World};

const FRAME: Duration = Duration::from_millis(16);

struct Arena {
    world: World,
    targeting: TowerTargeting,
    combat: TowerCombat,
    targets: Vec<TowerTarget>,
    log: Vec<Event>,
}

impl Arena {
    fn new() -> Self {
        Self {
            world: World::new(),
            targeting: TowerTargeting::new(),
            combat: TowerCombat::new(),
            targets: Vec::new(),
            log: Vec::new(),
        }
    }

    fn submit(&mut self, command: Command) {
        let mut events = Vec::new();
        world::apply(&mut self.world, command, &mut events);

        self.targeting.handle(
            &query::tower_view(&self.world),
            &query::enemy_view(&self.world),
            &mut self.targets,
        );
        let mut commands = Vec::new();
        self.combat.handle(
            &events,
            query::tower_cooldowns(&self.world),
            &self.targets,
            &mut commands,
        );
        for command in commands {
            world::apply(&mut self.world, command, &mut events);
        }
        self.log.extend(events);
    }

    fn shots(&self) -> usize {
        self.log
            .iter()
            .filter(|event| matches!(event, Event::ProjectileFired { .. }))
            .count()
    }
}

#[test]
fn basic_tower_kills_a_stationary_fast_enemy_in_three_shots() {
    let mut arena = Arena::new();
    arena.submit(Command::PlaceTower {
        kind: TowerKind::Basic,
        cell: CellCoord::new(2, 12),
    });
    arena.submit(Command::SpawnEnemy {
        kind: EnemyKind::Fast,
        stagger: 0.0,
    });
    arena.submit(Command::SetRunning { running: true });

    for _ in 0..200 {
        arena.submit(Command::Tick { dt: FRAME });
    }

    assert_eq!(arena.shots(), 3);
    assert!(arena.log.contains(&Event::EnemyKilled {
        enemy: EnemyId::new(0),
        reward: 15,
    }));
    let economy = query::economy(&arena.world);
    assert_eq!(economy.gold, 165);
    assert_eq!(economy.score, 15);
}

#[test]
fn towers_hold_fire_while_paused() {
    let mut arena = Arena::new();
    arena.submit(Command::PlaceTower {
        kind: TowerKind::Laser,
        cell: CellCoord::new(2, 12),
    });
    arena.submit(Command::SpawnEnemy {
        kind: EnemyKind::Tank,
        stagger: 0.0,
    });

    for _ in 0..10 {
        arena.submit(Command::Tick { dt: FRAME });
    }

    assert_eq!(arena.shots(), 0);
    assert_eq!(query::projectiles(&arena.world).len(), 0);
}
