//! Headless tower-defence session wiring the world to its systems.

use std::{fmt, time::Duration};

use arena_core::{Command, Event, TowerTarget};
use arena_system_movement::Movement;
use arena_system_pathfinding::Pathfinder;
use arena_system_spawning::Spawning;
use arena_system_tower_combat::TowerCombat;
use arena_system_tower_targeting::TowerTargeting;
use arena_world::{self as world, query, World};
use tracing::{info, warn};

use crate::config::{ArenaConfig, TowerPlacement};

/// Simulated time advanced per frame.
pub(crate) const FRAME: Duration = Duration::from_millis(16);

/// Owns the world together with every system reacting to it.
pub(crate) struct DefenceSession {
    world: World,
    pathfinder: Pathfinder,
    movement: Movement,
    targeting: TowerTargeting,
    combat: TowerCombat,
    spawning: Spawning,
    targets: Vec<TowerTarget>,
    tally: Tally,
}

impl DefenceSession {
    pub(crate) fn new(config: &ArenaConfig) -> Self {
        let world = World::with_config(config.world.clone());
        let pathfinder = Pathfinder::new(query::grid(&world).clone());
        Self {
            world,
            pathfinder,
            movement: Movement::new(),
            targeting: TowerTargeting::new(),
            combat: TowerCombat::new(),
            spawning: Spawning::new(config.spawning),
            targets: Vec::new(),
            tally: Tally::default(),
        }
    }

    /// Applies `command` and every follow-up command the systems emit until
    /// the world settles.
    fn submit(&mut self, command: Command) {
        let mut pending = vec![command];
        while !pending.is_empty() {
            let mut events = Vec::new();
            for command in pending.drain(..) {
                world::apply(&mut self.world, command, &mut events);
            }

            if events.iter().any(|event| {
                matches!(
                    event,
                    Event::ThreatFieldRebuilt { .. }
                        | Event::CellWalkabilityChanged { .. }
                        | Event::GridConfigured { .. }
                        | Event::WorldReset
                )
            }) {
                self.pathfinder
                    .update_grid(query::grid(&self.world).clone());
            }

            self.spawning.handle(&events, &mut pending);

            let enemies = query::enemy_view(&self.world);
            self.movement.handle(
                &events,
                &enemies,
                query::clock(&self.world),
                query::goal_cell(&self.world),
                &mut self.pathfinder,
                &mut pending,
            );

            self.targeting.handle(
                &query::tower_view(&self.world),
                &enemies,
                &mut self.targets,
            );
            self.combat.handle(
                &events,
                query::tower_cooldowns(&self.world),
                &self.targets,
                &mut pending,
            );

            self.tally.record(&events);
        }
    }

    /// Builds `layout`, then plays up to `waves` waves.
    ///
    /// Stops early on game over or once `max_ticks` frames have been played.
    pub(crate) fn run(
        &mut self,
        layout: &[TowerPlacement],
        waves: u32,
        max_ticks: u64,
    ) -> DefenceSummary {
        for placement in layout {
            self.submit(Command::PlaceTower {
                kind: placement.kind,
                cell: placement.cell(),
            });
        }
        self.submit(Command::SetRunning { running: true });

        let mut ticks = 0;
        'waves: for _ in 0..waves {
            let target = self.tally.waves_completed + 1;
            self.submit(Command::StartWave);
            while self.tally.waves_completed < target {
                if query::is_game_over(&self.world) || ticks >= max_ticks {
                    break 'waves;
                }
                self.submit(Command::Tick { dt: FRAME });
                ticks += 1;
            }
        }

        let economy = query::economy(&self.world);
        let summary = DefenceSummary {
            ticks,
            waves_completed: self.tally.waves_completed,
            towers_placed: self.tally.towers_placed,
            towers_rejected: self.tally.towers_rejected,
            shots: self.tally.shots,
            kills: self.tally.kills,
            escapes: self.tally.escapes,
            gold: economy.gold,
            lives: economy.lives,
            score: economy.score,
            game_over: query::is_game_over(&self.world),
        };
        info!(
            waves = summary.waves_completed,
            kills = summary.kills,
            escapes = summary.escapes,
            "defence run finished"
        );
        summary
    }
}

#[derive(Debug, Default)]
struct Tally {
    waves_completed: u32,
    towers_placed: u32,
    towers_rejected: u32,
    shots: u32,
    kills: u32,
    escapes: u32,
}

impl Tally {
    fn record(&mut self, events: &[Event]) {
        for event in events {
            match event {
                Event::WaveCompleted { .. } => self.waves_completed += 1,
                Event::TowerPlaced { .. } => self.towers_placed += 1,
                Event::TowerPlacementRejected { cell, reason, .. } => {
                    warn!(?cell, %reason, "tower placement rejected");
                    self.towers_rejected += 1;
                }
                Event::ProjectileFired { .. } => self.shots += 1,
                Event::EnemyKilled { .. } => self.kills += 1,
                Event::EnemyEscaped { .. } => self.escapes += 1,
                _ => {}
            }
        }
    }
}

/// Outcome of a headless defence run.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) struct DefenceSummary {
    pub(crate) ticks: u64,
    pub(crate) waves_completed: u32,
    pub(crate) towers_placed: u32,
    pub(crate) towers_rejected: u32,
    pub(crate) shots: u32,
    pub(crate) kills: u32,
    pub(crate) escapes: u32,
    pub(crate) gold: u32,
    pub(crate) lives: u32,
    pub(crate) score: u32,
    pub(crate) game_over: bool,
}

impl fmt::Display for DefenceSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "towers placed: {} (rejected {})",
            self.towers_placed, self.towers_rejected
        )?;
        writeln!(f, "waves completed: {}", self.waves_completed)?;
        writeln!(
            f,
            "shots: {}  kills: {}  escapes: {}",
            self.shots, self.kills, self.escapes
        )?;
        writeln!(
            f,
            "gold: {}  lives: {}  score: {}",
            self.gold, self.lives, self.score
        )?;
        write!(
            f,
            "simulated {:.1}s{}",
            FRAME.as_secs_f64() * self.ticks as f64,
            if self.game_over { ", game over" } else { "" }
        )
    }
}
