#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Authoritative world state management for the Arena tower-defence game.
//!
//! The world owns the grid, the tower registry, enemies, projectiles and the
//! player's economy. It only changes through [`apply`], which executes one
//! [`Command`] and reports the outcome as [`Event`] values. Path planning,
//! target selection and wave composition live in separate systems that read
//! the world through [`query`] and answer with further commands.

mod combat;
mod enemies;
mod threat;
mod towers;

use std::time::Duration;

use arena_core::{
    is_stable_tick, CellCoord, Command, EnemyId, Event, Grid, PlacementError, TowerId, TowerKind,
    UpgradeError, DEFAULT_GRID_SIZE,
};
use glam::Vec2;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use serde::Deserialize;
use tracing::{debug, info, warn};

use combat::{Particle, Projectile};
use enemies::{Enemy, Fate};
use towers::TowerRegistry;

const DEFAULT_STARTING_GOLD: u32 = 200;
const DEFAULT_STARTING_LIVES: u32 = 20;
const DEFAULT_PARTICLE_SEED: u64 = 0x5eed_0f_a7e4a;

/// Tunable parameters used when constructing or resetting a world.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct WorldConfig {
    /// Number of cells along each edge of the grid.
    pub grid_size: u32,
    /// Gold available before the first tower is placed.
    pub starting_gold: u32,
    /// Lives available before the game ends.
    pub starting_lives: u32,
    /// Seed for the cosmetic particle generator.
    pub particle_seed: u64,
}

impl Default for WorldConfig {
    fn default() -> Self {
        Self {
            grid_size: DEFAULT_GRID_SIZE,
            starting_gold: DEFAULT_STARTING_GOLD,
            starting_lives: DEFAULT_STARTING_LIVES,
            particle_seed: DEFAULT_PARTICLE_SEED,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
struct Economy {
    gold: u32,
    lives: u32,
    score: u32,
    wave: u32,
}

impl Economy {
    fn starting(config: &WorldConfig) -> Self {
        Self {
            gold: config.starting_gold,
            lives: config.starting_lives,
            score: 0,
            wave: 1,
        }
    }
}

/// Represents the authoritative tower-defence world state.
#[derive(Debug)]
pub struct World {
    config: WorldConfig,
    grid: Grid,
    towers: TowerRegistry,
    enemies: Vec<Enemy>,
    next_enemy_id: EnemyId,
    projectiles: Vec<Projectile>,
    particles: Vec<Particle>,
    economy: Economy,
    pending_spawns: u32,
    wave_in_progress: bool,
    running: bool,
    game_over: bool,
    clock: Duration,
    rng: ChaCha8Rng,
}

impl World {
    /// Creates a new world using the default configuration.
    #[must_use]
    pub fn new() -> Self {
        Self::with_config(WorldConfig::default())
    }

    /// Creates a new world from the provided configuration.
    #[must_use]
    pub fn with_config(config: WorldConfig) -> Self {
        Self {
            grid: Grid::new(config.grid_size),
            towers: TowerRegistry::new(),
            enemies: Vec::new(),
            next_enemy_id: EnemyId::new(0),
            projectiles: Vec::new(),
            particles: Vec::new(),
            economy: Economy::starting(&config),
            pending_spawns: 0,
            wave_in_progress: false,
            running: false,
            game_over: false,
            clock: Duration::ZERO,
            rng: ChaCha8Rng::seed_from_u64(config.particle_seed),
            config,
        }
    }

    fn spawn_cell(&self) -> CellCoord {
        CellCoord::new(0, self.grid.size() / 2)
    }

    fn goal_cell(&self) -> CellCoord {
        CellCoord::new(self.grid.size().saturating_sub(1), self.grid.size() / 2)
    }

    fn enemy_mut(&mut self, enemy: EnemyId) -> Option<&mut Enemy> {
        self.enemies.iter_mut().find(|candidate| candidate.id == enemy)
    }

    fn rebuild_threat(&mut self, out_events: &mut Vec<Event>) {
        threat::rebuild(&mut self.grid, self.towers.iter());
        out_events.push(Event::ThreatFieldRebuilt {
            version: self.grid.version(),
        });
    }

    fn place_tower(
        &mut self,
        kind: TowerKind,
        cell: CellCoord,
    ) -> Result<TowerId, PlacementError> {
        let Some(state) = self.grid.cell(cell) else {
            return Err(PlacementError::OutOfBounds);
        };
        if !state.is_walkable() {
            return Err(PlacementError::NotWalkable);
        }
        if state.tower().is_some() {
            return Err(PlacementError::Occupied);
        }
        let cost = kind.profile().cost;
        if self.economy.gold < cost {
            return Err(PlacementError::InsufficientFunds {
                required: cost,
                available: self.economy.gold,
            });
        }

        let tower = self.towers.insert(kind, cell);
        let _ = self.grid.set_tower(cell, Some(tower));
        self.economy.gold -= cost;
        Ok(tower)
    }

    fn upgrade_tower(&mut self, tower: TowerId) -> Result<u8, UpgradeError> {
        let gold = self.economy.gold;
        let state = self
            .towers
            .get_mut(tower)
            .ok_or(UpgradeError::MissingTower)?;
        let cost = state.check_upgrade(gold)?;
        state.upgrade();
        let level = state.level;
        self.economy.gold -= cost;
        Ok(level)
    }

    fn fire(&mut self, tower: TowerId, target: EnemyId, out_events: &mut Vec<Event>) {
        let now = self.clock;
        let Some(state) = self.towers.get(tower) else {
            debug!(tower = tower.get(), "fire request for unknown tower");
            return;
        };
        if !state.ready_in(now).is_zero() {
            debug!(tower = tower.get(), "fire request while reloading");
            return;
        }
        let from = state.cell.position();
        let range = state.range as f32;
        let kind = state.kind.projectile();
        let damage = state.damage;

        let Some(enemy) = self
            .enemies
            .iter()
            .find(|enemy| enemy.id == target && enemy.is_alive())
        else {
            debug!(enemy = target.get(), "fire request for missing enemy");
            return;
        };
        let aim = enemy.position;
        if from.distance(aim) > range {
            debug!(tower = tower.get(), enemy = target.get(), "target out of range");
            return;
        }

        if let Some(state) = self.towers.get_mut(tower) {
            state.last_fired = Some(now);
        }
        self.projectiles
            .push(Projectile::launch(kind, from, aim, damage));
        out_events.push(Event::ProjectileFired {
            tower,
            target,
            from,
            aim,
        });
    }

    fn tick(&mut self, dt: Duration, out_events: &mut Vec<Event>) {
        self.clock = self.clock.saturating_add(dt);
        out_events.push(Event::TimeAdvanced { dt });
        let seconds = dt.as_secs_f32();

        for enemy in &mut self.enemies {
            enemy.advance(seconds);
        }

        self.resolve_projectiles(seconds, out_events);
        combat::step_particles(&mut self.particles, seconds);
        self.resolve_fates(out_events);

        if self.wave_in_progress && self.pending_spawns == 0 && self.enemies.is_empty() {
            self.wave_in_progress = false;
            let wave = self.economy.wave;
            let bonus_gold = wave.saturating_mul(50);
            self.economy.gold = self.economy.gold.saturating_add(bonus_gold);
            self.economy.score = self.economy.score.saturating_add(wave.saturating_mul(100));
            info!(wave, bonus_gold, "wave completed");
            out_events.push(Event::WaveCompleted { wave, bonus_gold });
        }
    }

    fn resolve_projectiles(&mut self, seconds: f32, out_events: &mut Vec<Event>) {
        let mut index = 0;
        while index < self.projectiles.len() {
            if !self.projectiles[index].advance(seconds) {
                index += 1;
                continue;
            }

            let projectile = self.projectiles.swap_remove(index);
            let struck = self
                .enemies
                .iter_mut()
                .find(|enemy| enemy.is_alive() && projectile.strikes(enemy.position));
            match struck {
                Some(enemy) => {
                    enemy.take_damage(projectile.damage);
                    out_events.push(Event::ProjectileHit {
                        enemy: enemy.id,
                        damage: projectile.damage,
                    });
                    combat::burst(&mut self.rng, projectile.position, &mut self.particles);
                }
                None => out_events.push(Event::ProjectileMissed {
                    aim: projectile.aim,
                }),
            }
        }
    }

    fn resolve_fates(&mut self, out_events: &mut Vec<Event>) {
        let economy = &mut self.economy;
        self.enemies.retain(|enemy| match enemy.fate {
            Fate::Alive => true,
            Fate::Killed => {
                economy.gold = economy.gold.saturating_add(enemy.reward);
                economy.score = economy.score.saturating_add(enemy.reward);
                out_events.push(Event::EnemyKilled {
                    enemy: enemy.id,
                    reward: enemy.reward,
                });
                false
            }
            Fate::Escaped => {
                economy.lives = economy.lives.saturating_sub(1);
                out_events.push(Event::EnemyEscaped { enemy: enemy.id });
                false
            }
        });

        if self.economy.lives == 0 && !self.game_over {
            self.game_over = true;
            self.running = false;
            warn!(
                score = self.economy.score,
                wave = self.economy.wave,
                "game over"
            );
            out_events.push(Event::GameOver {
                score: self.economy.score,
                wave: self.economy.wave,
            });
        }
    }

    fn restart(&mut self, size: u32) {
        self.config.grid_size = size;
        *self = Self::with_config(self.config.clone());
    }
}

impl Default for World {
    fn default() -> Self {
        Self::new()
    }
}

/// Applies the provided command to the world, mutating state deterministically.
pub fn apply(world: &mut World, command: Command, out_events: &mut Vec<Event>) {
    match command {
        Command::ConfigureGrid { size } => {
            world.restart(size);
            debug!(size, "grid configured");
            out_events.push(Event::GridConfigured { size });
        }
        Command::SetCellWalkable { cell, walkable } => {
            if world.grid.set_walkable(cell, walkable) {
                out_events.push(Event::CellWalkabilityChanged { cell, walkable });
            } else {
                warn!(?cell, "walkability change outside the grid");
                out_events.push(Event::CellWalkabilityRejected { cell });
            }
        }
        Command::SetRunning { running } => {
            let running = running && !world.game_over;
            if world.running != running {
                world.running = running;
                out_events.push(Event::RunningChanged { running });
            }
        }
        Command::Tick { dt } => {
            if !world.running {
                return;
            }
            if !is_stable_tick(dt) {
                warn!(?dt, "discarding oversized tick");
                out_events.push(Event::TickDiscarded { dt });
                return;
            }
            world.tick(dt, out_events);
        }
        Command::PlaceTower { kind, cell } => match world.place_tower(kind, cell) {
            Ok(tower) => {
                debug!(tower = tower.get(), ?kind, ?cell, "tower placed");
                out_events.push(Event::TowerPlaced { tower, kind, cell });
                world.rebuild_threat(out_events);
            }
            Err(reason) => {
                debug!(?kind, ?cell, %reason, "tower placement rejected");
                out_events.push(Event::TowerPlacementRejected { kind, cell, reason });
            }
        },
        Command::UpgradeTower { tower } => match world.upgrade_tower(tower) {
            Ok(level) => {
                debug!(tower = tower.get(), level, "tower upgraded");
                out_events.push(Event::TowerUpgraded { tower, level });
                world.rebuild_threat(out_events);
            }
            Err(reason) => {
                debug!(tower = tower.get(), %reason, "tower upgrade rejected");
                out_events.push(Event::TowerUpgradeRejected { tower, reason });
            }
        },
        Command::StartWave => {
            if world.wave_in_progress || world.game_over {
                debug!("start wave ignored");
                return;
            }
            let wave = world.economy.wave;
            let enemy_count = 5 + wave.saturating_mul(2);
            world.economy.wave = wave.saturating_add(1);
            world.pending_spawns = enemy_count;
            world.wave_in_progress = true;
            info!(wave, enemy_count, "wave started");
            out_events.push(Event::WaveStarted { wave, enemy_count });
            if !world.running {
                world.running = true;
                out_events.push(Event::RunningChanged { running: true });
            }
        }
        Command::SpawnEnemy { kind, stagger } => {
            let spawn = world.spawn_cell().position();
            let position = Vec2::new(spawn.x - stagger.max(0.0), spawn.y);
            let enemy = world.next_enemy_id;
            world.next_enemy_id = EnemyId::new(enemy.get().saturating_add(1));
            world.enemies.push(Enemy::spawn(enemy, kind, position));
            world.pending_spawns = world.pending_spawns.saturating_sub(1);
            out_events.push(Event::EnemySpawned { enemy, kind });
        }
        Command::AssignPath { enemy, path } => {
            if path.is_empty() || path.iter().any(|cell| !world.grid.contains(*cell)) {
                debug!(enemy = enemy.get(), "ignoring unusable path");
                return;
            }
            let now = world.clock;
            if let Some(target) = world.enemy_mut(enemy).filter(|target| target.is_alive()) {
                let waypoints = path.len();
                target.assign_path(path, now);
                out_events.push(Event::PathAssigned { enemy, waypoints });
            }
        }
        Command::FireProjectile { tower, target } => world.fire(tower, target, out_events),
        Command::Reset => {
            let size = world.grid.size();
            world.restart(size);
            info!("world reset");
            out_events.push(Event::WorldReset);
        }
    }
}

/// Query functions that provide read-only access to the world state.
pub mod query {
    use std::time::Duration;

    use arena_core::{
        CellCoord, EconomySnapshot, EnemyView, Grid, ParticleSnapshot, ProjectileSnapshot,
        TowerCooldownView, TowerSnapshot, TowerId, TowerView,
    };

    use super::World;

    /// Provides read-only access to the grid, including danger costs.
    #[must_use]
    pub fn grid(world: &World) -> &Grid {
        &world.grid
    }

    /// Cell at which new enemies enter the grid.
    #[must_use]
    pub fn spawn_cell(world: &World) -> CellCoord {
        world.spawn_cell()
    }

    /// Cell enemies try to reach.
    #[must_use]
    pub fn goal_cell(world: &World) -> CellCoord {
        world.goal_cell()
    }

    /// Total simulated time processed by the world.
    #[must_use]
    pub fn clock(world: &World) -> Duration {
        world.clock
    }

    /// Reports whether ticks are currently processed.
    #[must_use]
    pub fn is_running(world: &World) -> bool {
        world.running
    }

    /// Reports whether the player ran out of lives.
    #[must_use]
    pub fn is_game_over(world: &World) -> bool {
        world.game_over
    }

    /// Captures the economy and progress counters.
    #[must_use]
    pub fn economy(world: &World) -> EconomySnapshot {
        EconomySnapshot {
            gold: world.economy.gold,
            lives: world.economy.lives,
            score: world.economy.score,
            wave: world.economy.wave,
            wave_in_progress: world.wave_in_progress,
            running: world.running,
        }
    }

    /// Captures a read-only view of every placed tower.
    #[must_use]
    pub fn tower_view(world: &World) -> TowerView {
        TowerView::from_snapshots(world.towers.iter().map(|tower| tower.snapshot()).collect())
    }

    /// Looks up a single tower.
    #[must_use]
    pub fn tower(world: &World, tower: TowerId) -> Option<TowerSnapshot> {
        world.towers.get(tower).map(|state| state.snapshot())
    }

    /// Captures the remaining reload time of every tower.
    #[must_use]
    pub fn tower_cooldowns(world: &World) -> TowerCooldownView {
        TowerCooldownView::from_snapshots(
            world
                .towers
                .iter()
                .map(|tower| tower.cooldown(world.clock))
                .collect(),
        )
    }

    /// Captures a read-only view of the enemies still on the grid.
    #[must_use]
    pub fn enemy_view(world: &World) -> EnemyView {
        EnemyView::from_snapshots(
            world
                .enemies
                .iter()
                .filter(|enemy| enemy.is_alive())
                .map(|enemy| enemy.snapshot())
                .collect(),
        )
    }

    /// Captures every projectile currently in flight.
    #[must_use]
    pub fn projectiles(world: &World) -> Vec<ProjectileSnapshot> {
        world
            .projectiles
            .iter()
            .map(|projectile| projectile.snapshot())
            .collect()
    }

    /// Captures every live particle.
    #[must_use]
    pub fn particles(world: &World) -> Vec<ParticleSnapshot> {
        world
            .particles
            .iter()
            .map(|particle| particle.snapshot())
            .collect()
    }
}
