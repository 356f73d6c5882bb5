#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Core contracts shared across the Arena engine.
//!
//! This crate defines the message surface that connects adapters, the
//! authoritative tower-defence world, and pure systems. Adapters submit
//! [`Command`] values describing desired mutations, the world executes those
//! commands via its `apply` entry point, and then broadcasts [`Event`] values
//! for systems to react to deterministically. Systems consume event streams,
//! query immutable snapshots, and respond exclusively with new command
//! batches. The grid model and the geometry primitives used by the driving
//! simulation live here as well so both environments share one vocabulary.

use std::time::Duration;

use glam::Vec2;
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub mod geometry;
mod grid;

pub use grid::{Grid, GridCell};

/// Side length of the square tower-defence grid when nothing else is configured.
pub const DEFAULT_GRID_SIZE: u32 = 25;

/// Largest simulated delta a single tick may carry before it is discarded.
///
/// Stalled frames (for example a backgrounded window) would otherwise feed a
/// huge integration step into the kinematics.
pub const MAX_TICK_DELTA: Duration = Duration::from_millis(100);

/// Minimum simulated time between two path recomputations of the same enemy.
pub const PATH_REFRESH_INTERVAL: Duration = Duration::from_secs(2);

/// Distance in cells between two consecutive enemies of the same wave.
pub const SPAWN_STAGGER: f32 = 0.8;

/// Highest level a tower can be upgraded to.
pub const MAX_TOWER_LEVEL: u8 = 5;

/// Upper bound applied to tower range growth on upgrade, measured in cells.
pub const MAX_TOWER_RANGE: u32 = 8;

/// Reports whether a tick delta is small enough to integrate safely.
#[must_use]
pub fn is_stable_tick(dt: Duration) -> bool {
    dt <= MAX_TICK_DELTA
}

/// Commands that express all permissible tower-defence world mutations.
#[derive(Clone, Debug, PartialEq)]
pub enum Command {
    /// Rebuilds the world around an empty square grid of the provided size.
    ConfigureGrid {
        /// Number of cells along each edge of the grid.
        size: u32,
    },
    /// Marks a single cell as walkable or blocked.
    SetCellWalkable {
        /// Cell whose walkability should change.
        cell: CellCoord,
        /// Whether enemies may traverse the cell.
        walkable: bool,
    },
    /// Resumes or suspends tick processing.
    SetRunning {
        /// Whether ticks should be processed.
        running: bool,
    },
    /// Advances the simulation clock by the provided delta time.
    Tick {
        /// Duration of simulated time that elapsed since the previous tick.
        dt: Duration,
    },
    /// Requests placement of a tower on the provided cell.
    PlaceTower {
        /// Type of tower to construct.
        kind: TowerKind,
        /// Cell the tower should occupy.
        cell: CellCoord,
    },
    /// Requests an upgrade of an existing tower.
    UpgradeTower {
        /// Identifier of the tower to upgrade.
        tower: TowerId,
    },
    /// Requests that the next wave begins.
    StartWave,
    /// Requests that a new enemy enters the grid behind the spawn cell.
    SpawnEnemy {
        /// Archetype of the enemy to create.
        kind: EnemyKind,
        /// Distance in cells the enemy trails behind the spawn cell.
        stagger: f32,
    },
    /// Replaces an enemy's path with a freshly computed one.
    AssignPath {
        /// Enemy receiving the path.
        enemy: EnemyId,
        /// Ordered waypoints from the enemy's cell to the goal, inclusive.
        path: Vec<CellCoord>,
    },
    /// Requests that a tower fires at an enemy.
    FireProjectile {
        /// Tower that fires the projectile.
        tower: TowerId,
        /// Enemy whose current position is used as the aim point.
        target: EnemyId,
    },
    /// Restores the initial world state while keeping the configured grid size.
    Reset,
}

/// Events broadcast by the world after processing commands.
#[derive(Clone, Debug, PartialEq)]
pub enum Event {
    /// Confirms that the grid was rebuilt with the provided size.
    GridConfigured {
        /// Number of cells along each edge of the grid.
        size: u32,
    },
    /// Confirms a walkability change.
    CellWalkabilityChanged {
        /// Cell whose walkability changed.
        cell: CellCoord,
        /// New walkability state.
        walkable: bool,
    },
    /// Reports that a walkability change targeted a cell outside the grid.
    CellWalkabilityRejected {
        /// Cell provided in the request.
        cell: CellCoord,
    },
    /// Announces that tick processing was resumed or suspended.
    RunningChanged {
        /// Whether ticks are now processed.
        running: bool,
    },
    /// Indicates that the simulation clock advanced.
    TimeAdvanced {
        /// Duration of simulated time that elapsed in the tick.
        dt: Duration,
    },
    /// Reports that a tick was dropped because its delta was too large.
    TickDiscarded {
        /// Delta carried by the rejected tick.
        dt: Duration,
    },
    /// Announces that the danger costs were recomputed from the tower set.
    ThreatFieldRebuilt {
        /// Grid version after the rebuild.
        version: u64,
    },
    /// Confirms that a tower was placed into the world.
    TowerPlaced {
        /// Identifier assigned to the tower by the world.
        tower: TowerId,
        /// Type of tower that was placed.
        kind: TowerKind,
        /// Cell occupied by the tower.
        cell: CellCoord,
    },
    /// Reports that a tower placement request was rejected.
    TowerPlacementRejected {
        /// Type of tower requested for placement.
        kind: TowerKind,
        /// Cell provided in the placement request.
        cell: CellCoord,
        /// Specific reason the placement failed.
        reason: PlacementError,
    },
    /// Confirms that a tower was upgraded.
    TowerUpgraded {
        /// Identifier of the upgraded tower.
        tower: TowerId,
        /// Level reached by the tower.
        level: u8,
    },
    /// Reports that a tower upgrade request was rejected.
    TowerUpgradeRejected {
        /// Identifier of the tower targeted for upgrade.
        tower: TowerId,
        /// Specific reason the upgrade failed.
        reason: UpgradeError,
    },
    /// Announces that a wave began and how many enemies it contains.
    WaveStarted {
        /// Wave number that started.
        wave: u32,
        /// Number of enemies that should be spawned for the wave.
        enemy_count: u32,
    },
    /// Confirms that an enemy entered the world.
    EnemySpawned {
        /// Identifier assigned to the enemy.
        enemy: EnemyId,
        /// Archetype of the enemy.
        kind: EnemyKind,
    },
    /// Confirms that an enemy accepted a new path.
    PathAssigned {
        /// Enemy that received the path.
        enemy: EnemyId,
        /// Number of waypoints in the new path.
        waypoints: usize,
    },
    /// Confirms that a tower launched a projectile.
    ProjectileFired {
        /// Tower that fired.
        tower: TowerId,
        /// Enemy that was targeted.
        target: EnemyId,
        /// Launch position.
        from: Vec2,
        /// Fixed aim point captured at launch.
        aim: Vec2,
    },
    /// Reports that a projectile damaged an enemy.
    ProjectileHit {
        /// Enemy that absorbed the damage.
        enemy: EnemyId,
        /// Damage applied.
        damage: u32,
    },
    /// Reports that a projectile reached its aim point without finding a target.
    ProjectileMissed {
        /// Aim point of the projectile.
        aim: Vec2,
    },
    /// Reports that an enemy was destroyed by damage.
    EnemyKilled {
        /// Enemy that was destroyed.
        enemy: EnemyId,
        /// Gold granted for the kill.
        reward: u32,
    },
    /// Reports that an enemy reached the end of its path.
    EnemyEscaped {
        /// Enemy that escaped.
        enemy: EnemyId,
    },
    /// Announces that every enemy of the wave was resolved.
    WaveCompleted {
        /// Wave counter at completion.
        wave: u32,
        /// Gold paid out for clearing the wave.
        bonus_gold: u32,
    },
    /// Announces that the player ran out of lives.
    GameOver {
        /// Final score.
        score: u32,
        /// Wave counter at the time of defeat.
        wave: u32,
    },
    /// Confirms that the world was restored to its initial state.
    WorldReset,
}

/// Unique identifier assigned to a tower.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TowerId(u32);

impl TowerId {
    /// Creates a new tower identifier with the provided numeric value.
    #[must_use]
    pub const fn new(value: u32) -> Self {
        Self(value)
    }

    /// Retrieves the numeric representation of the tower identifier.
    #[must_use]
    pub const fn get(&self) -> u32 {
        self.0
    }
}

/// Unique identifier assigned to an enemy.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct EnemyId(u32);

impl EnemyId {
    /// Creates a new enemy identifier with the provided numeric value.
    #[must_use]
    pub const fn new(value: u32) -> Self {
        Self(value)
    }

    /// Retrieves the numeric representation of the identifier.
    #[must_use]
    pub const fn get(&self) -> u32 {
        self.0
    }
}

/// Location of a single grid cell expressed as column and row coordinates.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct CellCoord {
    column: u32,
    row: u32,
}

impl CellCoord {
    /// Creates a new grid cell coordinate.
    #[must_use]
    pub const fn new(column: u32, row: u32) -> Self {
        Self { column, row }
    }

    /// Zero-based column index of the cell.
    #[must_use]
    pub const fn column(&self) -> u32 {
        self.column
    }

    /// Zero-based row index of the cell.
    #[must_use]
    pub const fn row(&self) -> u32 {
        self.row
    }

    /// Straight-line distance between two cells measured in cells.
    #[must_use]
    pub fn euclidean_distance(self, other: CellCoord) -> f64 {
        let dx = f64::from(self.column.abs_diff(other.column));
        let dy = f64::from(self.row.abs_diff(other.row));
        dx.hypot(dy)
    }

    /// Reports whether `other` touches this cell through a corner only.
    #[must_use]
    pub fn is_diagonal_to(self, other: CellCoord) -> bool {
        self.column.abs_diff(other.column) == 1 && self.row.abs_diff(other.row) == 1
    }

    /// Continuous position of the cell's anchor point.
    #[must_use]
    pub fn position(self) -> Vec2 {
        Vec2::new(self.column as f32, self.row as f32)
    }

    /// Cell containing the provided position, if it lies inside a `size`×`size` grid.
    #[must_use]
    pub fn containing(position: Vec2, size: u32) -> Option<CellCoord> {
        if !position.is_finite() || position.x < 0.0 || position.y < 0.0 {
            return None;
        }
        let column = position.x.floor() as u32;
        let row = position.y.floor() as u32;
        (column < size && row < size).then_some(CellCoord::new(column, row))
    }

    /// Cell nearest to the provided position, clamped into a `size`×`size` grid.
    ///
    /// Returns `None` only when the grid is empty.
    #[must_use]
    pub fn clamped(position: Vec2, size: u32) -> Option<CellCoord> {
        if size == 0 {
            return None;
        }
        let max = (size - 1) as f32;
        let column = if position.x.is_finite() {
            position.x.floor().clamp(0.0, max)
        } else {
            0.0
        };
        let row = if position.y.is_finite() {
            position.y.floor().clamp(0.0, max)
        } else {
            0.0
        };
        Some(CellCoord::new(column as u32, row as u32))
    }
}

/// Cost strategy that enemies use when asking the pathfinder for a route.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PathStrategy {
    /// Ignores danger entirely.
    Shortest,
    /// Penalises threatened cells twice as heavily as distance.
    Safest,
    /// Weighs danger and distance equally.
    #[default]
    Adaptive,
}

impl PathStrategy {
    /// Multiplier applied to a cell's danger cost when entering it.
    #[must_use]
    pub const fn danger_weight(self) -> f64 {
        match self {
            Self::Shortest => 0.0,
            Self::Safest => 2.0,
            Self::Adaptive => 1.0,
        }
    }
}

/// Static configuration attached to a tower archetype.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TowerProfile {
    /// Gold required to build the tower.
    pub cost: u32,
    /// Damage dealt by each projectile at level one.
    pub damage: u32,
    /// Targeting radius measured in cells.
    pub range: u32,
    /// Minimum interval between two shots.
    pub fire_rate: Duration,
    /// Gold required for the first upgrade.
    pub upgrade_cost: u32,
}

/// Types of towers that can be constructed.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TowerKind {
    /// Cheap all-round tower.
    Basic,
    /// Fast-firing tower with quick projectiles.
    Laser,
    /// Slow, heavy tower whose missiles can be outrun.
    Missile,
}

impl TowerKind {
    /// Every tower archetype in catalogue order.
    pub const ALL: [TowerKind; 3] = [Self::Basic, Self::Laser, Self::Missile];

    /// Returns the configuration table entry for the archetype.
    #[must_use]
    pub const fn profile(self) -> TowerProfile {
        match self {
            Self::Basic => TowerProfile {
                cost: 50,
                damage: 20,
                range: 3,
                fire_rate: Duration::from_millis(1_000),
                upgrade_cost: 30,
            },
            Self::Laser => TowerProfile {
                cost: 100,
                damage: 35,
                range: 4,
                fire_rate: Duration::from_millis(800),
                upgrade_cost: 50,
            },
            Self::Missile => TowerProfile {
                cost: 150,
                damage: 60,
                range: 5,
                fire_rate: Duration::from_millis(1_500),
                upgrade_cost: 75,
            },
        }
    }

    /// Projectile archetype launched by the tower.
    #[must_use]
    pub const fn projectile(self) -> ProjectileKind {
        match self {
            Self::Basic => ProjectileKind::Bullet,
            Self::Laser => ProjectileKind::Laser,
            Self::Missile => ProjectileKind::Missile,
        }
    }
}

/// Projectile archetypes launched by towers.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProjectileKind {
    /// Standard bullet.
    Bullet,
    /// Fast laser bolt.
    Laser,
    /// Slow missile.
    Missile,
}

impl ProjectileKind {
    /// Flight speed measured in cells per second.
    #[must_use]
    pub const fn speed(self) -> f32 {
        match self {
            Self::Bullet => 12.0,
            Self::Laser => 15.0,
            Self::Missile => 8.0,
        }
    }
}

/// Static configuration attached to an enemy archetype.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct EnemyProfile {
    /// Starting and maximum health.
    pub health: u32,
    /// Movement speed in cells per second.
    pub speed: f32,
    /// Gold granted when the enemy is killed.
    pub reward: u32,
    /// Strategy used when requesting paths.
    pub strategy: PathStrategy,
}

/// Enemy archetypes.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EnemyKind {
    /// Quick and fragile, always takes the shortest route.
    Fast,
    /// Slow and durable, balances distance against danger.
    Tank,
    /// Medium speed, avoids danger wherever possible.
    Stealth,
}

impl EnemyKind {
    /// Every enemy archetype in catalogue order.
    pub const ALL: [EnemyKind; 3] = [Self::Fast, Self::Tank, Self::Stealth];

    /// Returns the configuration table entry for the archetype.
    #[must_use]
    pub const fn profile(self) -> EnemyProfile {
        match self {
            Self::Fast => EnemyProfile {
                health: 50,
                speed: 2.0,
                reward: 15,
                strategy: PathStrategy::Shortest,
            },
            Self::Tank => EnemyProfile {
                health: 150,
                speed: 0.8,
                reward: 30,
                strategy: PathStrategy::Adaptive,
            },
            Self::Stealth => EnemyProfile {
                health: 80,
                speed: 1.5,
                reward: 25,
                strategy: PathStrategy::Safest,
            },
        }
    }
}

/// Reasons a tower placement request may be rejected by the world.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize, Error)]
pub enum PlacementError {
    /// The requested cell lies outside the grid.
    #[error("cell lies outside the grid")]
    OutOfBounds,
    /// The requested cell cannot be built on.
    #[error("cell is not walkable")]
    NotWalkable,
    /// Another tower already occupies the cell.
    #[error("cell already holds a tower")]
    Occupied,
    /// The player cannot afford the tower.
    #[error("tower costs {required} gold but only {available} is available")]
    InsufficientFunds {
        /// Gold required by the request.
        required: u32,
        /// Gold held by the player.
        available: u32,
    },
}

/// Reasons a tower upgrade request may be rejected by the world.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize, Error)]
pub enum UpgradeError {
    /// No tower with the provided identifier exists.
    #[error("no such tower")]
    MissingTower,
    /// The tower already reached the highest level.
    #[error("tower is already at the maximum level")]
    MaxLevel,
    /// The player cannot afford the upgrade.
    #[error("upgrade costs {required} gold but only {available} is available")]
    InsufficientFunds {
        /// Gold required by the request.
        required: u32,
        /// Gold held by the player.
        available: u32,
    },
}

/// Immutable representation of a single tower's state used for queries.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct TowerSnapshot {
    /// Identifier allocated to the tower by the world.
    pub id: TowerId,
    /// Kind of tower that was constructed.
    pub kind: TowerKind,
    /// Cell occupied by the tower.
    pub cell: CellCoord,
    /// Current upgrade level.
    pub level: u8,
    /// Damage per projectile.
    pub damage: u32,
    /// Targeting radius in cells.
    pub range: u32,
    /// Gold required for the next upgrade.
    pub upgrade_cost: u32,
}

/// Read-only snapshot describing all towers placed within the grid.
#[derive(Clone, Debug, Default)]
pub struct TowerView {
    snapshots: Vec<TowerSnapshot>,
}

impl TowerView {
    /// Creates a new tower view from the provided snapshots.
    #[must_use]
    pub fn from_snapshots(mut snapshots: Vec<TowerSnapshot>) -> Self {
        snapshots.sort_by_key(|snapshot| snapshot.id);
        Self { snapshots }
    }

    /// Iterator over the captured tower snapshots in deterministic order.
    pub fn iter(&self) -> impl Iterator<Item = &TowerSnapshot> {
        self.snapshots.iter()
    }

    /// Consumes the view, yielding the underlying snapshots.
    #[must_use]
    pub fn into_vec(self) -> Vec<TowerSnapshot> {
        self.snapshots
    }
}

/// Immutable representation of a single enemy's state used for queries.
#[derive(Clone, Debug, PartialEq)]
pub struct EnemySnapshot {
    /// Unique identifier assigned to the enemy.
    pub id: EnemyId,
    /// Archetype of the enemy.
    pub kind: EnemyKind,
    /// Continuous position measured in cells.
    pub position: Vec2,
    /// Remaining health.
    pub health: u32,
    /// Health at spawn.
    pub max_health: u32,
    /// Strategy used when requesting paths.
    pub strategy: PathStrategy,
    /// Number of waypoints in the current path.
    pub path_len: usize,
    /// Index of the waypoint the enemy is heading to.
    pub path_index: usize,
    /// Simulated time of the last accepted path, if any.
    pub last_path_update: Option<Duration>,
}

impl EnemySnapshot {
    /// Reports whether the enemy should request a fresh path at time `now`.
    #[must_use]
    pub fn needs_path(&self, now: Duration) -> bool {
        if self.path_len == 0 {
            return true;
        }
        match self.last_path_update {
            None => true,
            Some(updated) => now.saturating_sub(updated) > PATH_REFRESH_INTERVAL,
        }
    }
}

/// Read-only snapshot describing all enemies on the grid.
#[derive(Clone, Debug, Default)]
pub struct EnemyView {
    snapshots: Vec<EnemySnapshot>,
}

impl EnemyView {
    /// Creates a new enemy view from the provided snapshots.
    #[must_use]
    pub fn from_snapshots(mut snapshots: Vec<EnemySnapshot>) -> Self {
        snapshots.sort_by_key(|snapshot| snapshot.id);
        Self { snapshots }
    }

    /// Iterator over the captured enemy snapshots in deterministic order.
    pub fn iter(&self) -> impl Iterator<Item = &EnemySnapshot> {
        self.snapshots.iter()
    }

    /// Number of enemies captured by the view.
    #[must_use]
    pub fn len(&self) -> usize {
        self.snapshots.len()
    }

    /// Reports whether the view holds no enemies.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.snapshots.is_empty()
    }

    /// Consumes the view, yielding the underlying snapshots.
    #[must_use]
    pub fn into_vec(self) -> Vec<EnemySnapshot> {
        self.snapshots
    }
}

/// Target assignment describing which enemy a tower is aiming at.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct TowerTarget {
    /// Tower that owns the assignment.
    pub tower: TowerId,
    /// Enemy selected as the target.
    pub enemy: EnemyId,
    /// Position of the tower.
    pub tower_position: Vec2,
    /// Position of the enemy at the time of selection.
    pub enemy_position: Vec2,
}

/// Snapshot describing how long a tower must wait before firing again.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TowerCooldownSnapshot {
    /// Tower described by the snapshot.
    pub tower: TowerId,
    /// Archetype of the tower.
    pub kind: TowerKind,
    /// Remaining time before the tower may fire; zero when ready.
    pub ready_in: Duration,
}

/// Read-only view over all tower cooldowns, sorted by tower identifier.
#[derive(Clone, Debug, Default)]
pub struct TowerCooldownView {
    snapshots: Vec<TowerCooldownSnapshot>,
}

impl TowerCooldownView {
    /// Creates a new cooldown view from the provided snapshots.
    #[must_use]
    pub fn from_snapshots(mut snapshots: Vec<TowerCooldownSnapshot>) -> Self {
        snapshots.sort_by_key(|snapshot| snapshot.tower);
        Self { snapshots }
    }

    /// Iterator over the captured cooldowns in tower order.
    pub fn iter(&self) -> impl Iterator<Item = &TowerCooldownSnapshot> {
        self.snapshots.iter()
    }

    /// Consumes the view, yielding the underlying snapshots.
    #[must_use]
    pub fn into_vec(self) -> Vec<TowerCooldownSnapshot> {
        self.snapshots
    }
}

/// Immutable representation of a projectile in flight.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ProjectileSnapshot {
    /// Archetype of the projectile.
    pub kind: ProjectileKind,
    /// Current position.
    pub position: Vec2,
    /// Fixed aim point captured at launch.
    pub aim: Vec2,
    /// Damage dealt on impact.
    pub damage: u32,
}

/// Immutable representation of a cosmetic particle.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ParticleSnapshot {
    /// Current position.
    pub position: Vec2,
    /// Current velocity in cells per second.
    pub velocity: Vec2,
    /// Remaining lifetime in ticks.
    pub life: f32,
    /// Rendered radius.
    pub size: f32,
}

/// Player-facing economy and progress counters.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct EconomySnapshot {
    /// Gold available for building and upgrading.
    pub gold: u32,
    /// Remaining lives.
    pub lives: u32,
    /// Accumulated score.
    pub score: u32,
    /// Wave counter.
    pub wave: u32,
    /// Whether enemies of the current wave are still alive.
    pub wave_in_progress: bool,
    /// Whether ticks are currently processed.
    pub running: bool,
}
