use std::{
    fs,
    path::{Path, PathBuf},
};

use arena_core::{CellCoord, TowerKind};
use arena_driving::DrivingConfig;
use arena_system_evolution::EvolutionConfig;
use arena_system_spawning::SpawningConfig;
use arena_world::WorldConfig;
use serde::Deserialize;
use thiserror::Error;

/// Failures while loading an arena configuration file.
#[derive(Debug, Error)]
pub(crate) enum ConfigError {
    /// The file could not be read.
    #[error("failed to read {}", path.display())]
    Read {
        /// Path that was requested.
        path: PathBuf,
        /// Underlying I/O failure.
        #[source]
        source: std::io::Error,
    },
    /// The file is not a valid arena configuration.
    #[error("failed to parse {}", path.display())]
    Parse {
        /// Path that was requested.
        path: PathBuf,
        /// Underlying TOML failure.
        #[source]
        source: toml::de::Error,
    },
}

/// Every tunable consumed by the command-line sessions.
#[derive(Clone, Debug, Default, PartialEq, Deserialize)]
#[serde(default)]
pub(crate) struct ArenaConfig {
    pub(crate) world: WorldConfig,
    pub(crate) spawning: SpawningConfig,
    pub(crate) defence: DefenceConfig,
    pub(crate) driving: DrivingConfig,
    pub(crate) evolution: EvolutionConfig,
}

impl ArenaConfig {
    /// Loads the configuration at `path`, or the defaults when none is given.
    pub(crate) fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let Some(path) = path else {
            return Ok(Self::default());
        };
        let contents = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_owned(),
            source,
        })?;
        Self::parse(&contents).map_err(|source| ConfigError::Parse {
            path: path.to_owned(),
            source,
        })
    }

    fn parse(contents: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(contents)
    }
}

/// Headless tower-defence run parameters.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub(crate) struct DefenceConfig {
    /// Towers placed before the first wave, in order.
    pub(crate) towers: Vec<TowerPlacement>,
}

impl Default for DefenceConfig {
    fn default() -> Self {
        Self {
            towers: vec![
                TowerPlacement::new(TowerKind::Basic, 4, 11),
                TowerPlacement::new(TowerKind::Basic, 9, 13),
                TowerPlacement::new(TowerKind::Laser, 15, 11),
            ],
        }
    }
}

/// A single tower of the opening layout.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize)]
pub(crate) struct TowerPlacement {
    pub(crate) kind: TowerKind,
    pub(crate) column: u32,
    pub(crate) row: u32,
}

impl TowerPlacement {
    const fn new(kind: TowerKind, column: u32, row: u32) -> Self {
        Self { kind, column, row }
    }

    pub(crate) const fn cell(&self) -> CellCoord {
        CellCoord::new(self.column, self.row)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_sections_fall_back_to_defaults() {
        let config = ArenaConfig::parse(
            r#"
            [world]
            starting_gold = 500

            [driving]
            population = 8
            track = "figure8"

            [[defence.towers]]
            kind = "missile"
            column = 3
            row = 4
            "#,
        )
        .expect("valid config");

        assert_eq!(config.world.starting_gold, 500);
        assert_eq!(config.world.starting_lives, 20);
        assert_eq!(config.driving.population, 8);
        assert_eq!(config.driving.track, "figure8");
        assert_eq!(config.driving.layers, vec![8, 12, 8, 4]);
        assert_eq!(config.evolution, EvolutionConfig::default());
        assert_eq!(
            config.defence.towers,
            vec![TowerPlacement::new(TowerKind::Missile, 3, 4)]
        );
    }

    #[test]
    fn no_path_means_defaults() {
        assert_eq!(ArenaConfig::load(None).expect("defaults"), ArenaConfig::default());
    }

    #[test]
    fn unreadable_files_name_the_path() {
        let error = ArenaConfig::load(Some(Path::new("/definitely/not/here.toml")))
            .expect_err("missing file");
        assert!(matches!(error, ConfigError::Read { .. }));
        assert!(error.to_string().contains("/definitely/not/here.toml"));
    }

    #[test]
    fn unknown_tower_kinds_are_parse_errors() {
        let result = ArenaConfig::parse(
            r#"
            [[defence.towers]]
            kind = "catapult"
            column = 1
            row = 1
            "#,
        );
        assert!(result.is_err());
    }
}
