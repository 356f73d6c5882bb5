//! Track geometry, the built-in circuits and TOML track files.

use std::{
    collections::BTreeMap,
    f32::consts::{FRAC_PI_2, PI},
    fs,
    path::{Path, PathBuf},
};

use arena_core::geometry::Segment;
use glam::Vec2;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Identifier of the default built-in track.
pub const DEFAULT_TRACK: &str = "simple";

/// Problems encountered while supplying or selecting tracks.
#[derive(Debug, Error)]
pub enum TrackError {
    /// A track file could not be read.
    #[error("failed to read track file {path}")]
    Io {
        /// File that failed to load.
        path: PathBuf,
        /// Underlying I/O failure.
        #[source]
        source: std::io::Error,
    },
    /// A track file is not valid TOML or misses required fields.
    #[error("failed to parse track definition: {0}")]
    Parse(#[from] toml::de::Error),
    /// A track definition is structurally unusable.
    #[error("track `{id}` is invalid: {reason}")]
    Invalid {
        /// Identifier of the rejected track.
        id: String,
        /// What is wrong with it.
        reason: String,
    },
    /// Two suppliers offered tracks with the same identifier.
    #[error("duplicate track `{id}`")]
    Duplicate {
        /// Identifier offered twice.
        id: String,
    },
    /// No track with the requested identifier exists.
    #[error("unknown track `{id}`")]
    Unknown {
        /// Identifier that was requested.
        id: String,
    },
}

/// Static circuit geometry. Immutable once selected.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Track {
    /// Stable identifier used to select the track.
    pub id: String,
    /// Display name.
    pub name: String,
    /// Wall segments cars must not touch.
    pub walls: Vec<Segment>,
    /// Checkpoint gates in the order they must be passed.
    pub checkpoints: Vec<Segment>,
    /// Where every car of a generation starts.
    pub start_position: Vec2,
    /// Initial heading in radians.
    pub start_heading: f32,
    /// Horizontal extent of the track.
    pub width: f32,
    /// Vertical extent of the track.
    pub height: f32,
}

impl Track {
    /// Checks that every coordinate is finite and the bounds are positive.
    pub fn validate(&self) -> Result<(), TrackError> {
        let invalid = |reason: &str| TrackError::Invalid {
            id: self.id.clone(),
            reason: reason.to_owned(),
        };

        if self.id.trim().is_empty() {
            return Err(invalid("identifier is empty"));
        }
        if !(self.width.is_finite() && self.height.is_finite())
            || self.width <= 0.0
            || self.height <= 0.0
        {
            return Err(invalid("bounds must be positive"));
        }
        if !self.start_position.is_finite() || !self.start_heading.is_finite() {
            return Err(invalid("start pose is not finite"));
        }
        let segments_finite = self
            .walls
            .iter()
            .chain(&self.checkpoints)
            .all(|segment| segment.start.is_finite() && segment.end.is_finite());
        if !segments_finite {
            return Err(invalid("segment coordinates are not finite"));
        }
        Ok(())
    }

    /// Index of the checkpoint following `last` in cyclic order.
    ///
    /// Returns `None` when the track has no checkpoints.
    #[must_use]
    pub fn next_checkpoint(&self, last: Option<usize>) -> Option<usize> {
        if self.checkpoints.is_empty() {
            return None;
        }
        Some(last.map_or(0, |index| (index + 1) % self.checkpoints.len()))
    }

    /// Parses a single track from TOML.
    pub fn from_toml_str(contents: &str) -> Result<Self, TrackError> {
        let track: Track = toml::from_str(contents)?;
        track.validate()?;
        Ok(track)
    }
}

/// Source of track definitions.
pub trait TrackSupplier {
    /// Produces the supplied tracks in presentation order.
    fn supply(&self) -> Result<Vec<Track>, TrackError>;
}

/// The three circuits shipped with the simulator.
#[derive(Clone, Copy, Debug, Default)]
pub struct BuiltinTracks;

impl TrackSupplier for BuiltinTracks {
    fn supply(&self) -> Result<Vec<Track>, TrackError> {
        Ok(vec![simple_oval(), complex_circuit(), figure_eight()])
    }
}

/// TOML file holding one or more `[[tracks]]` tables.
#[derive(Clone, Debug)]
pub struct TomlTrackFile {
    path: PathBuf,
}

impl TomlTrackFile {
    /// Creates a supplier reading the file at `path`.
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Path of the supplied file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Parses the tracks contained in `contents`.
    pub fn parse(contents: &str) -> Result<Vec<Track>, TrackError> {
        let file: TrackFile = toml::from_str(contents)?;
        for track in &file.tracks {
            track.validate()?;
        }
        Ok(file.tracks)
    }
}

impl TrackSupplier for TomlTrackFile {
    fn supply(&self) -> Result<Vec<Track>, TrackError> {
        let contents = fs::read_to_string(&self.path).map_err(|source| TrackError::Io {
            path: self.path.clone(),
            source,
        })?;
        Self::parse(&contents)
    }
}

#[derive(Debug, Deserialize)]
struct TrackFile {
    tracks: Vec<Track>,
}

/// Tracks collected from one or more suppliers, addressable by identifier.
#[derive(Clone, Debug, Default)]
pub struct TrackLibrary {
    order: Vec<String>,
    tracks: BTreeMap<String, Track>,
}

impl TrackLibrary {
    /// Creates an empty library.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Library holding only the built-in tracks.
    #[must_use]
    pub fn builtin() -> Self {
        let mut library = Self::new();
        for track in [simple_oval(), complex_circuit(), figure_eight()] {
            library.order.push(track.id.clone());
            let _ = library.tracks.insert(track.id.clone(), track);
        }
        library
    }

    /// Adds every track offered by `supplier`.
    ///
    /// Fails without modifying the library if any track is invalid or its
    /// identifier is already taken.
    pub fn extend_from(&mut self, supplier: &dyn TrackSupplier) -> Result<(), TrackError> {
        let supplied = supplier.supply()?;
        let mut seen = Vec::with_capacity(supplied.len());
        for track in &supplied {
            track.validate()?;
            if self.tracks.contains_key(&track.id) || seen.contains(&&track.id) {
                return Err(TrackError::Duplicate {
                    id: track.id.clone(),
                });
            }
            seen.push(&track.id);
        }

        for track in supplied {
            self.order.push(track.id.clone());
            let _ = self.tracks.insert(track.id.clone(), track);
        }
        Ok(())
    }

    /// Looks up a track by identifier.
    pub fn get(&self, id: &str) -> Result<&Track, TrackError> {
        self.tracks.get(id).ok_or_else(|| TrackError::Unknown { id: id.to_owned() })
    }

    /// Identifiers in the order tracks were added.
    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.order.iter().map(String::as_str)
    }

    /// Number of tracks held.
    #[must_use]
    pub fn len(&self) -> usize {
        self.order.len()
    }

    /// Reports whether the library holds no tracks.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }
}

fn wall(x1: f32, y1: f32, x2: f32, y2: f32) -> Segment {
    Segment::new(Vec2::new(x1, y1), Vec2::new(x2, y2))
}

/// Closed polygon through `points`.
fn outline(points: &[(f32, f32)]) -> Vec<Segment> {
    points
        .iter()
        .zip(points.iter().cycle().skip(1))
        .map(|(&(x1, y1), &(x2, y2))| wall(x1, y1, x2, y2))
        .collect()
}

/// Rectangular loop between two nested boxes.
pub fn simple_oval() -> Track {
    let mut walls = outline(&[(50.0, 50.0), (750.0, 50.0), (750.0, 550.0), (50.0, 550.0)]);
    walls.extend(outline(&[
        (150.0, 150.0),
        (650.0, 150.0),
        (650.0, 450.0),
        (150.0, 450.0),
    ]));

    let checkpoints = vec![
        wall(100.0, 100.0, 100.0, 200.0),
        wall(300.0, 100.0, 300.0, 150.0),
        wall(500.0, 100.0, 500.0, 150.0),
        wall(700.0, 200.0, 650.0, 200.0),
        wall(700.0, 400.0, 650.0, 400.0),
        wall(500.0, 500.0, 500.0, 450.0),
        wall(300.0, 500.0, 300.0, 450.0),
        wall(100.0, 400.0, 150.0, 400.0),
    ];

    Track {
        id: "simple".to_owned(),
        name: "Simple Oval".to_owned(),
        walls,
        checkpoints,
        start_position: Vec2::new(100.0, 300.0),
        start_heading: 0.0,
        width: 800.0,
        height: 600.0,
    }
}

/// Stepped outer boundary with three box obstacles.
pub fn complex_circuit() -> Track {
    let mut walls = outline(&[
        (50.0, 50.0),
        (750.0, 50.0),
        (750.0, 300.0),
        (600.0, 300.0),
        (600.0, 450.0),
        (750.0, 450.0),
        (750.0, 550.0),
        (50.0, 550.0),
        (50.0, 450.0),
        (200.0, 450.0),
        (200.0, 300.0),
        (50.0, 300.0),
    ]);
    walls.extend(outline(&[
        (150.0, 150.0),
        (300.0, 150.0),
        (300.0, 200.0),
        (150.0, 200.0),
    ]));
    walls.extend(outline(&[
        (500.0, 150.0),
        (650.0, 150.0),
        (650.0, 200.0),
        (500.0, 200.0),
    ]));
    walls.extend(outline(&[
        (350.0, 350.0),
        (450.0, 350.0),
        (450.0, 400.0),
        (350.0, 400.0),
    ]));

    let checkpoints = vec![
        wall(125.0, 100.0, 125.0, 150.0),
        wall(400.0, 100.0, 400.0, 150.0),
        wall(675.0, 100.0, 675.0, 150.0),
        wall(700.0, 225.0, 650.0, 225.0),
        wall(675.0, 375.0, 675.0, 425.0),
        wall(700.0, 500.0, 650.0, 500.0),
        wall(400.0, 500.0, 400.0, 450.0),
        wall(125.0, 500.0, 125.0, 450.0),
        wall(100.0, 375.0, 150.0, 375.0),
        wall(125.0, 225.0, 125.0, 275.0),
    ];

    Track {
        id: "complex".to_owned(),
        name: "Complex Circuit".to_owned(),
        walls,
        checkpoints,
        start_position: Vec2::new(100.0, 125.0),
        start_heading: 0.0,
        width: 800.0,
        height: 600.0,
    }
}

/// Two stacked elliptical loops built from 64 wall pieces each side.
pub fn figure_eight() -> Track {
    const SEGMENTS: usize = 64;
    const CENTER: Vec2 = Vec2::new(400.0, 300.0);
    const RADIUS: f32 = 150.0;
    const SQUASH: f32 = 0.6;
    const LANE: f32 = 50.0;
    const LOOP_OFFSET: f32 = 100.0;

    let offset = |angle: f32| Vec2::new((angle + FRAC_PI_2).cos(), (angle + FRAC_PI_2).sin()) * LANE;
    let loops: [fn(f32) -> Vec2; 2] = [
        |angle| {
            Vec2::new(
                CENTER.x + angle.cos() * RADIUS,
                CENTER.y - LOOP_OFFSET + angle.sin() * RADIUS * SQUASH,
            )
        },
        |angle| {
            Vec2::new(
                CENTER.x - angle.cos() * RADIUS,
                CENTER.y + LOOP_OFFSET - angle.sin() * RADIUS * SQUASH,
            )
        },
    ];

    let mut walls = Vec::with_capacity(SEGMENTS * 4);
    for step in 0..SEGMENTS {
        let from = step as f32 / 32.0 * PI;
        let to = (step + 1) as f32 / 32.0 * PI;
        for centre in loops {
            let (a, b) = (centre(from), centre(to));
            walls.push(Segment::new(a + offset(from), b + offset(to)));
            walls.push(Segment::new(a - offset(from), b - offset(to)));
        }
    }

    let checkpoints = (0..8)
        .map(|index| {
            let angle = index as f32 / 4.0 * PI;
            let centre = Vec2::new(
                CENTER.x + angle.cos() * RADIUS * 0.8,
                CENTER.y - LOOP_OFFSET + angle.sin() * RADIUS * SQUASH * 0.8,
            );
            Segment::new(centre - Vec2::splat(10.0), centre + Vec2::splat(10.0))
        })
        .collect();

    Track {
        id: "figure8".to_owned(),
        name: "Figure Eight".to_owned(),
        walls,
        checkpoints,
        start_position: Vec2::new(CENTER.x + RADIUS * 0.8, CENTER.y - LOOP_OFFSET),
        start_heading: 0.0,
        width: 800.0,
        height: 600.0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builtin_tracks_are_valid_and_distinct() {
        let tracks = BuiltinTracks.supply().expect("builtin tracks");
        let ids: Vec<&str> = tracks.iter().map(|track| track.id.as_str()).collect();
        assert_eq!(ids, vec!["simple", "complex", "figure8"]);
        for track in &tracks {
            track.validate().expect("valid builtin track");
            assert_eq!(track.start_heading, 0.0);
        }
        assert_eq!(tracks[0].walls.len(), 8);
        assert_eq!(tracks[0].checkpoints.len(), 8);
        assert_eq!(tracks[1].walls.len(), 24);
        assert_eq!(tracks[1].checkpoints.len(), 10);
        assert_eq!(tracks[2].walls.len(), 256);
        assert_eq!(tracks[2].checkpoints.len(), 8);
    }

    #[test]
    fn outlines_are_closed() {
        let walls = outline(&[(0.0, 0.0), (1.0, 0.0), (1.0, 1.0)]);
        assert_eq!(walls.len(), 3);
        assert_eq!(walls[2].end, walls[0].start);
    }

    #[test]
    fn checkpoints_cycle() {
        let track = simple_oval();
        assert_eq!(track.next_checkpoint(None), Some(0));
        assert_eq!(track.next_checkpoint(Some(3)), Some(4));
        assert_eq!(track.next_checkpoint(Some(7)), Some(0));

        let empty = Track {
            checkpoints: Vec::new(),
            ..track
        };
        assert_eq!(empty.next_checkpoint(None), None);
    }

    #[test]
    fn toml_files_supply_validated_tracks() {
        let contents = r#"
            [[tracks]]
            id = "box"
            name = "Box"
            start_position = [20.0, 20.0]
            start_heading = 0.0
            width = 100.0
            height = 100.0
            walls = [
                { start = [0.0, 0.0], end = [100.0, 0.0] },
                { start = [100.0, 0.0], end = [100.0, 100.0] },
            ]
            checkpoints = [{ start = [50.0, 0.0], end = [50.0, 40.0] }]
        "#;

        let tracks = TomlTrackFile::parse(contents).expect("valid file");
        assert_eq!(tracks.len(), 1);
        assert_eq!(tracks[0].walls.len(), 2);
        assert_eq!(tracks[0].start_position, Vec2::new(20.0, 20.0));

        let mut library = TrackLibrary::builtin();
        struct Inline(Vec<Track>);
        impl TrackSupplier for Inline {
            fn supply(&self) -> Result<Vec<Track>, TrackError> {
                Ok(self.0.clone())
            }
        }
        library
            .extend_from(&Inline(tracks.clone()))
            .expect("new identifier");
        assert_eq!(library.len(), 4);
        assert_eq!(library.get("box").map(|track| track.width).ok(), Some(100.0));
        assert!(matches!(
            library.extend_from(&Inline(tracks)),
            Err(TrackError::Duplicate { .. })
        ));
    }

    #[test]
    fn invalid_definitions_are_rejected() {
        let negative = r#"
            id = "bad"
            name = "Bad"
            start_position = [0.0, 0.0]
            start_heading = 0.0
            width = -1.0
            height = 10.0
            walls = []
            checkpoints = []
        "#;
        assert!(matches!(
            Track::from_toml_str(negative),
            Err(TrackError::Invalid { .. })
        ));
        assert!(matches!(
            Track::from_toml_str("id = 3"),
            Err(TrackError::Parse(_))
        ));
        assert!(matches!(
            TrackLibrary::builtin().get("moon"),
            Err(TrackError::Unknown { .. })
        ));
    }

    #[test]
    fn missing_files_report_their_path() {
        let supplier = TomlTrackFile::new("/definitely/not/here.toml");
        match supplier.supply() {
            Err(TrackError::Io { path, .. }) => assert_eq!(path, supplier.path()),
            other => panic!("unexpected result: {other:?}"),
        }
    }
}
