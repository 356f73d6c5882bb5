//! Planar geometry primitives shared by sensing and collision code.
//!
//! Every function returns a defined sentinel for degenerate input (zero
//! length segments, parallel lines, non-finite angles) so callers never see
//! `NaN` leak out of a query.

use std::f32::consts::{PI, TAU};

use glam::Vec2;
use serde::{Deserialize, Serialize};

/// Denominator magnitude below which two segments are treated as parallel.
const PARALLEL_EPSILON: f32 = 1e-10;

/// Straight line segment between two points.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Segment {
    /// First endpoint.
    pub start: Vec2,
    /// Second endpoint.
    pub end: Vec2,
}

impl Segment {
    /// Creates a segment from its endpoints.
    #[must_use]
    pub const fn new(start: Vec2, end: Vec2) -> Self {
        Self { start, end }
    }

    /// Point on the segment closest to `point`.
    ///
    /// A zero-length segment collapses to its start point.
    #[must_use]
    pub fn closest_point(&self, point: Vec2) -> Vec2 {
        let direction = self.end - self.start;
        let length_squared = direction.length_squared();
        if length_squared <= f32::EPSILON {
            return self.start;
        }
        let t = ((point - self.start).dot(direction) / length_squared).clamp(0.0, 1.0);
        self.start + direction * t
    }

    /// Shortest distance between `point` and any point on the segment.
    #[must_use]
    pub fn distance_to_point(&self, point: Vec2) -> f32 {
        point.distance(self.closest_point(point))
    }

    /// Intersection point of two segments, including their endpoints.
    ///
    /// Parallel, collinear and zero-length segments never intersect.
    #[must_use]
    pub fn intersection(&self, other: &Segment) -> Option<Vec2> {
        let a = self.start;
        let b = self.end;
        let c = other.start;
        let d = other.end;

        let denominator = (a.x - b.x) * (c.y - d.y) - (a.y - b.y) * (c.x - d.x);
        if !denominator.is_finite() || denominator.abs() < PARALLEL_EPSILON {
            return None;
        }

        let t = ((a.x - c.x) * (c.y - d.y) - (a.y - c.y) * (c.x - d.x)) / denominator;
        let u = -((a.x - b.x) * (a.y - c.y) - (a.y - b.y) * (a.x - c.x)) / denominator;

        if (0.0..=1.0).contains(&t) && (0.0..=1.0).contains(&u) {
            Some(a + (b - a) * t)
        } else {
            None
        }
    }
}

/// Outcome of a single ray cast.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct RayHit {
    /// Distance to the nearest wall, or the ray length when nothing was hit.
    pub distance: f32,
    /// Whether any wall intersected the ray.
    pub hit: bool,
}

/// Unit vector pointing along `angle` radians.
#[must_use]
pub fn heading_vector(angle: f32) -> Vec2 {
    if !angle.is_finite() {
        return Vec2::X;
    }
    Vec2::new(angle.cos(), angle.sin())
}

/// Casts a ray of `length` from `origin` along `angle` against every wall.
///
/// Only walls strictly closer than `length` count as hits.
#[must_use]
pub fn raycast(origin: Vec2, angle: f32, length: f32, walls: &[Segment]) -> RayHit {
    let ray = Segment::new(origin, origin + heading_vector(angle) * length);
    walls
        .iter()
        .filter_map(|wall| ray.intersection(wall))
        .map(|point| origin.distance(point))
        .filter(|distance| distance.is_finite() && *distance < length)
        .min_by(f32::total_cmp)
        .map_or(
            RayHit {
                distance: length,
                hit: false,
            },
            |distance| RayHit {
                distance,
                hit: true,
            },
        )
}

/// Wraps an angle into the half-open interval `[-π, π)`.
///
/// Non-finite angles collapse to zero.
#[must_use]
pub fn wrap_angle(angle: f32) -> f32 {
    if !angle.is_finite() {
        return 0.0;
    }
    (angle + PI).rem_euclid(TAU) - PI
}

#[cfg(test)]
mod tests {
    use super::*;

    fn wall(ax: f32, ay: f32, bx: f32, by: f32) -> Segment {
        Segment::new(Vec2::new(ax, ay), Vec2::new(bx, by))
    }

    #[test]
    fn raycast_reports_nearest_wall() {
        let walls = [wall(50.0, -10.0, 50.0, 10.0)];
        let result = raycast(Vec2::ZERO, 0.0, 100.0, &walls);
        assert!(result.hit);
        assert!((result.distance - 50.0).abs() < 1e-4);
    }

    #[test]
    fn raycast_without_intersection_returns_full_length() {
        let walls = [wall(50.0, 10.0, 50.0, 30.0)];
        let result = raycast(Vec2::ZERO, 0.0, 100.0, &walls);
        assert_eq!(
            result,
            RayHit {
                distance: 100.0,
                hit: false
            }
        );
    }

    #[test]
    fn raycast_ignores_walls_at_the_tip() {
        let walls = [wall(100.0, -10.0, 100.0, 10.0)];
        let result = raycast(Vec2::ZERO, 0.0, 100.0, &walls);
        assert_eq!(
            result,
            RayHit {
                distance: 100.0,
                hit: false
            }
        );
    }

    #[test]
    fn raycast_picks_closest_of_several_walls() {
        let walls = [wall(80.0, -5.0, 80.0, 5.0), wall(30.0, -5.0, 30.0, 5.0)];
        let result = raycast(Vec2::ZERO, 0.0, 100.0, &walls);
        assert!(result.hit);
        assert!((result.distance - 30.0).abs() < 1e-4);
    }

    #[test]
    fn parallel_segments_do_not_intersect() {
        let a = wall(0.0, 0.0, 10.0, 0.0);
        let b = wall(0.0, 5.0, 10.0, 5.0);
        assert_eq!(a.intersection(&b), None);
        assert_eq!(a.intersection(&a), None, "collinear overlap is not a hit");
    }

    #[test]
    fn zero_length_segment_measures_point_distance() {
        let point_wall = wall(3.0, 4.0, 3.0, 4.0);
        assert_eq!(point_wall.distance_to_point(Vec2::ZERO), 5.0);
        assert_eq!(point_wall.intersection(&wall(0.0, 0.0, 10.0, 10.0)), None);
    }

    #[test]
    fn distance_to_segment_uses_closest_point() {
        let segment = wall(0.0, 0.0, 10.0, 0.0);
        assert_eq!(segment.distance_to_point(Vec2::new(5.0, 3.0)), 3.0);
        assert_eq!(segment.distance_to_point(Vec2::new(13.0, 4.0)), 5.0);
        assert_eq!(segment.distance_to_point(Vec2::new(4.0, 0.0)), 0.0);
    }

    #[test]
    fn wrap_angle_stays_in_half_open_range() {
        assert!((wrap_angle(3.0 * PI / 2.0) + PI / 2.0).abs() < 1e-5);
        assert!((wrap_angle(-3.0 * PI / 2.0) - PI / 2.0).abs() < 1e-5);
        assert!((wrap_angle(0.25) - 0.25).abs() < 1e-6);
        assert_eq!(wrap_angle(f32::NAN), 0.0);
    }
}
