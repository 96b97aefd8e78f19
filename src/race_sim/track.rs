//! Track - Oval track geometry
//!
//! Maps a scalar race distance plus a lane index onto a screen position and
//! heading. Distances are lane independent: every racer measures progress
//! along the same centerline length, lanes only change where they are drawn.

use serde::{Deserialize, Serialize};
use std::f32::consts::{PI, TAU};

/// 2D point or radius pair in screen units
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Point {
    pub x: f32,
    pub y: f32,
}

impl Point {
    pub const fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }
}

/// Resolved on-track placement of a racer
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TrackPosition {
    pub x: f32,
    pub y: f32,
    /// Tangent angle in radians, for rendering rotation only
    pub heading: f32,
}

/// Immutable oval geometry, rebuilt as a whole whenever the viewport changes
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrackSpec {
    center: Point,
    outer_radius: Point,
    inner_radius: Point,
    track_width: f32,
    lane_count: usize,
    total_length: f32,
}

impl TrackSpec {
    /// Outer radii as a fraction of the viewport size
    const OUTER_RADIUS_X_FACTOR: f32 = 0.42;
    const OUTER_RADIUS_Y_FACTOR: f32 = 0.38;
    /// Track width as a fraction of the smaller outer radius
    const TRACK_WIDTH_FACTOR: f32 = 0.35;

    /// Build a track from its outer boundary and width.
    ///
    /// Negative radii are treated as zero and the width is limited to the
    /// smaller outer radius so the inner boundary never inverts.
    pub fn new(center: Point, outer_radius: Point, track_width: f32, lane_count: usize) -> Self {
        debug_assert!(lane_count > 0, "track needs at least one lane");

        let outer_radius = Point::new(sanitize(outer_radius.x), sanitize(outer_radius.y));
        let track_width = sanitize(track_width).min(outer_radius.x.min(outer_radius.y));
        let inner_radius = Point::new(outer_radius.x - track_width, outer_radius.y - track_width);

        let centerline = Point::new(
            outer_radius.x - track_width / 2.0,
            outer_radius.y - track_width / 2.0,
        );

        Self {
            center,
            outer_radius,
            inner_radius,
            track_width,
            lane_count: lane_count.max(1),
            total_length: ellipse_perimeter(centerline.x, centerline.y),
        }
    }

    /// Derive the track from the current viewport dimensions
    pub fn from_viewport(width: f32, height: f32, lane_count: usize) -> Self {
        let width = sanitize(width);
        let height = sanitize(height);
        let outer = Point::new(
            width * Self::OUTER_RADIUS_X_FACTOR,
            height * Self::OUTER_RADIUS_Y_FACTOR,
        );
        let track_width = outer.x.min(outer.y) * Self::TRACK_WIDTH_FACTOR;

        Self::new(Point::new(width / 2.0, height / 2.0), outer, track_width, lane_count)
    }

    pub fn center(&self) -> Point {
        self.center
    }

    pub fn outer_radius(&self) -> Point {
        self.outer_radius
    }

    pub fn inner_radius(&self) -> Point {
        self.inner_radius
    }

    pub fn track_width(&self) -> f32 {
        self.track_width
    }

    pub fn lane_count(&self) -> usize {
        self.lane_count
    }

    /// Radial spacing between adjacent lanes
    pub fn lane_width(&self) -> f32 {
        self.track_width / self.lane_count as f32
    }

    /// Length of one lap along the centerline
    pub fn total_length(&self) -> f32 {
        self.total_length
    }

    /// Whether the track has collapsed to nothing (e.g. a zero-sized viewport)
    pub fn is_degenerate(&self) -> bool {
        self.total_length <= 0.0
    }

    pub fn contains_lane(&self, lane: usize) -> bool {
        lane < self.lane_count
    }

    /// Laps covered for a given distance; zero on a degenerate track
    pub fn progress_of(&self, distance: f32) -> f32 {
        if self.is_degenerate() {
            0.0
        } else {
            distance / self.total_length
        }
    }

    /// Parametric angle for a distance, periodic over one lap
    pub fn angle_at(&self, distance: f32) -> f32 {
        if self.is_degenerate() {
            return 0.0;
        }
        let wrapped = distance.rem_euclid(self.total_length);
        (wrapped / self.total_length) * TAU
    }

    /// Screen position and heading for a distance in a lane.
    ///
    /// Lane 0 runs along the inner boundary. Lane validity is checked when
    /// racers are created, not here.
    pub fn position_at(&self, distance: f32, lane: usize) -> TrackPosition {
        debug_assert!(self.contains_lane(lane), "lane {lane} out of range");

        let angle = self.angle_at(distance);
        let offset = lane as f32 * self.lane_width();
        let radius = Point::new(self.inner_radius.x + offset, self.inner_radius.y + offset);

        let (sin, cos) = angle.sin_cos();
        TrackPosition {
            x: self.center.x + radius.x * cos,
            y: self.center.y + radius.y * sin,
            heading: (radius.y * cos).atan2(-radius.x * sin),
        }
    }
}

fn sanitize(value: f32) -> f32 {
    if value.is_finite() {
        value.max(0.0)
    } else {
        0.0
    }
}

/// Ramanujan's approximation of an ellipse perimeter
fn ellipse_perimeter(a: f32, b: f32) -> f32 {
    let a = a.max(0.0);
    let b = b.max(0.0);
    let perimeter = PI * (3.0 * (a + b) - ((3.0 * a + b) * (a + 3.0 * b)).sqrt());
    if perimeter.is_finite() {
        perimeter.max(0.0)
    } else {
        0.0
    }
}

/// Smallest signed difference between two angles, in `[-PI, PI]`
pub fn angle_delta(from: f32, to: f32) -> f32 {
    let diff = (to - from).rem_euclid(TAU);
    if diff > PI {
        diff - TAU
    } else {
        diff
    }
}
