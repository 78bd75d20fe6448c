//! Radial layout engine
//!
//! Angles are measured clockwise from 12 o'clock, in radians, and mapped onto
//! SVG screen coordinates (y grows downwards).

use serde::{Deserialize, Serialize};
use std::f64::consts::PI;

/// A point in canvas coordinates
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Default)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub const ORIGIN: Point = Point { x: 0.0, y: 0.0 };

    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// Round both coordinates to `decimals` places for attribute output
    pub fn rounded(self, decimals: i32) -> Self {
        let factor = 10f64.powi(decimals);
        Self {
            x: (self.x * factor).round() / factor,
            y: (self.y * factor).round() / factor,
        }
    }

    pub fn distance(self, other: Point) -> f64 {
        ((self.x - other.x).powi(2) + (self.y - other.y).powi(2)).sqrt()
    }
}

/// Map a polar coordinate to Cartesian, translated by `offset`
pub fn coords_from_angle(center: Point, angle: f64, radius: f64, offset: Point) -> Point {
    Point {
        x: center.x + radius * angle.sin() + offset.x,
        y: center.y - radius * angle.cos() + offset.y,
    }
}

/// Canvas-derived constants shared by every placement on one chart.
/// The centre sits on whole pixels (`side // 2`).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CanvasGeometry {
    pub width: f64,
    pub height: f64,
    pub center: Point,
    /// Radar axis length
    pub axis_radius: f64,
    /// Outer radius of an iris chart
    pub full_radius: f64,
}

impl CanvasGeometry {
    pub fn new(width: f64, height: f64) -> Self {
        let min = width.min(height);
        Self {
            width,
            height,
            center: Point::new((width / 2.0).floor(), (height / 2.0).floor()),
            axis_radius: min / 2.0 - min / 20.0,
            full_radius: min / 2.0 - 10.0,
        }
    }

    pub fn min_side(&self) -> f64 {
        self.width.min(self.height)
    }
}

/// One segment per residue around a ring, optionally leaving a gap at the top
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RingLayout {
    pub segments: usize,
    /// Gap width in radians
    pub gap: f64,
}

impl RingLayout {
    pub fn with_gap_degrees(segments: usize, gap_degrees: f64) -> Self {
        Self {
            segments,
            gap: gap_degrees.to_radians(),
        }
    }

    /// Angular width of one residue segment
    pub fn angle_delta(&self) -> f64 {
        if self.segments == 0 {
            return 0.0;
        }
        (2.0 * PI - self.gap) / self.segments as f64
    }

    /// Start angle of residue `index` (fractional indices allowed)
    pub fn angle(&self, index: f64) -> f64 {
        index * self.angle_delta()
    }

    /// Place a point at a fractional residue index, with the gap centred at 12 o'clock
    pub fn place(&self, center: Point, index: f64, radius: f64) -> Point {
        coords_from_angle(center, self.angle(index) + self.gap / 2.0, radius, Point::ORIGIN)
    }

    /// Rotation in degrees applied to the selector marker to highlight `residue`
    pub fn selector_rotation_degrees(&self, residue: usize) -> f64 {
        if self.segments == 0 {
            return 0.0;
        }
        (360.0 - self.gap.to_degrees()) / self.segments as f64 * residue as f64
    }
}

/// One axis per metric; distance from centre is proportional to a percentile
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RadarLayout {
    pub axes: usize,
    pub geometry: CanvasGeometry,
}

impl RadarLayout {
    pub fn new(axes: usize, geometry: CanvasGeometry) -> Self {
        Self { axes, geometry }
    }

    pub fn angle(&self, axis: usize) -> f64 {
        if self.axes == 0 {
            return 0.0;
        }
        axis as f64 * 2.0 * PI / self.axes as f64
    }

    /// Point for a percentile `value` (0-100) on `axis`
    pub fn point(&self, axis: usize, value: f64) -> Point {
        coords_from_angle(
            self.geometry.center,
            self.angle(axis),
            self.geometry.axis_radius * value / 100.0,
            Point::ORIGIN,
        )
    }

    /// Closed polygon through the present values, in axis order.
    /// Absent values are left out rather than drawn at the centre.
    pub fn polygon(&self, values: &[Option<f64>]) -> Vec<Point> {
        values
            .iter()
            .enumerate()
            .filter_map(|(axis, value)| value.map(|v| self.point(axis, v)))
            .collect()
    }
}

/// Residue range shown in a docked side panel of `window` rows around `residue`,
/// clamped to the chain. Returns inclusive `(start, end)`.
pub fn docked_window(residue: usize, window: usize, chain_len: usize) -> (usize, usize) {
    if chain_len == 0 || window == 0 {
        return (0, 0);
    }
    if window >= chain_len {
        return (0, chain_len - 1);
    }
    let half = (window + 1) / 2;
    let start = residue.saturating_sub(half);
    let end = start + window - 1;
    if residue < half {
        (0, window - 1)
    } else if end >= chain_len {
        (chain_len - window, chain_len - 1)
    } else {
        (start, end)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn close(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[test]
    fn test_coords_from_angle() {
        let up = coords_from_angle(Point::ORIGIN, 0.0, 10.0, Point::ORIGIN);
        assert!(close(up.x, 0.0));
        assert!(close(up.y, -10.0));

        let right = coords_from_angle(Point::ORIGIN, PI / 2.0, 10.0, Point::ORIGIN);
        assert!(close(right.x, 10.0));
        assert!(close(right.y, 0.0));

        let shifted = coords_from_angle(Point::new(500.0, 500.0), PI, 100.0, Point::new(3.0, -4.0));
        assert!(close(shifted.x, 503.0));
        assert!(close(shifted.y, 596.0));
    }

    #[test]
    fn test_canvas_geometry() {
        let g = CanvasGeometry::new(600.0, 500.0);
        assert_eq!(g.center, Point::new(300.0, 250.0));
        assert!(close(g.axis_radius, 225.0));
        assert!(close(g.full_radius, 240.0));

        // Odd canvases centre on whole pixels
        let odd = CanvasGeometry::new(999.0, 601.0);
        assert_eq!(odd.center, Point::new(499.0, 300.0));
    }

    #[test]
    fn test_full_ring_angles_wrap() {
        let ring = RingLayout::with_gap_degrees(7, 0.0);
        let delta = ring.angle_delta();
        assert!(close(delta, 2.0 * PI / 7.0));
        for i in 0..6 {
            assert!(close(ring.angle((i + 1) as f64) - ring.angle(i as f64), delta));
        }
        let wrapped = (ring.angle(6.0) + delta) % (2.0 * PI);
        assert!(close(wrapped, ring.angle(0.0)) || close(wrapped, 2.0 * PI));
    }

    #[test]
    fn test_gapped_ring() {
        let ring = RingLayout { segments: 10, gap: 0.3 };
        assert!(close(ring.angle_delta(), (2.0 * PI - 0.3) / 10.0));

        // Residue 0 starts half a gap clockwise of 12 o'clock
        let start = ring.place(Point::ORIGIN, 0.0, 1.0);
        assert!(close(start.x, 0.15_f64.sin()));
        // The last residue ends half a gap anticlockwise of 12 o'clock
        let end = ring.place(Point::ORIGIN, 10.0, 1.0);
        assert!(close(end.x, -(0.15_f64.sin())));
        assert!(close(end.y, start.y));
    }

    #[test]
    fn test_selector_rotation() {
        let ring = RingLayout::with_gap_degrees(100, 20.0);
        assert!(close(ring.selector_rotation_degrees(0), 0.0));
        assert!(close(ring.selector_rotation_degrees(50), 170.0));
        assert!(close(RingLayout::with_gap_degrees(4, 0.0).selector_rotation_degrees(1), 90.0));
        assert!(close(RingLayout::with_gap_degrees(0, 0.0).selector_rotation_degrees(3), 0.0));
    }

    #[test]
    fn test_radar_points_and_polygon() {
        let radar = RadarLayout::new(4, CanvasGeometry::new(200.0, 200.0));
        // axis radius = 100 - 10 = 90
        let top = radar.point(0, 100.0);
        assert!(close(top.x, 100.0));
        assert!(close(top.y, 10.0));
        let right = radar.point(1, 50.0);
        assert!(close(right.x, 145.0));
        assert!(close(right.y, 100.0));

        let polygon = radar.polygon(&[Some(100.0), None, Some(0.0), Some(50.0)]);
        assert_eq!(polygon.len(), 3);
        assert_eq!(polygon[1].rounded(6), Point::new(100.0, 100.0));
    }

    #[test]
    fn test_docked_window() {
        assert_eq!(docked_window(50, 10, 100), (45, 54));
        assert_eq!(docked_window(10, 5, 100), (7, 11));
        assert_eq!(docked_window(2, 10, 100), (0, 9));
        assert_eq!(docked_window(98, 10, 100), (90, 99));
        assert_eq!(docked_window(3, 10, 6), (0, 5));
        assert_eq!(docked_window(0, 0, 6), (0, 0));
    }

    #[test]
    fn test_point_rounding() {
        assert_eq!(Point::new(1.26, -3.04).rounded(1), Point::new(1.3, -3.0));
    }
}
