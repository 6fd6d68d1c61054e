//! Shared data types: detected circles and pixel-space bounds.

use serde::{Deserialize, Serialize};

/// A detected (or user-adjusted) circle in image coordinates.
///
/// The original detector pose is captured at construction and kept
/// alongside the current pose, so interactive edits stay reversible.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Circle {
    /// Center x in pixels.
    pub x: i32,
    /// Center y in pixels.
    pub y: i32,
    /// Radius in pixels.
    pub radius: i32,
    /// Detection confidence in `[0, 1]`.
    pub confidence: f32,
    /// True once the pose was edited after detection.
    pub adjusted: bool,
    /// Center x as originally detected.
    pub original_x: i32,
    /// Center y as originally detected.
    pub original_y: i32,
    /// Radius as originally detected.
    pub original_radius: i32,
}

impl Circle {
    /// New circle; the original pose is snapshotted from the arguments.
    pub fn new(x: i32, y: i32, radius: i32, confidence: f32) -> Self {
        Self {
            x,
            y,
            radius,
            confidence,
            adjusted: false,
            original_x: x,
            original_y: y,
            original_radius: radius,
        }
    }

    /// Move/resize the circle, marking it as user-adjusted.
    ///
    /// The original pose is left untouched so [`Circle::reset`] can
    /// undo any number of edits.
    pub fn adjust(&mut self, x: i32, y: i32, radius: i32) {
        self.x = x;
        self.y = y;
        self.radius = radius;
        self.adjusted = true;
    }

    /// Restore the originally detected pose.
    pub fn reset(&mut self) {
        self.x = self.original_x;
        self.y = self.original_y;
        self.radius = self.original_radius;
        self.adjusted = false;
    }

    /// Euclidean distance between the centers of two circles.
    pub fn center_distance(&self, other: &Circle) -> f32 {
        let dx = (self.x - other.x) as f32;
        let dy = (self.y - other.y) as f32;
        (dx * dx + dy * dy).sqrt()
    }

    /// True when the axis-aligned bounding box (center ± radius) lies
    /// fully inside a `width`×`height` image.
    pub fn fits_within(&self, width: u32, height: u32) -> bool {
        self.x - self.radius >= 0
            && self.y - self.radius >= 0
            && self.x + self.radius < width as i32
            && self.y + self.radius < height as i32
    }
}

/// Half-open pixel rectangle `[x0, x1) × [y0, y1)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegionBounds {
    /// Left edge (inclusive).
    pub x0: u32,
    /// Top edge (inclusive).
    pub y0: u32,
    /// Right edge (exclusive).
    pub x1: u32,
    /// Bottom edge (exclusive).
    pub y1: u32,
}

impl RegionBounds {
    /// Width in pixels.
    pub fn width(&self) -> u32 {
        self.x1.saturating_sub(self.x0)
    }

    /// Height in pixels.
    pub fn height(&self) -> u32 {
        self.y1.saturating_sub(self.y0)
    }

    /// True when either side collapsed to zero.
    pub fn is_empty(&self) -> bool {
        self.x1 <= self.x0 || self.y1 <= self.y0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn adjust_keeps_original_pose() {
        let mut c = Circle::new(100, 120, 30, 0.8);
        c.adjust(110, 118, 35);
        assert!(c.adjusted);
        assert_eq!(c.x, 110);
        assert_eq!(c.original_x, 100);
        assert_eq!(c.original_radius, 30);

        c.reset();
        assert!(!c.adjusted);
        assert_eq!((c.x, c.y, c.radius), (100, 120, 30));
    }

    #[test]
    fn fits_within_checks_bounding_box() {
        let c = Circle::new(50, 50, 20, 1.0);
        assert!(c.fits_within(100, 100));
        assert!(!c.fits_within(69, 100));
        let edge = Circle::new(10, 50, 20, 1.0);
        assert!(!edge.fits_within(100, 100));
    }

    #[test]
    fn bounds_dimensions() {
        let b = RegionBounds {
            x0: 0,
            y0: 0,
            x1: 36,
            y1: 36,
        };
        assert_eq!(b.width(), 36);
        assert_eq!(b.height(), 36);
        assert!(!b.is_empty());
        let empty = RegionBounds {
            x0: 5,
            y0: 5,
            x1: 5,
            y1: 9,
        };
        assert!(empty.is_empty());
    }
}
