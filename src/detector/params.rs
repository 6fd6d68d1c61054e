//! Parameter types configuring the circle detector.
//!
//! Defaults aim for robust behaviour on typical screenshot content:
//! UI elements with crisp boundaries, radii in the tens of pixels.
//! For tuning, start with the Canny threshold (`param1`) and the
//! accumulator threshold (`param2`).

use serde::{Deserialize, Serialize};

use crate::validation::{force_odd_at_least, ValidationReport};

/// Hough-transform and preprocessing parameters for circle detection.
///
/// Out-of-range values are clamped by [`DetectionParams::validate`],
/// which reports every adjusted field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct DetectionParams {
    /// Inverse ratio of accumulator resolution to image resolution.
    pub dp: f32,
    /// Minimum distance between accepted circle centers, pixels.
    pub min_dist: f32,
    /// Canny high threshold for the Hough edge stage (low is half).
    pub param1: f32,
    /// Accumulator vote threshold for candidate centers.
    pub param2: f32,
    /// Smallest radius searched, pixels.
    pub min_radius: u32,
    /// Largest radius searched, pixels.
    pub max_radius: u32,
    /// Gaussian kernel side applied during preprocessing, odd; 0 skips
    /// the blur.
    pub blur_kernel: u32,
    /// Median kernel side applied during preprocessing, odd; 0 skips
    /// the filter.
    pub median_kernel: u32,
    /// Equalize contrast before blurring.
    pub use_clahe: bool,
    /// CLAHE clip limit.
    pub clahe_clip_limit: f32,
    /// CLAHE tile layout.
    pub clahe_tiles: (u32, u32),
}

impl Default for DetectionParams {
    fn default() -> Self {
        Self {
            dp: 1.0,
            min_dist: 50.0,
            param1: 50.0,
            param2: 30.0,
            min_radius: 10,
            max_radius: 100,
            blur_kernel: 5,
            median_kernel: 5,
            use_clahe: true,
            clahe_clip_limit: 2.0,
            clahe_tiles: (8, 8),
        }
    }
}

impl DetectionParams {
    /// Clamp all fields into their legal ranges.
    ///
    /// Returns a report naming every adjusted field; an empty report
    /// means the parameters were already valid.
    pub fn validate(&mut self) -> ValidationReport {
        let mut report = ValidationReport::default();

        if self.dp < 1.0 {
            report.push("dp", self.dp as f64, 1.0, "must be at least 1");
            self.dp = 1.0;
        }
        if self.min_dist < 1.0 {
            report.push("minDist", self.min_dist as f64, 1.0, "must be at least 1");
            self.min_dist = 1.0;
        }
        let p1 = self.param1.clamp(1.0, 255.0);
        if p1 != self.param1 {
            report.push("param1", self.param1 as f64, p1 as f64, "must be in [1, 255]");
            self.param1 = p1;
        }
        if self.param2 < 1.0 {
            report.push("param2", self.param2 as f64, 1.0, "must be at least 1");
            self.param2 = 1.0;
        }
        if self.min_radius < 1 {
            report.push("minRadius", self.min_radius as f64, 1.0, "must be at least 1");
            self.min_radius = 1;
        }
        if self.max_radius < self.min_radius {
            let (old_min, old_max) = (self.min_radius, self.max_radius);
            self.min_radius = old_max.max(1);
            self.max_radius = old_min;
            report.push(
                "minRadius",
                old_min as f64,
                self.min_radius as f64,
                "radius range was inverted",
            );
            report.push(
                "maxRadius",
                old_max as f64,
                self.max_radius as f64,
                "radius range was inverted",
            );
        }

        for (field, value) in [
            ("blurKernel", &mut self.blur_kernel),
            ("medianKernel", &mut self.median_kernel),
        ] {
            // A zero kernel disables its stage and is left untouched.
            if *value == 0 {
                continue;
            }
            let fixed = force_odd_at_least(*value, 3);
            if fixed != *value {
                report.push(field, *value as f64, fixed as f64, "must be odd and >= 3");
                *value = fixed;
            }
        }

        if self.clahe_clip_limit < 0.1 {
            report.push(
                "claheClipLimit",
                self.clahe_clip_limit as f64,
                0.1,
                "must be at least 0.1",
            );
            self.clahe_clip_limit = 0.1;
        }
        if self.clahe_tiles.0 < 1 || self.clahe_tiles.1 < 1 {
            let fixed = (self.clahe_tiles.0.max(1), self.clahe_tiles.1.max(1));
            report.push(
                "claheTiles",
                self.clahe_tiles.0.min(self.clahe_tiles.1) as f64,
                1.0,
                "tile counts must be positive",
            );
            self.clahe_tiles = fixed;
        }

        report
    }
}

/// Selection thresholds applied after detection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct FilterParams {
    /// Minimum confidence a circle must reach, in `[0, 1]`.
    pub min_confidence: f32,
    /// Maximum number of circles returned.
    pub max_circles: usize,
    /// Overlap factor: a circle closer than this fraction of the
    /// smaller radius to an accepted circle is dropped.
    pub overlap_threshold: f32,
}

impl Default for FilterParams {
    fn default() -> Self {
        Self {
            min_confidence: 0.3,
            max_circles: 10,
            overlap_threshold: 0.7,
        }
    }
}
