//! Edge-detection parameters with self-validation.

use serde::{Deserialize, Serialize};
use std::hash::{Hash, Hasher};

use crate::validation::{force_odd_at_least, ValidationReport};

/// CLAHE tile layout used by the edge pipeline.
pub(crate) const CLAHE_TILES: (u32, u32) = (8, 8);

/// Tunable parameters for the edge-detection pipeline.
///
/// Out-of-range values never panic; [`EdgeDetectionParams::validate`]
/// clamps them into their legal ranges and reports what changed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct EdgeDetectionParams {
    /// Hysteresis low threshold.
    pub threshold1: f32,
    /// Hysteresis high threshold; kept strictly above `threshold1`.
    pub threshold2: f32,
    /// Sobel aperture: 3, 5 or 7.
    pub aperture_size: u32,
    /// Euclidean gradient magnitude instead of absolute-sum.
    pub l2_gradient: bool,
    /// Apply Gaussian blur before edge extraction.
    pub gaussian_blur: bool,
    /// Gaussian kernel side, odd.
    pub blur_kernel: u32,
    /// Apply median filtering before edge extraction.
    pub median_filter: bool,
    /// Median kernel side, odd.
    pub median_kernel: u32,
    /// Apply contrast-limited equalization before blurring.
    pub clahe: bool,
    /// CLAHE clip limit.
    pub clahe_clip_limit: f32,
    /// Apply a closing pass to bridge small gaps.
    pub morphology: bool,
    /// Closing kernel side, odd.
    pub morph_kernel: u32,
    /// Thin edges to single-pixel skeletons.
    pub edge_thinning: bool,
    /// Remove 1-px debris with a 2×2 opening.
    pub remove_noise: bool,
}

impl Default for EdgeDetectionParams {
    fn default() -> Self {
        Self {
            threshold1: 50.0,
            threshold2: 150.0,
            aperture_size: 3,
            l2_gradient: false,
            gaussian_blur: true,
            blur_kernel: 5,
            median_filter: false,
            median_kernel: 5,
            clahe: false,
            clahe_clip_limit: 2.0,
            morphology: false,
            morph_kernel: 3,
            edge_thinning: false,
            remove_noise: true,
        }
    }
}

impl EdgeDetectionParams {
    /// Clamp all fields into their legal ranges.
    ///
    /// Returns a report naming every adjusted field; an empty report
    /// means the parameters were already valid.
    pub fn validate(&mut self) -> ValidationReport {
        let mut report = ValidationReport::default();

        let t1 = self.threshold1.clamp(1.0, 255.0);
        if t1 != self.threshold1 {
            report.push(
                "threshold1",
                self.threshold1 as f64,
                t1 as f64,
                "must be in [1, 255]",
            );
            self.threshold1 = t1;
        }
        let t2 = self.threshold2.clamp(1.0, 255.0);
        if t2 != self.threshold2 {
            report.push(
                "threshold2",
                self.threshold2 as f64,
                t2 as f64,
                "must be in [1, 255]",
            );
            self.threshold2 = t2;
        }
        if self.threshold2 <= self.threshold1 {
            let bumped = self.threshold1 + 50.0;
            report.push(
                "threshold2",
                self.threshold2 as f64,
                bumped as f64,
                "must exceed threshold1",
            );
            self.threshold2 = bumped;
        }

        let aperture = match self.aperture_size {
            0..=3 => 3,
            4 | 5 => 5,
            _ => 7,
        };
        if aperture != self.aperture_size {
            report.push(
                "apertureSize",
                self.aperture_size as f64,
                aperture as f64,
                "must be 3, 5 or 7",
            );
            self.aperture_size = aperture;
        }

        for (field, value) in [
            ("blurKernel", &mut self.blur_kernel),
            ("medianKernel", &mut self.median_kernel),
            ("morphKernel", &mut self.morph_kernel),
        ] {
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

        report
    }

    /// Stable digest of all fields, used in cache keys.
    pub(crate) fn fingerprint(&self) -> u64 {
        let mut hasher = std::collections::hash_map::DefaultHasher::new();
        self.threshold1.to_bits().hash(&mut hasher);
        self.threshold2.to_bits().hash(&mut hasher);
        self.aperture_size.hash(&mut hasher);
        self.l2_gradient.hash(&mut hasher);
        self.gaussian_blur.hash(&mut hasher);
        self.blur_kernel.hash(&mut hasher);
        self.median_filter.hash(&mut hasher);
        self.median_kernel.hash(&mut hasher);
        self.clahe.hash(&mut hasher);
        self.clahe_clip_limit.to_bits().hash(&mut hasher);
        self.morphology.hash(&mut hasher);
        self.morph_kernel.hash(&mut hasher);
        self.edge_thinning.hash(&mut hasher);
        self.remove_noise.hash(&mut hasher);
        hasher.finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_params_are_valid() {
        let mut p = EdgeDetectionParams::default();
        assert!(p.validate().is_clean());
    }

    #[test]
    fn thresholds_are_clamped_and_ordered() {
        let mut p = EdgeDetectionParams {
            threshold1: 300.0,
            threshold2: 0.0,
            ..Default::default()
        };
        let report = p.validate();
        assert_eq!(p.threshold1, 255.0);
        assert_eq!(p.threshold2, 305.0);
        assert_eq!(report.len(), 3);
    }

    #[test]
    fn equal_thresholds_get_separated() {
        let mut p = EdgeDetectionParams {
            threshold1: 80.0,
            threshold2: 80.0,
            ..Default::default()
        };
        p.validate();
        assert_eq!(p.threshold2, 130.0);
    }

    #[test]
    fn kernels_are_forced_odd() {
        let mut p = EdgeDetectionParams {
            blur_kernel: 4,
            median_kernel: 0,
            morph_kernel: 6,
            aperture_size: 4,
            ..Default::default()
        };
        let report = p.validate();
        assert_eq!(p.blur_kernel, 5);
        assert_eq!(p.median_kernel, 3);
        assert_eq!(p.morph_kernel, 7);
        assert_eq!(p.aperture_size, 5);
        assert_eq!(report.len(), 4);
    }

    #[test]
    fn fingerprint_tracks_field_changes() {
        let a = EdgeDetectionParams::default();
        let mut b = EdgeDetectionParams::default();
        assert_eq!(a.fingerprint(), b.fingerprint());
        b.threshold1 = 60.0;
        assert_ne!(a.fingerprint(), b.fingerprint());
    }

    #[test]
    fn params_serialize_in_camel_case() {
        let json = serde_json::to_string(&EdgeDetectionParams::default()).unwrap();
        assert!(json.contains("\"apertureSize\":3"));
        assert!(json.contains("\"l2Gradient\":false"));
    }
}
