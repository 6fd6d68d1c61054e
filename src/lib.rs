#![doc = include_str!("../README.md")]

// Public modules (stable-ish surface)
pub mod detector;
pub mod error;
pub mod extract;
pub mod report;
pub mod types;

// “Expert” modules – still public, but considered unstable internals.
// (You can tighten or feature-gate these later.)
pub mod edges;
pub mod preprocess;
pub mod pyramid;
pub mod validation;

// --- High-level re-exports -------------------------------------------------

// Main entry points: detection + filtering.
pub use crate::detector::{filter_circles, CircleDetector, DetectionParams, FilterParams};
pub use crate::error::{Error, Result};
pub use crate::types::Circle;

// Capture and edge analysis.
pub use crate::edges::{EdgeDetectionParams, EdgeDetectionResult, EdgeEngine};
pub use crate::extract::{capture_circles, extract_circle_region, CaptureOptions, CaptureOutcome};
pub use crate::pyramid::ImagePyramid;
pub use crate::report::DetectionRecord;
pub use crate::validation::ValidationReport;

// --- Prelude ---------------------------------------------------------------

/// Small prelude for quick experiments.
///
/// ```no_run
/// use circlesnap::prelude::*;
///
/// # fn main() -> circlesnap::Result<()> {
/// let image = image::DynamicImage::new_rgb8(640, 480);
///
/// let detector = CircleDetector::new(DetectionParams::default());
/// let circles = detector.detect(&image)?;
/// let kept = filter_circles(&circles, &FilterParams::default());
/// println!("detected={} kept={}", circles.len(), kept.len());
/// # Ok(())
/// # }
/// ```
pub mod prelude {
    pub use crate::detector::{filter_circles, CircleDetector, DetectionParams, FilterParams};
    pub use crate::edges::{EdgeDetectionParams, EdgeEngine};
    pub use crate::extract::{capture_circles, CaptureOptions};
    pub use crate::types::Circle;
}
