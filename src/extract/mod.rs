//! Circle region extraction and capture.
//!
//! Overview
//! - Rasterizes per-circle coverage masks, plain or anti-aliased via
//!   supersample-and-box-filter.
//! - Crops padded circle bounding boxes out of a source image, clamped
//!   to the image extents, and applies the mask as alpha (transparent
//!   cut-out) or as a channel attenuation (in-place masking).
//! - Batch-captures a detection run: per-circle cut-outs, an optional
//!   combined strip, suggested file names and the serializable
//!   detection-data record.
//! - Renders annotated previews with confidence-colored outlines.
//!
//! Modules
//! - `mask` – coverage mask rasterization.
//! - `region` – single-circle crop and mask application.
//! - `capture` – batch capture, combined strip, preview rendering.

mod capture;
mod mask;
mod region;

pub use capture::{capture_circles, preview_image, CaptureOptions, CaptureOutcome, CircleCapture};
pub use mask::{circle_mask, MaskParams};
pub use region::{extract_circle_region, CircleRegion, ExtractOptions};
