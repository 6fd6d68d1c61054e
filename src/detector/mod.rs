//! Circle detector built around a gradient-guided Hough transform.
//!
//! Overview
//! - Preprocesses the grayscale input: optional CLAHE, then a median and a
//!   Gaussian blur to suppress texture noise before edge extraction.
//! - Extracts a Canny edge map and votes along the Sobel gradient direction
//!   (both senses) into a center accumulator, one pass per candidate radius.
//! - Promotes accumulator peaks to candidates, thins them by `min_dist`, and
//!   recovers each radius from an edge-distance histogram.
//! - Scores every candidate on the preprocessed image: ring edge strength,
//!   angular completeness and interior uniformity blend into a confidence in
//!   `[0, 1]`.
//! - Sorts circles by confidence and optionally filters overlapping and
//!   low-confidence detections.
//!
//! Modules
//! - [`params`] – configuration types for detection and result filtering.
//! - `pipeline` – the main [`CircleDetector`] implementation.
//! - `hough` – accumulator voting, peak extraction and radius estimation.
//! - `score` – the [`ConfidenceScorer`] shared by detection and rescoring.
//! - `filter` – confidence ranking and overlap suppression.
//!
//! Key Ideas
//! - Voting follows the gradient in both senses, so dark-on-light and
//!   light-on-dark circles accumulate evidence at the true center.
//! - `param2` is a literal vote count: votes land in rounded accumulator
//!   bins and a candidate needs `param2` hits to survive.
//! - Confidence is measured on the same preprocessed pixels the Hough stage
//!   saw, keeping scores comparable across parameter changes.

pub mod params;

mod filter;
mod hough;
mod pipeline;
mod score;

pub use filter::filter_circles;
pub use hough::{hough_circles, HoughCandidate};
pub use params::{DetectionParams, FilterParams};
pub use pipeline::CircleDetector;
pub use score::{score_circle, ConfidenceScorer};
