//! Detector pipeline driving circle detection end-to-end.
//!
//! The [`CircleDetector`] exposes a simple API: feed an image and get back
//! scored circles sorted by confidence. Internally it coordinates grayscale
//! preprocessing (CLAHE, median, Gaussian), the Hough transform, and
//! per-candidate confidence scoring on the preprocessed image.
//!
//! Typical usage:
//! ```no_run
//! use circlesnap::detector::{CircleDetector, DetectionParams};
//!
//! # fn example(image: image::DynamicImage) -> circlesnap::Result<()> {
//! let detector = CircleDetector::new(DetectionParams::default());
//! let circles = detector.detect(&image)?;
//! if let Some(best) = circles.first() {
//!     println!("confidence: {:.3}", best.confidence);
//! }
//! # Ok(())
//! # }
//! ```
use super::hough::hough_circles;
use super::params::{DetectionParams, FilterParams};
use super::score::ConfidenceScorer;
use crate::error::{Error, Result};
use crate::preprocess::{clahe, gaussian_blur_odd, mean_std, median_blur, to_grayscale};
use crate::types::Circle;
use crate::validation::ValidationReport;
use image::{DynamicImage, GrayImage};
use log::debug;
use rayon::prelude::*;
use std::time::Instant;

/// Circle detector orchestrating preprocessing, Hough voting and confidence
/// scoring.
pub struct CircleDetector {
    params: DetectionParams,
}

impl CircleDetector {
    /// Create a detector with the supplied parameters.
    ///
    /// Out-of-range values are clamped; each adjustment is logged at `warn`.
    pub fn new(params: DetectionParams) -> Self {
        let mut params = params;
        let report = params.validate();
        report.warn_all("CircleDetector::new");
        Self { params }
    }

    /// Current detection parameters.
    pub fn params(&self) -> &DetectionParams {
        &self.params
    }

    /// Replace the detection parameters, clamping out-of-range values.
    pub fn set_params(&mut self, params: DetectionParams) -> ValidationReport {
        let mut params = params;
        let report = params.validate();
        self.params = params;
        report
    }

    /// Run the grayscale preprocessing chain configured in the parameters:
    /// CLAHE (optional), median blur, Gaussian blur. A blur whose kernel
    /// is 0 is skipped.
    pub fn preprocess(&self, gray: &GrayImage) -> GrayImage {
        let p = &self.params;
        let mut work = if p.use_clahe {
            clahe(gray, p.clahe_clip_limit, p.clahe_tiles)
        } else {
            gray.clone()
        };
        if p.median_kernel > 0 {
            work = median_blur(&work, p.median_kernel);
        }
        if p.blur_kernel > 0 {
            work = gaussian_blur_odd(&work, p.blur_kernel);
        }
        work
    }

    /// Detect circles in `image` and return them sorted by confidence,
    /// best first. An image with no circles yields an empty vector.
    pub fn detect(&self, image: &DynamicImage) -> Result<Vec<Circle>> {
        if image.width() == 0 || image.height() == 0 {
            return Err(Error::empty(image.width(), image.height()));
        }
        self.detect_gray(&to_grayscale(image))
    }

    /// Detect circles in an already-grayscale image.
    pub fn detect_gray(&self, gray: &GrayImage) -> Result<Vec<Circle>> {
        if gray.width() == 0 || gray.height() == 0 {
            return Err(Error::empty(gray.width(), gray.height()));
        }

        let t0 = Instant::now();
        let processed = self.preprocess(gray);
        let preprocess_ms = t0.elapsed().as_secs_f64() * 1000.0;

        let t1 = Instant::now();
        let candidates = hough_circles(&processed, &self.params);
        let hough_ms = t1.elapsed().as_secs_f64() * 1000.0;

        // Confidence is always measured on the preprocessed image so the
        // score sees the same pixels the Hough stage voted on.
        let t2 = Instant::now();
        let scorer = ConfidenceScorer::new(&processed);
        let mut circles: Vec<Circle> = candidates
            .par_iter()
            .map(|c| Circle::new(c.x, c.y, c.radius, scorer.score(c.x, c.y, c.radius)))
            .collect();
        circles.sort_by(|a, b| b.confidence.total_cmp(&a.confidence));
        let score_ms = t2.elapsed().as_secs_f64() * 1000.0;

        debug!(
            "CircleDetector::detect candidates={} preprocess={preprocess_ms:.2}ms hough={hough_ms:.2}ms score={score_ms:.2}ms",
            circles.len()
        );
        Ok(circles)
    }

    /// Drop low-confidence and overlapping circles. Convenience wrapper
    /// around [`filter_circles`](super::filter_circles).
    pub fn filter(&self, circles: &[Circle], filter: &FilterParams) -> Vec<Circle> {
        super::filter::filter_circles(circles, filter)
    }

    /// Suggest parameters tuned to the image statistics.
    ///
    /// The mean and standard deviation of the preprocessed grayscale drive
    /// the adjustment: dark images lower the Canny threshold, bright images
    /// raise it, and the accumulator threshold follows the contrast. The
    /// current parameters are the starting point; the detector itself is
    /// left untouched.
    pub fn auto_adjust_params(&self, image: &DynamicImage) -> Result<DetectionParams> {
        if image.width() == 0 || image.height() == 0 {
            return Err(Error::empty(image.width(), image.height()));
        }
        let processed = self.preprocess(&to_grayscale(image));
        let (mean, std) = mean_std(&processed);

        let mut adjusted = self.params.clone();
        if mean < 100.0 {
            adjusted.param1 = (self.params.param1 - 20.0).max(30.0);
        } else if mean > 180.0 {
            adjusted.param1 = (self.params.param1 + 20.0).min(100.0);
        }
        if std < 30.0 {
            adjusted.param2 = (self.params.param2 - 10.0).max(20.0);
        } else if std > 80.0 {
            adjusted.param2 = (self.params.param2 + 10.0).min(50.0);
        }
        debug!(
            "CircleDetector::auto_adjust_params mean={mean:.1} std={std:.1} param1={} param2={}",
            adjusted.param1, adjusted.param2
        );
        Ok(adjusted)
    }
}

impl Default for CircleDetector {
    fn default() -> Self {
        Self::new(DetectionParams::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Luma;

    fn disk_image(width: u32, height: u32, disks: &[(i32, i32, i32)]) -> DynamicImage {
        let mut img = GrayImage::from_pixel(width, height, Luma([230u8]));
        for (x, y) in (0..width as i32).flat_map(|x| (0..height as i32).map(move |y| (x, y))) {
            for &(cx, cy, r) in disks {
                let dx = x - cx;
                let dy = y - cy;
                if dx * dx + dy * dy <= r * r {
                    img.put_pixel(x as u32, y as u32, Luma([40u8]));
                }
            }
        }
        DynamicImage::ImageLuma8(img)
    }

    #[test]
    fn detects_disks_sorted_by_confidence() {
        let image = disk_image(260, 120, &[(60, 60, 22), (190, 60, 22)]);
        let params = DetectionParams {
            param1: 50.0,
            param2: 25.0,
            min_radius: 10,
            max_radius: 40,
            min_dist: 40.0,
            ..DetectionParams::default()
        };
        let detector = CircleDetector::new(params);
        let circles = detector.detect(&image).unwrap();
        assert!(circles.len() >= 2, "expected two circles, got {}", circles.len());
        for pair in circles.windows(2) {
            assert!(pair[0].confidence >= pair[1].confidence);
        }
        for c in &circles {
            assert!((0.0..=1.0).contains(&c.confidence));
        }
        let near = |cx: i32, cy: i32| {
            circles
                .iter()
                .any(|c| (c.x - cx).abs() <= 5 && (c.y - cy).abs() <= 5)
        };
        assert!(near(60, 60), "left disk not found: {circles:?}");
        assert!(near(190, 60), "right disk not found: {circles:?}");
    }

    #[test]
    fn empty_image_is_rejected() {
        let detector = CircleDetector::default();
        let image = DynamicImage::new_luma8(0, 10);
        match detector.detect(&image) {
            Err(Error::EmptyImage { width: 0, height: 10 }) => {}
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[test]
    fn flat_image_yields_no_circles() {
        let detector = CircleDetector::default();
        let image = DynamicImage::ImageLuma8(GrayImage::from_pixel(90, 90, Luma([128u8])));
        let circles = detector.detect(&image).unwrap();
        assert!(circles.is_empty());
    }

    #[test]
    fn auto_adjust_lowers_threshold_for_dark_images() {
        let params = DetectionParams {
            use_clahe: false,
            ..DetectionParams::default()
        };
        let detector = CircleDetector::new(params);
        let image = DynamicImage::ImageLuma8(GrayImage::from_pixel(64, 64, Luma([40u8])));
        let adjusted = detector.auto_adjust_params(&image).unwrap();
        assert_eq!(adjusted.param1, 30.0);
        assert_eq!(adjusted.param2, 20.0);
    }

    #[test]
    fn auto_adjust_raises_threshold_for_high_contrast() {
        let params = DetectionParams {
            use_clahe: false,
            ..DetectionParams::default()
        };
        let detector = CircleDetector::new(params);
        let mut img = GrayImage::from_pixel(64, 64, Luma([0u8]));
        for y in 0..64 {
            for x in 0..64 {
                if (x / 16 + y / 16) % 2 == 0 {
                    img.put_pixel(x, y, Luma([255u8]));
                }
            }
        }
        let adjusted = detector
            .auto_adjust_params(&DynamicImage::ImageLuma8(img))
            .unwrap();
        assert_eq!(adjusted.param1, 50.0);
        assert_eq!(adjusted.param2, 40.0);
    }

    #[test]
    fn zero_blur_kernels_skip_their_stages() {
        let detector = CircleDetector::new(DetectionParams {
            use_clahe: false,
            blur_kernel: 0,
            median_kernel: 0,
            ..DetectionParams::default()
        });
        assert_eq!(detector.params().blur_kernel, 0);
        assert_eq!(detector.params().median_kernel, 0);

        // A sharp step that any of the blurs would smear.
        let mut gray = GrayImage::from_pixel(32, 32, Luma([0u8]));
        for y in 0..32 {
            for x in 16..32 {
                gray.put_pixel(x, y, Luma([255u8]));
            }
        }
        let processed = detector.preprocess(&gray);
        assert_eq!(processed.as_raw(), gray.as_raw());
    }

    #[test]
    fn set_params_reports_clamped_fields() {
        let mut detector = CircleDetector::default();
        let report = detector.set_params(DetectionParams {
            dp: 0.0,
            ..DetectionParams::default()
        });
        assert!(!report.is_clean());
        assert_eq!(detector.params().dp, 1.0);
    }
}
