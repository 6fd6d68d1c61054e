//! Circle confidence scoring.
//!
//! Combines three measurements against a fixed-threshold edge map:
//!
//! - edge strength (weight 0.4): fraction of a 2-px ring covered by
//!   edge pixels, scaled by 3 and capped at 1;
//! - completeness (weight 0.4): 36 perimeter samples at 10-degree
//!   steps, each probing a 5×5 neighborhood for any edge response;
//! - center uniformity (weight 0.2): intensity variance of a central
//!   patch, normalized by 255 and inverted.
//!
//! A circle whose bounding box leaves the image scores 0 outright.

use image::GrayImage;

use crate::edges::canny::canny;
use crate::types::Circle;

const EDGE_WEIGHT: f32 = 0.4;
const COMPLETENESS_WEIGHT: f32 = 0.4;
const UNIFORMITY_WEIGHT: f32 = 0.2;

/// Fixed Canny thresholds for the scoring edge map.
const SCORE_CANNY_LOW: f32 = 50.0;
const SCORE_CANNY_HIGH: f32 = 150.0;

/// Scores circles against one image.
///
/// The edge map is computed once at construction, so scoring a full
/// candidate list costs one Canny pass regardless of list length.
pub struct ConfidenceScorer<'a> {
    gray: &'a GrayImage,
    edges: GrayImage,
}

impl<'a> ConfidenceScorer<'a> {
    /// Prepare the scorer for one grayscale image.
    pub fn new(gray: &'a GrayImage) -> Self {
        let edges = canny(gray, SCORE_CANNY_LOW, SCORE_CANNY_HIGH, 3, false);
        Self { gray, edges }
    }

    /// Confidence in `[0, 1]` for a circle at `(cx, cy)` with `radius`.
    pub fn score(&self, cx: i32, cy: i32, radius: i32) -> f32 {
        let (width, height) = self.gray.dimensions();
        if radius < 1 {
            return 0.0;
        }
        let inside = cx - radius >= 0
            && cy - radius >= 0
            && cx + radius < width as i32
            && cy + radius < height as i32;
        if !inside {
            return 0.0;
        }

        let edge = self.edge_strength(cx, cy, radius);
        let completeness = self.completeness(cx, cy, radius);
        let uniformity = self.center_uniformity(cx, cy, radius);
        (EDGE_WEIGHT * edge + COMPLETENESS_WEIGHT * completeness + UNIFORMITY_WEIGHT * uniformity)
            .clamp(0.0, 1.0)
    }

    /// Fraction of the 2-px ring covered by edge pixels, scaled by 3.
    fn edge_strength(&self, cx: i32, cy: i32, radius: i32) -> f32 {
        let (width, height) = self.gray.dimensions();
        let r = radius as f32;
        let x0 = (cx - radius - 2).max(0);
        let y0 = (cy - radius - 2).max(0);
        let x1 = (cx + radius + 2).min(width as i32 - 1);
        let y1 = (cy + radius + 2).min(height as i32 - 1);

        let mut ring_pixels = 0u32;
        let mut overlap = 0u32;
        for y in y0..=y1 {
            for x in x0..=x1 {
                let dx = (x - cx) as f32;
                let dy = (y - cy) as f32;
                let d = (dx * dx + dy * dy).sqrt();
                if (d - r).abs() <= 1.0 {
                    ring_pixels += 1;
                    if self.edges.get_pixel(x as u32, y as u32).0[0] > 0 {
                        overlap += 1;
                    }
                }
            }
        }
        if ring_pixels == 0 {
            return 0.0;
        }
        (3.0 * overlap as f32 / ring_pixels as f32).min(1.0)
    }

    /// Fraction of 36 perimeter samples with edge response nearby.
    fn completeness(&self, cx: i32, cy: i32, radius: i32) -> f32 {
        let (width, height) = self.gray.dimensions();
        let mut covered = 0u32;
        for i in 0..36u32 {
            let angle = (i as f32) * 10.0f32.to_radians();
            let px = cx + (radius as f32 * angle.cos()).round() as i32;
            let py = cy + (radius as f32 * angle.sin()).round() as i32;

            let mut hit = false;
            'probe: for dy in -2..=2i32 {
                for dx in -2..=2i32 {
                    let x = px + dx;
                    let y = py + dy;
                    if x < 0 || y < 0 || x >= width as i32 || y >= height as i32 {
                        continue;
                    }
                    if self.edges.get_pixel(x as u32, y as u32).0[0] > 0 {
                        hit = true;
                        break 'probe;
                    }
                }
            }
            if hit {
                covered += 1;
            }
        }
        covered as f32 / 36.0
    }

    /// Inverted, normalized intensity variance of the central patch.
    fn center_uniformity(&self, cx: i32, cy: i32, radius: i32) -> f32 {
        let (width, height) = self.gray.dimensions();
        let half = (radius / 4).max(3);
        let x0 = (cx - half).max(0);
        let y0 = (cy - half).max(0);
        let x1 = (cx + half).min(width as i32 - 1);
        let y1 = (cy + half).min(height as i32 - 1);

        let mut sum = 0.0f64;
        let mut sum_sq = 0.0f64;
        let mut n = 0u32;
        for y in y0..=y1 {
            for x in x0..=x1 {
                let v = self.gray.get_pixel(x as u32, y as u32).0[0] as f64;
                sum += v;
                sum_sq += v * v;
                n += 1;
            }
        }
        if n == 0 {
            return 0.0;
        }
        let mean = sum / n as f64;
        let var = (sum_sq / n as f64 - mean * mean).max(0.0) as f32;
        let normalized = var / 255.0;
        1.0 - normalized.min(1.0)
    }
}

/// One-shot confidence score for a single circle.
pub fn score_circle(gray: &GrayImage, circle: &Circle) -> f32 {
    ConfidenceScorer::new(gray).score(circle.x, circle.y, circle.radius)
}

#[cfg(test)]
mod tests {
    use super::*;
    use imageproc::drawing::draw_filled_circle_mut;
    use proptest::prelude::*;

    fn disk_image(w: u32, h: u32, cx: i32, cy: i32, r: i32) -> GrayImage {
        let mut img = GrayImage::from_pixel(w, h, image::Luma([30]));
        draw_filled_circle_mut(&mut img, (cx, cy), r, image::Luma([220]));
        img
    }

    #[test]
    fn clean_disk_scores_high() {
        let img = disk_image(120, 120, 60, 60, 25);
        let scorer = ConfidenceScorer::new(&img);
        let score = scorer.score(60, 60, 25);
        assert!(score > 0.6, "score too low for a clean disk: {score}");
    }

    #[test]
    fn wrong_radius_scores_lower() {
        let img = disk_image(120, 120, 60, 60, 25);
        let scorer = ConfidenceScorer::new(&img);
        let on = scorer.score(60, 60, 25);
        let off = scorer.score(60, 60, 40);
        assert!(on > off, "on={on} off={off}");
    }

    #[test]
    fn out_of_bounds_scores_zero() {
        let img = disk_image(120, 120, 60, 60, 25);
        let scorer = ConfidenceScorer::new(&img);
        assert_eq!(scorer.score(5, 60, 25), 0.0);
        assert_eq!(scorer.score(60, 118, 25), 0.0);
        assert_eq!(scorer.score(60, 60, 0), 0.0);
    }

    #[test]
    fn blank_image_gives_only_uniformity_credit() {
        let img = GrayImage::from_pixel(100, 100, image::Luma([128]));
        let scorer = ConfidenceScorer::new(&img);
        let score = scorer.score(50, 50, 20);
        assert!((score - UNIFORMITY_WEIGHT).abs() < 1e-3, "score={score}");
    }

    #[test]
    fn one_shot_matches_scorer() {
        let img = disk_image(120, 120, 60, 60, 25);
        let circle = Circle::new(60, 60, 25, 0.0);
        let direct = score_circle(&img, &circle);
        let scorer = ConfidenceScorer::new(&img);
        assert_eq!(direct, scorer.score(60, 60, 25));
    }

    proptest! {
        #[test]
        fn scores_stay_in_unit_range(
            seed in 0u64..1000,
            cx in -20i32..140,
            cy in -20i32..140,
            radius in 0i32..80,
        ) {
            let img = GrayImage::from_fn(96, 96, |x, y| {
                let v = (x.wrapping_mul(31).wrapping_add(y.wrapping_mul(17)) as u64 + seed)
                    % 256;
                image::Luma([v as u8])
            });
            let scorer = ConfidenceScorer::new(&img);
            let score = scorer.score(cx, cy, radius);
            prop_assert!((0.0..=1.0).contains(&score), "score={score}");
        }
    }
}
