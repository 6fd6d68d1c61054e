//! Gradient Hough transform for circle centers and radii.
//!
//! - Canny edges at `param1` (low threshold is half).
//! - Each edge pixel votes along its gradient direction, both senses,
//!   for every radius in the configured range; votes land in an
//!   accumulator at `1/dp` resolution.
//! - Candidate centers are accumulator local maxima reaching `param2`,
//!   thinned greedily so accepted centers stay `min_dist` apart.
//! - Each center's radius comes from the peak of the edge-distance
//!   histogram; the peak must also reach `param2` support.

use image::GrayImage;

use crate::edges::canny::{canny, gradients};

use super::params::DetectionParams;

const EPS: f32 = 1e-6;

/// Raw Hough candidate before confidence scoring.
#[derive(Debug, Clone, Copy)]
pub struct HoughCandidate {
    /// Center x in full-resolution pixels.
    pub x: i32,
    /// Center y in full-resolution pixels.
    pub y: i32,
    /// Estimated radius in pixels.
    pub radius: i32,
    /// Accumulator votes at the center.
    pub votes: f32,
}

/// Detect circle candidates on a preprocessed grayscale image.
///
/// Returns candidates sorted by vote count, strongest first. The image
/// must be at least 3 pixels in both dimensions; smaller inputs yield
/// an empty list.
pub fn hough_circles(image: &GrayImage, params: &DetectionParams) -> Vec<HoughCandidate> {
    let (width, height) = image.dimensions();
    if width < 3 || height < 3 {
        return Vec::new();
    }

    let high = params.param1.max(1.0);
    let edge_map = canny(image, high / 2.0, high, 3, false);
    let grad = gradients(image, 3);

    let edge_points: Vec<(u32, u32)> = edge_map
        .enumerate_pixels()
        .filter(|(_, _, p)| p.0[0] > 0)
        .map(|(x, y, _)| (x, y))
        .collect();
    if edge_points.is_empty() {
        return Vec::new();
    }

    let dp = params.dp.max(1.0);
    let acc_w = (width as f32 / dp).ceil() as usize;
    let acc_h = (height as f32 / dp).ceil() as usize;
    let mut acc = vec![0.0f32; acc_w * acc_h];

    let min_r = params.min_radius.min(params.max_radius) as i32;
    let max_r = params.max_radius.max(params.min_radius) as i32;

    for &(x, y) in &edge_points {
        let idx = y as usize * grad.w + x as usize;
        let gx = grad.gx[idx];
        let gy = grad.gy[idx];
        let mag = (gx * gx + gy * gy).sqrt();
        if mag < EPS {
            continue;
        }
        let ux = gx / mag;
        let uy = gy / mag;
        for sign in [1.0f32, -1.0] {
            for r in min_r..=max_r {
                let cx = x as f32 + sign * ux * r as f32;
                let cy = y as f32 + sign * uy * r as f32;
                let ax = (cx / dp).round();
                let ay = (cy / dp).round();
                if ax < 0.0 || ay < 0.0 || ax >= acc_w as f32 || ay >= acc_h as f32 {
                    continue;
                }
                acc[ay as usize * acc_w + ax as usize] += 1.0;
            }
        }
    }

    let centers = accumulator_peaks(&acc, acc_w, acc_h, params.param2, params.min_dist / dp);
    log::debug!(
        "hough_circles w={width} h={height} edges={} centers={}",
        edge_points.len(),
        centers.len()
    );

    let mut candidates = Vec::with_capacity(centers.len());
    for (ax, ay, votes) in centers {
        let cx = (ax as f32 * dp).round() as i32;
        let cy = (ay as f32 * dp).round() as i32;
        if let Some(radius) = estimate_radius(&edge_points, cx, cy, min_r, max_r, params.param2) {
            candidates.push(HoughCandidate {
                x: cx,
                y: cy,
                radius,
                votes,
            });
        }
    }
    candidates
}

/// Local maxima of the accumulator above `threshold`, greedily thinned
/// to a minimum separation, sorted by votes descending.
fn accumulator_peaks(
    acc: &[f32],
    acc_w: usize,
    acc_h: usize,
    threshold: f32,
    min_dist: f32,
) -> Vec<(usize, usize, f32)> {
    let mut peaks = Vec::new();
    if acc_w < 3 || acc_h < 3 {
        return peaks;
    }
    for y in 1..acc_h - 1 {
        for x in 1..acc_w - 1 {
            let v = acc[y * acc_w + x];
            if v < threshold {
                continue;
            }
            if v >= acc[y * acc_w + x - 1]
                && v >= acc[y * acc_w + x + 1]
                && v >= acc[(y - 1) * acc_w + x]
                && v >= acc[(y + 1) * acc_w + x]
            {
                peaks.push((x, y, v));
            }
        }
    }
    peaks.sort_by(|a, b| b.2.total_cmp(&a.2));

    let min_dist_sq = min_dist * min_dist;
    let mut accepted: Vec<(usize, usize, f32)> = Vec::new();
    for peak in peaks {
        let close = accepted.iter().any(|a| {
            let dx = peak.0 as f32 - a.0 as f32;
            let dy = peak.1 as f32 - a.1 as f32;
            dx * dx + dy * dy < min_dist_sq
        });
        if !close {
            accepted.push(peak);
        }
    }
    accepted
}

/// Radius with the strongest edge support around a center.
///
/// Bins edge distances into integer radii; the winning bin must reach
/// `support` votes. Ties favor the smaller radius.
fn estimate_radius(
    edge_points: &[(u32, u32)],
    cx: i32,
    cy: i32,
    min_r: i32,
    max_r: i32,
    support: f32,
) -> Option<i32> {
    let bins = (max_r - min_r + 1) as usize;
    let mut hist = vec![0u32; bins];
    for &(x, y) in edge_points {
        let dx = x as f32 - cx as f32;
        let dy = y as f32 - cy as f32;
        let d = (dx * dx + dy * dy).sqrt().round() as i32;
        if d >= min_r && d <= max_r {
            hist[(d - min_r) as usize] += 1;
        }
    }
    let (best_bin, best_count) = hist
        .iter()
        .enumerate()
        .max_by(|a, b| a.1.cmp(b.1).then(b.0.cmp(&a.0)))?;
    if (*best_count as f32) < support.max(1.0) {
        return None;
    }
    Some(min_r + best_bin as i32)
}

#[cfg(test)]
mod tests {
    use super::*;
    use imageproc::drawing::draw_filled_circle_mut;

    fn disk_image(w: u32, h: u32, centers: &[(i32, i32, i32)]) -> GrayImage {
        let mut img = GrayImage::from_pixel(w, h, image::Luma([30]));
        for &(x, y, r) in centers {
            draw_filled_circle_mut(&mut img, (x, y), r, image::Luma([220]));
        }
        img
    }

    #[test]
    fn single_disk_is_located() {
        let img = disk_image(120, 120, &[(60, 60, 25)]);
        let params = DetectionParams::default();
        let candidates = hough_circles(&img, &params);
        assert!(!candidates.is_empty(), "no candidates on a clean disk");
        let best = &candidates[0];
        assert!(
            (best.x - 60).abs() <= 3 && (best.y - 60).abs() <= 3,
            "center off: ({}, {})",
            best.x,
            best.y
        );
        assert!((best.radius - 25).abs() <= 3, "radius off: {}", best.radius);
    }

    #[test]
    fn nearby_centers_collapse_under_min_dist() {
        let img = disk_image(200, 120, &[(60, 60, 20), (90, 60, 20)]);
        let params = DetectionParams {
            min_dist: 50.0,
            ..Default::default()
        };
        let candidates = hough_circles(&img, &params);
        for a in &candidates {
            for b in &candidates {
                if std::ptr::eq(a, b) {
                    continue;
                }
                let dx = (a.x - b.x) as f32;
                let dy = (a.y - b.y) as f32;
                assert!(
                    (dx * dx + dy * dy).sqrt() >= 50.0 - 3.0,
                    "centers too close after min_dist thinning"
                );
            }
        }
    }

    #[test]
    fn separated_disks_are_both_found() {
        let img = disk_image(260, 120, &[(60, 60, 22), (190, 60, 22)]);
        let params = DetectionParams::default();
        let candidates = hough_circles(&img, &params);
        assert!(candidates.len() >= 2, "found {}", candidates.len());
        let found_left = candidates
            .iter()
            .any(|c| (c.x - 60).abs() <= 4 && (c.y - 60).abs() <= 4);
        let found_right = candidates
            .iter()
            .any(|c| (c.x - 190).abs() <= 4 && (c.y - 60).abs() <= 4);
        assert!(found_left && found_right);
    }

    #[test]
    fn tiny_or_flat_images_yield_nothing() {
        let params = DetectionParams::default();
        assert!(hough_circles(&GrayImage::new(2, 2), &params).is_empty());
        let flat = GrayImage::from_pixel(64, 64, image::Luma([100]));
        assert!(hough_circles(&flat, &params).is_empty());
    }
}
