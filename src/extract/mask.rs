//! Circle mask rasterization.
//!
//! Masks are single-channel coverage images: 255 inside the circle,
//! 0 outside. Anti-aliased masks rasterize at a supersampled
//! resolution and box-filter down, which grades the rim pixels by
//! covered area without per-pixel coverage math.

use image::{GrayImage, Luma};
use imageproc::drawing::draw_filled_circle_mut;
use serde::{Deserialize, Serialize};

/// Controls how [`circle_mask`] rasterizes coverage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct MaskParams {
    /// Supersample and box-filter the rim instead of hard 0/255 edges.
    pub anti_alias: bool,
    /// Supersampling factor for the anti-aliased path.
    pub supersample: u32,
}

impl Default for MaskParams {
    fn default() -> Self {
        Self {
            anti_alias: true,
            supersample: 4,
        }
    }
}

/// Rasterize a filled-circle coverage mask of `width`×`height`.
///
/// The circle may extend past the mask bounds; drawing clips. A
/// non-positive radius yields an all-zero mask.
pub fn circle_mask(
    width: u32,
    height: u32,
    center_x: i32,
    center_y: i32,
    radius: i32,
    params: &MaskParams,
) -> GrayImage {
    let mut mask = GrayImage::new(width, height);
    if width == 0 || height == 0 || radius < 1 {
        return mask;
    }

    let scale = params.supersample.max(1);
    if !params.anti_alias || scale == 1 {
        draw_filled_circle_mut(&mut mask, (center_x, center_y), radius, Luma([255u8]));
        return mask;
    }

    let mut large = GrayImage::new(width * scale, height * scale);
    let s = scale as i32;
    draw_filled_circle_mut(&mut large, (center_x * s, center_y * s), radius * s, Luma([255u8]));

    // Box downsample: each output pixel averages its scale x scale block.
    let area = scale * scale;
    for y in 0..height {
        for x in 0..width {
            let mut sum = 0u32;
            for sy in 0..scale {
                for sx in 0..scale {
                    sum += u32::from(large.get_pixel(x * scale + sx, y * scale + sy)[0]);
                }
            }
            mask.put_pixel(x, y, Luma([((sum + area / 2) / area) as u8]));
        }
    }
    mask
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hard_mask() -> MaskParams {
        MaskParams {
            anti_alias: false,
            supersample: 4,
        }
    }

    #[test]
    fn hard_mask_area_tracks_disk_area() {
        let r = 20i32;
        let mask = circle_mask(100, 100, 50, 50, r, &hard_mask());
        let count = mask.pixels().filter(|p| p[0] > 0).count() as f64;
        let expected = std::f64::consts::PI * f64::from(r) * f64::from(r);
        let relative = (count - expected).abs() / expected;
        assert!(relative < 0.05, "area {count} vs {expected} (off by {relative:.3})");
    }

    #[test]
    fn anti_aliased_mask_grades_the_rim() {
        let mask = circle_mask(100, 100, 50, 50, 20, &MaskParams::default());
        assert_eq!(mask.get_pixel(50, 50)[0], 255);
        assert_eq!(mask.get_pixel(2, 2)[0], 0);
        let partial = mask.pixels().filter(|p| p[0] > 0 && p[0] < 255).count();
        assert!(partial > 0, "expected graded rim pixels");

        let coverage: f64 = mask.pixels().map(|p| f64::from(p[0]) / 255.0).sum();
        let expected = std::f64::consts::PI * 400.0;
        assert!((coverage - expected).abs() / expected < 0.05);
    }

    #[test]
    fn degenerate_inputs_yield_empty_masks() {
        let zero_r = circle_mask(10, 10, 5, 5, 0, &MaskParams::default());
        assert!(zero_r.pixels().all(|p| p[0] == 0));
        let negative = circle_mask(10, 10, 5, 5, -3, &hard_mask());
        assert!(negative.pixels().all(|p| p[0] == 0));
        let empty = circle_mask(0, 10, 5, 5, 4, &hard_mask());
        assert_eq!(empty.dimensions(), (0, 10));
    }

    #[test]
    fn clipping_keeps_mask_dimensions() {
        let mask = circle_mask(30, 30, 0, 0, 20, &MaskParams::default());
        assert_eq!(mask.dimensions(), (30, 30));
        assert_eq!(mask.get_pixel(0, 0)[0], 255);
        assert_eq!(mask.get_pixel(29, 29)[0], 0);
    }
}
