//! Shared preprocessing primitives.
//!
//! Both detection pipelines collapse to grayscale and optionally apply
//! contrast-limited equalization and blurs before edge extraction.
//! Kernel sizes follow the common odd-side convention; the Gaussian
//! sigma is derived from the kernel size with the OpenCV rule
//! `0.3 * ((k - 1) * 0.5 - 1) + 0.8`, so kernel-size parameters behave
//! the way computer-vision users expect.

use image::{DynamicImage, GrayImage};
use imageproc::filter::{gaussian_blur_f32, median_filter};

/// Collapse any supported color layout to 8-bit grayscale.
pub fn to_grayscale(image: &DynamicImage) -> GrayImage {
    image.to_luma8()
}

/// Mean and standard deviation of a grayscale image.
///
/// Returns `(0.0, 0.0)` for an empty image; callers reject those
/// upstream.
pub fn mean_std(image: &GrayImage) -> (f32, f32) {
    let n = image.len();
    if n == 0 {
        return (0.0, 0.0);
    }
    let mut sum = 0.0f64;
    let mut sum_sq = 0.0f64;
    for p in image.as_raw() {
        let v = *p as f64;
        sum += v;
        sum_sq += v * v;
    }
    let n = n as f64;
    let mean = sum / n;
    let var = (sum_sq / n - mean * mean).max(0.0);
    (mean as f32, var.sqrt() as f32)
}

/// Gaussian blur with an odd kernel side, sigma derived from the size.
pub fn gaussian_blur_odd(image: &GrayImage, kernel: u32) -> GrayImage {
    let sigma = 0.3 * ((kernel as f32 - 1.0) * 0.5 - 1.0) + 0.8;
    gaussian_blur_f32(image, sigma.max(0.1))
}

/// Median blur with an odd kernel side.
pub fn median_blur(image: &GrayImage, kernel: u32) -> GrayImage {
    let radius = kernel / 2;
    median_filter(image, radius, radius)
}

/// Contrast-limited adaptive histogram equalization.
///
/// The image is split into `tiles` regions; each gets a clipped,
/// renormalized equalization LUT, and output pixels interpolate
/// bilinearly between the four surrounding tile LUTs to avoid visible
/// tile seams.
pub fn clahe(image: &GrayImage, clip_limit: f32, tiles: (u32, u32)) -> GrayImage {
    let (width, height) = image.dimensions();
    if width == 0 || height == 0 {
        return image.clone();
    }
    let tiles_x = tiles.0.max(1).min(width) as usize;
    let tiles_y = tiles.1.max(1).min(height) as usize;
    let tile_w = width.div_ceil(tiles_x as u32);
    let tile_h = height.div_ceil(tiles_y as u32);

    let mut luts = vec![[0u8; 256]; tiles_x * tiles_y];
    for ty in 0..tiles_y {
        for tx in 0..tiles_x {
            let x0 = tx as u32 * tile_w;
            let y0 = ty as u32 * tile_h;
            let x1 = (x0 + tile_w).min(width);
            let y1 = (y0 + tile_h).min(height);
            let area = ((x1 - x0) * (y1 - y0)) as u32;

            let mut hist = [0u32; 256];
            for y in y0..y1 {
                for x in x0..x1 {
                    hist[image.get_pixel(x, y).0[0] as usize] += 1;
                }
            }

            let clip = ((clip_limit * area as f32 / 256.0) as u32).max(1);
            let mut excess = 0u32;
            for bin in hist.iter_mut() {
                if *bin > clip {
                    excess += *bin - clip;
                    *bin = clip;
                }
            }
            let bonus = excess / 256;
            for bin in hist.iter_mut() {
                *bin += bonus;
            }
            // Spread the remainder evenly instead of piling it onto the
            // lowest bins, which would skew the equalization.
            let residual = (excess % 256) as usize;
            if residual > 0 {
                let step = (256 / residual).max(1);
                let mut given = 0;
                let mut i = 0;
                while given < residual && i < 256 {
                    hist[i] += 1;
                    given += 1;
                    i += step;
                }
            }

            let lut = &mut luts[ty * tiles_x + tx];
            let scale = 255.0 / area as f32;
            let mut cdf = 0u32;
            for (i, bin) in hist.iter().enumerate() {
                cdf += *bin;
                lut[i] = (cdf as f32 * scale).round().clamp(0.0, 255.0) as u8;
            }
        }
    }

    let mut out = GrayImage::new(width, height);
    for y in 0..height {
        // Position in tile-center space for the vertical axis.
        let fy = (y as f32 + 0.5) / tile_h as f32 - 0.5;
        let ty0 = (fy.floor() as i32).clamp(0, tiles_y as i32 - 1) as usize;
        let ty1 = (ty0 + 1).min(tiles_y - 1);
        let wy = (fy - fy.floor()).clamp(0.0, 1.0);
        let wy = if fy < 0.0 { 0.0 } else { wy };

        for x in 0..width {
            let fx = (x as f32 + 0.5) / tile_w as f32 - 0.5;
            let tx0 = (fx.floor() as i32).clamp(0, tiles_x as i32 - 1) as usize;
            let tx1 = (tx0 + 1).min(tiles_x - 1);
            let wx = (fx - fx.floor()).clamp(0.0, 1.0);
            let wx = if fx < 0.0 { 0.0 } else { wx };

            let v = image.get_pixel(x, y).0[0] as usize;
            let tl = luts[ty0 * tiles_x + tx0][v] as f32;
            let tr = luts[ty0 * tiles_x + tx1][v] as f32;
            let bl = luts[ty1 * tiles_x + tx0][v] as f32;
            let br = luts[ty1 * tiles_x + tx1][v] as f32;
            let top = tl + (tr - tl) * wx;
            let bottom = bl + (br - bl) * wx;
            let value = top + (bottom - top) * wy;
            out.put_pixel(x, y, image::Luma([value.round().clamp(0.0, 255.0) as u8]));
        }
    }
    out
}
