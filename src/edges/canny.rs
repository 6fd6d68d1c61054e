//! Canny edge extraction on 8-bit grayscale images.
//!
//! - Separable Sobel derivatives at aperture 3, 5 or 7 with border
//!   clamping.
//! - L1 (`|gx| + |gy|`) or L2 (`sqrt(gx^2 + gy^2)`) magnitude.
//! - Direction-aligned non-maximum suppression comparing each pixel
//!   against its two neighbors along the quantized gradient direction.
//! - Double-threshold hysteresis with 8-connected tracking.
//!
//! Thresholds compare against the unnormalized kernel response, so
//! familiar OpenCV-style values like 50/150 keep their meaning.
//! Complexity: O(W·H) per stage.

use image::GrayImage;

const SOBEL_DERIV_3: [f32; 3] = [-1.0, 0.0, 1.0];
const SOBEL_SMOOTH_3: [f32; 3] = [1.0, 2.0, 1.0];

const SOBEL_DERIV_5: [f32; 5] = [-1.0, -2.0, 0.0, 2.0, 1.0];
const SOBEL_SMOOTH_5: [f32; 5] = [1.0, 4.0, 6.0, 4.0, 1.0];

const SOBEL_DERIV_7: [f32; 7] = [-1.0, -4.0, -5.0, 0.0, 5.0, 4.0, 1.0];
const SOBEL_SMOOTH_7: [f32; 7] = [1.0, 6.0, 15.0, 20.0, 15.0, 6.0, 1.0];

const TAN_22_5_DEG: f32 = 0.41421356237;

/// Per-pixel derivative buffers for one image.
#[derive(Clone, Debug)]
pub(crate) struct Gradients {
    pub w: usize,
    pub h: usize,
    /// Horizontal derivative.
    pub gx: Vec<f32>,
    /// Vertical derivative.
    pub gy: Vec<f32>,
}

impl Gradients {
    /// Gradient magnitude, Euclidean or absolute-sum.
    pub fn magnitude(&self, l2: bool) -> Vec<f32> {
        self.gx
            .iter()
            .zip(&self.gy)
            .map(|(gx, gy)| {
                if l2 {
                    (gx * gx + gy * gy).sqrt()
                } else {
                    gx.abs() + gy.abs()
                }
            })
            .collect()
    }
}

fn kernel_pair(aperture: u32) -> (&'static [f32], &'static [f32]) {
    match aperture {
        5 => (&SOBEL_DERIV_5, &SOBEL_SMOOTH_5),
        7 => (&SOBEL_DERIV_7, &SOBEL_SMOOTH_7),
        _ => (&SOBEL_DERIV_3, &SOBEL_SMOOTH_3),
    }
}

/// 1-D horizontal convolution with clamped borders.
fn convolve_rows(src: &[f32], w: usize, h: usize, kernel: &[f32]) -> Vec<f32> {
    let half = (kernel.len() / 2) as i64;
    let mut out = vec![0.0f32; w * h];
    for y in 0..h {
        let row = &src[y * w..(y + 1) * w];
        let out_row = &mut out[y * w..(y + 1) * w];
        for x in 0..w {
            let mut sum = 0.0;
            for (k, coeff) in kernel.iter().enumerate() {
                let xi = (x as i64 + k as i64 - half).clamp(0, w as i64 - 1) as usize;
                sum += row[xi] * coeff;
            }
            out_row[x] = sum;
        }
    }
    out
}

/// 1-D vertical convolution with clamped borders.
fn convolve_cols(src: &[f32], w: usize, h: usize, kernel: &[f32]) -> Vec<f32> {
    let half = (kernel.len() / 2) as i64;
    let mut out = vec![0.0f32; w * h];
    for y in 0..h {
        for (k, coeff) in kernel.iter().enumerate() {
            let yi = (y as i64 + k as i64 - half).clamp(0, h as i64 - 1) as usize;
            let src_row = &src[yi * w..(yi + 1) * w];
            let out_row = &mut out[y * w..(y + 1) * w];
            for x in 0..w {
                out_row[x] += src_row[x] * coeff;
            }
        }
    }
    out
}

/// Sobel derivatives of a grayscale image at the given aperture.
pub(crate) fn gradients(image: &GrayImage, aperture: u32) -> Gradients {
    let (w, h) = image.dimensions();
    let w = w as usize;
    let h = h as usize;
    let luma: Vec<f32> = image.as_raw().iter().map(|p| *p as f32).collect();
    let (deriv, smooth) = kernel_pair(aperture);

    let gx = convolve_cols(&convolve_rows(&luma, w, h, deriv), w, h, smooth);
    let gy = convolve_rows(&convolve_cols(&luma, w, h, deriv), w, h, smooth);
    Gradients { w, h, gx, gy }
}

/// Suppress non-maximal magnitudes along the gradient direction.
///
/// The outermost 1-pixel frame is skipped so neighbor lookups stay in
/// bounds; survivors keep their magnitude, everything else drops to 0.
/// The comparison is strict against the first neighbor and non-strict
/// against the second so exactly one pixel of a two-wide magnitude
/// plateau survives; screenshots are full of such symmetric steps.
fn non_maximum_suppression(grad: &Gradients, mag: &[f32]) -> Vec<f32> {
    let w = grad.w;
    let h = grad.h;
    let mut out = vec![0.0f32; w * h];
    if w < 3 || h < 3 {
        return out;
    }

    for y in 1..h - 1 {
        let prev = &mag[(y - 1) * w..y * w];
        let row = &mag[y * w..(y + 1) * w];
        let next = &mag[(y + 1) * w..(y + 2) * w];
        for x in 1..w - 1 {
            let m = row[x];
            if m <= 0.0 {
                continue;
            }
            let gx = grad.gx[y * w + x];
            let gy = grad.gy[y * w + x];
            let abs_gx = gx.abs();
            let abs_gy = gy.abs();
            let same_sign = (gx >= 0.0 && gy >= 0.0) || (gx <= 0.0 && gy <= 0.0);

            let (neighbor1, neighbor2) = if abs_gx >= abs_gy {
                if abs_gy <= abs_gx * TAN_22_5_DEG {
                    (row[x - 1], row[x + 1])
                } else if same_sign {
                    (prev[x + 1], next[x - 1])
                } else {
                    (prev[x - 1], next[x + 1])
                }
            } else if abs_gx <= abs_gy * TAN_22_5_DEG {
                (prev[x], next[x])
            } else if same_sign {
                (prev[x + 1], next[x - 1])
            } else {
                (prev[x - 1], next[x + 1])
            };

            if m > neighbor1 && m >= neighbor2 {
                out[y * w + x] = m;
            }
        }
    }
    out
}

/// Hysteresis: keep weak responses only when 8-connected to a strong one.
fn hysteresis(suppressed: &[f32], w: usize, h: usize, low: f32, high: f32) -> GrayImage {
    const WEAK: u8 = 1;
    const STRONG: u8 = 2;

    let mut marks = vec![0u8; w * h];
    let mut stack = Vec::new();
    for (idx, &m) in suppressed.iter().enumerate() {
        if m >= high {
            marks[idx] = STRONG;
            stack.push(idx);
        } else if m >= low {
            marks[idx] = WEAK;
        }
    }

    while let Some(idx) = stack.pop() {
        let x = idx % w;
        let y = idx / w;
        for dy in -1i64..=1 {
            for dx in -1i64..=1 {
                if dx == 0 && dy == 0 {
                    continue;
                }
                let nx = x as i64 + dx;
                let ny = y as i64 + dy;
                if nx < 0 || ny < 0 || nx >= w as i64 || ny >= h as i64 {
                    continue;
                }
                let nidx = ny as usize * w + nx as usize;
                if marks[nidx] == WEAK {
                    marks[nidx] = STRONG;
                    stack.push(nidx);
                }
            }
        }
    }

    let mut out = GrayImage::new(w as u32, h as u32);
    for (pixel, mark) in out.iter_mut().zip(&marks) {
        *pixel = if *mark == STRONG { 255 } else { 0 };
    }
    out
}

/// Full Canny pass: gradients, NMS, hysteresis.
///
/// Returns a binary map with 255 on edge pixels. Images narrower than
/// 3 pixels in either dimension produce an all-zero map.
pub fn canny(image: &GrayImage, low: f32, high: f32, aperture: u32, l2_gradient: bool) -> GrayImage {
    let (w, h) = image.dimensions();
    if w < 3 || h < 3 {
        return GrayImage::new(w, h);
    }
    let (low, high) = if low > high { (high, low) } else { (low, high) };

    let grad = gradients(image, aperture);
    let mag = grad.magnitude(l2_gradient);
    let suppressed = non_maximum_suppression(&grad, &mag);
    hysteresis(&suppressed, grad.w, grad.h, low, high)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vertical_step(w: u32, h: u32, split: u32) -> GrayImage {
        GrayImage::from_fn(w, h, |x, _| image::Luma([if x < split { 20 } else { 220 }]))
    }

    fn count_edges(map: &GrayImage) -> usize {
        map.as_raw().iter().filter(|p| **p > 0).count()
    }

    #[test]
    fn step_edge_is_found_near_the_boundary() {
        let img = vertical_step(64, 32, 32);
        let edges = canny(&img, 50.0, 150.0, 3, false);
        let found = count_edges(&edges);
        assert!(found > 0, "no edges on a hard step");
        for y in 0..32 {
            for x in 0..64 {
                if edges.get_pixel(x, y).0[0] > 0 {
                    assert!(
                        (31..=33).contains(&x),
                        "edge pixel far from the step at x={x}"
                    );
                }
            }
        }
    }

    #[test]
    fn flat_image_has_no_edges() {
        let img = GrayImage::from_pixel(48, 48, image::Luma([128]));
        let edges = canny(&img, 50.0, 150.0, 3, false);
        assert_eq!(count_edges(&edges), 0);
    }

    #[test]
    fn swapped_thresholds_behave_like_ordered_ones() {
        let img = vertical_step(64, 32, 32);
        let a = canny(&img, 50.0, 150.0, 3, false);
        let b = canny(&img, 150.0, 50.0, 3, false);
        assert_eq!(a.as_raw(), b.as_raw());
    }

    #[test]
    fn larger_aperture_still_finds_the_step() {
        let img = vertical_step(64, 32, 32);
        for aperture in [5u32, 7] {
            let edges = canny(&img, 100.0, 300.0, aperture, true);
            assert!(
                count_edges(&edges) > 0,
                "aperture {aperture} lost the step edge"
            );
        }
    }

    #[test]
    fn tiny_images_produce_empty_maps() {
        let img = GrayImage::from_pixel(2, 40, image::Luma([200]));
        let edges = canny(&img, 50.0, 150.0, 3, false);
        assert_eq!(count_edges(&edges), 0);
        assert_eq!(edges.dimensions(), (2, 40));
    }

    #[test]
    fn l1_magnitude_dominates_l2() {
        let img = vertical_step(32, 32, 16);
        let grad = gradients(&img, 3);
        let l1 = grad.magnitude(false);
        let l2 = grad.magnitude(true);
        for (a, b) in l1.iter().zip(&l2) {
            assert!(a + 1e-3 >= *b, "l1 {a} below l2 {b}");
        }
    }
}
