//! Binary post-processing for edge maps: small-structure removal,
//! gap closing and skeleton thinning.
//!
//! All functions treat nonzero pixels as set and return 0/255 maps.

use image::GrayImage;
use imageproc::distance_transform::Norm;
use imageproc::morphology::close;

/// Morphological opening with a 2×2 square.
///
/// Removes isolated pixels and 1-px-thin debris while leaving 2-px
/// structures intact. Out-of-bounds samples act as 255 for the erosion
/// and 0 for the dilation, so the image border does not smear.
pub fn open_2x2(image: &GrayImage) -> GrayImage {
    let (w, h) = image.dimensions();
    let wi = w as i64;
    let hi = h as i64;

    // Erosion: window spans (x-1..=x, y-1..=y), anchor bottom-right.
    let mut eroded = GrayImage::new(w, h);
    for y in 0..hi {
        for x in 0..wi {
            let mut v = 255u8;
            for dy in -1..=0i64 {
                for dx in -1..=0i64 {
                    let (nx, ny) = (x + dx, y + dy);
                    if nx >= 0 && ny >= 0 {
                        v = v.min(image.get_pixel(nx as u32, ny as u32).0[0]);
                    }
                }
            }
            eroded.put_pixel(x as u32, y as u32, image::Luma([v]));
        }
    }

    // Dilation with the reflected window (x..=x+1, y..=y+1).
    let mut out = GrayImage::new(w, h);
    for y in 0..hi {
        for x in 0..wi {
            let mut v = 0u8;
            for dy in 0..=1i64 {
                for dx in 0..=1i64 {
                    let (nx, ny) = (x + dx, y + dy);
                    if nx < wi && ny < hi {
                        v = v.max(eroded.get_pixel(nx as u32, ny as u32).0[0]);
                    }
                }
            }
            out.put_pixel(x as u32, y as u32, image::Luma([v]));
        }
    }
    out
}

/// Morphological closing with an odd square kernel.
pub fn close_odd(image: &GrayImage, kernel: u32) -> GrayImage {
    let radius = (kernel.max(1) - 1) / 2;
    if radius == 0 {
        return image.clone();
    }
    close(image, Norm::LInf, radius as u8)
}

/// Zhang–Suen skeletonization of a binary edge map.
///
/// Iterates the two sub-passes until no pixel is deleted; pixels
/// outside the image count as background.
pub fn thin(image: &GrayImage) -> GrayImage {
    let (w, h) = image.dimensions();
    let w = w as usize;
    let h = h as usize;
    let mut set: Vec<bool> = image.as_raw().iter().map(|p| *p > 0).collect();

    let at = |set: &[bool], x: i64, y: i64| -> u8 {
        if x < 0 || y < 0 || x >= w as i64 || y >= h as i64 {
            0
        } else {
            set[y as usize * w + x as usize] as u8
        }
    };

    let mut to_clear = Vec::new();
    loop {
        let mut deleted = false;
        for pass in 0..2 {
            to_clear.clear();
            for y in 0..h as i64 {
                for x in 0..w as i64 {
                    if at(&set, x, y) == 0 {
                        continue;
                    }
                    // Neighbors clockwise from north: p2..p9.
                    let p = [
                        at(&set, x, y - 1),
                        at(&set, x + 1, y - 1),
                        at(&set, x + 1, y),
                        at(&set, x + 1, y + 1),
                        at(&set, x, y + 1),
                        at(&set, x - 1, y + 1),
                        at(&set, x - 1, y),
                        at(&set, x - 1, y - 1),
                    ];
                    let b: u8 = p.iter().sum();
                    if !(2..=6).contains(&b) {
                        continue;
                    }
                    let transitions = (0..8)
                        .filter(|i| p[*i] == 0 && p[(i + 1) % 8] == 1)
                        .count();
                    if transitions != 1 {
                        continue;
                    }
                    let (c1, c2) = if pass == 0 {
                        (p[0] * p[2] * p[4], p[2] * p[4] * p[6])
                    } else {
                        (p[0] * p[2] * p[6], p[0] * p[4] * p[6])
                    };
                    if c1 == 0 && c2 == 0 {
                        to_clear.push(y as usize * w + x as usize);
                    }
                }
            }
            if !to_clear.is_empty() {
                deleted = true;
                for idx in &to_clear {
                    set[*idx] = false;
                }
            }
        }
        if !deleted {
            break;
        }
    }

    let mut out = GrayImage::new(w as u32, h as u32);
    for (pixel, on) in out.iter_mut().zip(&set) {
        *pixel = if *on { 255 } else { 0 };
    }
    out
}
