use image::{DynamicImage, GrayImage, Luma, Rgb, RgbImage};

/// Generates a light RGB background with dark filled disks.
pub fn disks_rgb(width: u32, height: u32, disks: &[(i32, i32, i32)]) -> DynamicImage {
    assert!(width > 0 && height > 0, "image dimensions must be positive");

    let mut img = RgbImage::from_pixel(width, height, Rgb([235u8, 235, 235]));
    for y in 0..height as i32 {
        for x in 0..width as i32 {
            for &(cx, cy, r) in disks {
                let dx = x - cx;
                let dy = y - cy;
                if dx * dx + dy * dy <= r * r {
                    img.put_pixel(x as u32, y as u32, Rgb([45u8, 45, 45]));
                }
            }
        }
    }
    DynamicImage::ImageRgb8(img)
}

/// Generates a grayscale vertical step edge: `low` left of `split`,
/// `high` from `split` on.
pub fn step_u8(width: u32, height: u32, split: u32, low: u8, high: u8) -> GrayImage {
    assert!(width > 0 && height > 0, "image dimensions must be positive");
    assert!(split < width, "split column must lie inside the image");

    let mut img = GrayImage::new(width, height);
    for y in 0..height {
        for x in 0..width {
            let val = if x < split { low } else { high };
            img.put_pixel(x, y, Luma([val]));
        }
    }
    img
}
