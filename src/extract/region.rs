//! Circle region extraction.
//!
//! Crops the padded bounding box of a circle out of a source image and
//! applies a coverage mask, either as an alpha channel (transparent
//! cut-out) or by attenuating the color channels in place.

use super::mask::{circle_mask, MaskParams};
use crate::types::{Circle, RegionBounds};
use image::DynamicImage;
use serde::{Deserialize, Serialize};

/// Options for [`extract_circle_region`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ExtractOptions {
    /// Extra pixels kept around the circle bounding box.
    pub padding: i32,
    /// Emit RGBA with alpha = mask; otherwise attenuate RGB channels.
    pub transparent: bool,
    /// Mask rasterization settings.
    pub mask: MaskParams,
}

impl Default for ExtractOptions {
    fn default() -> Self {
        Self {
            padding: 10,
            transparent: true,
            mask: MaskParams::default(),
        }
    }
}

/// A cropped, masked circle region.
#[derive(Debug, Clone)]
pub struct CircleRegion {
    /// Source-image rectangle the region was cropped from, after
    /// clamping to the image extents.
    pub bounds: RegionBounds,
    /// Extracted pixels: RGBA when transparent, RGB when masked.
    pub image: DynamicImage,
}

impl CircleRegion {
    /// Region width in pixels.
    pub fn width(&self) -> u32 {
        self.image.width()
    }

    /// Region height in pixels.
    pub fn height(&self) -> u32 {
        self.image.height()
    }
}

/// Extract the padded circle region from `image`.
///
/// The bounding box `[x-r-p, y-r-p] .. [x+r+p+1, y+r+p+1]` is clamped
/// to the image; `None` when nothing remains after clamping. The mask
/// is rebuilt in region coordinates so clipped circles keep their
/// shape.
pub fn extract_circle_region(
    image: &DynamicImage,
    circle: &Circle,
    options: &ExtractOptions,
) -> Option<CircleRegion> {
    if image.width() == 0 || image.height() == 0 {
        return None;
    }

    let (x, y, r) = (circle.x, circle.y, circle.radius);
    let p = options.padding;
    let x0 = (x - r - p).max(0);
    let y0 = (y - r - p).max(0);
    let x1 = (x + r + p + 1).min(image.width() as i32);
    let y1 = (y + r + p + 1).min(image.height() as i32);
    if x0 >= x1 || y0 >= y1 {
        return None;
    }

    let bounds = RegionBounds {
        x0: x0 as u32,
        y0: y0 as u32,
        x1: x1 as u32,
        y1: y1 as u32,
    };
    let cropped = image.crop_imm(bounds.x0, bounds.y0, bounds.width(), bounds.height());
    let mask = circle_mask(
        bounds.width(),
        bounds.height(),
        x - x0,
        y - y0,
        r,
        &options.mask,
    );

    let masked = if options.transparent {
        let mut rgba = cropped.to_rgba8();
        for (pixel, coverage) in rgba.pixels_mut().zip(mask.pixels()) {
            pixel[3] = coverage[0];
        }
        DynamicImage::ImageRgba8(rgba)
    } else {
        let mut rgb = cropped.to_rgb8();
        for (pixel, coverage) in rgb.pixels_mut().zip(mask.pixels()) {
            let m = u32::from(coverage[0]);
            for channel in pixel.0.iter_mut() {
                *channel = ((u32::from(*channel) * m + 127) / 255) as u8;
            }
        }
        DynamicImage::ImageRgb8(rgb)
    };

    Some(CircleRegion {
        bounds,
        image: masked,
    })
}
