//! Batch circle capture.
//!
//! Extracts every circle of a detection run, assembles the optional
//! combined strip and the detection-data record, and renders the
//! annotated preview. Per-circle extraction failures are logged and
//! skipped so one bad circle cannot abort the batch; writing the
//! resulting images to disk is the caller's job.

use super::mask::MaskParams;
use super::region::{extract_circle_region, CircleRegion, ExtractOptions};
use crate::detector::DetectionParams;
use crate::error::{Error, Result};
use crate::report::{CircleEntry, DetectionRecord, OutputManifest};
use crate::types::Circle;
use chrono::Local;
use image::{imageops, DynamicImage, Rgb, RgbImage, RgbaImage};
use imageproc::drawing::{draw_cross_mut, draw_filled_circle_mut, draw_hollow_circle_mut};
use log::{debug, warn};
use serde::{Deserialize, Serialize};

const STRIP_GAP: u32 = 10;

/// Options for [`capture_circles`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CaptureOptions {
    /// Padding around each circle bounding box.
    pub padding: i32,
    /// Cut circles out with an alpha channel.
    pub transparent: bool,
    /// Also build the horizontal combined strip.
    pub combined: bool,
    /// Mask rasterization settings.
    pub mask: MaskParams,
}

impl Default for CaptureOptions {
    fn default() -> Self {
        Self {
            padding: 10,
            transparent: true,
            combined: true,
            mask: MaskParams::default(),
        }
    }
}

/// One successfully captured circle.
#[derive(Debug, Clone)]
pub struct CircleCapture {
    /// 1-based position in the input list.
    pub index: usize,
    /// The circle that was captured.
    pub circle: Circle,
    /// Cropped and masked pixels.
    pub region: CircleRegion,
    /// File name a persistence collaborator should save this under.
    pub suggested_name: String,
}

/// Everything a capture run produces.
#[derive(Debug, Clone)]
pub struct CaptureOutcome {
    /// Per-circle captures, in input order, failures skipped.
    pub captures: Vec<CircleCapture>,
    /// Horizontal strip of all captures, when requested and non-empty.
    pub combined: Option<RgbaImage>,
    /// Detection-data record, emitted regardless of capture failures.
    pub record: DetectionRecord,
}

/// Capture all `circles` out of `image`.
///
/// Circles whose region is empty after clamping are logged at `warn`
/// and skipped. The returned record always describes the full input
/// list; its manifest names only the successful captures.
pub fn capture_circles(
    image: &DynamicImage,
    circles: &[Circle],
    params: &DetectionParams,
    options: &CaptureOptions,
) -> Result<CaptureOutcome> {
    if image.width() == 0 || image.height() == 0 {
        return Err(Error::empty(image.width(), image.height()));
    }

    let now = Local::now();
    let stamp = now.format("%Y%m%d_%H%M%S").to_string();
    let extract = ExtractOptions {
        padding: options.padding,
        transparent: options.transparent,
        mask: options.mask,
    };

    let mut captures = Vec::with_capacity(circles.len());
    for (i, circle) in circles.iter().enumerate() {
        let index = i + 1;
        match extract_circle_region(image, circle, &extract) {
            Some(region) => captures.push(CircleCapture {
                index,
                circle: *circle,
                region,
                suggested_name: format!("circle_{index:02}_{stamp}.png"),
            }),
            None => warn!(
                "capture skipped: circle {index} at ({}, {}) r={} has no visible region",
                circle.x, circle.y, circle.radius
            ),
        }
    }

    let combined = if options.combined {
        combined_strip(&captures)
    } else {
        None
    };
    let combined_file = combined
        .as_ref()
        .map(|_| format!("circles_combined_{stamp}.png"));

    let record = DetectionRecord {
        timestamp: stamp,
        datetime: now.to_rfc3339(),
        total_detected: circles.len(),
        successful_captures: captures.len(),
        source_width: image.width(),
        source_height: image.height(),
        params: params.clone(),
        circles: circles
            .iter()
            .enumerate()
            .map(|(i, c)| CircleEntry::from_circle(i + 1, c))
            .collect(),
        output: OutputManifest {
            individual_files: captures.iter().map(|c| c.suggested_name.clone()).collect(),
            combined_file,
        },
    };

    debug!(
        "capture_circles captured={}/{} combined={}",
        captures.len(),
        circles.len(),
        combined.is_some()
    );
    Ok(CaptureOutcome {
        captures,
        combined,
        record,
    })
}

/// Concatenate captures horizontally with a 10 px gap, each tile
/// vertically centered against the tallest one.
fn combined_strip(captures: &[CircleCapture]) -> Option<RgbaImage> {
    if captures.is_empty() {
        return None;
    }
    let total_width =
        captures.iter().map(|c| c.region.width() + STRIP_GAP).sum::<u32>() - STRIP_GAP;
    let max_height = captures.iter().map(|c| c.region.height()).max()?;

    let mut strip = RgbaImage::new(total_width, max_height);
    let mut x_offset = 0i64;
    for capture in captures {
        let tile = capture.region.image.to_rgba8();
        let y_offset = i64::from((max_height - tile.height()) / 2);
        imageops::replace(&mut strip, &tile, x_offset, y_offset);
        x_offset += i64::from(tile.width() + STRIP_GAP);
    }
    Some(strip)
}

/// Render an annotated copy of `image`: every circle outlined in a
/// confidence color (green above 0.7, yellow above 0.4, red below),
/// a filled center dot, and a magenta cross on the rim of circles the
/// user adjusted.
pub fn preview_image(image: &DynamicImage, circles: &[Circle]) -> RgbImage {
    let mut preview = image.to_rgb8();
    for circle in circles {
        let color = confidence_color(circle.confidence);
        draw_hollow_circle_mut(&mut preview, (circle.x, circle.y), circle.radius, color);
        if circle.radius > 1 {
            draw_hollow_circle_mut(&mut preview, (circle.x, circle.y), circle.radius - 1, color);
        }
        draw_filled_circle_mut(&mut preview, (circle.x, circle.y), 3, color);
        if circle.adjusted {
            draw_cross_mut(
                &mut preview,
                Rgb([255, 0, 255]),
                circle.x + circle.radius,
                circle.y,
            );
        }
    }
    preview
}

fn confidence_color(confidence: f32) -> Rgb<u8> {
    if confidence > 0.7 {
        Rgb([0, 255, 0])
    } else if confidence > 0.4 {
        Rgb([255, 255, 0])
    } else {
        Rgb([255, 0, 0])
    }
}
