//! Serializable detection-data record.
//!
//! The record is the structured hand-off to persistence or export
//! collaborators: what was detected, with which parameters, and which
//! output files a saver should produce. The crate never touches the
//! filesystem itself; file names in the manifest are suggestions.

use crate::detector::DetectionParams;
use crate::error::Result;
use crate::types::Circle;
use serde::{Deserialize, Serialize};

/// Integer pixel coordinate pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PixelPoint {
    pub x: i32,
    pub y: i32,
}

/// One detected circle as recorded for export.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CircleEntry {
    /// 1-based position in the detection list.
    pub index: usize,
    pub center: PixelPoint,
    pub radius: i32,
    /// Confidence rounded to 4 decimals.
    pub confidence: f32,
    pub adjusted: bool,
    pub original_center: PixelPoint,
    pub original_radius: i32,
}

impl CircleEntry {
    /// Build an entry from a circle, rounding the confidence.
    pub fn from_circle(index: usize, circle: &Circle) -> Self {
        Self {
            index,
            center: PixelPoint {
                x: circle.x,
                y: circle.y,
            },
            radius: circle.radius,
            confidence: round4(circle.confidence),
            adjusted: circle.adjusted,
            original_center: PixelPoint {
                x: circle.original_x,
                y: circle.original_y,
            },
            original_radius: circle.original_radius,
        }
    }
}

/// Suggested output file names for the persistence collaborator.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OutputManifest {
    pub individual_files: Vec<String>,
    pub combined_file: Option<String>,
}

/// Full detection-data record for one capture run.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DetectionRecord {
    /// Compact stamp shared with the suggested file names
    /// (`%Y%m%d_%H%M%S`).
    pub timestamp: String,
    /// RFC 3339 wall-clock time of the capture run.
    pub datetime: String,
    pub total_detected: usize,
    pub successful_captures: usize,
    pub source_width: u32,
    pub source_height: u32,
    /// Detector parameters the circles were found with.
    pub params: DetectionParams,
    pub circles: Vec<CircleEntry>,
    pub output: OutputManifest,
}

impl DetectionRecord {
    /// Render the record as pretty-printed JSON.
    pub fn to_json_string(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

fn round4(value: f32) -> f32 {
    (value * 10_000.0).round() / 10_000.0
}
