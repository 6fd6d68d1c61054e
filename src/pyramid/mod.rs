//! Memory-bounded zoom cache for display images.
//!
//! Purpose
//! - Serve a base image resampled to arbitrary zoom factors without
//!   re-scaling on every view change, while keeping the resident set
//!   under a per-instance memory budget.
//!
//! Design
//! - Levels are keyed by milli-zoom (`round(zoom * 1000)`), giving float
//!   zoom factors a stable integer identity.
//! - Cached levels are `Arc<DynamicImage>`; hits hand out shared handles.
//! - A miss estimates the allocation at 3 bytes/pixel, evicts until the
//!   estimate fits, and serves the scaled image uncached when the budget
//!   (or the level cap) still cannot accommodate it.
//! - Eviction never touches the 1.0 level. Uncommon zooms go first,
//!   farthest from 1.0 first; common zooms follow in reverse importance.
//! - A base image larger than the whole budget is downscaled by
//!   `sqrt(0.8 * budget / size)` before being cached as the 1.0 level.
//!
//! Notes
//! - Instances are independent; a caller displaying original, edge and
//!   comparison variants creates one pyramid per variant, each with its
//!   own slice of the total budget.
//! - Zoom factors below 0.5 downscale progressively (repeated halving
//!   with an exact final resize) to avoid single-step quality cliffs.

use image::imageops::FilterType;
use image::{ColorType, DynamicImage};
use log::{debug, warn};
use serde::Serialize;
use std::collections::HashMap;
use std::sync::Arc;

/// Zoom levels users return to constantly; evicted only as a last resort.
const COMMON_KEYS: [i32; 5] = [1000, 500, 250, 2000, 1500];
/// Retention ranking for common levels; eviction walks it in reverse.
const IMPORTANCE_KEYS: [i32; 5] = [1000, 500, 2000, 1500, 250];

const BASE_KEY: i32 = 1000;
const DEFAULT_MAX_LEVELS: usize = 6;
const DEFAULT_BUDGET_MB: f64 = 512.0;
const BYTES_PER_MB: f64 = (1024 * 1024) as f64;

fn zoom_key(zoom: f32) -> i32 {
    (zoom * 1000.0).round() as i32
}

fn key_zoom(key: i32) -> f32 {
    key as f32 / 1000.0
}

fn image_mb(image: &DynamicImage) -> f64 {
    let bytes_per_pixel = match image.color() {
        ColorType::L8 => 1,
        ColorType::Rgb8 => 3,
        ColorType::Rgba8 => 4,
        _ => 4,
    };
    f64::from(image.width()) * f64::from(image.height()) * f64::from(bytes_per_pixel)
        / BYTES_PER_MB
}

/// Zoom-keyed cache of resampled copies of one base image.
pub struct ImagePyramid {
    levels: HashMap<i32, Arc<DynamicImage>>,
    max_levels: usize,
    budget_mb: f64,
    current_mb: f64,
}

/// Snapshot of a pyramid's memory state.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PyramidMemoryInfo {
    pub current_mb: f64,
    pub budget_mb: f64,
    pub usage_percent: f64,
    pub cached_levels: usize,
    pub max_levels: usize,
    /// Cached zoom factors, ascending.
    pub zoom_levels: Vec<f32>,
}

impl ImagePyramid {
    /// Pyramid with the given memory budget and the default level cap.
    pub fn new(budget_mb: f64) -> Self {
        Self::with_max_levels(budget_mb, DEFAULT_MAX_LEVELS)
    }

    /// Pyramid with an explicit cap on the number of cached levels.
    pub fn with_max_levels(budget_mb: f64, max_levels: usize) -> Self {
        Self {
            levels: HashMap::new(),
            max_levels: max_levels.max(1),
            budget_mb,
            current_mb: 0.0,
        }
    }

    /// Install a new base image, dropping all cached levels.
    ///
    /// A base exceeding the budget is downscaled so that it never
    /// violates the budget on its own.
    pub fn set_base_image(&mut self, image: DynamicImage) {
        self.levels.clear();
        self.current_mb = 0.0;

        let mut base = image;
        let mut base_mb = image_mb(&base);
        if base_mb > self.budget_mb && base_mb > 0.0 {
            let scale = (self.budget_mb * 0.8 / base_mb).sqrt();
            let width = ((f64::from(base.width()) * scale) as u32).max(1);
            let height = ((f64::from(base.height()) * scale) as u32).max(1);
            warn!(
                "ImagePyramid::set_base_image base {base_mb:.1}MB over budget {:.1}MB, downscaling to {width}x{height}",
                self.budget_mb
            );
            base = base.resize_exact(width, height, FilterType::Lanczos3);
            base_mb = image_mb(&base);
        }

        self.current_mb = base_mb;
        self.levels.insert(BASE_KEY, Arc::new(base));
    }

    /// The cached 1.0 level, when a base image is installed.
    pub fn base_image(&self) -> Option<&Arc<DynamicImage>> {
        self.levels.get(&BASE_KEY)
    }

    /// The base image scaled to `zoom`.
    ///
    /// Cache hits return the shared handle. Misses scale, then cache the
    /// result unless the budget or level cap forbids it; the scaled
    /// image is served either way. `None` without a base image or for a
    /// degenerate zoom factor.
    pub fn image_at_zoom(&mut self, zoom: f32) -> Option<Arc<DynamicImage>> {
        if !zoom.is_finite() || zoom <= 0.0 {
            return None;
        }
        let key = zoom_key(zoom);
        if let Some(cached) = self.levels.get(&key) {
            return Some(Arc::clone(cached));
        }

        let base = Arc::clone(self.levels.get(&BASE_KEY)?);
        let width = ((f64::from(base.width()) * f64::from(zoom)) as u32).max(1);
        let height = ((f64::from(base.height()) * f64::from(zoom)) as u32).max(1);
        let estimated_mb = f64::from(width) * f64::from(height) * 3.0 / BYTES_PER_MB;

        if self.current_mb + estimated_mb > self.budget_mb {
            self.evict_for(estimated_mb);
        }

        let scaled = scale_to(&base, zoom, width, height);
        if self.current_mb + estimated_mb > self.budget_mb {
            debug!("ImagePyramid::image_at_zoom {zoom:.2}x does not fit the budget, serving uncached");
            return Some(Arc::new(scaled));
        }

        let scaled = Arc::new(scaled);
        if self.levels.len() < self.max_levels {
            self.current_mb += image_mb(&scaled);
            self.levels.insert(key, Arc::clone(&scaled));
        } else {
            debug!(
                "ImagePyramid::image_at_zoom level cap {} reached, serving {zoom:.2}x uncached",
                self.max_levels
            );
        }
        Some(scaled)
    }

    /// Drop every cached level including the base image.
    pub fn clear(&mut self) {
        self.levels.clear();
        self.current_mb = 0.0;
    }

    /// Memory usage snapshot.
    pub fn memory_info(&self) -> PyramidMemoryInfo {
        let mut keys: Vec<i32> = self.levels.keys().copied().collect();
        keys.sort_unstable();
        let usage_percent = if self.budget_mb > 0.0 {
            self.current_mb / self.budget_mb * 100.0
        } else {
            0.0
        };
        PyramidMemoryInfo {
            current_mb: self.current_mb,
            budget_mb: self.budget_mb,
            usage_percent,
            cached_levels: self.levels.len(),
            max_levels: self.max_levels,
            zoom_levels: keys.into_iter().map(key_zoom).collect(),
        }
    }

    /// Change the memory budget, evicting down to it when lowered.
    pub fn set_memory_budget(&mut self, budget_mb: f64) {
        debug!(
            "ImagePyramid::set_memory_budget {:.1}MB -> {budget_mb:.1}MB",
            self.budget_mb
        );
        self.budget_mb = budget_mb;
        if self.current_mb > self.budget_mb {
            self.evict_for(0.0);
        }
    }

    /// Evict levels until `required_mb` more fits, or nothing evictable
    /// remains. The 1.0 level is never removed.
    fn evict_for(&mut self, required_mb: f64) {
        let mut uncommon: Vec<i32> = self
            .levels
            .keys()
            .copied()
            .filter(|k| *k != BASE_KEY && !COMMON_KEYS.contains(k))
            .collect();
        uncommon.sort_by(|a, b| {
            let da = (a - BASE_KEY).abs();
            let db = (b - BASE_KEY).abs();
            db.cmp(&da)
        });

        let mut common: Vec<i32> = self
            .levels
            .keys()
            .copied()
            .filter(|k| *k != BASE_KEY && COMMON_KEYS.contains(k))
            .collect();
        common.sort_by_key(|k| IMPORTANCE_KEYS.iter().position(|i| i == k));

        let order = uncommon.into_iter().chain(common.into_iter().rev());
        for key in order {
            if self.current_mb + required_mb <= self.budget_mb {
                break;
            }
            if let Some(evicted) = self.levels.remove(&key) {
                let freed = image_mb(&evicted);
                self.current_mb -= freed;
                debug!(
                    "ImagePyramid evicted {:.2}x, freed {freed:.1}MB",
                    key_zoom(key)
                );
            }
        }
    }
}

impl Default for ImagePyramid {
    fn default() -> Self {
        Self::new(DEFAULT_BUDGET_MB)
    }
}

fn scale_to(base: &DynamicImage, zoom: f32, width: u32, height: u32) -> DynamicImage {
    if zoom < 0.5 {
        progressive_downscale(base, width, height, zoom)
    } else {
        // Upscales and moderate downscales take a single Lanczos pass.
        base.resize_exact(width, height, FilterType::Lanczos3)
    }
}

/// Downscale by at most 50% per step, then resize exactly to the target.
fn progressive_downscale(base: &DynamicImage, width: u32, height: u32, zoom: f32) -> DynamicImage {
    let mut steps = Vec::new();
    let mut factor = zoom;
    while factor < 0.5 {
        steps.push(0.5f32);
        factor /= 0.5;
    }
    if factor < 1.0 {
        steps.push(factor);
    }

    let mut current: Option<DynamicImage> = None;
    for step in steps {
        let src = current.as_ref().unwrap_or(base);
        let w = ((src.width() as f32 * step) as u32).max(1);
        let h = ((src.height() as f32 * step) as u32).max(1);
        current = Some(src.resize_exact(w, h, FilterType::Lanczos3));
    }

    let result = current.unwrap_or_else(|| base.clone());
    if result.width() != width || result.height() != height {
        result.resize_exact(width, height, FilterType::Lanczos3)
    } else {
        result
    }
}
