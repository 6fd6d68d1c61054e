//! Edge-detection engine: preprocessing, Canny, post-processing,
//! result caching and background execution.
//!
//! The engine is a constructed value; all shared state lives behind an
//! `Arc` inside it, so several engines with different parameter sets
//! can coexist and background tasks keep working while callers hold
//! only the engine.

use std::collections::hash_map::DefaultHasher;
use std::collections::HashMap;
use std::hash::{Hash, Hasher};
use std::sync::{Arc, Mutex};
use std::time::{Instant, SystemTime};

use image::{DynamicImage, GrayImage, RgbImage};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::preprocess;
use crate::validation::ValidationReport;

use super::canny::canny;
use super::lock;
use super::morph;
use super::params::{EdgeDetectionParams, CLAHE_TILES};
use super::queue::{ProcessingQueue, QueueOptions};

/// Number of results the engine keeps.
const CACHE_CAPACITY: usize = 10;

/// Output of one edge-detection run.
#[derive(Debug, Clone)]
pub struct EdgeDetectionResult {
    /// Input image as received.
    pub original: DynamicImage,
    /// Binary edge map, 255 on edge pixels.
    pub edges: GrayImage,
    /// Grayscale image after the preprocessing chain.
    pub preprocessed: Option<GrayImage>,
    /// Wall-clock processing time in milliseconds.
    pub elapsed_ms: f64,
    /// Number of set pixels in the edge map.
    pub edge_pixels: usize,
    /// Parameters this run used.
    pub params: EdgeDetectionParams,
    /// Creation time.
    pub created: SystemTime,
}

/// Aggregate engine counters since construction or the last reset.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EngineStats {
    /// Pipeline runs that actually processed pixels.
    pub total_processed: u64,
    /// Total processing time in milliseconds.
    pub total_ms: f64,
    /// Mean processing time per run in milliseconds.
    pub average_ms: f64,
    /// Requests served from the result cache.
    pub cache_hits: u64,
    /// Requests that ran the pipeline.
    pub cache_misses: u64,
    /// `cache_hits / (cache_hits + cache_misses)`, 0 when idle.
    pub hit_rate: f64,
}

#[derive(Default)]
struct StatsAccum {
    total_processed: u64,
    total_ms: f64,
    cache_hits: u64,
    cache_misses: u64,
}

impl StatsAccum {
    fn snapshot(&self) -> EngineStats {
        let requests = self.cache_hits + self.cache_misses;
        EngineStats {
            total_processed: self.total_processed,
            total_ms: self.total_ms,
            average_ms: if self.total_processed > 0 {
                self.total_ms / self.total_processed as f64
            } else {
                0.0
            },
            cache_hits: self.cache_hits,
            cache_misses: self.cache_misses,
            hit_rate: if requests > 0 {
                self.cache_hits as f64 / requests as f64
            } else {
                0.0
            },
        }
    }
}

struct CacheEntry {
    result: Arc<EdgeDetectionResult>,
    last_used: Instant,
}

/// Keyed by (image digest, parameter fingerprint); bounded size with
/// oldest-use eviction. Hits refresh the entry age.
struct ResultCache {
    capacity: usize,
    entries: HashMap<(u64, u64), CacheEntry>,
}

impl ResultCache {
    fn new(capacity: usize) -> Self {
        Self {
            capacity,
            entries: HashMap::new(),
        }
    }

    fn get(&mut self, key: (u64, u64)) -> Option<Arc<EdgeDetectionResult>> {
        let entry = self.entries.get_mut(&key)?;
        entry.last_used = Instant::now();
        Some(Arc::clone(&entry.result))
    }

    fn insert(&mut self, key: (u64, u64), result: Arc<EdgeDetectionResult>) {
        if !self.entries.contains_key(&key) && self.entries.len() >= self.capacity {
            if let Some(oldest) = self
                .entries
                .iter()
                .min_by_key(|(_, e)| e.last_used)
                .map(|(k, _)| *k)
            {
                self.entries.remove(&oldest);
                log::debug!("EdgeEngine: cache full, evicted oldest entry");
            }
        }
        self.entries.insert(
            key,
            CacheEntry {
                result,
                last_used: Instant::now(),
            },
        );
    }

    fn clear(&mut self) {
        self.entries.clear();
    }

    fn len(&self) -> usize {
        self.entries.len()
    }
}

/// Digest of the full pixel content plus layout.
fn image_digest(image: &DynamicImage) -> u64 {
    let mut hasher = DefaultHasher::new();
    image.width().hash(&mut hasher);
    image.height().hash(&mut hasher);
    image.color().bytes_per_pixel().hash(&mut hasher);
    image.as_bytes().hash(&mut hasher);
    hasher.finish()
}

/// Run the pipeline once, uncached.
fn detect_once(image: &DynamicImage, params: &EdgeDetectionParams) -> Result<EdgeDetectionResult> {
    let (w, h) = (image.width(), image.height());
    if w == 0 || h == 0 {
        return Err(Error::empty(w, h));
    }
    let start = Instant::now();

    let mut work = preprocess::to_grayscale(image);
    if params.clahe {
        work = preprocess::clahe(&work, params.clahe_clip_limit, CLAHE_TILES);
    }
    if params.gaussian_blur {
        work = preprocess::gaussian_blur_odd(&work, params.blur_kernel);
    }
    if params.median_filter {
        work = preprocess::median_blur(&work, params.median_kernel);
    }
    let preprocess_ms = start.elapsed().as_secs_f64() * 1000.0;

    let canny_start = Instant::now();
    let mut edges = canny(
        &work,
        params.threshold1,
        params.threshold2,
        params.aperture_size,
        params.l2_gradient,
    );
    let canny_ms = canny_start.elapsed().as_secs_f64() * 1000.0;

    let post_start = Instant::now();
    if params.remove_noise {
        edges = morph::open_2x2(&edges);
    }
    if params.morphology {
        edges = morph::close_odd(&edges, params.morph_kernel);
    }
    if params.edge_thinning {
        edges = morph::thin(&edges);
    }
    let post_ms = post_start.elapsed().as_secs_f64() * 1000.0;

    let edge_pixels = edges.as_raw().iter().filter(|p| **p > 0).count();
    let elapsed_ms = start.elapsed().as_secs_f64() * 1000.0;
    log::debug!("EdgeEngine::detect w={w} h={h} edges={edge_pixels} preprocess_ms={preprocess_ms:.2} canny_ms={canny_ms:.2} post_ms={post_ms:.2}");

    Ok(EdgeDetectionResult {
        original: image.clone(),
        edges,
        preprocessed: Some(work),
        elapsed_ms,
        edge_pixels,
        params: params.clone(),
        created: SystemTime::now(),
    })
}

struct EngineState {
    params: EdgeDetectionParams,
    cache: ResultCache,
    stats: StatsAccum,
}

struct EngineShared {
    state: Mutex<EngineState>,
}

impl EngineShared {
    fn detect(&self, image: &DynamicImage) -> Result<Arc<EdgeDetectionResult>> {
        let (w, h) = (image.width(), image.height());
        if w == 0 || h == 0 {
            return Err(Error::empty(w, h));
        }

        let params = lock(&self.state).params.clone();
        let key = (image_digest(image), params.fingerprint());
        {
            let mut state = lock(&self.state);
            if let Some(hit) = state.cache.get(key) {
                state.stats.cache_hits += 1;
                log::debug!("EdgeEngine::detect cache hit w={w} h={h}");
                return Ok(hit);
            }
        }

        let result = Arc::new(detect_once(image, &params)?);
        let mut state = lock(&self.state);
        state.stats.cache_misses += 1;
        state.stats.total_processed += 1;
        state.stats.total_ms += result.elapsed_ms;
        state.cache.insert(key, Arc::clone(&result));
        Ok(result)
    }
}

/// Edge-detection engine with result caching and a background queue.
pub struct EdgeEngine {
    shared: Arc<EngineShared>,
    queue: ProcessingQueue,
}

impl EdgeEngine {
    /// Engine with the given parameters and default queue options.
    ///
    /// Parameters are validated up front; adjustments are logged.
    pub fn new(params: EdgeDetectionParams) -> Self {
        Self::with_queue(params, QueueOptions::default())
    }

    /// Engine with explicit worker/debounce configuration.
    pub fn with_queue(mut params: EdgeDetectionParams, queue: QueueOptions) -> Self {
        params.validate().warn_all("EdgeEngine::new");
        Self {
            shared: Arc::new(EngineShared {
                state: Mutex::new(EngineState {
                    params,
                    cache: ResultCache::new(CACHE_CAPACITY),
                    stats: StatsAccum::default(),
                }),
            }),
            queue: ProcessingQueue::new(queue),
        }
    }

    /// Current parameters.
    pub fn params(&self) -> EdgeDetectionParams {
        lock(&self.shared.state).params.clone()
    }

    /// Replace the parameters; the result cache is cleared when they
    /// differ from the current set.
    pub fn set_params(&self, mut params: EdgeDetectionParams) -> ValidationReport {
        let report = params.validate();
        report.warn_all("EdgeEngine::set_params");
        let mut state = lock(&self.shared.state);
        if state.params != params {
            state.params = params;
            state.cache.clear();
            log::debug!("EdgeEngine::set_params parameters changed, cache cleared");
        }
        report
    }

    /// Detect edges synchronously, consulting the result cache.
    pub fn detect_edges(&self, image: &DynamicImage) -> Result<Arc<EdgeDetectionResult>> {
        self.shared.detect(image)
    }

    /// Queue a debounced detection; the callback fires once per burst
    /// with the newest image, or not at all when superseded.
    pub fn detect_edges_async<F>(&self, image: DynamicImage, callback: F) -> Result<()>
    where
        F: FnOnce(Result<Arc<EdgeDetectionResult>>) + Send + 'static,
    {
        let shared = Arc::clone(&self.shared);
        self.queue
            .submit_debounced(Box::new(move || callback(shared.detect(&image))))
    }

    /// Queue a detection that bypasses the debounce window.
    pub fn detect_edges_immediate<F>(&self, image: DynamicImage, callback: F) -> Result<()>
    where
        F: FnOnce(Result<Arc<EdgeDetectionResult>>) + Send + 'static,
    {
        let shared = Arc::clone(&self.shared);
        self.queue
            .submit_now(Box::new(move || callback(shared.detect(&image))))
    }

    /// Counter snapshot.
    pub fn stats(&self) -> EngineStats {
        lock(&self.shared.state).stats.snapshot()
    }

    /// Zero all counters.
    pub fn reset_stats(&self) {
        lock(&self.shared.state).stats = StatsAccum::default();
    }

    /// Drop all cached results.
    pub fn clear_cache(&self) {
        lock(&self.shared.state).cache.clear();
    }

    /// Number of cached results.
    pub fn cached_results(&self) -> usize {
        lock(&self.shared.state).cache.len()
    }
}

impl Default for EdgeEngine {
    fn default() -> Self {
        Self::new(EdgeDetectionParams::default())
    }
}

/// How to compose an original/edges comparison view.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ComparisonMode {
    /// Original on the left, edge map on the right.
    SideBySide,
    /// Edges blended into the original's green channel.
    Overlay,
}

/// Compose the original and its edge map for display.
pub fn comparison_image(result: &EdgeDetectionResult, mode: ComparisonMode) -> RgbImage {
    let original = result.original.to_rgb8();
    let (w, h) = original.dimensions();
    match mode {
        ComparisonMode::SideBySide => {
            let mut out = RgbImage::new(w * 2, h);
            for (x, y, p) in original.enumerate_pixels() {
                out.put_pixel(x, y, *p);
            }
            for (x, y, p) in result.edges.enumerate_pixels() {
                let v = p.0[0];
                out.put_pixel(w + x, y, image::Rgb([v, v, v]));
            }
            out
        }
        ComparisonMode::Overlay => {
            let mut out = original;
            for (x, y, pixel) in out.enumerate_pixels_mut() {
                let e = result.edges.get_pixel(x, y).0[0] as f32;
                let [r, g, b] = pixel.0;
                pixel.0 = [
                    (r as f32 * 0.7) as u8,
                    (g as f32 * 0.7 + e * 0.3) as u8,
                    (b as f32 * 0.7) as u8,
                ];
            }
            out
        }
    }
}

/// One-off detection with default parameters and custom thresholds.
pub fn detect_edges_simple(
    image: &DynamicImage,
    threshold1: f32,
    threshold2: f32,
) -> Result<EdgeDetectionResult> {
    let mut params = EdgeDetectionParams {
        threshold1,
        threshold2,
        ..Default::default()
    };
    params.validate().warn_all("detect_edges_simple");
    detect_once(image, &params)
}
