//! Edge detection subsystem.
//!
//! Building blocks and the engine that drives them:
//!
//! - Gradient extraction, direction-aligned non-maximum suppression and
//!   hysteresis tracking ([`canny`]).
//! - Binary post-processing: noise opening, gap closing, skeleton
//!   thinning ([`morph`]).
//! - Self-validating pipeline parameters ([`params`]).
//! - A cached engine with synchronous and debounced background
//!   execution ([`engine`], [`queue`]).
//!
//! Design goals
//! - Favor clarity and row access over micro-optimizations.
//! - Handle borders by clamping indices (replicate).
//! - Keep parameter and stats types serializable for tooling.

use std::sync::{Mutex, MutexGuard, PoisonError};

pub mod canny;
pub mod engine;
pub mod morph;
pub mod params;
pub mod queue;

pub use engine::{
    comparison_image, detect_edges_simple, ComparisonMode, EdgeDetectionResult, EdgeEngine,
    EngineStats,
};
pub use params::EdgeDetectionParams;
pub use queue::QueueOptions;

/// Lock a mutex, recovering the guard if a panicking task poisoned it.
pub(crate) fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}
