//! Crate-wide error type.

/// Errors surfaced by the fallible top-level operations.
///
/// Per-item failures inside batch operations (a single circle whose
/// region cannot be extracted, a superseded async request) are not
/// errors; they are logged and skipped.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The input image has a zero dimension.
    #[error("empty input image ({width}x{height})")]
    EmptyImage {
        /// Width of the rejected image.
        width: u32,
        /// Height of the rejected image.
        height: u32,
    },

    /// An asynchronous request was submitted after the queue shut down.
    #[error("processing queue is shut down")]
    QueueClosed,

    /// Serializing a report failed.
    #[error("report serialization failed: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// Convenience alias used across the crate.
pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// Build an [`Error::EmptyImage`] from image dimensions.
    pub(crate) fn empty(width: u32, height: u32) -> Self {
        Error::EmptyImage { width, height }
    }
}
