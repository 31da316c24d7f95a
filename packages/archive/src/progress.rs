//! Progress reporting for file transfers.
//!
//! Defines a [`ProgressCallback`] trait that decouples transfer progress
//! from any specific rendering backend (e.g., `indicatif` progress bars,
//! periodic log lines, or silence). Implementations are provided upstream
//! in crates that choose a rendering strategy.

use std::sync::Arc;

/// Trait for reporting progress of one transfer at a time.
///
/// Implementations must be `Send + Sync` to support `Arc`-based sharing.
pub trait ProgressCallback: Send + Sync {
    /// Begin tracking a new transfer. `total` is the expected size in bytes
    /// when the origin announced one.
    fn start(&self, label: &str, total: Option<u64>);

    /// Advance progress by `delta` bytes.
    fn inc(&self, delta: u64);

    /// Mark the current transfer as complete with a final message.
    fn finish(&self, msg: String);

    /// Mark the current transfer as abandoned and remove its indicator.
    fn finish_and_clear(&self);
}

/// A no-op implementation of [`ProgressCallback`] that silently ignores
/// all progress updates.
pub struct NullProgress;

impl ProgressCallback for NullProgress {
    fn start(&self, _label: &str, _total: Option<u64>) {}
    fn inc(&self, _delta: u64) {}
    fn finish(&self, _msg: String) {}
    fn finish_and_clear(&self) {}
}

/// Returns a shared [`NullProgress`] instance for convenient use.
#[must_use]
pub fn null_progress() -> Arc<dyn ProgressCallback> {
    Arc::new(NullProgress)
}
