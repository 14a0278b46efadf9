//! Progress-callback trait for per-document batch events.
//!
//! Inject an [`Arc<dyn BatchProgressCallback>`] via
//! [`crate::config::AssemblyConfigBuilder::progress_callback`] to receive
//! events as the batch controller works through its sources.
//!
//! # Example
//!
//! ```rust
//! use edgequake_md2pdf::{AssemblyConfig, BatchProgressCallback, OrganizationIdentity};
//! use std::sync::{Arc, atomic::{AtomicUsize, Ordering}};
//!
//! struct CountingCallback {
//!     completed: AtomicUsize,
//! }
//!
//! impl BatchProgressCallback for CountingCallback {
//!     fn on_document_complete(&self, index: usize, total: usize, name: &str, bytes: usize) {
//!         self.completed.fetch_add(1, Ordering::SeqCst);
//!         eprintln!("{}/{} {} ({} bytes)", index, total, name, bytes);
//!     }
//! }
//!
//! let config = AssemblyConfig::builder()
//!     .subject(OrganizationIdentity::new("Globex"))
//!     .progress_callback(Arc::new(CountingCallback { completed: AtomicUsize::new(0) }))
//!     .build()
//!     .unwrap();
//! ```

use std::sync::Arc;

/// Called by the batch controller as it processes each document.
///
/// All methods have default no-op implementations so callers only override
/// what they care about. Documents are processed one at a time, but the
/// trait is `Send + Sync` so a callback can be shared with other tasks.
pub trait BatchProgressCallback: Send + Sync {
    /// Called once before the first document.
    ///
    /// # Arguments
    /// * `total` — number of assembler invocations planned (1 in combine mode)
    fn on_batch_start(&self, total: usize) {
        let _ = total;
    }

    /// Called before a document is assembled.
    ///
    /// # Arguments
    /// * `index` — 1-indexed position in the batch
    /// * `total` — planned invocations
    /// * `name`  — source file name (or the combined display name)
    fn on_document_start(&self, index: usize, total: usize, name: &str) {
        let _ = (index, total, name);
    }

    /// Called when a PDF has been rendered and written.
    ///
    /// # Arguments
    /// * `bytes` — size of the rendered PDF
    fn on_document_complete(&self, index: usize, total: usize, name: &str, bytes: usize) {
        let _ = (index, total, name, bytes);
    }

    /// Called when a document fails.
    ///
    /// # Arguments
    /// * `error` — human-readable error description naming the document
    fn on_document_error(&self, index: usize, total: usize, name: &str, error: &str) {
        let _ = (index, total, name, error);
    }

    /// Called once after the batch finished or stopped early.
    ///
    /// # Arguments
    /// * `total`    — planned invocations
    /// * `produced` — documents that rendered successfully
    fn on_batch_complete(&self, total: usize, produced: usize) {
        let _ = (total, produced);
    }
}

/// A no-op implementation for callers that don't need progress events.
pub struct NoopProgressCallback;

impl BatchProgressCallback for NoopProgressCallback {}

/// Convenience alias matching the type stored in [`crate::config::AssemblyConfig`].
pub type ProgressCallback = Arc<dyn BatchProgressCallback>;

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Default)]
    struct TrackingCallback {
        starts: AtomicUsize,
        completes: AtomicUsize,
        errors: AtomicUsize,
        planned: AtomicUsize,
        produced: AtomicUsize,
    }

    impl BatchProgressCallback for TrackingCallback {
        fn on_batch_start(&self, total: usize) {
            self.planned.store(total, Ordering::SeqCst);
        }

        fn on_document_start(&self, _index: usize, _total: usize, _name: &str) {
            self.starts.fetch_add(1, Ordering::SeqCst);
        }

        fn on_document_complete(&self, _index: usize, _total: usize, _name: &str, _bytes: usize) {
            self.completes.fetch_add(1, Ordering::SeqCst);
        }

        fn on_document_error(&self, _index: usize, _total: usize, _name: &str, _error: &str) {
            self.errors.fetch_add(1, Ordering::SeqCst);
        }

        fn on_batch_complete(&self, _total: usize, produced: usize) {
            self.produced.store(produced, Ordering::SeqCst);
        }
    }

    #[test]
    fn noop_callback_does_not_panic() {
        let cb = NoopProgressCallback;
        cb.on_batch_start(2);
        cb.on_document_start(1, 2, "a.md");
        cb.on_document_complete(1, 2, "a.md", 1024);
        cb.on_document_error(2, 2, "b.md", "boom");
        cb.on_batch_complete(2, 1);
    }

    #[test]
    fn tracking_callback_receives_events() {
        let tracker = TrackingCallback::default();

        tracker.on_batch_start(3);
        assert_eq!(tracker.planned.load(Ordering::SeqCst), 3);

        tracker.on_document_start(1, 3, "a.md");
        tracker.on_document_complete(1, 3, "a.md", 100);
        tracker.on_document_start(2, 3, "b.md");
        tracker.on_document_complete(2, 3, "b.md", 200);
        tracker.on_document_start(3, 3, "c.md");
        tracker.on_document_error(3, 3, "c.md", "render timed out");

        assert_eq!(tracker.starts.load(Ordering::SeqCst), 3);
        assert_eq!(tracker.completes.load(Ordering::SeqCst), 2);
        assert_eq!(tracker.errors.load(Ordering::SeqCst), 1);

        tracker.on_batch_complete(3, 2);
        assert_eq!(tracker.produced.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn arc_dyn_callback_works() {
        let cb: ProgressCallback = Arc::new(NoopProgressCallback);
        cb.on_batch_start(1);
        cb.on_document_start(1, 1, "combined_output.pdf");
    }
}
