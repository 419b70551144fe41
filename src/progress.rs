//! Progress-callback trait for per-file batch events.
//!
//! Inject an [`Arc<dyn ProcessingProgressCallback>`] via
//! [`crate::config::NoteConfigBuilder::progress_callback`] to receive events
//! as [`crate::process::process_batch`] works through its files.
//!
//! ```rust
//! use notebot::{NoteConfig, ProcessingProgressCallback};
//! use std::sync::{Arc, atomic::{AtomicUsize, Ordering}};
//!
//! struct Counter(AtomicUsize);
//!
//! impl ProcessingProgressCallback for Counter {
//!     fn on_file_complete(&self, _index: usize, _total: usize, _filename: &str, _len: usize) {
//!         self.0.fetch_add(1, Ordering::SeqCst);
//!     }
//! }
//!
//! let config = NoteConfig::builder()
//!     .progress_callback(Arc::new(Counter(AtomicUsize::new(0))))
//!     .build()
//!     .unwrap();
//! ```

use std::sync::Arc;

/// Called by the batch processor as it handles each file.
///
/// With `concurrency > 1` the per-file methods may be called from several
/// tasks at once. Every method defaults to a no-op.
pub trait ProcessingProgressCallback: Send + Sync {
    /// Called once before the first file.
    fn on_batch_start(&self, total_files: usize) {
        let _ = total_files;
    }

    /// Called before extraction starts. `index` is 1-based.
    fn on_file_start(&self, index: usize, total_files: usize, filename: &str) {
        let _ = (index, total_files, filename);
    }

    /// Called when a file produced notes; `notes_len` is the byte length.
    fn on_file_complete(&self, index: usize, total_files: usize, filename: &str, notes_len: usize) {
        let _ = (index, total_files, filename, notes_len);
    }

    /// Called when a file failed.
    fn on_file_error(&self, index: usize, total_files: usize, filename: &str, error: &str) {
        let _ = (index, total_files, filename, error);
    }

    /// Called once after every file was attempted.
    fn on_batch_complete(&self, total_files: usize, success_count: usize) {
        let _ = (total_files, success_count);
    }
}

/// Default when no callback is configured.
pub struct NoopProgressCallback;

impl ProcessingProgressCallback for NoopProgressCallback {}

/// Type stored in [`crate::config::NoteConfig`].
pub type ProgressCallback = Arc<dyn ProcessingProgressCallback>;

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    #[derive(Default)]
    struct Tracking {
        started: AtomicUsize,
        completed: AtomicUsize,
        errors: Mutex<Vec<String>>,
        successes: AtomicUsize,
    }

    impl ProcessingProgressCallback for Tracking {
        fn on_file_start(&self, _i: usize, _t: usize, _f: &str) {
            self.started.fetch_add(1, Ordering::SeqCst);
        }

        fn on_file_complete(&self, _i: usize, _t: usize, _f: &str, _n: usize) {
            self.completed.fetch_add(1, Ordering::SeqCst);
        }

        fn on_file_error(&self, _i: usize, _t: usize, filename: &str, _e: &str) {
            self.errors.lock().unwrap().push(filename.to_string());
        }

        fn on_batch_complete(&self, _t: usize, success_count: usize) {
            self.successes.store(success_count, Ordering::SeqCst);
        }
    }

    #[test]
    fn noop_callback_does_not_panic() {
        let cb = NoopProgressCallback;
        cb.on_batch_start(2);
        cb.on_file_start(1, 2, "a.txt");
        cb.on_file_complete(1, 2, "a.txt", 10);
        cb.on_file_error(2, 2, "b.xyz", "unsupported");
        cb.on_batch_complete(2, 1);
    }

    #[test]
    fn tracking_callback_through_arc() {
        let tracker = Arc::new(Tracking::default());
        let cb: ProgressCallback = tracker.clone();
        cb.on_batch_start(2);
        cb.on_file_start(1, 2, "a.txt");
        cb.on_file_complete(1, 2, "a.txt", 10);
        cb.on_file_start(2, 2, "b.xyz");
        cb.on_file_error(2, 2, "b.xyz", "unsupported");
        cb.on_batch_complete(2, 1);

        assert_eq!(tracker.started.load(Ordering::SeqCst), 2);
        assert_eq!(tracker.completed.load(Ordering::SeqCst), 1);
        assert_eq!(*tracker.errors.lock().unwrap(), vec!["b.xyz".to_string()]);
        assert_eq!(tracker.successes.load(Ordering::SeqCst), 1);
    }
}
