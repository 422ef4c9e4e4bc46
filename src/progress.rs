//! Progress-callback trait for per-page load events.
//!
//! Inject an [`Arc<dyn LoadProgressCallback>`] via
//! [`crate::config::LoaderOptions::progress_callback`] to receive events as
//! the loader works through the pages. Both `load` and `lazy_load` fire the
//! same events, from the same per-page step.
//!
//! # Example
//!
//! ```rust
//! use edgequake_pageloader::{LoadProgressCallback, LoaderOptions};
//! use std::sync::{Arc, atomic::{AtomicUsize, Ordering}};
//!
//! struct CountingCallback {
//!     completed: AtomicUsize,
//! }
//!
//! impl LoadProgressCallback for CountingCallback {
//!     fn on_page_complete(&self, page: usize, total_pages: usize, content_len: usize) {
//!         self.completed.fetch_add(1, Ordering::SeqCst);
//!         eprintln!("Page {}/{} done ({} bytes)", page, total_pages, content_len);
//!     }
//! }
//!
//! let counter = Arc::new(CountingCallback { completed: AtomicUsize::new(0) });
//! let options = LoaderOptions::default()
//!     .progress_callback(counter as Arc<dyn LoadProgressCallback>);
//! ```

use std::sync::Arc;

/// Called by the loader as it processes each page.
///
/// All methods default to no-ops so callers only override what they need.
/// Implementations must be `Send + Sync`: a lazy stream may be polled from
/// any worker thread.
pub trait LoadProgressCallback: Send + Sync {
    /// Called once the source is open and its page count is known.
    fn on_load_start(&self, total_pages: usize) {
        let _ = total_pages;
    }

    /// Called just before a page artifact is handed to the engine.
    fn on_page_start(&self, page: usize, total_pages: usize) {
        let _ = (page, total_pages);
    }

    /// Called when a page's document has been assembled.
    ///
    /// `content_len` is the byte length of the page's Markdown.
    fn on_page_complete(&self, page: usize, total_pages: usize, content_len: usize) {
        let _ = (page, total_pages, content_len);
    }

    /// Called when a page fails to convert or render.
    ///
    /// `error` is owned so implementations can move it into spawned tasks.
    fn on_page_error(&self, page: usize, total_pages: usize, error: String) {
        let _ = (page, total_pages, error);
    }

    /// Called once after the last page (or the first failure).
    fn on_load_complete(&self, total_pages: usize, success_count: usize) {
        let _ = (total_pages, success_count);
    }
}

/// A no-op implementation for callers that don't need progress events.
pub struct NoopProgressCallback;

impl LoadProgressCallback for NoopProgressCallback {}

/// Convenience alias matching the type stored in [`crate::config::LoaderOptions`].
pub type ProgressCallback = Arc<dyn LoadProgressCallback>;
