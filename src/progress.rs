//! Progress-callback trait for run, page and chunk events.
//!
//! Inject an [`Arc<dyn ConversionProgressCallback>`] via
//! [`crate::config::PipelineConfigBuilder::progress_callback`] to receive
//! events as the pipeline works through the URL list.
//!
//! Pages and chunks are processed one at a time, so events arrive in a
//! strict order: `on_run_start`, then for each URL either
//! `on_page_start → on_chunk_complete* → on_page_complete` or
//! `on_page_start → on_page_skipped`, then `on_run_complete`.
//!
//! # Example
//!
//! ```rust
//! use docmd_translate::{ConversionProgressCallback, PipelineConfig};
//! use std::sync::{Arc, atomic::{AtomicUsize, Ordering}};
//!
//! struct CountingCallback {
//!     chunks: AtomicUsize,
//! }
//!
//! impl ConversionProgressCallback for CountingCallback {
//!     fn on_chunk_complete(&self, index: usize, total_chunks: usize, degraded: bool) {
//!         self.chunks.fetch_add(1, Ordering::SeqCst);
//!         if degraded {
//!             eprintln!("chunk {}/{} kept its original text", index + 1, total_chunks);
//!         }
//!     }
//! }
//!
//! let config = PipelineConfig::builder()
//!     .progress_callback(Arc::new(CountingCallback { chunks: AtomicUsize::new(0) }))
//!     .build()
//!     .unwrap();
//! ```

use crate::error::PageError;
use crate::output::PageReport;
use std::sync::Arc;

/// Called by the pipeline as it processes URLs and translation chunks.
///
/// All methods have default no-op implementations so callers only override
/// what they care about.
pub trait ConversionProgressCallback: Send + Sync {
    /// Called once before the first URL.
    fn on_run_start(&self, total_urls: usize) {
        let _ = total_urls;
    }

    /// Called before a URL is fetched.
    ///
    /// # Arguments
    /// * `page_num` — 1-indexed position in the URL list
    /// * `total`    — number of URLs in the list
    /// * `url`      — the URL about to be fetched
    fn on_page_start(&self, page_num: usize, total: usize, url: &str) {
        let _ = (page_num, total, url);
    }

    /// Called after each translation chunk returns, success or passthrough.
    ///
    /// `index` is 0-based.
    fn on_chunk_complete(&self, index: usize, total_chunks: usize, degraded: bool) {
        let _ = (index, total_chunks, degraded);
    }

    /// Called when a page's files have been written.
    fn on_page_complete(&self, page_num: usize, total: usize, report: &PageReport) {
        let _ = (page_num, total, report);
    }

    /// Called when a page is skipped (fetch failure, missing element, write failure).
    fn on_page_skipped(&self, page_num: usize, total: usize, error: &PageError) {
        let _ = (page_num, total, error);
    }

    /// Called once after every URL has been attempted.
    ///
    /// # Arguments
    /// * `total_urls` — number of URLs in the list
    /// * `succeeded`  — pages that produced a [`PageReport`]
    fn on_run_complete(&self, total_urls: usize, succeeded: usize) {
        let _ = (total_urls, succeeded);
    }
}

/// A no-op implementation; the default when no callback is configured.
pub struct NoopProgressCallback;

impl ConversionProgressCallback for NoopProgressCallback {}

/// Convenience alias matching the type stored in [`crate::config::PipelineConfig`].
pub type ProgressCallback = Arc<dyn ConversionProgressCallback>;
