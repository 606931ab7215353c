//! Error types for the docmd-translate library.
//!
//! Three error types reflect three distinct failure scopes:
//!
//! * [`PipelineError`] — **Fatal**: the run cannot start or continue at all
//!   (unreadable URL list, invalid configuration, HTTP client construction).
//!   Returned as `Err(PipelineError)` from [`crate::convert::Pipeline::new`]
//!   and the top-level `convert_all*` functions.
//!
//! * [`PageError`] — **Non-fatal, per page**: one URL could not be fetched,
//!   had no main-content element, or its output could not be written. The
//!   page is skipped, recorded in [`crate::output::RunSummary::skipped`], and
//!   the run continues with the next URL.
//!
//! * [`TransformError`] — **Absorbed**: a single remote call failed. It never
//!   propagates as an `Err`; it travels inside
//!   [`crate::output::TransformOutcome::Degraded`] next to the untransformed
//!   content so callers can see the failure without losing text.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use thiserror::Error;

/// All fatal errors returned by the docmd-translate library.
#[derive(Debug, Error)]
pub enum PipelineError {
    // ── Input errors ──────────────────────────────────────────────────────
    /// The newline-delimited URL list could not be read.
    #[error("Cannot read URL list '{path}': {source}\nCheck the path exists and is readable.")]
    UrlListUnreadable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // ── Config errors ─────────────────────────────────────────────────────
    /// Builder validation failed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// The shared HTTP client could not be constructed (TLS backend, proxy env…).
    #[error("Failed to build HTTP client: {0}")]
    HttpClient(String),

    // ── Catch-all ─────────────────────────────────────────────────────────
    /// Unexpected internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

/// A non-fatal error for a single page.
///
/// The URL is skipped and the run moves on to the next one.
#[derive(Debug, Clone, PartialEq, Error, Serialize, Deserialize)]
pub enum PageError {
    /// The URL could not be parsed.
    #[error("Invalid URL '{url}': {detail}")]
    InvalidUrl { url: String, detail: String },

    /// Fetching the page exceeded the navigation timeout.
    #[error("Navigation to '{url}' timed out after {timeout_ms}ms")]
    NavigationTimeout { url: String, timeout_ms: u64 },

    /// The page loaded but has no element with the configured id.
    #[error("Could not find #{content_id} element on '{url}'")]
    ContentNotFound { url: String, content_id: String },

    /// Transport error or non-success status while fetching the page.
    #[error("Failed to fetch '{url}': {detail}")]
    FetchFailed { url: String, detail: String },

    /// An output Markdown file could not be written.
    #[error("Failed to write '{path}': {detail}")]
    WriteFailed { path: PathBuf, detail: String },
}

impl PageError {
    /// The URL (or output path) this error is about, for log lines.
    pub fn subject(&self) -> String {
        match self {
            PageError::InvalidUrl { url, .. }
            | PageError::NavigationTimeout { url, .. }
            | PageError::ContentNotFound { url, .. }
            | PageError::FetchFailed { url, .. } => url.clone(),
            PageError::WriteFailed { path, .. } => path.display().to_string(),
        }
    }
}

/// Why a remote transform call fell back to passthrough.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
pub enum TransformError {
    /// No credential and no pre-built backend; the network was never touched.
    #[error("API key not set")]
    ConfigMissing,

    /// Timeout, connection error, or non-success HTTP status.
    #[error("upstream failure{}: {detail}", .status.map(|s| format!(" [HTTP {s}]")).unwrap_or_default())]
    UpstreamFailure { status: Option<u16>, detail: String },

    /// The service answered, but not with a usable completion.
    #[error("malformed response: {detail}")]
    MalformedResponse { detail: String },
}

impl TransformError {
    /// Explanatory note prefixed to passthrough content.
    pub fn note(&self, label: &str) -> String {
        match self {
            TransformError::ConfigMissing => "API key not set. Original content:".to_string(),
            TransformError::UpstreamFailure { .. } => {
                format!("Error during processing for {label}. Original content:")
            }
            TransformError::MalformedResponse { .. } => {
                format!("Processing failed for {label}. Original content:")
            }
        }
    }
}
