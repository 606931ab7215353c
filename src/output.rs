//! Result types produced by the pipeline.

use crate::error::{PageError, TransformError};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Result of one remote transform call.
///
/// A failed call never loses content: [`TransformOutcome::Degraded`] keeps
/// the untransformed input and [`TransformOutcome::text`] renders it back.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransformOutcome {
    /// The service returned usable text.
    Translated(String),
    /// The call fell back to passthrough.
    Degraded {
        /// The untransformed input.
        original: String,
        /// Why the call did not succeed.
        reason: TransformError,
        /// Explanatory note prefixed to the original when rendered, if any.
        note: Option<String>,
    },
}

impl TransformOutcome {
    /// The text to hand downstream: the translation, or the original content
    /// (prefixed with its note, when annotated).
    pub fn text(&self) -> String {
        match self {
            TransformOutcome::Translated(text) => text.clone(),
            TransformOutcome::Degraded {
                original,
                note: Some(note),
                ..
            } => format!("{note}\n{original}"),
            TransformOutcome::Degraded { original, .. } => original.clone(),
        }
    }

    pub fn is_degraded(&self) -> bool {
        matches!(self, TransformOutcome::Degraded { .. })
    }

    /// The failure reason, if the call degraded.
    pub fn reason(&self) -> Option<&TransformError> {
        match self {
            TransformOutcome::Translated(_) => None,
            TransformOutcome::Degraded { reason, .. } => Some(reason),
        }
    }
}

/// Per-chunk diagnostics from the translation orchestrator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChunkReport {
    /// 0-based chunk index.
    pub index: usize,
    /// Characters sent to the service.
    pub input_chars: usize,
    /// Characters appended to the reassembled document.
    pub output_chars: usize,
    /// `Some` when the chunk fell back to passthrough.
    pub degraded: Option<TransformError>,
}

/// Reassembled translation of one document.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TranslationOutput {
    /// The translated document, chunks joined by a blank line.
    pub markdown: String,
    /// One report per chunk, in document order.
    pub chunks: Vec<ChunkReport>,
}

impl TranslationOutput {
    pub fn degraded_chunks(&self) -> usize {
        self.chunks.iter().filter(|c| c.degraded.is_some()).count()
    }
}

/// Outcome of one successfully processed page.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PageReport {
    /// Source URL.
    pub url: String,
    /// Where the pre-translation Markdown went (`None` if skipped as empty).
    pub original_path: Option<PathBuf>,
    /// Where the translated Markdown went (`None` if skipped as empty).
    pub translated_path: Option<PathBuf>,
    /// Why the HTML → Markdown call degraded, if it did.
    pub conversion_degraded: Option<TransformError>,
    /// Number of translation chunks.
    pub chunk_count: usize,
    /// Number of chunks that fell back to passthrough.
    pub degraded_chunks: usize,
    /// Wall-clock time for this page.
    pub duration_ms: u64,
}

/// Outcome of a whole run.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RunSummary {
    /// Pages processed, in input order.
    pub pages: Vec<PageReport>,
    /// Pages skipped, in input order.
    pub skipped: Vec<PageError>,
    /// URLs in the input list.
    pub total_urls: usize,
    /// Wall-clock time for the run.
    pub duration_ms: u64,
}

impl RunSummary {
    /// Total chunks that degraded across all pages.
    pub fn degraded_chunks(&self) -> usize {
        self.pages.iter().map(|p| p.degraded_chunks).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn degraded_text_contains_original() {
        let o = TransformOutcome::Degraded {
            original: "# Title\nbody".into(),
            reason: TransformError::ConfigMissing,
            note: Some("API key not set. Original content:".into()),
        };
        assert!(o.text().contains("# Title\nbody"));
        assert!(o.text().starts_with("API key not set"));
        assert!(o.is_degraded());
        assert_eq!(o.reason(), Some(&TransformError::ConfigMissing));
    }

    #[test]
    fn unannotated_degraded_is_exact_passthrough() {
        let o = TransformOutcome::Degraded {
            original: "body".into(),
            reason: TransformError::MalformedResponse { detail: "x".into() },
            note: None,
        };
        assert_eq!(o.text(), "body");
    }

    #[test]
    fn translated_text_is_returned_as_is() {
        let o = TransformOutcome::Translated("訳".into());
        assert_eq!(o.text(), "訳");
        assert!(!o.is_degraded());
        assert!(o.reason().is_none());
    }
}
