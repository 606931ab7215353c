//! Chunked translation: split, translate each chunk in order, reassemble.
//!
//! Chunks are sent strictly one at a time. The call for chunk `i + 1` is only
//! issued after chunk `i` has returned, whether it succeeded or degraded, so
//! the reassembled document is always in source order and a failed chunk
//! never takes its neighbours down with it.

use crate::output::{ChunkReport, TranslationOutput};
use crate::pipeline::chunk::chunk_markdown;
use crate::pipeline::transform::RemoteTransform;
use crate::progress::ProgressCallback;
use tracing::{debug, info};

/// Separator inserted between translated chunks.
pub const CHUNK_SEPARATOR: &str = "\n\n";

/// Label used in log lines and passthrough notes for chunk `index` (0-based).
pub fn chunk_label(index: usize, total: usize) -> String {
    format!("Markdown Translation (chunk {} of {})", index + 1, total)
}

/// Translate `document` chunk by chunk with `template`.
///
/// Empty or whitespace-only documents produce an empty output and no calls.
pub async fn translate_document(
    document: &str,
    transform: &RemoteTransform,
    template: &str,
    max_chunk_size: usize,
    progress: Option<&ProgressCallback>,
) -> TranslationOutput {
    let chunks = chunk_markdown(document, max_chunk_size);
    let total = chunks.len();
    if total == 0 {
        debug!("Nothing to translate: document is empty");
        return TranslationOutput::default();
    }

    info!(
        chunks = total,
        doc_len = document.chars().count(),
        "Translating Markdown in {} chunk(s)",
        total
    );

    let mut markdown = String::with_capacity(document.len());
    let mut reports = Vec::with_capacity(total);

    for chunk in &chunks {
        let label = chunk_label(chunk.index, total);
        let outcome = transform.transform(template, chunk.text, &label).await;
        let text = outcome.text();

        if chunk.index > 0 {
            markdown.push_str(CHUNK_SEPARATOR);
        }
        markdown.push_str(&text);

        if let Some(cb) = progress {
            cb.on_chunk_complete(chunk.index, total, outcome.is_degraded());
        }

        reports.push(ChunkReport {
            index: chunk.index,
            input_chars: chunk.text.chars().count(),
            output_chars: text.chars().count(),
            degraded: outcome.reason().cloned(),
        });
    }

    TranslationOutput {
        markdown,
        chunks: reports,
    }
}
