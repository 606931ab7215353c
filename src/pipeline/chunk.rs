//! Heading-aware chunking of a Markdown document.
//!
//! Translation models handle a few thousand characters well and long inputs
//! badly, so the translated document is produced chunk by chunk. Chunk
//! boundaries prefer heading lines (`#`, `##`, … followed by a space): every
//! heading starts a new chunk, and no heading line is ever cut in two.
//!
//! ## Algorithm
//!
//! A cursor walks the document once:
//!
//! 1. skip whitespace at the cursor;
//! 2. find the next heading line starting strictly after the cursor;
//! 3. tentative end = `min(cursor + max_chunk_size chars, next heading)`;
//! 4. if the end lands exactly on a heading, back off to the newline just
//!    before it so the heading opens the next chunk;
//! 5. emit the trimmed slice and move on.
//!
//! The next heading position is remembered until the cursor reaches it, so a
//! long heading-free section is scanned once rather than once per chunk.
//!
//! ## Known limitation
//!
//! A heading-free run longer than `max_chunk_size` is cut at raw character
//! offsets, not at paragraph or sentence boundaries, and the pieces are not
//! re-examined recursively.

use once_cell::sync::Lazy;
use regex::Regex;

static RE_HEADING_LINE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?m)^#+ ").unwrap());

/// One ordered slice of a Markdown document.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Chunk<'a> {
    /// 0-based position in document order.
    pub index: usize,
    /// Trimmed, non-empty text borrowed from the document.
    pub text: &'a str,
}

/// Split `document` into chunks of at most `max_chunk_size` characters,
/// breaking before heading lines.
///
/// Returns an empty vector for empty or whitespace-only input. A
/// `max_chunk_size` of 0 is treated as 1.
pub fn split_markdown(document: &str, max_chunk_size: usize) -> Vec<&str> {
    let max = max_chunk_size.max(1);
    let len = document.len();
    let mut chunks = Vec::new();
    let mut cursor = 0;
    // Last heading search; still the answer while it lies ahead of the cursor.
    let mut heading_ahead: Option<Option<usize>> = None;

    loop {
        cursor = skip_whitespace(document, cursor);
        if cursor >= len {
            break;
        }

        let next_heading = match heading_ahead {
            Some(Some(h)) if h > cursor => Some(h),
            Some(None) => None,
            _ => next_heading_after(document, cursor),
        };
        heading_ahead = Some(next_heading);
        let size_limit = advance_chars(document, cursor, max);
        let mut end = size_limit.min(next_heading.unwrap_or(len));

        // A heading longer than the size limit still goes out whole.
        if is_heading_start(document, cursor) {
            end = end.max(line_end(document, cursor));
        }

        if Some(end) == next_heading && end < len {
            end = document[..end].rfind('\n').filter(|&nl| nl > cursor).unwrap_or(end);
        }

        let piece = document[cursor..end].trim();
        if piece.is_empty() {
            cursor = end.max(advance_chars(document, cursor, 1));
        } else {
            chunks.push(piece);
            cursor = end;
        }
    }

    if chunks.is_empty() {
        let trimmed = document.trim();
        if !trimmed.is_empty() {
            chunks.push(trimmed);
        }
    }

    chunks
}

/// Like [`split_markdown`] but tags each chunk with its index.
pub fn chunk_markdown(document: &str, max_chunk_size: usize) -> Vec<Chunk<'_>> {
    split_markdown(document, max_chunk_size)
        .into_iter()
        .enumerate()
        .map(|(index, text)| Chunk { index, text })
        .collect()
}

/// Whether `line` is a Markdown heading line.
pub fn is_heading_line(line: &str) -> bool {
    let hashes = line.bytes().take_while(|&b| b == b'#').count();
    hashes > 0 && line.as_bytes().get(hashes) == Some(&b' ')
}

/// Byte offset of the first heading line that starts strictly after `cursor`.
fn next_heading_after(document: &str, cursor: usize) -> Option<usize> {
    let from = advance_chars(document, cursor, 1);
    RE_HEADING_LINE
        .find_at(document, from)
        .map(|m| m.start())
        .filter(|&start| start > cursor)
}

fn is_heading_start(document: &str, pos: usize) -> bool {
    (pos == 0 || document[..pos].ends_with('\n')) && is_heading_line(&document[pos..])
}

/// Byte offset of the `\n` ending the line that contains `pos`, or the document end.
fn line_end(document: &str, pos: usize) -> usize {
    document[pos..]
        .find('\n')
        .map(|i| pos + i)
        .unwrap_or(document.len())
}

/// Byte offset `n` characters after `pos`, clamped to the document end.
fn advance_chars(document: &str, pos: usize, n: usize) -> usize {
    document[pos..]
        .char_indices()
        .nth(n)
        .map(|(i, _)| pos + i)
        .unwrap_or(document.len())
}

fn skip_whitespace(document: &str, pos: usize) -> usize {
    document[pos..]
        .char_indices()
        .find(|(_, c)| !c.is_whitespace())
        .map(|(i, _)| pos + i)
        .unwrap_or(document.len())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn non_ws(s: &str) -> String {
        s.chars().filter(|c| !c.is_whitespace()).collect()
    }

    fn assert_preserves(doc: &str, chunks: &[&str]) {
        assert_eq!(non_ws(&chunks.concat()), non_ws(doc), "content lost or reordered");
    }

    fn assert_headings_intact(doc: &str, chunks: &[&str]) {
        for heading in doc.lines().filter(|l| is_heading_line(l)) {
            let heading = heading.trim();
            let holders = chunks.iter().filter(|c| c.contains(heading)).count();
            assert!(holders >= 1, "heading {heading:?} was split");
            for c in chunks {
                for line in c.lines() {
                    if is_heading_line(line) {
                        assert!(
                            doc.lines().any(|l| l.trim() == line.trim()),
                            "chunk carries a truncated heading: {line:?}"
                        );
                    }
                }
            }
        }
    }

    #[test]
    fn splits_at_headings() {
        let chunks = split_markdown("# H1\npara1\n## H2\npara2", 100);
        assert_eq!(chunks, vec!["# H1\npara1", "## H2\npara2"]);
    }

    #[test]
    fn empty_and_blank_input_yield_nothing() {
        assert!(split_markdown("", 100).is_empty());
        assert!(split_markdown("   ", 100).is_empty());
        assert!(split_markdown("\n\n\t\n", 5).is_empty());
    }

    #[test]
    fn text_without_headings_fits_one_chunk() {
        assert_eq!(split_markdown("  just a paragraph \n", 100), vec!["just a paragraph"]);
    }

    #[test]
    fn preamble_before_first_heading_is_its_own_chunk() {
        let doc = "intro text\n\n# Title\nbody";
        assert_eq!(split_markdown(doc, 100), vec!["intro text", "# Title\nbody"]);
    }

    #[test]
    fn leading_blank_lines_before_heading() {
        let doc = "\n\n# Title\nbody\n\n## Next\nmore\n";
        assert_eq!(split_markdown(doc, 100), vec!["# Title\nbody", "## Next\nmore"]);
    }

    #[test]
    fn hash_without_space_is_not_a_heading() {
        let doc = "#hashtag line\n#not heading either\ntext";
        assert_eq!(split_markdown(doc, 100).len(), 1);
        assert!(!is_heading_line("#tag"));
        assert!(is_heading_line("### Deep"));
    }

    #[test]
    fn heading_free_segment_is_cut_at_raw_offsets() {
        let doc = "a".repeat(25);
        let chunks = split_markdown(&doc, 10);
        assert_eq!(chunks.len(), 3);
        assert_eq!(chunks[0].len(), 10);
        assert_eq!(chunks[1].len(), 10);
        assert_eq!(chunks[2].len(), 5);
        assert_preserves(&doc, &chunks);
    }

    #[test]
    fn oversized_section_is_sliced_then_next_heading_starts_fresh() {
        let body = "x".repeat(30);
        let doc = format!("# A\n{body}\n# B\nshort");
        let chunks = split_markdown(&doc, 12);
        assert!(chunks.len() > 2);
        assert_eq!(*chunks.last().unwrap(), "# B\nshort");
        assert!(chunks[0].starts_with("# A"));
        assert_preserves(&doc, &chunks);
        assert_headings_intact(&doc, &chunks);
    }

    #[test]
    fn long_heading_free_section_with_small_limit() {
        let body = "x".repeat(60_000);
        let doc = format!("# A\n{body}\n# B\nend");
        let chunks = split_markdown(&doc, 7);
        assert_eq!(chunks[0], "# A\nxxx");
        assert_eq!(*chunks.last().unwrap(), "# B\nend");
        assert!(chunks.iter().all(|c| c.chars().count() <= 7));
        assert_preserves(&doc, &chunks);
    }

    #[test]
    fn heading_longer_than_limit_stays_whole() {
        let doc = "## A very long heading line indeed\nbody text";
        let chunks = split_markdown(doc, 5);
        assert_eq!(chunks[0], "## A very long heading line indeed");
        assert_preserves(doc, &chunks);
    }

    #[test]
    fn sizes_are_counted_in_characters() {
        let doc = "日本語のテキストです。".repeat(3);
        let chunks = split_markdown(&doc, 11);
        assert_eq!(chunks.len(), 3);
        for c in &chunks {
            assert!(c.chars().count() <= 11);
        }
        assert_preserves(&doc, &chunks);
    }

    #[test]
    fn zero_limit_is_treated_as_one() {
        let chunks = split_markdown("abc", 0);
        assert_eq!(chunks, vec!["a", "b", "c"]);
    }

    #[test]
    fn consecutive_headings_each_open_a_chunk() {
        let doc = "# One\n## Two\n### Three\ntext";
        assert_eq!(
            split_markdown(doc, 100),
            vec!["# One", "## Two", "### Three\ntext"]
        );
    }

    #[test]
    fn splitting_is_deterministic() {
        let doc = "# A\nalpha beta\n\n## B\ngamma\n\ndelta epsilon zeta\n### C\neta";
        assert_eq!(split_markdown(doc, 7), split_markdown(doc, 7));
    }

    #[test]
    fn mixed_document_preserves_content_for_many_sizes() {
        let doc = "Preface line\n\n# Install\nRun the installer.\nThen reboot.\n\n\
                   ## Linux\n`apt install tool`\n\n## macOS\nUse brew.\n\n\
                   # Configure\nEdit the file and restart the service.\n";
        for size in [1, 3, 8, 17, 40, 500] {
            let chunks = split_markdown(doc, size);
            assert!(!chunks.is_empty());
            assert!(chunks.iter().all(|c| !c.is_empty() && c.trim() == *c));
            assert_preserves(doc, &chunks);
            assert_headings_intact(doc, &chunks);
        }
    }

    #[test]
    fn chunk_markdown_tags_indices_in_order() {
        let chunks = chunk_markdown("# A\na\n# B\nb\n# C\nc", 100);
        let indices: Vec<usize> = chunks.iter().map(|c| c.index).collect();
        assert_eq!(indices, vec![0, 1, 2]);
        assert_eq!(chunks[2].text, "# C\nc");
    }
}
