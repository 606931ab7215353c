//! Output layout: where each page's Markdown files go, and how they are written.
//!
//! For a URL `https://host/a/b/` and target language `ja`:
//!
//! ```text
//! <output_dir>/original/host/a/b/index.md   converted, pre-translation
//! <output_dir>/ja/host/a/b/index.md         translated
//! ```
//!
//! Files are written atomically (temp file + rename) so an interrupted run
//! never leaves a half-written page behind.

use crate::config::EmptyOutputPolicy;
use crate::error::PageError;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Directory (under the output dir) holding pre-translation Markdown.
pub const ORIGINAL_DIR: &str = "original";

fn sanitise_segment(segment: &str) -> String {
    let s: String = segment
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-') {
                c
            } else {
                '_'
            }
        })
        .collect();
    if s.chars().all(|c| c == '.') {
        "_".repeat(s.len().max(1))
    } else {
        s
    }
}

/// Relative `.md` path for `url`: host, then path segments.
///
/// An empty trailing segment becomes `index`; a query string becomes a
/// `_`-joined suffix on the file name.
pub fn relative_path_for_url(url: &str) -> Result<PathBuf, PageError> {
    let invalid = |detail: &str| PageError::InvalidUrl {
        url: url.to_string(),
        detail: detail.to_string(),
    };

    let parsed = url::Url::parse(url).map_err(|e| invalid(&e.to_string()))?;
    let host = parsed.host_str().ok_or_else(|| invalid("URL has no host"))?;

    let mut path = PathBuf::from(match parsed.port() {
        Some(port) => sanitise_segment(&format!("{host}_{port}")),
        None => sanitise_segment(host),
    });

    let segments: Vec<&str> = parsed
        .path_segments()
        .map(|s| s.collect())
        .unwrap_or_default();
    let (last, dirs) = match segments.split_last() {
        Some((last, dirs)) if !last.is_empty() => (sanitise_segment(last), dirs),
        Some((_, dirs)) => ("index".to_string(), dirs),
        None => ("index".to_string(), &[][..]),
    };
    for dir in dirs.iter().filter(|d| !d.is_empty()) {
        path.push(sanitise_segment(dir));
    }

    let suffix = match parsed.query() {
        Some(q) if !q.is_empty() => {
            let parts: Vec<String> = q
                .split(['&', '='])
                .filter(|p| !p.is_empty())
                .map(sanitise_segment)
                .collect();
            format!("_{}", parts.join("_"))
        }
        _ => String::new(),
    };

    path.push(format!("{last}{suffix}.md"));
    Ok(path)
}

/// Output directory layout plus the empty-output policy.
#[derive(Debug, Clone)]
pub struct OutputLayout {
    output_dir: PathBuf,
    target_lang: String,
    empty_output: EmptyOutputPolicy,
}

impl OutputLayout {
    pub fn new(
        output_dir: impl Into<PathBuf>,
        target_lang: impl Into<String>,
        empty_output: EmptyOutputPolicy,
    ) -> Self {
        Self {
            output_dir: output_dir.into(),
            target_lang: target_lang.into(),
            empty_output,
        }
    }

    pub fn original_path(&self, relative: &Path) -> PathBuf {
        self.output_dir.join(ORIGINAL_DIR).join(relative)
    }

    pub fn translated_path(&self, relative: &Path) -> PathBuf {
        self.output_dir.join(&self.target_lang).join(relative)
    }

    /// Write `content` to `path`, creating parent directories.
    ///
    /// Returns `Ok(None)` when the content is blank and the policy is
    /// [`EmptyOutputPolicy::Skip`].
    pub async fn write(&self, path: &Path, content: &str) -> Result<Option<PathBuf>, PageError> {
        if content.trim().is_empty() {
            warn!(path = %path.display(), "Output is empty");
            if self.empty_output == EmptyOutputPolicy::Skip {
                return Ok(None);
            }
        }

        let failed = |e: std::io::Error| PageError::WriteFailed {
            path: path.to_path_buf(),
            detail: e.to_string(),
        };

        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await.map_err(failed)?;
        }

        let tmp_path = path.with_extension("md.tmp");
        tokio::fs::write(&tmp_path, content).await.map_err(failed)?;
        tokio::fs::rename(&tmp_path, path).await.map_err(failed)?;

        debug!(path = %path.display(), bytes = content.len(), "Markdown written");
        Ok(Some(path.to_path_buf()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rel(url: &str) -> String {
        relative_path_for_url(url)
            .unwrap()
            .to_string_lossy()
            .replace('\\', "/")
    }

    #[test]
    fn trailing_slash_becomes_index() {
        assert_eq!(
            rel("https://developer.hashicorp.com/vault/docs/"),
            "developer.hashicorp.com/vault/docs/index.md"
        );
        assert_eq!(rel("https://example.com"), "example.com/index.md");
    }

    #[test]
    fn last_segment_names_the_file() {
        assert_eq!(
            rel("https://example.com/vault/docs/what-is-vault"),
            "example.com/vault/docs/what-is-vault.md"
        );
    }

    #[test]
    fn query_becomes_suffix() {
        assert_eq!(
            rel("https://example.com/search?q=seal&page=2"),
            "example.com/search_q_seal_page_2.md"
        );
    }

    #[test]
    fn unsafe_characters_are_replaced() {
        assert_eq!(rel("https://example.com/a%20b/c@d"), "example.com/a_20b/c_d.md");
        assert_eq!(rel("http://localhost:8080/x"), "localhost_8080/x.md");
    }

    #[test]
    fn url_without_host_is_rejected() {
        assert!(matches!(
            relative_path_for_url("mailto:someone@example.com"),
            Err(PageError::InvalidUrl { .. })
        ));
        assert!(relative_path_for_url("not a url").is_err());
    }

    #[test]
    fn layout_paths() {
        let layout = OutputLayout::new("out", "ja", EmptyOutputPolicy::Skip);
        let r = Path::new("example.com/index.md");
        assert_eq!(layout.original_path(r), Path::new("out/original/example.com/index.md"));
        assert_eq!(layout.translated_path(r), Path::new("out/ja/example.com/index.md"));
    }

    #[tokio::test]
    async fn write_creates_parents_and_leaves_no_temp_file() {
        let dir = tempfile::tempdir().unwrap();
        let layout = OutputLayout::new(dir.path(), "ja", EmptyOutputPolicy::Skip);
        let path = layout.translated_path(Path::new("example.com/a/b.md"));
        let written = layout.write(&path, "# 見出し\n").await.unwrap();
        assert_eq!(written.as_deref(), Some(path.as_path()));
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "# 見出し\n");
        assert!(!path.with_extension("md.tmp").exists());
    }

    #[tokio::test]
    async fn empty_output_policy() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("e.md");

        let skip = OutputLayout::new(dir.path(), "ja", EmptyOutputPolicy::Skip);
        assert_eq!(skip.write(&path, "  \n").await.unwrap(), None);
        assert!(!path.exists());

        let write = OutputLayout::new(dir.path(), "ja", EmptyOutputPolicy::WriteEmpty);
        assert!(write.write(&path, "").await.unwrap().is_some());
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "");
    }

    #[tokio::test]
    async fn write_failure_is_a_page_error() {
        let dir = tempfile::tempdir().unwrap();
        let blocker = dir.path().join("file");
        std::fs::write(&blocker, "x").unwrap();
        let layout = OutputLayout::new(dir.path(), "ja", EmptyOutputPolicy::Skip);
        let err = layout.write(&blocker.join("child.md"), "text").await.unwrap_err();
        assert!(matches!(err, PageError::WriteFailed { .. }));
    }
}
