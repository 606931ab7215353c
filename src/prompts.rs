//! Prompt templates for the two remote transforms: HTML → Markdown and
//! Markdown → target language.
//!
//! Templates are plain text with three named placeholders:
//!
//! | Placeholder | Replaced with |
//! |-------------|---------------|
//! | `{html_content}` | the content being transformed |
//! | `{markdown_content}` | the content being transformed |
//! | `{do_not_translate_words}` | the do-not-translate list, one term per line |
//!
//! Substitution is a single pass over the template: content that happens to
//! contain a placeholder literal is never re-expanded.
//!
//! Templates and the term list are loaded once at startup into a [`PromptSet`]
//! that lives inside [`crate::config::PipelineConfig`].

use once_cell::sync::Lazy;
use regex::{Captures, Regex};
use std::path::Path;
use tracing::{debug, warn};

/// Placeholder for the HTML fragment in the conversion template.
pub const HTML_PLACEHOLDER: &str = "{html_content}";

/// Placeholder for the Markdown chunk in the translation template.
pub const MARKDOWN_PLACEHOLDER: &str = "{markdown_content}";

/// Placeholder for the newline-joined do-not-translate list.
pub const TERMS_PLACEHOLDER: &str = "{do_not_translate_words}";

/// Fallback conversion template, used when no template file is available.
pub const DEFAULT_HTML_TO_MARKDOWN_PROMPT: &str =
    "Convert the following HTML to GitHub Flavored Markdown: {html_content}";

/// Fallback translation template, used when no template file is available.
pub const DEFAULT_TRANSLATION_PROMPT: &str = r#"Translate the following Markdown to Japanese.

Keep the Markdown structure intact: headings, lists, tables, links and code blocks.
Do not translate code, URLs, or any of these terms:
{do_not_translate_words}

Markdown:
{markdown_content}"#;

static RE_PLACEHOLDER: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\{(html_content|markdown_content|do_not_translate_words)\}").unwrap()
});

/// Substitute `content` and `terms` into `template` in a single pass.
pub fn render_prompt(template: &str, content: &str, terms: &str) -> String {
    RE_PLACEHOLDER
        .replace_all(template, |caps: &Captures<'_>| match &caps[1] {
            "do_not_translate_words" => terms.to_string(),
            _ => content.to_string(),
        })
        .into_owned()
}

/// Parse a newline-delimited term list: entries trimmed, blanks dropped.
pub fn parse_term_list(raw: &str) -> Vec<String> {
    raw.lines()
        .map(str::trim)
        .filter(|w| !w.is_empty())
        .map(str::to_string)
        .collect()
}

/// The templates and term list shared by every remote call in a run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PromptSet {
    /// Template for the HTML → Markdown conversion call.
    pub html_to_markdown: String,
    /// Template for each chunk translation call.
    pub translation: String,
    /// Terms the model is told to leave untranslated.
    pub do_not_translate: Vec<String>,
}

impl Default for PromptSet {
    fn default() -> Self {
        Self {
            html_to_markdown: DEFAULT_HTML_TO_MARKDOWN_PROMPT.to_string(),
            translation: DEFAULT_TRANSLATION_PROMPT.to_string(),
            do_not_translate: Vec::new(),
        }
    }
}

impl PromptSet {
    /// Load templates and the term list from disk.
    ///
    /// Missing or unreadable files never abort the run: a warning is logged
    /// and the built-in fallback (or an empty term list) is used instead.
    pub async fn load(
        html_template: Option<&Path>,
        translation_template: Option<&Path>,
        terms: Option<&Path>,
    ) -> Self {
        let defaults = Self::default();

        let html_to_markdown = match html_template {
            Some(p) => read_or_fallback(p, "HTML to Markdown prompt template")
                .await
                .unwrap_or(defaults.html_to_markdown),
            None => defaults.html_to_markdown,
        };

        let translation = match translation_template {
            Some(p) => read_or_fallback(p, "translation prompt template")
                .await
                .unwrap_or(defaults.translation),
            None => defaults.translation,
        };

        let do_not_translate = match terms {
            Some(p) => read_or_fallback(p, "do-not-translate list")
                .await
                .map(|raw| parse_term_list(&raw))
                .unwrap_or_default(),
            None => Vec::new(),
        };

        Self {
            html_to_markdown,
            translation,
            do_not_translate,
        }
    }

    /// The term list as injected into `{do_not_translate_words}`.
    pub fn terms_section(&self) -> String {
        self.do_not_translate.join("\n")
    }
}

async fn read_or_fallback(path: &Path, what: &str) -> Option<String> {
    match tokio::fs::read_to_string(path).await {
        Ok(s) => {
            debug!("Loaded {} from {}", what, path.display());
            Some(s)
        }
        Err(e) => {
            warn!(
                "Error loading {} from {}: {}. Using fallback content.",
                what,
                path.display(),
                e
            );
            None
        }
    }
}
