//! Eager (whole-run) entry points.
//!
//! [`Pipeline`] resolves a [`PipelineConfig`] into the live pieces of a run
//! (HTTP client, chat backend, page source, output layout) once, then
//! processes URLs strictly one after another. Use
//! [`crate::stream::convert_stream`] instead to receive page results as they
//! complete.

use crate::config::PipelineConfig;
use crate::error::{PageError, PipelineError};
use crate::output::{PageReport, RunSummary, TranslationOutput};
use crate::pipeline::fetch::{HttpPageSource, PageSource};
use crate::pipeline::transform::{ChatBackend, OpenRouterBackend, RemoteTransform};
use crate::pipeline::translate::translate_document;
use crate::pipeline::write::{relative_path_for_url, OutputLayout};
use crate::progress::ProgressCallback;
use crate::prompts::PromptSet;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

/// Label for the HTML → Markdown call, in logs and passthrough notes.
pub const CONVERSION_LABEL: &str = "HTML to Markdown conversion";

/// A resolved, ready-to-run pipeline.
pub struct Pipeline {
    transform: RemoteTransform,
    source: Arc<dyn PageSource>,
    layout: OutputLayout,
    prompts: PromptSet,
    max_chunk_size: usize,
    progress: Option<ProgressCallback>,
}

impl std::fmt::Debug for Pipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Pipeline")
            .field("transform", &self.transform)
            .field("layout", &self.layout)
            .field("max_chunk_size", &self.max_chunk_size)
            .finish_non_exhaustive()
    }
}

impl Pipeline {
    /// Resolve `config` into a runnable pipeline.
    ///
    /// Backend priority: `config.backend`, then an [`OpenRouterBackend`] when
    /// an API key is set, else none (every remote call passes through).
    pub fn new(config: &PipelineConfig) -> Result<Self, PipelineError> {
        let client = reqwest::Client::builder()
            .user_agent(config.user_agent.as_str())
            .build()
            .map_err(|e| PipelineError::HttpClient(e.to_string()))?;

        let backend: Option<Arc<dyn ChatBackend>> = match (&config.backend, &config.api_key) {
            (Some(backend), _) => Some(Arc::clone(backend)),
            (None, Some(key)) => Some(Arc::new(OpenRouterBackend::new(
                client.clone(),
                config.endpoint.clone(),
                key.clone(),
                config.model.clone(),
                Duration::from_secs(config.api_timeout_secs),
            ))),
            (None, None) => {
                warn!("No API key configured: remote conversion and translation will pass content through unchanged");
                None
            }
        };

        let source: Arc<dyn PageSource> = match &config.page_source {
            Some(source) => Arc::clone(source),
            None => Arc::new(HttpPageSource::new(
                client,
                config.content_id.clone(),
                config.fetch_timeout_ms,
            )),
        };

        let transform = RemoteTransform::new(backend, config.prompts.terms_section())
            .long_content_warning(config.long_content_warning)
            .annotate_degraded(config.annotate_degraded)
            .clean_output(config.clean_output);

        debug!(?config, "Pipeline resolved");

        Ok(Self {
            transform,
            source,
            layout: OutputLayout::new(
                config.output_dir.clone(),
                config.target_lang.clone(),
                config.empty_output,
            ),
            prompts: config.prompts.clone(),
            max_chunk_size: config.max_chunk_size,
            progress: config.progress_callback.clone(),
        })
    }

    /// Translate a Markdown document chunk by chunk with the configured template.
    pub async fn translate_markdown(&self, document: &str) -> TranslationOutput {
        translate_document(
            document,
            &self.transform,
            &self.prompts.translation,
            self.max_chunk_size,
            self.progress.as_ref(),
        )
        .await
    }

    /// Fetch, convert, translate and write one page.
    ///
    /// Remote-call failures never surface here: they degrade to passthrough
    /// and are recorded in the report. `Err` means the page was skipped.
    pub async fn convert_page(&self, url: &str) -> Result<PageReport, PageError> {
        let start = Instant::now();
        let relative = relative_path_for_url(url)?;

        // ── Step 1: Fetch main content ───────────────────────────────────
        let html = self.source.fetch_main(url).await?;
        debug!(url, html_len = html.len(), "Main content extracted");

        // ── Step 2: HTML → Markdown ──────────────────────────────────────
        let conversion = self
            .transform
            .transform(&self.prompts.html_to_markdown, &html, CONVERSION_LABEL)
            .await;
        let markdown = conversion.text();
        if markdown.trim().is_empty() {
            warn!(url, "Converted Markdown is empty");
        }

        let original_path = self
            .layout
            .write(&self.layout.original_path(&relative), &markdown)
            .await?;
        if let Some(p) = &original_path {
            info!("Original Markdown content saved to {}", p.display());
        }

        // ── Step 3: Chunked translation ──────────────────────────────────
        let translation = self.translate_markdown(&markdown).await;
        if translation.markdown.trim().is_empty() {
            warn!(url, "Translated Markdown is empty");
        }

        let translated_path = self
            .layout
            .write(&self.layout.translated_path(&relative), &translation.markdown)
            .await?;
        if let Some(p) = &translated_path {
            info!("Translated Markdown content saved to {}", p.display());
        }

        Ok(PageReport {
            url: url.to_string(),
            original_path,
            translated_path,
            conversion_degraded: conversion.reason().cloned(),
            chunk_count: translation.chunks.len(),
            degraded_chunks: translation.degraded_chunks(),
            duration_ms: start.elapsed().as_millis() as u64,
        })
    }

    /// Process every URL in order. Skipped pages are logged and recorded; the
    /// run always reaches the end of the list.
    pub async fn run(&self, urls: &[String]) -> RunSummary {
        let start = Instant::now();
        let total = urls.len();
        info!("Starting run over {} URL(s)", total);

        if let Some(cb) = &self.progress {
            cb.on_run_start(total);
        }

        let mut summary = RunSummary {
            total_urls: total,
            ..Default::default()
        };

        for (i, url) in urls.iter().enumerate() {
            let page_num = i + 1;
            info!("Processing URL ({}/{}): {}", page_num, total, url);
            if let Some(cb) = &self.progress {
                cb.on_page_start(page_num, total, url);
            }

            match self.convert_page(url).await {
                Ok(report) => {
                    if let Some(cb) = &self.progress {
                        cb.on_page_complete(page_num, total, &report);
                    }
                    summary.pages.push(report);
                }
                Err(e) => {
                    warn!(url = %url, error = %e, "Skipping page");
                    if let Some(cb) = &self.progress {
                        cb.on_page_skipped(page_num, total, &e);
                    }
                    summary.skipped.push(e);
                }
            }
        }

        summary.duration_ms = start.elapsed().as_millis() as u64;
        if let Some(cb) = &self.progress {
            cb.on_run_complete(total, summary.pages.len());
        }
        info!(
            pages = summary.pages.len(),
            skipped = summary.skipped.len(),
            degraded_chunks = summary.degraded_chunks(),
            duration_ms = summary.duration_ms,
            "Finished processing all URLs."
        );
        summary
    }
}

/// Run the whole pipeline over `urls`.
///
/// # Errors
/// Returns `Err(PipelineError)` only when the pipeline cannot be built.
/// Per-page problems are reported in [`RunSummary::skipped`].
pub async fn convert_all(
    urls: &[String],
    config: &PipelineConfig,
) -> Result<RunSummary, PipelineError> {
    let pipeline = Pipeline::new(config)?;
    Ok(pipeline.run(urls).await)
}

/// Synchronous wrapper around [`convert_all`].
///
/// Creates a temporary tokio runtime internally.
pub fn convert_all_sync(
    urls: &[String],
    config: &PipelineConfig,
) -> Result<RunSummary, PipelineError> {
    tokio::runtime::Runtime::new()
        .map_err(|e| PipelineError::Internal(format!("Failed to create tokio runtime: {}", e)))?
        .block_on(convert_all(urls, config))
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;

    struct StaticSource;

    #[async_trait]
    impl PageSource for StaticSource {
        async fn fetch_main(&self, url: &str) -> Result<String, PageError> {
            if url.contains("missing") {
                return Err(PageError::ContentNotFound {
                    url: url.to_string(),
                    content_id: "main".into(),
                });
            }
            Ok("<h1>Title</h1>".to_string())
        }
    }

    #[test]
    fn new_without_key_has_no_backend() {
        let config = PipelineConfig::builder().build().unwrap();
        let p = Pipeline::new(&config).unwrap();
        assert!(!p.transform.has_backend());
    }

    #[test]
    fn new_with_key_builds_backend() {
        let config = PipelineConfig::builder().api_key("k").build().unwrap();
        let p = Pipeline::new(&config).unwrap();
        assert!(p.transform.has_backend());
    }

    #[test]
    fn sync_run_without_key_writes_passthrough_files() {
        let dir = tempfile::tempdir().unwrap();
        let config = PipelineConfig::builder()
            .output_dir(dir.path())
            .page_source(Arc::new(StaticSource))
            .annotate_degraded(false)
            .build()
            .unwrap();
        let urls = vec![
            "https://example.com/docs/".to_string(),
            "https://example.com/missing".to_string(),
        ];

        let summary = convert_all_sync(&urls, &config).unwrap();
        assert_eq!(summary.total_urls, 2);
        assert_eq!(summary.pages.len(), 1);
        assert_eq!(summary.skipped.len(), 1);

        let original = dir.path().join("original/example.com/docs/index.md");
        let translated = dir.path().join("ja/example.com/docs/index.md");
        assert_eq!(std::fs::read_to_string(original).unwrap(), "<h1>Title</h1>");
        assert_eq!(std::fs::read_to_string(translated).unwrap(), "<h1>Title</h1>");
    }

    #[tokio::test]
    async fn invalid_url_is_skipped_before_fetch() {
        let dir = tempfile::tempdir().unwrap();
        let config = PipelineConfig::builder()
            .output_dir(dir.path())
            .page_source(Arc::new(StaticSource))
            .build()
            .unwrap();
        let p = Pipeline::new(&config).unwrap();
        let err = p.convert_page("::not-a-url").await.unwrap_err();
        assert!(matches!(err, PageError::InvalidUrl { .. }));
    }
}
