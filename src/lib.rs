//! # docmd-translate
//!
//! Scrape documentation pages, convert their main content to Markdown with a
//! chat-completion model, and translate that Markdown chunk by chunk.
//!
//! ## Pipeline Overview
//!
//! ```text
//! URL list
//!  │
//!  ├─ 1. Fetch      GET each page, extract the inner HTML of #main
//!  ├─ 2. Convert    HTML → Markdown (one remote call)
//!  ├─ 3. Write      <out>/original/<host>/<path>.md
//!  ├─ 4. Chunk      split at heading lines, bounded by max_chunk_size
//!  ├─ 5. Translate  one remote call per chunk, strictly in order
//!  └─ 6. Write      <out>/<lang>/<host>/<path>.md
//! ```
//!
//! A remote call that fails (no API key, timeout, HTTP error, malformed
//! response) never loses content: the untransformed input passes through,
//! optionally prefixed with a note, and processing continues.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use docmd_translate::{convert_all, PipelineConfig, PromptSet};
//! use std::path::Path;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let prompts = PromptSet::load(
//!         Some(Path::new("prompts/html_to_english_markdown.txt")),
//!         Some(Path::new("prompts/english_markdown_to_japanese.txt")),
//!         Some(Path::new("dictionaries/do_not_translate.txt")),
//!     )
//!     .await;
//!     let config = PipelineConfig::builder()
//!         .api_key(std::env::var("OPENROUTER_API_KEY").unwrap_or_default())
//!         .prompts(prompts)
//!         .build()?;
//!     let urls = vec!["https://developer.hashicorp.com/vault/docs/what-is-vault".to_string()];
//!     let summary = convert_all(&urls, &config).await?;
//!     eprintln!("{} written, {} skipped", summary.pages.len(), summary.skipped.len());
//!     Ok(())
//! }
//! ```
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli`   | on      | Enables the `docmd` binary (clap + anyhow + indicatif + tracing-subscriber) |
//!
//! Disable `cli` when using only the library:
//! ```toml
//! docmd-translate = { version = "0.1", default-features = false }
//! ```

// ── Modules ──────────────────────────────────────────────────────────────

pub mod config;
pub mod convert;
pub mod error;
pub mod output;
pub mod pipeline;
pub mod progress;
pub mod prompts;
pub mod stream;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use config::{EmptyOutputPolicy, PipelineConfig, PipelineConfigBuilder};
pub use convert::{convert_all, convert_all_sync, Pipeline};
pub use error::{PageError, PipelineError, TransformError};
pub use output::{ChunkReport, PageReport, RunSummary, TransformOutcome, TranslationOutput};
pub use pipeline::chunk::{chunk_markdown, split_markdown, Chunk};
pub use pipeline::fetch::{read_url_list, HttpPageSource, PageSource};
pub use pipeline::transform::{ChatBackend, OpenRouterBackend, RemoteTransform};
pub use pipeline::translate::translate_document;
pub use progress::{ConversionProgressCallback, NoopProgressCallback, ProgressCallback};
pub use prompts::PromptSet;
pub use stream::{convert_stream, PageStream};
