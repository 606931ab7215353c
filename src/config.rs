//! Configuration types for the scrape → convert → translate pipeline.
//!
//! All behaviour is controlled through [`PipelineConfig`], built via its
//! [`PipelineConfigBuilder`]. Templates and the term list are loaded once
//! (see [`crate::prompts::PromptSet::load`]) and shared read-only for the
//! whole run.

use crate::error::PipelineError;
use crate::pipeline::fetch::PageSource;
use crate::pipeline::transform::{ChatBackend, OPENROUTER_ENDPOINT};
use crate::progress::ProgressCallback;
use crate::prompts::PromptSet;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

/// Default model id when none is configured.
pub const DEFAULT_MODEL: &str = "openai/gpt-3.5-turbo";

/// Configuration for a pipeline run.
///
/// # Example
/// ```rust
/// use docmd_translate::PipelineConfig;
///
/// let config = PipelineConfig::builder()
///     .api_key("sk-or-...")
///     .max_chunk_size(4000)
///     .target_lang("ja")
///     .build()
///     .unwrap();
/// ```
#[derive(Clone)]
pub struct PipelineConfig {
    /// Credential for the chat-completion service. `None` means every remote
    /// call degrades to passthrough without touching the network.
    pub api_key: Option<String>,

    /// Model id sent with every request. Default: `openai/gpt-3.5-turbo`.
    pub model: String,

    /// Chat-completions endpoint. Default: OpenRouter.
    pub endpoint: String,

    /// Pre-constructed backend. Takes precedence over `api_key`/`endpoint`.
    pub backend: Option<Arc<dyn ChatBackend>>,

    /// Pre-constructed page source. Default: HTTP fetch with `content_id`.
    pub page_source: Option<Arc<dyn PageSource>>,

    /// Prompt templates and the do-not-translate list.
    pub prompts: PromptSet,

    /// Maximum translation chunk size in characters. Default: 5000.
    pub max_chunk_size: usize,

    /// Per-request timeout for remote calls in seconds. Default: 180.
    ///
    /// Long chunks on slow models routinely take over a minute; a short
    /// timeout degrades chunks that would have succeeded.
    pub api_timeout_secs: u64,

    /// Page fetch timeout in milliseconds. Default: 3000.
    pub fetch_timeout_ms: u64,

    /// Content length (chars) above which a remote call logs a warning. Default: 20000.
    pub long_content_warning: usize,

    /// `id` of the main-content element. Default: `main`.
    pub content_id: String,

    /// Target language code; also the translated output subdirectory. Default: `ja`.
    pub target_lang: String,

    /// Root output directory. Default: `markdown_output`.
    pub output_dir: PathBuf,

    /// What to do with blank results. Default: [`EmptyOutputPolicy::Skip`].
    pub empty_output: EmptyOutputPolicy,

    /// Prefix passthrough content with an explanatory note. Default: true.
    pub annotate_degraded: bool,

    /// Clean up successful responses (fences, line endings…). Default: true.
    pub clean_output: bool,

    /// User-Agent for page fetches and API calls.
    pub user_agent: String,

    /// Optional progress events.
    pub progress_callback: Option<ProgressCallback>,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            model: DEFAULT_MODEL.to_string(),
            endpoint: OPENROUTER_ENDPOINT.to_string(),
            backend: None,
            page_source: None,
            prompts: PromptSet::default(),
            max_chunk_size: 5000,
            api_timeout_secs: 180,
            fetch_timeout_ms: 3000,
            long_content_warning: 20_000,
            content_id: "main".to_string(),
            target_lang: "ja".to_string(),
            output_dir: PathBuf::from("markdown_output"),
            empty_output: EmptyOutputPolicy::default(),
            annotate_degraded: true,
            clean_output: true,
            user_agent: concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")).to_string(),
            progress_callback: None,
        }
    }
}

impl fmt::Debug for PipelineConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PipelineConfig")
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .field("model", &self.model)
            .field("endpoint", &self.endpoint)
            .field("backend", &self.backend.as_ref().map(|b| b.name().to_string()))
            .field("page_source", &self.page_source.as_ref().map(|_| "<dyn PageSource>"))
            .field("do_not_translate", &self.prompts.do_not_translate.len())
            .field("max_chunk_size", &self.max_chunk_size)
            .field("api_timeout_secs", &self.api_timeout_secs)
            .field("fetch_timeout_ms", &self.fetch_timeout_ms)
            .field("content_id", &self.content_id)
            .field("target_lang", &self.target_lang)
            .field("output_dir", &self.output_dir)
            .field("empty_output", &self.empty_output)
            .field("annotate_degraded", &self.annotate_degraded)
            .field("clean_output", &self.clean_output)
            .finish()
    }
}

impl PipelineConfig {
    /// Create a new builder for `PipelineConfig`.
    pub fn builder() -> PipelineConfigBuilder {
        PipelineConfigBuilder {
            config: Self::default(),
        }
    }
}

/// Builder for [`PipelineConfig`].
#[derive(Debug)]
pub struct PipelineConfigBuilder {
    config: PipelineConfig,
}

impl PipelineConfigBuilder {
    pub fn api_key(mut self, key: impl Into<String>) -> Self {
        let key = key.into();
        // An empty key is the same as no key.
        self.config.api_key = (!key.trim().is_empty()).then_some(key);
        self
    }

    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.config.model = model.into();
        self
    }

    pub fn endpoint(mut self, url: impl Into<String>) -> Self {
        self.config.endpoint = url.into();
        self
    }

    pub fn backend(mut self, backend: Arc<dyn ChatBackend>) -> Self {
        self.config.backend = Some(backend);
        self
    }

    pub fn page_source(mut self, source: Arc<dyn PageSource>) -> Self {
        self.config.page_source = Some(source);
        self
    }

    pub fn prompts(mut self, prompts: PromptSet) -> Self {
        self.config.prompts = prompts;
        self
    }

    pub fn max_chunk_size(mut self, chars: usize) -> Self {
        self.config.max_chunk_size = chars;
        self
    }

    pub fn api_timeout_secs(mut self, secs: u64) -> Self {
        self.config.api_timeout_secs = secs;
        self
    }

    pub fn fetch_timeout_ms(mut self, ms: u64) -> Self {
        self.config.fetch_timeout_ms = ms;
        self
    }

    pub fn long_content_warning(mut self, chars: usize) -> Self {
        self.config.long_content_warning = chars;
        self
    }

    pub fn content_id(mut self, id: impl Into<String>) -> Self {
        self.config.content_id = id.into();
        self
    }

    pub fn target_lang(mut self, lang: impl Into<String>) -> Self {
        self.config.target_lang = lang.into();
        self
    }

    pub fn output_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.config.output_dir = dir.into();
        self
    }

    pub fn empty_output(mut self, policy: EmptyOutputPolicy) -> Self {
        self.config.empty_output = policy;
        self
    }

    pub fn annotate_degraded(mut self, v: bool) -> Self {
        self.config.annotate_degraded = v;
        self
    }

    pub fn clean_output(mut self, v: bool) -> Self {
        self.config.clean_output = v;
        self
    }

    pub fn user_agent(mut self, ua: impl Into<String>) -> Self {
        self.config.user_agent = ua.into();
        self
    }

    pub fn progress_callback(mut self, cb: ProgressCallback) -> Self {
        self.config.progress_callback = Some(cb);
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<PipelineConfig, PipelineError> {
        let c = &self.config;
        if c.max_chunk_size == 0 {
            return Err(PipelineError::InvalidConfig(
                "max_chunk_size must be ≥ 1".into(),
            ));
        }
        if c.api_timeout_secs == 0 {
            return Err(PipelineError::InvalidConfig(
                "api_timeout_secs must be ≥ 1".into(),
            ));
        }
        if c.content_id.trim().is_empty() {
            return Err(PipelineError::InvalidConfig(
                "content_id must not be empty".into(),
            ));
        }
        let lang = c.target_lang.trim();
        if lang.is_empty() || lang == crate::pipeline::write::ORIGINAL_DIR || lang.contains(['/', '\\']) {
            return Err(PipelineError::InvalidConfig(format!(
                "target_lang must be a plain directory name, got '{}'",
                c.target_lang
            )));
        }
        if c.backend.is_none() && c.api_key.is_some() {
            url::Url::parse(&c.endpoint).map_err(|e| {
                PipelineError::InvalidConfig(format!("endpoint '{}' is not a URL: {e}", c.endpoint))
            })?;
        }
        Ok(self.config)
    }
}

/// What to do with a blank conversion or translation result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum EmptyOutputPolicy {
    /// Log a warning and write no file. (default)
    #[default]
    Skip,
    /// Log a warning and write the empty file anyway.
    WriteEmpty,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let c = PipelineConfig::builder().build().unwrap();
        assert_eq!(c.model, DEFAULT_MODEL);
        assert_eq!(c.endpoint, OPENROUTER_ENDPOINT);
        assert_eq!(c.max_chunk_size, 5000);
        assert_eq!(c.api_timeout_secs, 180);
        assert_eq!(c.fetch_timeout_ms, 3000);
        assert_eq!(c.long_content_warning, 20_000);
        assert_eq!(c.content_id, "main");
        assert_eq!(c.target_lang, "ja");
        assert_eq!(c.output_dir, PathBuf::from("markdown_output"));
        assert_eq!(c.empty_output, EmptyOutputPolicy::Skip);
        assert!(c.api_key.is_none());
        assert!(c.annotate_degraded);
    }

    #[test]
    fn blank_api_key_is_none() {
        let c = PipelineConfig::builder().api_key("  ").build().unwrap();
        assert!(c.api_key.is_none());
    }

    #[test]
    fn zero_chunk_size_rejected() {
        let err = PipelineConfig::builder().max_chunk_size(0).build().unwrap_err();
        assert!(matches!(err, PipelineError::InvalidConfig(_)));
    }

    #[test]
    fn zero_timeout_rejected() {
        assert!(PipelineConfig::builder().api_timeout_secs(0).build().is_err());
    }

    #[test]
    fn empty_content_id_rejected() {
        assert!(PipelineConfig::builder().content_id("").build().is_err());
    }

    #[test]
    fn target_lang_must_be_a_plain_name() {
        for bad in ["", "original", "../ja", "a/b"] {
            assert!(
                PipelineConfig::builder().target_lang(bad).build().is_err(),
                "accepted {bad:?}"
            );
        }
        assert!(PipelineConfig::builder().target_lang("fr").build().is_ok());
    }

    #[test]
    fn bad_endpoint_rejected_only_when_used() {
        assert!(PipelineConfig::builder()
            .api_key("k")
            .endpoint("nope")
            .build()
            .is_err());
        assert!(PipelineConfig::builder().endpoint("nope").build().is_ok());
    }

    #[test]
    fn debug_redacts_api_key() {
        let c = PipelineConfig::builder().api_key("sk-secret").build().unwrap();
        let dbg = format!("{c:?}");
        assert!(!dbg.contains("sk-secret"));
        assert!(dbg.contains("<redacted>"));
    }
}
