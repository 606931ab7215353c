//! Streaming API: emit page results as each URL finishes.
//!
//! Pages still run one at a time, so items arrive in input order. Each item
//! is `Ok(PageReport)` for a written page or `Err(PageError)` for a skipped
//! one; the stream never ends early.

use crate::config::PipelineConfig;
use crate::convert::Pipeline;
use crate::error::{PageError, PipelineError};
use crate::output::PageReport;
use futures::stream::{self, StreamExt};
use std::pin::Pin;
use std::sync::Arc;
use tokio_stream::Stream;
use tracing::{info, warn};

/// A boxed stream of page results.
pub type PageStream = Pin<Box<dyn Stream<Item = Result<PageReport, PageError>> + Send>>;

/// Process `urls` sequentially, yielding one result per URL.
///
/// # Returns
/// - `Ok(PageStream)` — one `Result<PageReport, PageError>` per URL, in order
/// - `Err(PipelineError)` — the pipeline could not be built
pub fn convert_stream(
    urls: Vec<String>,
    config: &PipelineConfig,
) -> Result<PageStream, PipelineError> {
    let pipeline = Arc::new(Pipeline::new(config)?);
    let progress = config.progress_callback.clone();
    let total = urls.len();
    info!("Starting streaming run over {} URL(s)", total);

    if let Some(cb) = &progress {
        cb.on_run_start(total);
    }

    let s = stream::iter(urls.into_iter().enumerate()).then(move |(i, url)| {
        let pipeline = Arc::clone(&pipeline);
        let progress = progress.clone();
        async move {
            let page_num = i + 1;
            if let Some(cb) = &progress {
                cb.on_page_start(page_num, total, &url);
            }
            let result = pipeline.convert_page(&url).await;
            match &result {
                Ok(report) => {
                    if let Some(cb) = &progress {
                        cb.on_page_complete(page_num, total, report);
                    }
                }
                Err(e) => {
                    warn!(url = %url, error = %e, "Skipping page");
                    if let Some(cb) = &progress {
                        cb.on_page_skipped(page_num, total, e);
                    }
                }
            }
            result
        }
    });

    Ok(Box::pin(s))
}
