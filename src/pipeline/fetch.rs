//! Page fetching: URL list parsing and main-content extraction.
//!
//! [`HttpPageSource`] downloads a page and returns the inner HTML of the
//! element whose `id` matches the configured content id (`main` by
//! default). Pages are fetched as static HTML; anything the site renders
//! client-side after load is not seen.

use crate::error::{PageError, PipelineError};
use async_trait::async_trait;
use html5ever::parse_document;
use html5ever::serialize::{serialize, SerializeOpts, TraversalScope};
use html5ever::tendril::TendrilSink;
use markup5ever_rcdom::{Handle, NodeData, RcDom, SerializableHandle};
use std::path::Path;
use std::time::Duration;
use tracing::{debug, info};

/// A source of main-content HTML fragments, one per URL.
#[async_trait]
pub trait PageSource: Send + Sync {
    /// Fetch `url` and return the inner HTML of its main-content element.
    async fn fetch_main(&self, url: &str) -> Result<String, PageError>;
}

/// Parse a newline-delimited URL list: lines trimmed, blank lines dropped.
pub fn parse_url_list(raw: &str) -> Vec<String> {
    raw.lines()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .map(str::to_string)
        .collect()
}

/// Read and parse the URL list at `path`.
pub async fn read_url_list(path: &Path) -> Result<Vec<String>, PipelineError> {
    let raw = tokio::fs::read_to_string(path)
        .await
        .map_err(|source| PipelineError::UrlListUnreadable {
            path: path.to_path_buf(),
            source,
        })?;
    let urls = parse_url_list(&raw);
    info!("Found {} URLs to process in {}", urls.len(), path.display());
    Ok(urls)
}

/// Return the serialised children of the first element with `id="<id>"`.
///
/// `None` when no such element exists. Parsing is lenient, as in a browser:
/// malformed markup never fails.
pub fn extract_element_html(html: &str, id: &str) -> Option<String> {
    let dom = parse_document(RcDom::default(), Default::default()).one(html);
    let node = find_by_id(&dom.document, id)?;

    let mut buffer = Vec::new();
    let opts = SerializeOpts {
        traversal_scope: TraversalScope::ChildrenOnly(None),
        ..Default::default()
    };
    serialize(&mut buffer, &SerializableHandle::from(node), opts).ok()?;
    String::from_utf8(buffer).ok()
}

/// Depth-first, document-order search for an element carrying `id`.
fn find_by_id(root: &Handle, id: &str) -> Option<Handle> {
    let mut stack = vec![root.clone()];
    while let Some(node) = stack.pop() {
        if let NodeData::Element { ref attrs, .. } = node.data {
            let matches = attrs
                .borrow()
                .iter()
                .any(|a| &*a.name.local == "id" && &*a.value == id);
            if matches {
                return Some(node);
            }
        }
        // Reverse so the first child is popped first.
        for child in node.children.borrow().iter().rev() {
            stack.push(child.clone());
        }
    }
    None
}

/// Fetches pages over HTTP with a per-request timeout.
#[derive(Debug, Clone)]
pub struct HttpPageSource {
    client: reqwest::Client,
    content_id: String,
    timeout: Duration,
}

impl HttpPageSource {
    pub fn new(client: reqwest::Client, content_id: impl Into<String>, timeout_ms: u64) -> Self {
        Self {
            client,
            content_id: content_id.into(),
            timeout: Duration::from_millis(timeout_ms),
        }
    }

    fn timeout_ms(&self) -> u64 {
        self.timeout.as_millis() as u64
    }

    fn map_transport_error(&self, url: &str, e: reqwest::Error) -> PageError {
        if e.is_timeout() {
            PageError::NavigationTimeout {
                url: url.to_string(),
                timeout_ms: self.timeout_ms(),
            }
        } else {
            PageError::FetchFailed {
                url: url.to_string(),
                detail: e.to_string(),
            }
        }
    }
}

#[async_trait]
impl PageSource for HttpPageSource {
    async fn fetch_main(&self, url: &str) -> Result<String, PageError> {
        let parsed = url::Url::parse(url).map_err(|e| PageError::InvalidUrl {
            url: url.to_string(),
            detail: e.to_string(),
        })?;

        debug!(url, timeout_ms = self.timeout_ms(), "Fetching page");
        let response = self
            .client
            .get(parsed)
            .timeout(self.timeout)
            .send()
            .await
            .map_err(|e| self.map_transport_error(url, e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(PageError::FetchFailed {
                url: url.to_string(),
                detail: format!("HTTP {status}"),
            });
        }

        let body = response
            .text()
            .await
            .map_err(|e| self.map_transport_error(url, e))?;
        debug!(url, body_len = body.len(), "Page downloaded");

        extract_element_html(&body, &self.content_id).ok_or_else(|| PageError::ContentNotFound {
            url: url.to_string(),
            content_id: self.content_id.clone(),
        })
    }
}
