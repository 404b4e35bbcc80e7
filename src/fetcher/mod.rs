//! Retrieval of the services document from a public Google Doc.
//!
//! Sharing URLs are resolved to the plain-text export endpoint before
//! fetching, so the parser always sees the raw text grammar.


use anyhow::{Context, Result, bail};
use tracing::{debug, info};
use url::Url;

use crate::net::{DEFAULT_RETRY_ATTEMPTS, default_agent, request_with_retry};

/// Blocking HTTP client for Google Doc text exports.
#[derive(Debug, Clone)]
pub struct DocumentFetcher {
    agent: ureq::Agent,
    retry_attempts: u32,
}

impl Default for DocumentFetcher {
    #[inline]
    fn default() -> Self {
        Self::new()
    }
}

impl DocumentFetcher {
    #[inline]
    pub fn new() -> Self {
        Self {
            agent: default_agent(),
            retry_attempts: DEFAULT_RETRY_ATTEMPTS,
        }
    }

    #[inline]
    pub fn with_retry_attempts(mut self, attempts: u32) -> Self {
        self.retry_attempts = attempts;
        self
    }

    /// Fetch the raw text of the document behind a Google Docs sharing URL.
    #[inline]
    pub fn fetch_document(&self, url: &str) -> Result<String> {
        let doc_id = extract_doc_id(url)?;
        let export = export_url(&doc_id);
        info!("Fetching document {} via text export", doc_id);
        self.fetch(&export)
    }

    /// Plain GET of `url`, returning the response body as text.
    #[inline]
    pub fn fetch(&self, url: &str) -> Result<String> {
        debug!("Fetching {}", url);
        request_with_retry(self.retry_attempts, || {
            self.agent
                .get(url)
                .call()
                .and_then(|mut resp| resp.body_mut().read_to_string())
        })
        .with_context(|| format!("Failed to fetch document from {}", url))
    }
}

/// Extract the document id from the supported Google Docs URL forms:
/// `/document/d/<id>/...` and `?id=<id>`.
#[inline]
pub fn extract_doc_id(url: &str) -> Result<String> {
    if !url.contains("docs.google.com") {
        bail!("URL must be a Google Docs URL");
    }

    if let Some(rest) = url.split("/document/d/").nth(1) {
        let id = rest.split('/').next().unwrap_or_default();
        if !id.is_empty() {
            return Ok(id.to_string());
        }
    }

    let parsed = Url::parse(url).with_context(|| format!("Failed to parse URL: {}", url))?;
    if let Some((_, id)) = parsed.query_pairs().find(|(key, _)| key == "id") {
        if !id.is_empty() {
            return Ok(id.into_owned());
        }
    }

    bail!("Unable to extract document ID from URL")
}

/// Plain-text export endpoint for a document id.
#[inline]
pub fn export_url(doc_id: &str) -> String {
    format!("https://docs.google.com/document/d/{}/export?format=txt", doc_id)
}

/// Canonical edit URL for a bare document id.
#[inline]
pub fn doc_url_from_id(doc_id: &str) -> String {
    format!("https://docs.google.com/document/d/{}/edit", doc_id)
}
