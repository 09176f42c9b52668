//! Plugin dispatcher and the `Extractor` contract.
//!
//! The dispatcher owns an ordered registry of extractors. The first one
//! whose `handled_domains`/`handled_patterns` matches a URL wins and is
//! asked to resolve it into one or more concrete download descriptors.
//! Concrete site extractors are out of scope here; the generic HTTP
//! extractor is the only implementation shipped, acting as a passthrough
//! for any plain `http(s)://` URL.

use std::collections::HashMap;

use anyhow::Result;
use async_trait::async_trait;
use regex::Regex;

use crate::fetch_head;

/// One concrete, directly fetchable target produced by an extractor.
#[derive(Debug, Clone)]
pub struct DownloadDescriptor {
    /// Final fetch target.
    pub url: String,
    /// Suggested filename; the caller may override it.
    pub filename: Option<String>,
    /// Known size in bytes, if the extractor was able to determine it.
    pub size: Option<u64>,
    /// Extra request headers required for this fetch (auth, cookies).
    pub headers: HashMap<String, String>,
    /// Whether the extractor believes range requests are supported.
    pub resume_hint: bool,
    /// Original user-supplied URL, kept for logging/diagnostics.
    pub source_url: String,
    /// Concurrency cap from the extractor that produced this descriptor, if any.
    /// Stamped by the dispatcher from `Extractor::max_threads`, not by the
    /// extractor itself, so callers get it regardless of which `extract` wrote it.
    pub max_threads: Option<usize>,
}

/// Error returned when an extractor matched a URL but failed to resolve it.
/// Terminal for that URL: the dispatcher does not fall back to a later
/// extractor once one has matched.
#[derive(Debug, thiserror::Error)]
#[error("extraction failed for {url}: {reason}")]
pub struct ExtractionError {
    pub url: String,
    pub reason: String,
}

/// A pluggable component that turns a user-supplied URL into one or more
/// `DownloadDescriptor`s.
#[async_trait]
pub trait Extractor: Send + Sync {
    fn name(&self) -> &str;
    fn description(&self) -> &str;
    fn version(&self) -> &str;

    /// Substrings matched against the URL's host (host-substring inclusion).
    fn handled_domains(&self) -> &[&str] {
        &[]
    }

    /// Regular expressions matched against the full URL.
    fn handled_patterns(&self) -> &[Regex] {
        &[]
    }

    /// If set, the dispatcher clamps the caller's requested concurrency to
    /// this value before invoking the engine for descriptors this extractor produced.
    fn max_threads(&self) -> Option<usize> {
        None
    }

    /// True if this extractor should handle `url`. Default implementation
    /// checks `handled_domains` (host substring) then `handled_patterns`
    /// (full-URL regex); override for custom logic.
    fn matches(&self, url: &str) -> bool {
        let host = url::Url::parse(url)
            .ok()
            .and_then(|u| u.host_str().map(|h| h.to_string()));
        if let Some(host) = &host {
            if self.handled_domains().iter().any(|d| host.contains(d)) {
                return true;
            }
        }
        self.handled_patterns().iter().any(|re| re.is_match(url))
    }

    /// Resolves `url` into one or more fetchable descriptors. Must return at
    /// least one descriptor or fail with `ExtractionError`.
    async fn extract(&self, url: &str) -> Result<Vec<DownloadDescriptor>, ExtractionError>;
}

/// Generic HTTP extractor: last-resort passthrough matching any
/// `http(s)://` URL. Performs a best-effort HEAD and returns a single
/// descriptor pointing straight at the given URL.
pub struct HttpExtractor;

#[async_trait]
impl Extractor for HttpExtractor {
    fn name(&self) -> &str {
        "http"
    }

    fn description(&self) -> &str {
        "generic HTTP(S) passthrough"
    }

    fn version(&self) -> &str {
        "1"
    }

    fn matches(&self, url: &str) -> bool {
        url.starts_with("http://") || url.starts_with("https://")
    }

    async fn extract(&self, url: &str) -> Result<Vec<DownloadDescriptor>, ExtractionError> {
        let url = url.to_string();
        let head = tokio::task::spawn_blocking({
            let url = url.clone();
            move || fetch_head::probe_best_effort(&url, &HashMap::new())
        })
        .await
        .map_err(|e| ExtractionError {
            url: url.clone(),
            reason: format!("probe task join: {e}"),
        })?
        .map_err(|e| ExtractionError {
            url: url.clone(),
            reason: format!("HEAD probe failed: {e:#}"),
        })?;

        let filename = crate::url_model::derive_filename(&url, head.content_disposition.as_deref());
        Ok(vec![DownloadDescriptor {
            url: url.clone(),
            filename: Some(filename),
            size: head.content_length,
            headers: HashMap::new(),
            resume_hint: head.accept_ranges,
            source_url: url,
            max_threads: None,
        }])
    }
}

/// Ordered registry of extractors. Registration order defines match priority;
/// by convention the generic `HttpExtractor` is registered last.
pub struct Dispatcher {
    extractors: Vec<Box<dyn Extractor>>,
}

impl Dispatcher {
    pub fn new() -> Self {
        Self {
            extractors: Vec::new(),
        }
    }

    /// Registers an extractor at the end of the priority list.
    pub fn register(&mut self, extractor: Box<dyn Extractor>) {
        self.extractors.push(extractor);
    }

    /// Builds the default dispatcher: no site-specific extractors, generic
    /// HTTP passthrough last.
    pub fn with_defaults() -> Self {
        let mut d = Self::new();
        d.register(Box::new(HttpExtractor));
        d
    }

    /// Finds the first extractor whose `matches` returns true for `url`.
    pub fn find_for(&self, url: &str) -> Option<&dyn Extractor> {
        self.extractors
            .iter()
            .find(|e| e.matches(url))
            .map(|e| e.as_ref())
    }

    /// Dispatches `url` to the first matching extractor and resolves it.
    /// Fails with `ExtractionError` if no extractor matches, or if the
    /// matching extractor's `extract` call fails (no fallback once matched).
    ///
    /// Stamps every returned descriptor with the matching extractor's
    /// `max_threads`, so a caller can clamp the engine's requested concurrency
    /// to it before a single segment is fetched.
    pub async fn resolve(&self, url: &str) -> Result<Vec<DownloadDescriptor>, ExtractionError> {
        let extractor = self.find_for(url).ok_or_else(|| ExtractionError {
            url: url.to_string(),
            reason: "no extractor matched this URL".to_string(),
        })?;
        let max_threads = extractor.max_threads();
        let mut descriptors = extractor.extract(url).await?;
        for d in &mut descriptors {
            d.max_threads = max_threads;
        }
        Ok(descriptors)
    }
}

impl Default for Dispatcher {
    fn default() -> Self {
        Self::with_defaults()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn http_extractor_matches_http_and_https() {
        let e = HttpExtractor;
        assert!(e.matches("http://example.com/file.zip"));
        assert!(e.matches("https://example.com/file.zip"));
        assert!(!e.matches("ftp://example.com/file.zip"));
    }

    #[test]
    fn dispatcher_with_defaults_finds_http_extractor() {
        let d = Dispatcher::with_defaults();
        assert!(d.find_for("https://example.com/a.bin").is_some());
        assert!(d.find_for("ftp://example.com/a.bin").is_none());
    }

    struct DomainExtractor;

    #[async_trait]
    impl Extractor for DomainExtractor {
        fn name(&self) -> &str {
            "domain-test"
        }
        fn description(&self) -> &str {
            "test"
        }
        fn version(&self) -> &str {
            "1"
        }
        fn handled_domains(&self) -> &[&str] {
            &["special.example.com"]
        }
        async fn extract(&self, url: &str) -> Result<Vec<DownloadDescriptor>, ExtractionError> {
            Ok(vec![DownloadDescriptor {
                url: url.to_string(),
                filename: None,
                size: None,
                headers: HashMap::new(),
                resume_hint: false,
                source_url: url.to_string(),
                max_threads: None,
            }])
        }
    }

    struct CappedExtractor;

    #[async_trait]
    impl Extractor for CappedExtractor {
        fn name(&self) -> &str {
            "capped-test"
        }
        fn description(&self) -> &str {
            "test"
        }
        fn version(&self) -> &str {
            "1"
        }
        fn handled_domains(&self) -> &[&str] {
            &["capped.example.com"]
        }
        fn max_threads(&self) -> Option<usize> {
            Some(2)
        }
        async fn extract(&self, url: &str) -> Result<Vec<DownloadDescriptor>, ExtractionError> {
            Ok(vec![DownloadDescriptor {
                url: url.to_string(),
                filename: None,
                size: None,
                headers: HashMap::new(),
                resume_hint: false,
                source_url: url.to_string(),
                max_threads: None,
            }])
        }
    }

    #[tokio::test]
    async fn resolve_stamps_descriptor_with_extractor_max_threads() {
        let mut d = Dispatcher::new();
        d.register(Box::new(CappedExtractor));
        let descriptors = d.resolve("https://capped.example.com/x").await.unwrap();
        assert_eq!(descriptors[0].max_threads, Some(2));
    }

    #[test]
    fn domain_match_takes_priority_over_generic() {
        let mut d = Dispatcher::new();
        d.register(Box::new(DomainExtractor));
        d.register(Box::new(HttpExtractor));
        let found = d.find_for("https://special.example.com/x").unwrap();
        assert_eq!(found.name(), "domain-test");
    }

    #[tokio::test]
    async fn resolve_fails_with_no_matching_extractor() {
        let d = Dispatcher::new();
        let err = d.resolve("ftp://example.com/x").await.unwrap_err();
        assert!(err.reason.contains("no extractor matched"));
    }
}
