//! HTTP HEAD / metadata probing.
//!
//! Uses the curl crate (libcurl) to fetch response headers and confirm
//! `Content-Length`, `Accept-Ranges: bytes`, and capture ETag/Last-Modified
//! for resume safety.

mod parse;

use anyhow::{Context, Result};
use std::collections::HashMap;
use std::str;
use std::time::Duration;

/// Result of a HEAD request: key headers needed for segmented download and resume.
#[derive(Debug, Clone)]
pub struct HeadResult {
    /// Total size in bytes, if `Content-Length` is present.
    pub content_length: Option<u64>,
    /// True if server sent `Accept-Ranges: bytes`.
    pub accept_ranges: bool,
    /// `ETag` value if present (used for resume validation).
    pub etag: Option<String>,
    /// `Last-Modified` value if present (used for resume validation).
    pub last_modified: Option<String>,
    /// `Content-Disposition` value if present (filename hint).
    pub content_disposition: Option<String>,
}

/// Error from a HEAD probe. Distinguishes a probe that reached the server and
/// got an odd/rejecting HTTP response (some origins 403 HEAD while allowing
/// GET) from a genuine transport failure (DNS, connect, TLS, timeout) where
/// the request never got a response at all.
#[derive(Debug, thiserror::Error)]
pub enum ProbeError {
    #[error("HEAD {url} returned HTTP {status}")]
    Rejected { url: String, status: u32 },
    #[error(transparent)]
    Transport(#[from] anyhow::Error),
}

/// Performs a HEAD request and returns parsed metadata.
///
/// Follows redirects. Optional custom headers can be passed (e.g. from a resolver).
/// Runs in the current thread; call from `spawn_blocking` if used from async code.
pub fn probe(url: &str, custom_headers: &HashMap<String, String>) -> Result<HeadResult, ProbeError> {
    let (headers, code) = run_probe(url, custom_headers).map_err(ProbeError::Transport)?;

    if !(200..300).contains(&code) {
        return Err(ProbeError::Rejected {
            url: url.to_string(),
            status: code,
        });
    }

    parse::parse_headers(&headers).map_err(ProbeError::Transport)
}

/// Performs the actual curl transfer, returning the raw header lines and status
/// code. Any error here is a transport-level failure, not a rejected response.
fn run_probe(url: &str, custom_headers: &HashMap<String, String>) -> Result<(Vec<String>, u32)> {
    let mut headers: Vec<String> = Vec::new();

    let mut easy = curl::easy::Easy::new();
    easy.url(url)
        .context("invalid URL")?;
    easy.nobody(true)?; // HEAD request
    easy.follow_location(true)?;
    easy.connect_timeout(Duration::from_secs(15))?;
    easy.timeout(Duration::from_secs(30))?;

    // Build curl list for custom headers (e.g. "Name: value").
    let mut list = curl::easy::List::new();
    for (k, v) in custom_headers {
        list.append(&format!("{}: {}", k.trim(), v.trim()))?;
    }
    if !custom_headers.is_empty() {
        easy.http_headers(list)?;
    }

    {
        let mut transfer = easy.transfer();
        transfer.header_function(|data| {
            if let Ok(s) = str::from_utf8(data) {
                headers.push(s.trim_end().to_string());
            }
            true
        })?;
        transfer.perform().context("HEAD request failed")?;
    }

    let code = easy.response_code().context("no response code")?;
    Ok((headers, code as u32))
}

/// Like `probe`, but degrades gracefully instead of failing the whole job when
/// the HEAD itself is blocked or unsupported by the server (some origins 403
/// HEAD while allowing GET). A rejected/odd HEAD response falls back to an
/// empty, all-unknown `HeadResult` so the scheduler can fall through to the
/// single-stream path. Genuine transport failures (DNS, connect, TLS, timeout)
/// are NOT swallowed here: they propagate so the caller can surface a real
/// error instead of silently treating an unreachable host as reachable.
pub fn probe_best_effort(url: &str, custom_headers: &HashMap<String, String>) -> Result<HeadResult> {
    match probe(url, custom_headers) {
        Ok(r) => Ok(r),
        Err(ProbeError::Rejected { status, .. }) => {
            tracing::debug!(url, status, "HEAD probe rejected, proceeding without metadata");
            Ok(HeadResult {
                content_length: None,
                accept_ranges: false,
                etag: None,
                last_modified: None,
                content_disposition: None,
            })
        }
        Err(ProbeError::Transport(e)) => Err(e.context(format!("HEAD probe failed for {url}"))),
    }
}
