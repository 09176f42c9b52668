//! Segment download error type for retry classification.

use std::fmt;
use std::time::Duration;

/// Error returned by a single segment download (curl failure, HTTP error, or storage failure).
/// Used so we can classify and decide retries before converting to anyhow.
#[derive(Debug)]
pub enum SegmentError {
    /// Curl reported an error (timeout, connection, etc.).
    Curl(curl::Error),
    /// HTTP response had a non-2xx status. `retry_after` carries a parsed
    /// `Retry-After` header value when the server sent one.
    Http {
        status: u32,
        retry_after: Option<Duration>,
    },
    /// Transfer completed but fewer bytes were written than the segment length
    /// (e.g. server closed early). Enables retry instead of silent corruption.
    PartialTransfer { expected: u64, received: u64 },
    /// Server returned `200` with the full entity instead of honoring our
    /// `Range` header for a non-first segment. Fatal: retrying repeats it.
    RangeIgnored { expected_start: u64 },
    /// Disk/storage write failed (e.g. disk full, permission denied). Not retried.
    Storage(std::io::Error),
}

impl fmt::Display for SegmentError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SegmentError::Curl(e) => write!(f, "{}", e),
            SegmentError::Http { status, .. } => write!(f, "HTTP {}", status),
            SegmentError::PartialTransfer { expected, received } => {
                write!(f, "partial transfer: expected {} bytes, got {}", expected, received)
            }
            SegmentError::RangeIgnored { expected_start } => write!(
                f,
                "RangeIgnored: server sent HTTP 200 for a range request starting at byte {}",
                expected_start
            ),
            SegmentError::Storage(e) => write!(f, "storage: {}", e),
        }
    }
}

impl std::error::Error for SegmentError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            SegmentError::Curl(e) => Some(e),
            SegmentError::Storage(e) => Some(e),
            SegmentError::Http { .. }
            | SegmentError::PartialTransfer { .. }
            | SegmentError::RangeIgnored { .. } => None,
        }
    }
}
