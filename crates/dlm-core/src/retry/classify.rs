//! Classify HTTP status and curl errors into retry policy error kinds.

use super::error::SegmentError;
use super::policy::ErrorKind;
use std::time::Duration;

/// Classify an HTTP status code for retry decisions.
pub fn classify_http_status(code: u32) -> ErrorKind {
    match code {
        429 | 503 => ErrorKind::Throttled,
        500..=599 => ErrorKind::Http5xx(code as u16),
        _ => ErrorKind::Other,
    }
}

/// Classify a curl error for retry decisions.
pub fn classify_curl_error(e: &curl::Error) -> ErrorKind {
    if e.is_operation_timedout() {
        return ErrorKind::Timeout;
    }
    if e.is_couldnt_connect()
        || e.is_couldnt_resolve_host()
        || e.is_couldnt_resolve_proxy()
        || e.is_read_error()
        || e.is_recv_error()
        || e.is_send_error()
        || e.is_got_nothing()
    {
        return ErrorKind::Connection;
    }
    ErrorKind::Other
}

/// Classify a segment error (curl, HTTP, partial transfer, or storage) into an ErrorKind.
pub fn classify(e: &SegmentError) -> ErrorKind {
    match e {
        SegmentError::Curl(ce) => classify_curl_error(ce),
        SegmentError::Http { status, .. } => classify_http_status(*status),
        // A short write from a dropped connection is recoverable by re-requesting
        // the remaining range.
        SegmentError::PartialTransfer { .. } => ErrorKind::Connection,
        // The server already showed us it won't honor Range; retrying asks nothing new.
        SegmentError::RangeIgnored { .. } => ErrorKind::RangeIgnored,
        // Disk failures won't be fixed by retrying the same write.
        SegmentError::Storage(_) => ErrorKind::Other,
    }
}

/// Extract a server-supplied `Retry-After` hint, if the error carries one.
pub fn retry_after_hint(e: &SegmentError) -> Option<Duration> {
    match e {
        SegmentError::Http { retry_after, .. } => *retry_after,
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn http_429_and_503_throttled() {
        assert_eq!(classify_http_status(429), ErrorKind::Throttled);
        assert_eq!(classify_http_status(503), ErrorKind::Throttled);
    }

    #[test]
    fn http_5xx_retryable() {
        assert!(matches!(classify_http_status(500), ErrorKind::Http5xx(500)));
        assert!(matches!(classify_http_status(502), ErrorKind::Http5xx(502)));
    }

    #[test]
    fn http_4xx_other() {
        assert_eq!(classify_http_status(404), ErrorKind::Other);
        assert_eq!(classify_http_status(403), ErrorKind::Other);
    }

    #[test]
    fn http_200_is_other_not_retryable() {
        // The generic status classifier has no segment context, so a bare 200
        // falls into Other; `downloader::segment` detects the Range-ignored case
        // itself and raises `SegmentError::RangeIgnored` before this is reached.
        assert_eq!(classify_http_status(200), ErrorKind::Other);
    }

    #[test]
    fn range_ignored_is_fatal_not_retryable() {
        let e = SegmentError::RangeIgnored { expected_start: 1024 };
        assert_eq!(classify(&e), ErrorKind::RangeIgnored);
    }

    #[test]
    fn partial_transfer_is_connection() {
        let e = SegmentError::PartialTransfer {
            expected: 100,
            received: 40,
        };
        assert_eq!(classify(&e), ErrorKind::Connection);
    }

    #[test]
    fn storage_error_is_other() {
        let e = SegmentError::Storage(std::io::Error::other("disk full"));
        assert_eq!(classify(&e), ErrorKind::Other);
    }
}
