//! Progress reporting for downloads (bytes done, ETA, rate).
//!
//! Used by the scheduler to report progress to the CLI; consumers can compute
//! rate = bytes_done / elapsed_secs and ETA = (total_bytes - bytes_done) / rate.

/// Snapshot of download progress for one job (CLI-friendly).
#[derive(Debug, Clone)]
pub struct ProgressStats {
    /// Bytes written so far (completed segments).
    pub bytes_done: u64,
    /// Bytes currently in flight in incomplete segments (not yet counted in `bytes_done`).
    pub bytes_in_flight: u64,
    /// Total file size in bytes.
    pub total_bytes: u64,
    /// Elapsed time since download start (seconds).
    pub elapsed_secs: f64,
    /// Number of segments completed.
    pub segments_done: usize,
    /// Total number of segments.
    pub segment_count: usize,
    /// Moving-average speed from a `ProgressTracker`, when one is in use upstream.
    /// `None` before the tracker has accepted its first sample.
    pub smoothed_bytes_per_sec: Option<f64>,
}

impl ProgressStats {
    /// Total download rate in bytes per second (0 if elapsed is 0).
    pub fn bytes_per_sec(&self) -> f64 {
        if self.elapsed_secs <= 0.0 {
            return 0.0;
        }
        self.bytes_done as f64 / self.elapsed_secs
    }

    /// Estimated seconds remaining (None if rate is 0 or already done).
    pub fn eta_secs(&self) -> Option<f64> {
        let remaining = self.total_bytes.saturating_sub(self.bytes_done);
        if remaining == 0 {
            return Some(0.0);
        }
        let rate = self.bytes_per_sec();
        if rate <= 0.0 {
            return None;
        }
        Some(remaining as f64 / rate)
    }

    /// Fraction complete in [0.0, 1.0].
    pub fn fraction(&self) -> f64 {
        if self.total_bytes == 0 {
            return 1.0;
        }
        (self.bytes_done as f64 / self.total_bytes as f64).min(1.0)
    }

    /// Bytes accounted for so far: completed segments plus bytes already
    /// landed in segments still in flight. Used for a rate estimate that
    /// doesn't lag behind a segment's completion.
    pub fn effective_bytes(&self) -> u64 {
        self.bytes_done.saturating_add(self.bytes_in_flight)
    }
}

/// Smooths raw byte counters into a moving-average speed for display.
///
/// `ProgressStats::bytes_per_sec` divides total bytes by total elapsed time,
/// which is accurate but sluggish: a slow first segment drags the average
/// down for the whole run. This tracker instead keeps a short window of
/// recent instantaneous speeds (sampled no more than every 100ms) and
/// averages over that window, so the displayed rate reacts to recent
/// conditions the way a typical download manager's UI does.
pub struct ProgressTracker {
    window: std::collections::VecDeque<f64>,
    max_samples: usize,
    min_sample_interval: std::time::Duration,
    last_sample_at: std::time::Instant,
    last_bytes_done: u64,
}

impl ProgressTracker {
    pub fn new() -> Self {
        Self {
            window: std::collections::VecDeque::with_capacity(10),
            max_samples: 10,
            min_sample_interval: std::time::Duration::from_millis(100),
            last_sample_at: std::time::Instant::now(),
            last_bytes_done: 0,
        }
    }

    /// Feeds a new `ProgressStats` observation. Returns `true` if the sample
    /// was accepted (i.e. enough time has passed since the last one) and the
    /// smoothed speed was updated.
    pub fn observe(&mut self, stats: &ProgressStats) -> bool {
        let now = std::time::Instant::now();
        let since = now.duration_since(self.last_sample_at);
        if since < self.min_sample_interval {
            return false;
        }
        let delta_bytes = stats.bytes_done.saturating_sub(self.last_bytes_done);
        let secs = since.as_secs_f64();
        if secs > 0.0 {
            let instant_speed = delta_bytes as f64 / secs;
            self.window.push_back(instant_speed);
            if self.window.len() > self.max_samples {
                self.window.pop_front();
            }
        }
        self.last_sample_at = now;
        self.last_bytes_done = stats.bytes_done;
        true
    }

    /// Moving-average speed in bytes/sec over the current window.
    pub fn smoothed_bytes_per_sec(&self) -> f64 {
        if self.window.is_empty() {
            return 0.0;
        }
        self.window.iter().sum::<f64>() / self.window.len() as f64
    }

    /// ETA in seconds given a total size, using the smoothed speed. `None`
    /// if speed is zero or the total is unknown.
    pub fn eta_secs(&self, bytes_done: u64, total_bytes: u64) -> Option<f64> {
        let remaining = total_bytes.saturating_sub(bytes_done);
        if remaining == 0 {
            return Some(0.0);
        }
        let speed = self.smoothed_bytes_per_sec();
        if speed <= 0.0 {
            return None;
        }
        Some(remaining as f64 / speed)
    }
}

impl Default for ProgressTracker {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn stats_with(bytes_done: u64) -> ProgressStats {
        ProgressStats {
            bytes_done,
            bytes_in_flight: 0,
            total_bytes: 1000,
            elapsed_secs: 0.0,
            segments_done: 0,
            segment_count: 1,
            smoothed_bytes_per_sec: None,
        }
    }

    #[test]
    fn observe_rejects_samples_within_throttle_window() {
        let mut tracker = ProgressTracker::new();
        assert!(!tracker.observe(&stats_with(100)));
    }

    #[test]
    fn observe_accepts_after_interval_and_smooths() {
        let mut tracker = ProgressTracker::new();
        tracker.last_sample_at = std::time::Instant::now() - Duration::from_millis(200);
        assert!(tracker.observe(&stats_with(1000)));
        assert!(tracker.smoothed_bytes_per_sec() > 0.0);
    }

    #[test]
    fn eta_secs_zero_when_already_done() {
        let tracker = ProgressTracker::new();
        assert_eq!(tracker.eta_secs(1000, 1000), Some(0.0));
    }

    #[test]
    fn eta_secs_none_when_no_speed_yet() {
        let tracker = ProgressTracker::new();
        assert_eq!(tracker.eta_secs(0, 1000), None);
    }
}
