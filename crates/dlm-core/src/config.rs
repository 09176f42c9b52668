use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;

/// Per-job retry policy as persisted in config (mirrors `retry::RetryPolicy`
/// but in plain, TOML-friendly units).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RetryConfig {
    pub max_attempts: u32,
    pub base_delay_secs: f64,
    pub max_delay_secs: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            // Must be >= 1s: the delay before attempt k+1 has to be at least 2^k
            // seconds, so the very first retry (k=0) needs a full second.
            base_delay_secs: 1.0,
            max_delay_secs: 30,
        }
    }
}

/// Global configuration loaded from `~/.config/dlm/config.toml`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DlmConfig {
    /// Default directory new jobs download into, unless overridden per job.
    pub download_dir: PathBuf,
    /// Maximum concurrent download jobs. The engine itself processes one job
    /// at a time; this is schema completeness for a caller layer that wants
    /// to queue several CLI invocations (or a future multi-job driver).
    pub max_concurrent_downloads: usize,
    /// Default number of segments/threads per download when adaptive tuning
    /// has no prior observation for the host.
    pub threads_per_download: usize,
    /// GET streaming chunk size in bytes. Also the `size > chunk_size`
    /// threshold used to decide between the segmented and single-stream
    /// download strategies.
    pub chunk_size: u64,
    /// Per-request timeout in seconds (connect + transfer).
    pub timeout_seconds: u64,
    /// Maximum retry attempts per segment before giving up.
    pub max_retries: u32,
    /// User-Agent header sent on every request.
    pub user_agent: String,
    /// Names of extractor plugins enabled for URL resolution.
    pub enabled_plugins: Vec<String>,

    /// Maximum total concurrent HTTP connections across all jobs.
    pub max_total_connections: usize,
    /// Maximum concurrent HTTP connections per host.
    pub max_connections_per_host: usize,
    /// Minimum number of segments per job.
    pub min_segments: usize,
    /// Maximum number of segments per job.
    pub max_segments: usize,
    /// Global bandwidth cap in bytes/sec, divided across active segment handles.
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub max_bytes_per_sec: Option<u64>,
    /// curl buffer size per segment handle, in bytes.
    pub segment_buffer_bytes: usize,
    /// Retry/backoff tuning. `None` falls back to `RetryPolicy::default()`.
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub retry: Option<RetryConfig>,
}

impl Default for DlmConfig {
    fn default() -> Self {
        Self {
            download_dir: default_download_dir(),
            max_concurrent_downloads: 1,
            threads_per_download: 4,
            chunk_size: 1024 * 1024,
            timeout_seconds: 30,
            max_retries: 5,
            user_agent: format!("dlm/{}", env!("CARGO_PKG_VERSION")),
            enabled_plugins: Vec::new(),
            max_total_connections: 64,
            max_connections_per_host: 16,
            min_segments: 4,
            max_segments: 16,
            max_bytes_per_sec: None,
            segment_buffer_bytes: 128 * 1024,
            retry: Some(RetryConfig::default()),
        }
    }
}

fn default_download_dir() -> PathBuf {
    xdg::BaseDirectories::with_prefix("dlm")
        .ok()
        .map(|d| d.get_data_home().join("downloads"))
        .unwrap_or_else(|| PathBuf::from("."))
}

pub fn config_path() -> Result<PathBuf> {
    let xdg_dirs = xdg::BaseDirectories::with_prefix("dlm")?;
    Ok(xdg_dirs.place_config_file("config.toml")?)
}

/// Load configuration from disk, creating a default file if none exists.
pub fn load_or_init() -> Result<DlmConfig> {
    let path = config_path()?;
    if !path.exists() {
        let default_cfg = DlmConfig::default();
        let toml = toml::to_string_pretty(&default_cfg)?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&path, toml)?;
        tracing::info!("created default config at {}", path.display());
        return Ok(default_cfg);
    }

    let data = fs::read_to_string(&path)?;
    let cfg: DlmConfig = toml::from_str(&data)?;
    Ok(cfg)
}
