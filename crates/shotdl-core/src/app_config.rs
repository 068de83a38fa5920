use std::path::PathBuf;

/// Browser-like `User-Agent` sent by default. Image CDNs commonly reject
/// requests that identify as a bare HTTP client.
pub const DEFAULT_USER_AGENT: &str =
    "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/124.0.0.0 Safari/537.36";

/// Process-wide settings read from the environment.
///
/// Per-run knobs (query, count, delay, compression threshold) live in
/// [`crate::RunOptions`] and come from the command line instead.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub log_level: String,
    /// Site origin used for search URLs and the download `Referer`.
    pub base_url: String,
    pub user_agent: String,
    pub request_timeout_secs: u64,
    /// Ceiling for a single page navigation.
    pub nav_timeout_ms: u64,
    /// Fixed wait after each navigation so client-side rendering can finish.
    pub settle_ms: u64,
    /// Total download attempts per image, including the first.
    pub max_attempts: u32,
    /// Linear backoff unit: attempt `n` waits `retry_backoff_ms * n`.
    pub retry_backoff_ms: u64,
    pub max_scroll_rounds: u32,
    /// Attach to an already running browser instead of launching one.
    pub cdp_endpoint: Option<String>,
    pub chrome_path: Option<PathBuf>,
    pub magick_path: Option<PathBuf>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            base_url: "https://dribbble.com".to_string(),
            user_agent: DEFAULT_USER_AGENT.to_string(),
            request_timeout_secs: 60,
            nav_timeout_ms: 30_000,
            settle_ms: 2_000,
            max_attempts: 3,
            retry_backoff_ms: 1_000,
            max_scroll_rounds: 5,
            cdp_endpoint: None,
            chrome_path: None,
            magick_path: None,
        }
    }
}
