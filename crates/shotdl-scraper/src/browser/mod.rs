//! Browser session abstraction consumed by the pipeline.
//!
//! The pipeline only ever navigates, evaluates a script and closes. Two
//! implementations ship: [`CdpSession`] drives a real Chrome over the
//! DevTools protocol so client-rendered results pages work, and
//! [`HttpSession`] fetches raw HTML for sites that render server-side.

mod cdp;
mod error;
mod http;

use std::path::PathBuf;

use async_trait::async_trait;
use serde_json::Value;

pub use cdp::CdpSession;
pub use error::BrowserError;
pub use http::HttpSession;

/// Script returning the rendered document markup.
pub const OUTER_HTML_SCRIPT: &str = "document.documentElement.outerHTML";

/// Script scrolling to the bottom of the page to trigger lazy loading.
pub const SCROLL_SCRIPT: &str = "window.scrollTo(0, document.body.scrollHeight)";

/// When `navigate` considers the page loaded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WaitStrategy {
    /// `document.readyState` reached `complete`.
    Load,
    /// Loaded, and no new network resources for [`NETWORK_IDLE_QUIET_MS`].
    NetworkIdle,
}

/// Quiet period used by [`WaitStrategy::NetworkIdle`].
pub const NETWORK_IDLE_QUIET_MS: u64 = 500;

#[async_trait]
pub trait BrowserSession: Send {
    /// Navigates the page, returning once `wait` is satisfied.
    ///
    /// # Errors
    ///
    /// [`BrowserError::Timeout`] when `timeout_ms` elapses first, or
    /// [`BrowserError::Navigation`] when the page fails to load.
    async fn navigate(
        &mut self,
        url: &str,
        wait: WaitStrategy,
        timeout_ms: u64,
    ) -> Result<(), BrowserError>;

    /// Evaluates `script` in page context and returns its JSON value.
    ///
    /// # Errors
    ///
    /// Returns [`BrowserError`] if the script throws or cannot run.
    async fn evaluate(&mut self, script: &str) -> Result<Value, BrowserError>;

    /// Releases the page and any browser this session started.
    ///
    /// # Errors
    ///
    /// Returns [`BrowserError`] if the browser rejects the shutdown.
    async fn close(&mut self) -> Result<(), BrowserError>;

    /// Rendered markup of the current page.
    ///
    /// # Errors
    ///
    /// Propagates [`BrowserSession::evaluate`] failures.
    async fn content(&mut self) -> Result<String, BrowserError> {
        let value = self.evaluate(OUTER_HTML_SCRIPT).await?;
        Ok(value.as_str().unwrap_or_default().to_string())
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Engine {
    #[default]
    Cdp,
    Http,
}

#[derive(Debug, Clone)]
pub struct BrowserConfig {
    pub engine: Engine,
    pub headless: bool,
    pub cdp_endpoint: Option<String>,
    pub chrome_path: Option<PathBuf>,
    pub user_agent: String,
    pub request_timeout_secs: u64,
}

impl BrowserConfig {
    #[must_use]
    pub fn from_app_config(config: &shotdl_core::AppConfig, engine: Engine, headless: bool) -> Self {
        Self {
            engine,
            headless,
            cdp_endpoint: config.cdp_endpoint.clone(),
            chrome_path: config.chrome_path.clone(),
            user_agent: config.user_agent.clone(),
            request_timeout_secs: config.request_timeout_secs,
        }
    }
}

/// Opens a session for the configured engine.
///
/// # Errors
///
/// Returns [`BrowserError`] if the browser cannot be launched or reached.
pub async fn open_session(config: &BrowserConfig) -> Result<Box<dyn BrowserSession>, BrowserError> {
    match config.engine {
        Engine::Cdp => {
            let session = CdpSession::open(config).await?;
            Ok(Box::new(session))
        }
        Engine::Http => {
            let session = HttpSession::open(config)?;
            Ok(Box::new(session))
        }
    }
}
