//! Script-less session backed by a plain HTTP client.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde_json::Value;

use super::{BrowserConfig, BrowserError, BrowserSession, WaitStrategy, OUTER_HTML_SCRIPT};

/// Fetches pages with `reqwest` and serves their markup back through
/// [`BrowserSession::evaluate`]. No JavaScript runs, so only the outer-HTML
/// script is understood; anything else is [`BrowserError::Unsupported`].
pub struct HttpSession {
    client: Client,
    page: Option<String>,
}

impl HttpSession {
    /// # Errors
    ///
    /// Returns [`BrowserError::Http`] if the client cannot be built.
    pub fn open(config: &BrowserConfig) -> Result<Self, BrowserError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .connect_timeout(Duration::from_secs(10))
            .user_agent(config.user_agent.as_str())
            .build()?;
        Ok(Self { client, page: None })
    }
}

#[async_trait]
impl BrowserSession for HttpSession {
    async fn navigate(
        &mut self,
        url: &str,
        _wait: WaitStrategy,
        timeout_ms: u64,
    ) -> Result<(), BrowserError> {
        self.page = None;
        let request = self
            .client
            .get(url)
            .header(reqwest::header::ACCEPT, "text/html,application/xhtml+xml")
            .send();

        let response = tokio::time::timeout(Duration::from_millis(timeout_ms), request)
            .await
            .map_err(|_| BrowserError::Timeout(format!("navigating to {url}")))??;

        let status = response.status();
        if !status.is_success() {
            return Err(BrowserError::Navigation {
                url: url.to_string(),
                reason: format!("HTTP {}", status.as_u16()),
            });
        }

        self.page = Some(response.text().await?);
        tracing::debug!(url, "fetched page");
        Ok(())
    }

    async fn evaluate(&mut self, script: &str) -> Result<Value, BrowserError> {
        if script != OUTER_HTML_SCRIPT {
            return Err(BrowserError::Unsupported(
                "script evaluation without a browser".to_string(),
            ));
        }
        let html = self.page.clone().ok_or_else(|| {
            BrowserError::InvalidResponse("no page has been loaded".to_string())
        })?;
        Ok(Value::String(html))
    }

    async fn close(&mut self) -> Result<(), BrowserError> {
        self.page = None;
        Ok(())
    }
}
