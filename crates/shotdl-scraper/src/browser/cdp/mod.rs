//! Chrome DevTools Protocol session.
//!
//! Either attaches to a browser already listening on a DevTools endpoint
//! (`chrome --remote-debugging-port=9222`) or launches one, then drives a
//! single page target over a flattened session.

mod connection;
mod launch;
mod protocol;

use std::time::{Duration, Instant};

use async_trait::async_trait;
use serde_json::{json, Value};

use self::connection::CdpConnection;
use self::launch::LaunchedBrowser;
use super::{BrowserConfig, BrowserError, BrowserSession, WaitStrategy, NETWORK_IDLE_QUIET_MS};

const POLL_INTERVAL: Duration = Duration::from_millis(100);

const RESOURCE_COUNT_SCRIPT: &str = "performance.getEntriesByType('resource').length";

/// Installed on every new document. The default resource-timing buffer holds
/// 250 entries, after which the count stops moving and the page looks idle.
const RESOURCE_BUFFER_SCRIPT: &str = "performance.setResourceTimingBufferSize(100000)";

/// Commands sent to a freshly attached page, in order.
fn page_setup_commands(user_agent: &str) -> Vec<(&'static str, Option<Value>)> {
    vec![
        ("Page.enable", None),
        ("Runtime.enable", None),
        ("Network.enable", None),
        (
            "Page.addScriptToEvaluateOnNewDocument",
            Some(json!({"source": RESOURCE_BUFFER_SCRIPT})),
        ),
        (
            "Network.setUserAgentOverride",
            Some(json!({"userAgent": user_agent})),
        ),
    ]
}

pub struct CdpSession {
    conn: CdpConnection,
    target_id: String,
    session_id: String,
    browser: Option<LaunchedBrowser>,
}

impl CdpSession {
    /// Connects to `config.cdp_endpoint`, or launches Chrome when unset.
    ///
    /// # Errors
    ///
    /// Returns [`BrowserError`] if the browser cannot be launched or reached,
    /// or if creating the page target fails.
    pub async fn open(config: &BrowserConfig) -> Result<Self, BrowserError> {
        let (endpoint, mut browser) = match &config.cdp_endpoint {
            Some(endpoint) => (endpoint.clone(), None),
            None => {
                let launched =
                    launch::launch(config.chrome_path.as_deref(), config.headless).await?;
                (launched.endpoint().to_string(), Some(launched))
            }
        };

        match Self::attach(&endpoint, &config.user_agent).await {
            Ok((conn, target_id, session_id)) => Ok(Self {
                conn,
                target_id,
                session_id,
                browser,
            }),
            Err(e) => {
                if let Some(launched) = browser.as_mut() {
                    launched.shutdown().await;
                }
                Err(e)
            }
        }
    }

    async fn attach(
        endpoint: &str,
        user_agent: &str,
    ) -> Result<(CdpConnection, String, String), BrowserError> {
        let conn = CdpConnection::connect(endpoint).await?;

        let created = conn
            .call(
                "Target.createTarget",
                Some(json!({"url": "about:blank"})),
                None,
            )
            .await?;
        let target_id = created["targetId"]
            .as_str()
            .ok_or_else(|| BrowserError::InvalidResponse("missing targetId".to_string()))?
            .to_string();

        let attached = conn
            .call(
                "Target.attachToTarget",
                Some(json!({"targetId": target_id, "flatten": true})),
                None,
            )
            .await?;
        let session_id = attached["sessionId"]
            .as_str()
            .ok_or_else(|| BrowserError::InvalidResponse("missing sessionId".to_string()))?
            .to_string();

        for (method, params) in page_setup_commands(user_agent) {
            conn.call(method, params, Some(&session_id)).await?;
        }

        tracing::debug!(%target_id, "attached to page target");
        Ok((conn, target_id, session_id))
    }

    async fn page_call(&self, method: &str, params: Option<Value>) -> Result<Value, BrowserError> {
        self.conn.call(method, params, Some(&self.session_id)).await
    }

    async fn eval(&self, expression: &str) -> Result<Value, BrowserError> {
        let result = self
            .page_call(
                "Runtime.evaluate",
                Some(json!({
                    "expression": expression,
                    "returnByValue": true,
                    "awaitPromise": true,
                })),
            )
            .await?;

        if let Some(exception) = result.get("exceptionDetails") {
            let text = exception["exception"]["description"]
                .as_str()
                .or_else(|| exception["text"].as_str())
                .unwrap_or("unknown error");
            return Err(BrowserError::JavaScript(text.to_string()));
        }

        Ok(result["result"]["value"].clone())
    }

    async fn wait_for(&self, wait: WaitStrategy) -> Result<(), BrowserError> {
        loop {
            if self.eval("document.readyState").await?.as_str() == Some("complete") {
                break;
            }
            tokio::time::sleep(POLL_INTERVAL).await;
        }

        if wait == WaitStrategy::NetworkIdle {
            let quiet = Duration::from_millis(NETWORK_IDLE_QUIET_MS);
            let mut last_count = self.eval(RESOURCE_COUNT_SCRIPT).await?.as_u64();
            let mut since = Instant::now();
            while since.elapsed() < quiet {
                tokio::time::sleep(POLL_INTERVAL).await;
                let count = self.eval(RESOURCE_COUNT_SCRIPT).await?.as_u64();
                if count != last_count {
                    last_count = count;
                    since = Instant::now();
                }
            }
        }
        Ok(())
    }
}

#[async_trait]
impl BrowserSession for CdpSession {
    async fn navigate(
        &mut self,
        url: &str,
        wait: WaitStrategy,
        timeout_ms: u64,
    ) -> Result<(), BrowserError> {
        let navigation = async {
            let result = self
                .page_call("Page.navigate", Some(json!({"url": url})))
                .await?;
            if let Some(error) = result.get("errorText").and_then(Value::as_str) {
                return Err(BrowserError::Navigation {
                    url: url.to_string(),
                    reason: error.to_string(),
                });
            }
            self.wait_for(wait).await
        };

        tokio::time::timeout(Duration::from_millis(timeout_ms), navigation)
            .await
            .map_err(|_| BrowserError::Timeout(format!("navigating to {url} ({timeout_ms}ms)")))??;
        tracing::debug!(url, "navigation complete");
        Ok(())
    }

    async fn evaluate(&mut self, script: &str) -> Result<Value, BrowserError> {
        self.eval(script).await
    }

    async fn close(&mut self) -> Result<(), BrowserError> {
        let closed = self
            .conn
            .call(
                "Target.closeTarget",
                Some(json!({"targetId": self.target_id})),
                None,
            )
            .await
            .map(|_| ());
        if let Some(mut launched) = self.browser.take() {
            launched.shutdown().await;
        }
        closed
    }
}
