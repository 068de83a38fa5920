//! Browser-level WebSocket connection with request/response correlation.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use futures::stream::{SplitSink, SplitStream};
use futures::{SinkExt, StreamExt};
use serde_json::Value;
use tokio::net::TcpStream;
use tokio::sync::oneshot;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream};

use super::protocol::{BrowserVersion, CdpRequest, CdpResponse};
use crate::browser::BrowserError;

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;
type WsSink = SplitSink<WsStream, Message>;
type WsSource = SplitStream<WsStream>;
type Pending = Arc<Mutex<HashMap<u64, oneshot::Sender<Result<Value, BrowserError>>>>>;

/// Upper bound for a single CDP command round trip.
const CALL_TIMEOUT: Duration = Duration::from_secs(30);

pub(super) struct CdpConnection {
    ws_tx: tokio::sync::Mutex<WsSink>,
    request_id: AtomicU64,
    pending: Pending,
    recv_task: tokio::task::JoinHandle<()>,
}

impl CdpConnection {
    /// Connects to the browser behind a DevTools HTTP endpoint such as
    /// `http://127.0.0.1:9222`.
    pub(super) async fn connect(endpoint: &str) -> Result<Self, BrowserError> {
        let endpoint = endpoint.trim_end_matches('/');
        let version = fetch_version(endpoint).await?;
        tracing::debug!(browser = %version.browser, "connected to DevTools endpoint");

        let (ws_stream, _) = tokio_tungstenite::connect_async(version.web_socket_debugger_url.as_str())
            .await
            .map_err(|e| BrowserError::Unreachable {
                endpoint: version.web_socket_debugger_url.clone(),
                reason: e.to_string(),
            })?;

        let (ws_sink, ws_source) = ws_stream.split();
        let pending: Pending = Arc::new(Mutex::new(HashMap::new()));
        let recv_task = {
            let pending = Arc::clone(&pending);
            tokio::spawn(async move { receive_loop(ws_source, pending).await })
        };

        Ok(Self {
            ws_tx: tokio::sync::Mutex::new(ws_sink),
            request_id: AtomicU64::new(1),
            pending,
            recv_task,
        })
    }

    /// Sends one command and waits for its response.
    pub(super) async fn call(
        &self,
        method: &str,
        params: Option<Value>,
        session_id: Option<&str>,
    ) -> Result<Value, BrowserError> {
        let id = self.request_id.fetch_add(1, Ordering::SeqCst);
        let request = CdpRequest {
            id,
            method: method.to_string(),
            params,
            session_id: session_id.map(str::to_string),
        };
        let json = serde_json::to_string(&request)?;
        tracing::trace!(%json, "CDP send");

        let (tx, rx) = oneshot::channel();
        self.pending
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(id, tx);

        {
            let mut ws = self.ws_tx.lock().await;
            ws.send(Message::Text(json.into())).await?;
        }

        match tokio::time::timeout(CALL_TIMEOUT, rx).await {
            Ok(Ok(result)) => result,
            Ok(Err(_)) => Err(BrowserError::SessionClosed),
            Err(_) => {
                self.pending
                    .lock()
                    .unwrap_or_else(PoisonError::into_inner)
                    .remove(&id);
                Err(BrowserError::Timeout(format!("CDP command {method}")))
            }
        }
    }
}

impl Drop for CdpConnection {
    fn drop(&mut self) {
        self.recv_task.abort();
    }
}

/// Fetches `/json/version`.
pub(super) async fn fetch_version(endpoint: &str) -> Result<BrowserVersion, BrowserError> {
    let url = format!("{endpoint}/json/version");
    let unreachable = |e: reqwest::Error| BrowserError::Unreachable {
        endpoint: endpoint.to_string(),
        reason: e.to_string(),
    };
    reqwest::get(&url)
        .await
        .map_err(unreachable)?
        .json::<BrowserVersion>()
        .await
        .map_err(unreachable)
}

async fn receive_loop(mut ws_source: WsSource, pending: Pending) {
    while let Some(msg) = ws_source.next().await {
        match msg {
            Ok(Message::Text(text)) => {
                let resp = match serde_json::from_str::<CdpResponse>(&text) {
                    Ok(resp) => resp,
                    Err(e) => {
                        tracing::warn!(error = %e, "failed to parse CDP message");
                        continue;
                    }
                };
                // Events carry no id and are not consumed.
                let Some(id) = resp.id else { continue };
                let waiter = pending
                    .lock()
                    .unwrap_or_else(PoisonError::into_inner)
                    .remove(&id);
                if let Some(tx) = waiter {
                    let result = match resp.error {
                        Some(err) => Err(BrowserError::Protocol {
                            code: err.code,
                            message: err.message,
                        }),
                        None => Ok(resp.result.unwrap_or(Value::Null)),
                    };
                    let _ = tx.send(result);
                }
            }
            Ok(Message::Close(_)) => {
                tracing::debug!("CDP WebSocket closed");
                break;
            }
            Err(e) => {
                tracing::error!(error = %e, "CDP WebSocket error");
                break;
            }
            Ok(_) => {}
        }
    }
    // Wake remaining callers so they fail fast with SessionClosed.
    pending
        .lock()
        .unwrap_or_else(PoisonError::into_inner)
        .clear();
}
