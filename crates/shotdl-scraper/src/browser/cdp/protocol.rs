//! CDP wire messages.

use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Serialize)]
pub(crate) struct CdpRequest {
    pub id: u64,
    pub method: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub params: Option<Value>,
    #[serde(rename = "sessionId", skip_serializing_if = "Option::is_none")]
    pub session_id: Option<String>,
}

/// Either a command response (`id` set) or an event (`method` set).
#[derive(Debug, Deserialize)]
pub(crate) struct CdpResponse {
    pub id: Option<u64>,
    pub result: Option<Value>,
    pub error: Option<CdpErrorResponse>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct CdpErrorResponse {
    pub code: i64,
    pub message: String,
}

/// `/json/version` payload. Chrome uses PascalCase keys here.
#[derive(Debug, Clone, Deserialize)]
pub(crate) struct BrowserVersion {
    #[serde(rename = "Browser")]
    pub browser: String,
    #[serde(rename = "webSocketDebuggerUrl")]
    pub web_socket_debugger_url: String,
}
