use thiserror::Error;

use crate::browser::BrowserError;
use shotdl_core::DiscoveryDiagnostics;

#[derive(Debug, Error)]
pub enum ScraperError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("unexpected HTTP status {status} from {url}")]
    UnexpectedStatus { status: u16, url: String },

    #[error("response from {url} is not an image (content-type: {content_type})")]
    ContentTypeMismatch { url: String, content_type: String },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Errors that abort a whole pipeline run. Per-item failures never surface
/// here; they are folded into the item's `DownloadResult`.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("search query is required")]
    MissingQuery,

    #[error("no shots found for \"{query}\"")]
    NoResults {
        query: String,
        diagnostics: DiscoveryDiagnostics,
    },

    #[error("search page navigation failed: {0}")]
    Search(#[source] BrowserError),

    #[error("cannot prepare output directory {path}: {source}")]
    OutputDir {
        path: String,
        #[source]
        source: std::io::Error,
    },
}
