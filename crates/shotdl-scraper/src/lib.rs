pub mod browser;
pub mod compress;
pub mod discovery;
pub mod download;
pub mod error;
pub(crate) mod parse_helpers;
pub mod pipeline;
pub mod rate_limit;
pub mod resolver;

pub use browser::{open_session, BrowserConfig, BrowserError, BrowserSession, Engine};
pub use compress::{apply_policy, CompressionOutcome, Compressor, ImageMagickCompressor};
pub use discovery::{discover, scan_results, search_url, Discovery, ScanOptions};
pub use download::DownloadExecutor;
pub use error::{PipelineError, ScraperError};
pub use pipeline::{Pipeline, PipelineSettings};
pub use resolver::{extract_image_url, resolve};
