//! End-to-end run: discover, then resolve, download and compress each shot.
//!
//! Items are processed strictly one after another with a configurable
//! pause in between. A failing item is recorded in the summary and the run
//! moves on; only a missing query, an unusable output directory, a failed
//! search or an empty result set abort the run.

use std::path::{Path, PathBuf};
use std::time::Duration;

use shotdl_core::types::format_ratio;
use shotdl_core::{AppConfig, Candidate, DownloadResult, RunOptions, RunSummary};

use crate::browser::BrowserSession;
use crate::compress::{apply_policy, CompressionOutcome, Compressor};
use crate::discovery::{discover, search_url, ScanOptions};
use crate::download::DownloadExecutor;
use crate::error::PipelineError;
use crate::resolver::resolve;

/// Reported when a detail page yields no image URL.
pub const NO_IMAGE_ERROR: &str = "Could not extract image URL from shot page";

/// Site and timing settings that stay fixed across runs.
#[derive(Debug, Clone)]
pub struct PipelineSettings {
    pub base_url: String,
    pub nav_timeout_ms: u64,
    pub settle_ms: u64,
    pub max_scroll_rounds: u32,
}

impl PipelineSettings {
    #[must_use]
    pub fn from_app_config(config: &AppConfig) -> Self {
        Self {
            base_url: config.base_url.clone(),
            nav_timeout_ms: config.nav_timeout_ms,
            settle_ms: config.settle_ms,
            max_scroll_rounds: config.max_scroll_rounds,
        }
    }

    fn scan_options(&self) -> ScanOptions {
        ScanOptions {
            nav_timeout_ms: self.nav_timeout_ms,
            settle_ms: self.settle_ms,
            max_scroll_rounds: self.max_scroll_rounds,
        }
    }
}

pub struct Pipeline<'a> {
    settings: PipelineSettings,
    downloader: &'a DownloadExecutor,
    compressor: &'a dyn Compressor,
}

impl<'a> Pipeline<'a> {
    #[must_use]
    pub fn new(
        settings: PipelineSettings,
        downloader: &'a DownloadExecutor,
        compressor: &'a dyn Compressor,
    ) -> Self {
        Self {
            settings,
            downloader,
            compressor,
        }
    }

    /// Runs one query to completion and summarizes every attempted item.
    ///
    /// # Errors
    ///
    /// - [`PipelineError::MissingQuery`] for a blank query,
    /// - [`PipelineError::OutputDir`] if the directory cannot be created,
    /// - [`PipelineError::Search`] if the results page cannot be loaded,
    /// - [`PipelineError::NoResults`] if it contains no shots.
    pub async fn run(
        &self,
        session: &mut dyn BrowserSession,
        options: &RunOptions,
    ) -> Result<RunSummary, PipelineError> {
        let query = options.validated_query().ok_or(PipelineError::MissingQuery)?;

        let output_dir = prepare_output_dir(&options.output_dir).await?;
        tracing::info!(
            query,
            output_dir = %output_dir.display(),
            count = options.count,
            quality = %options.quality,
            "starting run"
        );
        // Extraction always targets the largest asset on the page.
        tracing::debug!(quality = %options.quality, "quality preference is advisory");

        let url = search_url(&self.settings.base_url, query);
        let discovery = discover(session, &url, options.count, self.settings.scan_options())
            .await
            .map_err(PipelineError::Search)?;
        if discovery.candidates.is_empty() {
            return Err(PipelineError::NoResults {
                query: query.to_string(),
                diagnostics: discovery.diagnostics,
            });
        }

        let selected: Vec<Candidate> = discovery
            .candidates
            .into_iter()
            .take(options.count)
            .collect();
        let total = selected.len();
        let max_bytes = options.max_size_bytes();

        let mut downloads = Vec::with_capacity(total);
        for (i, candidate) in selected.iter().enumerate() {
            let index = i + 1;
            tracing::info!(index, total, title = %candidate.title, "processing shot");
            let result = self
                .process_item(session, index, candidate, &output_dir, options, max_bytes)
                .await;
            match &result.error {
                None => tracing::info!(
                    index,
                    filename = %result.filename,
                    size = result.size,
                    compressed = result.compressed,
                    "saved"
                ),
                Some(error) => {
                    tracing::warn!(index, shot = %candidate.detail_url, error = %error, "item failed");
                }
            }
            downloads.push(result);

            if index < total && options.delay_ms > 0 {
                tokio::time::sleep(Duration::from_millis(options.delay_ms)).await;
            }
        }

        let summary = RunSummary::from_results(query.to_string(), output_dir, downloads);
        tracing::info!(
            downloaded = summary.total_downloaded,
            failed = summary.total_failed,
            "run complete"
        );
        Ok(summary)
    }

    async fn process_item(
        &self,
        session: &mut dyn BrowserSession,
        index: usize,
        candidate: &Candidate,
        output_dir: &Path,
        options: &RunOptions,
        max_bytes: u64,
    ) -> DownloadResult {
        let filename = item_filename(index, &candidate.title);
        let path = output_dir.join(&filename);
        let shot_url = candidate.detail_url.clone();

        let Some(image_url) = resolve(
            session,
            candidate,
            self.settings.nav_timeout_ms,
            self.settings.settle_ms,
        )
        .await
        else {
            return DownloadResult::failed(index, filename, path, shot_url, None, NO_IMAGE_ERROR);
        };

        let written = match self.downloader.download(&image_url, &path).await {
            Ok(written) => written,
            Err(e) => {
                return DownloadResult::failed(
                    index,
                    filename,
                    path,
                    shot_url,
                    Some(image_url),
                    e.to_string(),
                );
            }
        };

        let outcome = if options.compress {
            apply_policy(&path, written, max_bytes, self.compressor).await
        } else {
            CompressionOutcome::unchanged(written)
        };

        DownloadResult {
            index,
            filename,
            path,
            original_size: outcome.original_size,
            size: outcome.final_size,
            compressed: outcome.compressed,
            compression_ratio: format_ratio(outcome.original_size, outcome.final_size),
            url: Some(image_url),
            shot_url,
            success: true,
            error: None,
        }
    }
}

/// `NNN-title.jpg`, index zero-padded to three digits.
#[must_use]
pub fn item_filename(index: usize, title: &str) -> String {
    format!("{index:03}-{title}.jpg")
}

async fn prepare_output_dir(dir: &Path) -> Result<PathBuf, PipelineError> {
    let to_error = |source: std::io::Error| PipelineError::OutputDir {
        path: dir.display().to_string(),
        source,
    };
    tokio::fs::create_dir_all(dir).await.map_err(to_error)?;
    tokio::fs::canonicalize(dir).await.map_err(to_error)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn filename_pads_index() {
        assert_eq!(item_filename(1, "minimal-logo"), "001-minimal-logo.jpg");
        assert_eq!(item_filename(42, "untitled"), "042-untitled.jpg");
        assert_eq!(item_filename(1234, "x"), "1234-x.jpg");
    }

    #[tokio::test]
    async fn output_dir_is_created_and_made_absolute() {
        let root = tempfile::tempdir().unwrap();
        let nested = root.path().join("a").join("b");
        let resolved = prepare_output_dir(&nested).await.unwrap();
        assert!(resolved.is_absolute());
        assert!(resolved.is_dir());
    }

    #[tokio::test]
    async fn output_dir_under_a_file_is_an_error() {
        let root = tempfile::tempdir().unwrap();
        let file = root.path().join("occupied");
        std::fs::write(&file, b"x").unwrap();
        let err = prepare_output_dir(&file.join("sub")).await.unwrap_err();
        assert!(matches!(err, PipelineError::OutputDir { .. }));
    }
}
