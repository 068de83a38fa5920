//! The download command handler.
//!
//! Builds the browser session, downloader and compressor from config, runs
//! the pipeline, and always closes the session afterwards so a launched
//! Chrome never outlives the process.

use shotdl_core::{AppConfig, RunOptions, RunSummary};
use shotdl_scraper::{
    open_session, BrowserConfig, DownloadExecutor, Engine, ImageMagickCompressor, Pipeline,
    PipelineError, PipelineSettings,
};

/// Runs one search-and-download pass.
///
/// A blank query is rejected before any browser or network work starts.
///
/// # Errors
///
/// Returns an error if the downloader or browser session cannot be created,
/// or if the pipeline aborts the run (see `PipelineError`). Per-item
/// failures are reported inside the summary instead.
pub(crate) async fn run_download(
    config: &AppConfig,
    options: &RunOptions,
    engine: Engine,
    headless: bool,
) -> anyhow::Result<RunSummary> {
    if options.validated_query().is_none() {
        return Err(PipelineError::MissingQuery.into());
    }

    let downloader = DownloadExecutor::from_app_config(config)
        .map_err(|e| anyhow::anyhow!("failed to build download client: {e}"))?;
    let compressor = ImageMagickCompressor::new(config.magick_path.clone());
    let pipeline = Pipeline::new(
        PipelineSettings::from_app_config(config),
        &downloader,
        &compressor,
    );

    let browser_config = BrowserConfig::from_app_config(config, engine, headless);
    let mut session = open_session(&browser_config)
        .await
        .map_err(|e| anyhow::anyhow!("failed to open browser session: {e}"))?;

    let result = pipeline.run(session.as_mut(), options).await;

    if let Err(e) = session.close().await {
        tracing::warn!(error = %e, "failed to close browser session");
    }

    Ok(result?)
}
