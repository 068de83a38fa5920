mod output;
mod run;

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, ValueEnum};
use tracing_subscriber::EnvFilter;

use shotdl_core::{Quality, RunOptions};
use shotdl_scraper::Engine;

#[derive(Debug, Parser)]
#[command(name = "shotdl")]
#[command(about = "Search Dribbble and download shot images")]
struct Cli {
    /// Search query
    #[arg(short, long)]
    query: Option<String>,

    /// Directory to save images into
    #[arg(short, long, default_value = "./dribbble-downloads")]
    output: PathBuf,

    /// Number of images to download
    #[arg(short, long, default_value_t = 12, value_parser = clap::value_parser!(u64).range(1..))]
    count: u64,

    /// Preferred image quality (advisory)
    #[arg(long, value_enum, default_value_t = QualityArg::Hd)]
    quality: QualityArg,

    /// Pause between downloads in milliseconds
    #[arg(long, default_value_t = 1000)]
    delay: u64,

    /// Compress files larger than this many megabytes
    #[arg(long = "max-size", default_value_t = 10.0)]
    max_size: f64,

    /// Keep downloaded files as-is
    #[arg(long = "no-compress")]
    no_compress: bool,

    /// Show the browser window
    #[arg(long)]
    headed: bool,

    /// Page loading backend
    #[arg(long, value_enum, default_value_t = EngineArg::Cdp)]
    engine: EngineArg,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum QualityArg {
    Regular,
    Hd,
}

impl From<QualityArg> for Quality {
    fn from(arg: QualityArg) -> Self {
        match arg {
            QualityArg::Regular => Quality::Regular,
            QualityArg::Hd => Quality::Hd,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum EngineArg {
    /// Chrome over the DevTools protocol
    Cdp,
    /// Plain HTTP fetch, no JavaScript
    Http,
}

impl From<EngineArg> for Engine {
    fn from(arg: EngineArg) -> Self {
        match arg {
            EngineArg::Cdp => Engine::Cdp,
            EngineArg::Http => Engine::Http,
        }
    }
}

impl Cli {
    fn run_options(&self) -> RunOptions {
        RunOptions {
            query: self.query.clone().unwrap_or_default(),
            output_dir: self.output.clone(),
            count: usize::try_from(self.count).unwrap_or(usize::MAX),
            quality: self.quality.into(),
            delay_ms: self.delay,
            max_size_mb: self.max_size,
            compress: !self.no_compress,
        }
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    // Also loads `.env`.
    let config = match shotdl_core::load_app_config() {
        Ok(config) => config,
        Err(err) => return output::report_failure(&err.into()),
    };

    // Logs go to stderr; stdout carries only the JSON summary.
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(config.log_level.clone()))
        .unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .init();

    let options = cli.run_options();
    match run::run_download(&config, &options, cli.engine.into(), !cli.headed).await {
        Ok(summary) => output::report_success(&summary),
        Err(err) => output::report_failure(&err),
    }
}

#[cfg(test)]
mod tests;
