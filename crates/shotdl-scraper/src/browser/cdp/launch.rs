//! Starting a local Chrome with remote debugging enabled.

use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::{Duration, Instant};

use tokio::process::{Child, Command};

use super::connection::fetch_version;
use crate::browser::BrowserError;

const CHROME_CANDIDATES: &[&str] = &[
    "google-chrome",
    "google-chrome-stable",
    "chromium",
    "chromium-browser",
];

const STARTUP_TIMEOUT: Duration = Duration::from_secs(10);

/// A browser process owned by the session. Killed on drop.
pub(super) struct LaunchedBrowser {
    child: Child,
    endpoint: String,
    // Held so the profile directory outlives the process.
    _profile_dir: tempfile::TempDir,
}

impl LaunchedBrowser {
    pub(super) fn endpoint(&self) -> &str {
        &self.endpoint
    }

    pub(super) async fn shutdown(&mut self) {
        if let Err(e) = self.child.kill().await {
            tracing::debug!(error = %e, "browser process already exited");
        }
    }
}

/// Launches Chrome and waits until its DevTools endpoint answers.
pub(super) async fn launch(
    chrome_path: Option<&Path>,
    headless: bool,
) -> Result<LaunchedBrowser, BrowserError> {
    let binary = match chrome_path {
        Some(path) => path.to_path_buf(),
        None => find_on_path(CHROME_CANDIDATES).ok_or_else(|| {
            BrowserError::Launch(format!(
                "no Chrome binary found on PATH (tried {}); set SHOTDL_CHROME_PATH or SHOTDL_CDP_ENDPOINT",
                CHROME_CANDIDATES.join(", ")
            ))
        })?,
    };

    let port = free_port()?;
    let profile_dir = tempfile::tempdir().map_err(|e| BrowserError::Launch(e.to_string()))?;

    let mut cmd = Command::new(&binary);
    cmd.arg(format!("--remote-debugging-port={port}"))
        .arg(format!("--user-data-dir={}", profile_dir.path().display()))
        .args([
            "--no-first-run",
            "--no-default-browser-check",
            "--disable-gpu",
            "about:blank",
        ])
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .kill_on_drop(true);
    if headless {
        cmd.arg("--headless=new");
    }

    let child = cmd
        .spawn()
        .map_err(|e| BrowserError::Launch(format!("{}: {e}", binary.display())))?;
    let endpoint = format!("http://127.0.0.1:{port}");
    tracing::info!(binary = %binary.display(), %endpoint, headless, "launched browser");

    let mut browser = LaunchedBrowser {
        child,
        endpoint,
        _profile_dir: profile_dir,
    };

    let started = Instant::now();
    loop {
        match fetch_version(&browser.endpoint).await {
            Ok(_) => return Ok(browser),
            Err(e) if started.elapsed() >= STARTUP_TIMEOUT => {
                browser.shutdown().await;
                return Err(BrowserError::Launch(format!(
                    "DevTools endpoint did not come up within {}s: {e}",
                    STARTUP_TIMEOUT.as_secs()
                )));
            }
            Err(_) => tokio::time::sleep(Duration::from_millis(100)).await,
        }
    }
}

fn find_on_path(candidates: &[&str]) -> Option<PathBuf> {
    let path_var = std::env::var_os("PATH")?;
    std::env::split_paths(&path_var)
        .flat_map(|dir| candidates.iter().map(move |name| dir.join(name)))
        .find(|p| p.is_file())
}

fn free_port() -> Result<u16, BrowserError> {
    let listener = std::net::TcpListener::bind(("127.0.0.1", 0))
        .map_err(|e| BrowserError::Launch(format!("no free local port: {e}")))?;
    listener
        .local_addr()
        .map(|addr| addr.port())
        .map_err(|e| BrowserError::Launch(e.to_string()))
}
