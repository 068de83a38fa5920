use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Maximum length of a sanitized candidate title.
pub const MAX_TITLE_LEN: usize = 50;

/// Title used when neither the link nor its container yields any text.
pub const UNTITLED: &str = "untitled";

/// A discovered search result pending resolution to an image URL.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Candidate {
    /// Filesystem-safe slug, see [`sanitize_title`].
    pub title: String,
    /// Absolute URL of the shot's detail page.
    pub detail_url: String,
}

impl Candidate {
    #[must_use]
    pub fn new(raw_title: &str, detail_url: impl Into<String>) -> Self {
        Self {
            title: sanitize_title(raw_title),
            detail_url: detail_url.into(),
        }
    }
}

/// Lowercases `raw`, collapses every run of non-alphanumeric characters into
/// one `-`, trims hyphens from both ends and caps the result at
/// [`MAX_TITLE_LEN`] characters. Falls back to [`UNTITLED`] when nothing is
/// left.
#[must_use]
pub fn sanitize_title(raw: &str) -> String {
    let mut slug = String::with_capacity(raw.len());
    let mut pending_hyphen = false;
    for ch in raw.chars() {
        if ch.is_ascii_alphanumeric() {
            if pending_hyphen && !slug.is_empty() {
                slug.push('-');
            }
            pending_hyphen = false;
            slug.push(ch.to_ascii_lowercase());
        } else {
            pending_hyphen = true;
        }
    }

    slug.truncate(MAX_TITLE_LEN);
    let slug = slug.trim_end_matches('-');
    if slug.is_empty() {
        UNTITLED.to_string()
    } else {
        slug.to_string()
    }
}

/// Counts collected while scanning a results page. Reported with a
/// "no results" failure so markup drift can be diagnosed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DiscoveryDiagnostics {
    pub total_links: usize,
    pub total_images: usize,
    /// Links matching the shot pattern, before de-duplication.
    pub shot_links: usize,
}

/// Requested asset quality. Accepted for compatibility; extraction always
/// picks the largest image the detail page exposes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Quality {
    Regular,
    #[default]
    Hd,
}

impl std::fmt::Display for Quality {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Quality::Regular => write!(f, "regular"),
            Quality::Hd => write!(f, "hd"),
        }
    }
}

/// Options for a single pipeline run.
#[derive(Debug, Clone)]
pub struct RunOptions {
    pub query: String,
    pub output_dir: PathBuf,
    pub count: usize,
    pub quality: Quality,
    /// Pause between consecutive items.
    pub delay_ms: u64,
    /// Compression threshold in megabytes.
    pub max_size_mb: f64,
    pub compress: bool,
}

impl Default for RunOptions {
    fn default() -> Self {
        Self {
            query: String::new(),
            output_dir: PathBuf::from("./dribbble-downloads"),
            count: 12,
            quality: Quality::Hd,
            delay_ms: 1_000,
            max_size_mb: 10.0,
            compress: true,
        }
    }
}

impl RunOptions {
    /// The trimmed query, or `None` when it is blank. Checked before any
    /// browser, network or filesystem work starts.
    #[must_use]
    pub fn validated_query(&self) -> Option<&str> {
        let query = self.query.trim();
        (!query.is_empty()).then_some(query)
    }

    /// Threshold in bytes (`MB * 1024 * 1024`).
    #[must_use]
    #[allow(
        clippy::cast_possible_truncation,
        clippy::cast_sign_loss,
        clippy::cast_precision_loss
    )]
    pub fn max_size_bytes(&self) -> u64 {
        (self.max_size_mb.max(0.0) * 1024.0 * 1024.0) as u64
    }
}

/// Outcome of one item. Failed items carry `success: false` and an `error`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DownloadResult {
    pub index: usize,
    pub filename: String,
    pub path: PathBuf,
    pub original_size: u64,
    pub size: u64,
    pub compressed: bool,
    pub compression_ratio: String,
    pub url: Option<String>,
    pub shot_url: String,
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl DownloadResult {
    /// A failed item. Sizes are zero and nothing is marked compressed.
    #[must_use]
    pub fn failed(
        index: usize,
        filename: String,
        path: PathBuf,
        shot_url: String,
        url: Option<String>,
        error: impl Into<String>,
    ) -> Self {
        Self {
            index,
            filename,
            path,
            original_size: 0,
            size: 0,
            compressed: false,
            compression_ratio: format_ratio(0, 0),
            url,
            shot_url,
            success: false,
            error: Some(error.into()),
        }
    }
}

/// Formats `1 - final/original` as a percentage with two decimals, e.g.
/// `"37.50%"`. Zero-sized originals report `"0.00%"`.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn format_ratio(original: u64, final_size: u64) -> String {
    if original == 0 {
        return "0.00%".to_string();
    }
    let ratio = (1.0 - final_size as f64 / original as f64) * 100.0;
    format!("{ratio:.2}%")
}

/// The single machine-readable result of a run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RunSummary {
    pub success: bool,
    pub query: String,
    pub output_dir: PathBuf,
    pub total_requested: usize,
    pub total_downloaded: usize,
    pub total_failed: usize,
    pub downloads: Vec<DownloadResult>,
}

impl RunSummary {
    /// Builds a summary whose totals are derived from `downloads`, so
    /// `total_requested == total_downloaded + total_failed` always holds.
    #[must_use]
    pub fn from_results(query: String, output_dir: PathBuf, downloads: Vec<DownloadResult>) -> Self {
        let total_downloaded = downloads.iter().filter(|d| d.success).count();
        Self {
            success: true,
            query,
            output_dir,
            total_requested: downloads.len(),
            total_downloaded,
            total_failed: downloads.len() - total_downloaded,
            downloads,
        }
    }
}
