//! Size-driven recompression of downloaded images.
//!
//! Files at or under the threshold are left alone. Larger files get one
//! metadata-stripping re-encode at quality 75; if that is still too big, the
//! first-pass output is re-encoded at quality 60 and scaled to 85%, and that
//! result is final regardless of size. Compression problems never fail an
//! item: the original file is kept and reported as uncompressed.

use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::process::Stdio;

use async_trait::async_trait;
use thiserror::Error;
use tokio::process::Command;
use tokio::sync::OnceCell;

/// Encoder settings for one re-encode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CompressionPass {
    pub quality: u8,
    pub resize_percent: Option<u8>,
}

pub const FIRST_PASS: CompressionPass = CompressionPass {
    quality: 75,
    resize_percent: None,
};

pub const SECOND_PASS: CompressionPass = CompressionPass {
    quality: 60,
    resize_percent: Some(85),
};

#[derive(Debug, Error)]
pub enum CompressError {
    #[error("no image tool available")]
    Unavailable,

    #[error("image tool exited with {status}: {stderr}")]
    Failed { status: String, stderr: String },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Re-encodes images. Always writes a new file; never edits `input`.
#[async_trait]
pub trait Compressor: Send + Sync {
    async fn is_available(&self) -> bool;

    /// Re-encodes `input` into `output` with metadata stripped and
    /// progressive encoding.
    ///
    /// # Errors
    ///
    /// Returns [`CompressError`] if the tool is missing or fails.
    async fn compress(
        &self,
        input: &Path,
        output: &Path,
        pass: CompressionPass,
    ) -> Result<(), CompressError>;
}

/// Shells out to ImageMagick (`magick`, falling back to `convert`).
pub struct ImageMagickCompressor {
    explicit: Option<PathBuf>,
    program: OnceCell<Option<PathBuf>>,
}

impl ImageMagickCompressor {
    #[must_use]
    pub fn new(explicit: Option<PathBuf>) -> Self {
        Self {
            explicit,
            program: OnceCell::new(),
        }
    }

    async fn program(&self) -> Option<&Path> {
        self.program
            .get_or_init(|| async {
                let candidates: Vec<PathBuf> = match &self.explicit {
                    Some(path) => vec![path.clone()],
                    None => vec![PathBuf::from("magick"), PathBuf::from("convert")],
                };
                for candidate in candidates {
                    if responds_to_version(&candidate).await {
                        tracing::debug!(program = %candidate.display(), "found ImageMagick");
                        return Some(candidate);
                    }
                }
                None
            })
            .await
            .as_deref()
    }
}

async fn responds_to_version(program: &Path) -> bool {
    Command::new(program)
        .arg("-version")
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status()
        .await
        .is_ok_and(|status| status.success())
}

/// Arguments for one ImageMagick invocation.
pub(crate) fn magick_args(input: &Path, output: &Path, pass: CompressionPass) -> Vec<OsString> {
    let mut args: Vec<OsString> = vec![
        input.as_os_str().to_owned(),
        "-strip".into(),
        "-interlace".into(),
        "Plane".into(),
        "-quality".into(),
        pass.quality.to_string().into(),
    ];
    if let Some(percent) = pass.resize_percent {
        args.push("-resize".into());
        args.push(format!("{percent}%").into());
    }
    args.push(output.as_os_str().to_owned());
    args
}

#[async_trait]
impl Compressor for ImageMagickCompressor {
    async fn is_available(&self) -> bool {
        self.program().await.is_some()
    }

    async fn compress(
        &self,
        input: &Path,
        output: &Path,
        pass: CompressionPass,
    ) -> Result<(), CompressError> {
        let program = self.program().await.ok_or(CompressError::Unavailable)?;
        let result = Command::new(program)
            .args(magick_args(input, output, pass))
            .stdin(Stdio::null())
            .output()
            .await?;
        if result.status.success() {
            Ok(())
        } else {
            Err(CompressError::Failed {
                status: result.status.to_string(),
                stderr: String::from_utf8_lossy(&result.stderr).trim().to_string(),
            })
        }
    }
}

/// What the policy did to a file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CompressionOutcome {
    pub original_size: u64,
    pub final_size: u64,
    pub compressed: bool,
}

impl CompressionOutcome {
    #[must_use]
    pub fn unchanged(size: u64) -> Self {
        Self {
            original_size: size,
            final_size: size,
            compressed: false,
        }
    }
}

/// Shrinks `path` in place when it exceeds `max_bytes`.
///
/// `downloaded` is the byte count the downloader wrote; it is reported as
/// both sizes if the file cannot be inspected.
pub async fn apply_policy(
    path: &Path,
    downloaded: u64,
    max_bytes: u64,
    compressor: &dyn Compressor,
) -> CompressionOutcome {
    let original_size = match tokio::fs::metadata(path).await {
        Ok(meta) => meta.len(),
        Err(e) => {
            tracing::warn!(path = %path.display(), error = %e, "cannot stat file; skipping compression");
            return CompressionOutcome::unchanged(downloaded);
        }
    };

    if original_size <= max_bytes {
        return CompressionOutcome::unchanged(original_size);
    }

    if !compressor.is_available().await {
        tracing::warn!(
            path = %path.display(),
            size = original_size,
            max_bytes,
            "file exceeds size limit but no image tool is installed; keeping original"
        );
        return CompressionOutcome::unchanged(original_size);
    }

    let first = sibling(path, "pass1");
    let second = sibling(path, "pass2");
    let outcome = match run_passes(path, &first, &second, max_bytes, compressor).await {
        Ok((chosen, final_size)) if final_size <= original_size => {
            match tokio::fs::rename(chosen, path).await {
                Ok(()) => CompressionOutcome {
                    original_size,
                    final_size,
                    compressed: true,
                },
                Err(e) => {
                    tracing::warn!(path = %path.display(), error = %e, "cannot replace original with compressed file");
                    CompressionOutcome::unchanged(original_size)
                }
            }
        }
        Ok((_, final_size)) => {
            tracing::warn!(
                path = %path.display(),
                original_size,
                final_size,
                "re-encoded file is larger than the original; keeping original"
            );
            CompressionOutcome::unchanged(original_size)
        }
        Err(e) => {
            tracing::warn!(path = %path.display(), error = %e, "compression failed; keeping original");
            CompressionOutcome::unchanged(original_size)
        }
    };

    for temp in [&first, &second] {
        let _ = tokio::fs::remove_file(temp).await;
    }

    if outcome.compressed {
        tracing::info!(
            path = %path.display(),
            original_size,
            final_size = outcome.final_size,
            "compressed"
        );
    }
    outcome
}

/// Runs the first pass and, when still over the limit, the second pass on
/// its output. Returns the file to keep and its size.
async fn run_passes<'a>(
    path: &Path,
    first: &'a Path,
    second: &'a Path,
    max_bytes: u64,
    compressor: &dyn Compressor,
) -> Result<(&'a Path, u64), CompressError> {
    compressor.compress(path, first, FIRST_PASS).await?;
    let first_size = tokio::fs::metadata(first).await?.len();
    if first_size <= max_bytes {
        return Ok((first, first_size));
    }

    compressor.compress(first, second, SECOND_PASS).await?;
    let second_size = tokio::fs::metadata(second).await?.len();
    Ok((second, second_size))
}

/// `dir/.name.tag.ext` next to `path`, so renames stay on one filesystem.
fn sibling(path: &Path, tag: &str) -> PathBuf {
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    let ext = path
        .extension()
        .map_or_else(|| "jpg".to_string(), |e| e.to_string_lossy().into_owned());
    path.with_file_name(format!(".{name}.{tag}.{ext}"))
}

#[cfg(test)]
#[path = "compress_test.rs"]
mod tests;
