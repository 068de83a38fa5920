//! Image download with retry.

use std::path::Path;
use std::time::Duration;

use futures::StreamExt;
use reqwest::Client;
use tokio::io::AsyncWriteExt;

use crate::error::ScraperError;
use crate::parse_helpers::has_image_extension;
use crate::rate_limit::retry_with_backoff;

const IMAGE_ACCEPT: &str = "image/avif,image/webp,image/apng,image/*,*/*;q=0.8";

/// Streams resolved image URLs to disk.
///
/// Requests look like they come from a browser on the source site
/// (`User-Agent` plus `Referer`) since image CDNs commonly reject bare
/// clients. Each download gets `max_attempts` tries with linear backoff.
pub struct DownloadExecutor {
    client: Client,
    referer: String,
    max_attempts: u32,
    backoff_base_ms: u64,
}

impl DownloadExecutor {
    /// # Errors
    ///
    /// Returns [`ScraperError::Http`] if the underlying `reqwest::Client`
    /// cannot be constructed.
    pub fn new(
        timeout_secs: u64,
        user_agent: &str,
        referer: &str,
        max_attempts: u32,
        backoff_base_ms: u64,
    ) -> Result<Self, ScraperError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .connect_timeout(Duration::from_secs(10))
            .user_agent(user_agent)
            .build()?;
        Ok(Self {
            client,
            referer: referer.to_string(),
            max_attempts,
            backoff_base_ms,
        })
    }

    /// Builds an executor from process configuration. The referer is the
    /// site origin with a trailing slash.
    ///
    /// # Errors
    ///
    /// See [`DownloadExecutor::new`].
    pub fn from_app_config(config: &shotdl_core::AppConfig) -> Result<Self, ScraperError> {
        Self::new(
            config.request_timeout_secs,
            &config.user_agent,
            &format!("{}/", config.base_url.trim_end_matches('/')),
            config.max_attempts,
            config.retry_backoff_ms,
        )
    }

    /// Downloads `url` to `dest`, returning the number of bytes written.
    ///
    /// # Errors
    ///
    /// The error of the final attempt once all attempts failed:
    /// - [`ScraperError::UnexpectedStatus`] for a non-2xx response,
    /// - [`ScraperError::ContentTypeMismatch`] when neither the content type
    ///   nor the URL extension looks like an image,
    /// - [`ScraperError::Http`] / [`ScraperError::Io`] for transport or disk failures.
    pub async fn download(&self, url: &str, dest: &Path) -> Result<u64, ScraperError> {
        retry_with_backoff(self.max_attempts, self.backoff_base_ms, || {
            self.attempt(url, dest)
        })
        .await
    }

    async fn attempt(&self, url: &str, dest: &Path) -> Result<u64, ScraperError> {
        let response = self
            .client
            .get(url)
            .header(reqwest::header::REFERER, &self.referer)
            .header(reqwest::header::ACCEPT, IMAGE_ACCEPT)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(ScraperError::UnexpectedStatus {
                status: status.as_u16(),
                url: url.to_string(),
            });
        }

        let content_type = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default()
            .to_ascii_lowercase();
        if !is_image_response(&content_type, url) {
            return Err(ScraperError::ContentTypeMismatch {
                url: url.to_string(),
                content_type,
            });
        }

        match write_body(response, dest).await {
            Ok(written) => {
                tracing::debug!(url, bytes = written, dest = %dest.display(), "downloaded");
                Ok(written)
            }
            Err(e) => {
                let _ = tokio::fs::remove_file(dest).await;
                Err(e)
            }
        }
    }
}

/// Loose content check: an `image/*` type, or a generic type on a URL with
/// a known image extension.
pub(crate) fn is_image_response(content_type: &str, url: &str) -> bool {
    content_type.trim_start().starts_with("image/") || has_image_extension(url)
}

async fn write_body(response: reqwest::Response, dest: &Path) -> Result<u64, ScraperError> {
    let mut file = tokio::fs::File::create(dest).await?;
    let mut written = 0u64;
    let mut stream = response.bytes_stream();
    while let Some(chunk) = stream.next().await {
        let chunk = chunk?;
        file.write_all(&chunk).await?;
        written += chunk.len() as u64;
    }
    file.flush().await?;
    Ok(written)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_image_content_types() {
        assert!(is_image_response("image/png", "https://cdn.example.com/a"));
        assert!(is_image_response("image/webp; charset=binary", "https://cdn.example.com/a"));
    }

    #[test]
    fn accepts_generic_type_with_image_extension() {
        assert!(is_image_response(
            "application/octet-stream",
            "https://cdn.example.com/a.jpeg?resize=1600x1200"
        ));
        assert!(is_image_response("", "https://cdn.example.com/a.png"));
    }

    #[test]
    fn rejects_html_without_image_extension() {
        assert!(!is_image_response("text/html; charset=utf-8", "https://cdn.example.com/a"));
        assert!(!is_image_response("text/html", "https://cdn.example.com/error.html"));
    }
}
