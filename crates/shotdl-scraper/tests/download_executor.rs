//! Integration tests for `DownloadExecutor::download`.
//!
//! Each test stands up a local `wiremock` server acting as the image CDN.
//! Backoff is zero so retry tests run instantly.

use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use shotdl_scraper::{DownloadExecutor, ScraperError};

const UA: &str = "shotdl-test/0.1";
const REFERER: &str = "https://dribbble.com/";

fn test_executor(max_attempts: u32) -> DownloadExecutor {
    DownloadExecutor::new(5, UA, REFERER, max_attempts, 0).expect("failed to build executor")
}

fn png_body() -> Vec<u8> {
    let mut body = b"\x89PNG\r\n\x1a\n".to_vec();
    body.extend(std::iter::repeat(0u8).take(4_096));
    body
}

// ---------------------------------------------------------------------------
// Happy path
// ---------------------------------------------------------------------------

#[tokio::test]
async fn download_writes_body_and_returns_byte_count() {
    let server = MockServer::start().await;
    let body = png_body();

    Mock::given(method("GET"))
        .and(path("/userupload/1/original.png"))
        .and(header("referer", REFERER))
        .and(header("user-agent", UA))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("content-type", "image/png")
                .set_body_bytes(body.clone()),
        )
        .expect(1)
        .mount(&server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let dest = dir.path().join("001-logo.jpg");
    let url = format!("{}/userupload/1/original.png", server.uri());

    let written = test_executor(3).download(&url, &dest).await;

    assert!(written.is_ok(), "expected Ok, got: {written:?}");
    assert_eq!(written.unwrap(), body.len() as u64);
    assert_eq!(std::fs::read(&dest).unwrap(), body);
}

#[tokio::test]
async fn download_accepts_generic_type_when_url_has_image_extension() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/cdn/shot.webp"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("content-type", "application/octet-stream")
                .set_body_bytes(vec![1u8; 128]),
        )
        .mount(&server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let dest = dir.path().join("002-shot.jpg");
    let url = format!("{}/cdn/shot.webp", server.uri());

    let written = test_executor(1).download(&url, &dest).await.unwrap();
    assert_eq!(written, 128);
}

#[tokio::test]
async fn download_recovers_after_transient_failure() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/flaky.png"))
        .respond_with(ResponseTemplate::new(503))
        .up_to_n_times(1)
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/flaky.png"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("content-type", "image/png")
                .set_body_bytes(png_body()),
        )
        .expect(1)
        .mount(&server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let dest = dir.path().join("003-flaky.jpg");
    let url = format!("{}/flaky.png", server.uri());

    let result = test_executor(3).download(&url, &dest).await;
    assert!(result.is_ok(), "expected Ok after retry, got: {result:?}");
}

// ---------------------------------------------------------------------------
// Failures
// ---------------------------------------------------------------------------

#[tokio::test]
async fn download_gives_up_after_exactly_max_attempts() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/forbidden.png"))
        .respond_with(ResponseTemplate::new(403))
        .expect(3)
        .mount(&server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let dest = dir.path().join("004-forbidden.jpg");
    let url = format!("{}/forbidden.png", server.uri());

    let result = test_executor(3).download(&url, &dest).await;

    assert!(
        matches!(result, Err(ScraperError::UnexpectedStatus { status: 403, .. })),
        "expected UnexpectedStatus(403), got: {result:?}"
    );
    assert!(!dest.exists(), "no file should be left behind");
}

#[tokio::test]
async fn download_rejects_html_error_page() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/image/123"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("content-type", "text/html; charset=utf-8")
                .set_body_string("<html><body>Access denied</body></html>"),
        )
        .expect(2)
        .mount(&server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let dest = dir.path().join("005-denied.jpg");
    let url = format!("{}/image/123", server.uri());

    let result = test_executor(2).download(&url, &dest).await;

    match result {
        Err(ScraperError::ContentTypeMismatch { content_type, .. }) => {
            assert!(content_type.starts_with("text/html"));
        }
        other => panic!("expected ContentTypeMismatch, got: {other:?}"),
    }
    assert!(!dest.exists());
}

#[tokio::test]
async fn download_into_missing_directory_is_io_error() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/ok.png"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("content-type", "image/png")
                .set_body_bytes(png_body()),
        )
        .mount(&server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let dest = dir.path().join("missing").join("006-ok.jpg");
    let url = format!("{}/ok.png", server.uri());

    let result = test_executor(1).download(&url, &dest).await;
    assert!(
        matches!(result, Err(ScraperError::Io(_))),
        "expected Io error, got: {result:?}"
    );
}
