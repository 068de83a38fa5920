//! Search-results scanning.
//!
//! Loads the results page for a query and turns its shot links into an
//! ordered, de-duplicated list of [`Candidate`]s. Results pages render
//! client-side and lazy-load on scroll, so the scan is repeated after
//! scrolling until enough candidates are visible or the page stops growing.

use std::collections::HashSet;
use std::sync::LazyLock;
use std::time::Duration;

use percent_encoding::{utf8_percent_encode, NON_ALPHANUMERIC};
use scraper::{ElementRef, Html, Selector};
use url::Url;

use shotdl_core::{Candidate, DiscoveryDiagnostics};

use crate::browser::{BrowserError, BrowserSession, WaitStrategy, SCROLL_SCRIPT};
use crate::parse_helpers::{normalize_text, shot_detail_url};

static LINK_SEL: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("a[href]").expect("valid selector"));
static ANY_LINK_SEL: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("a").expect("valid selector"));
static IMG_SEL: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("img").expect("valid selector"));
static HEADING_SEL: LazyLock<Selector> = LazyLock::new(|| {
    Selector::parse("h1, h2, h3, h4, h5, h6, [class*='title']").expect("valid selector")
});

/// Result of scanning one results page.
#[derive(Debug, Clone, Default)]
pub struct Discovery {
    pub candidates: Vec<Candidate>,
    pub diagnostics: DiscoveryDiagnostics,
}

/// Timing knobs for [`discover`].
#[derive(Debug, Clone, Copy)]
pub struct ScanOptions {
    pub nav_timeout_ms: u64,
    pub settle_ms: u64,
    pub max_scroll_rounds: u32,
}

/// Builds `{base_url}/search/{query}` with the query percent-encoded.
#[must_use]
pub fn search_url(base_url: &str, query: &str) -> String {
    let encoded = utf8_percent_encode(query.trim(), NON_ALPHANUMERIC);
    format!("{}/search/{encoded}", base_url.trim_end_matches('/'))
}

/// Navigates to `url` and scans it, scrolling for more results while fewer
/// than `wanted` candidates are visible.
///
/// # Errors
///
/// Returns the [`BrowserError`] from the initial navigation or the first
/// content read. Failures while scrolling end the scan with what was found.
pub async fn discover(
    session: &mut dyn BrowserSession,
    url: &str,
    wanted: usize,
    options: ScanOptions,
) -> Result<Discovery, BrowserError> {
    session
        .navigate(url, WaitStrategy::NetworkIdle, options.nav_timeout_ms)
        .await?;
    settle(options.settle_ms).await;

    let mut discovery = scan_results(&session.content().await?, url);
    tracing::info!(
        url,
        found = discovery.candidates.len(),
        "scanned results page"
    );

    let mut round = 0;
    while discovery.candidates.len() < wanted && round < options.max_scroll_rounds {
        round += 1;
        if let Err(e) = session.evaluate(SCROLL_SCRIPT).await {
            tracing::debug!(error = %e, "scrolling unavailable; keeping current results");
            break;
        }
        settle(options.settle_ms).await;

        let html = match session.content().await {
            Ok(html) => html,
            Err(e) => {
                tracing::warn!(error = %e, "could not re-read results page after scroll");
                break;
            }
        };
        let next = scan_results(&html, url);
        if next.candidates.len() <= discovery.candidates.len() {
            break;
        }
        tracing::info!(round, found = next.candidates.len(), "loaded more results");
        discovery = next;
    }

    Ok(discovery)
}

async fn settle(ms: u64) {
    if ms > 0 {
        tokio::time::sleep(Duration::from_millis(ms)).await;
    }
}

/// Extracts shot candidates from rendered results markup, in document order.
#[must_use]
pub fn scan_results(html: &str, page_url: &str) -> Discovery {
    let Ok(base) = Url::parse(page_url) else {
        tracing::warn!(page_url, "results page URL is not absolute; nothing to scan");
        return Discovery::default();
    };
    let document = Html::parse_document(html);

    let mut diagnostics = DiscoveryDiagnostics {
        total_links: document.select(&ANY_LINK_SEL).count(),
        total_images: document.select(&IMG_SEL).count(),
        shot_links: 0,
    };

    let mut seen: HashSet<String> = HashSet::new();
    let mut candidates = Vec::new();
    for link in document.select(&LINK_SEL) {
        let Some(detail_url) = link
            .value()
            .attr("href")
            .and_then(|href| shot_detail_url(&base, href))
        else {
            continue;
        };
        diagnostics.shot_links += 1;
        if !seen.insert(detail_url.clone()) {
            continue;
        }
        let title = link_title(link);
        candidates.push(Candidate::new(&title, detail_url));
    }

    Discovery {
        candidates,
        diagnostics,
    }
}

/// The link's own text, else the heading of its nearest result container.
fn link_title(link: ElementRef<'_>) -> String {
    let own = normalize_text(&link.text().collect::<String>());
    if !own.is_empty() {
        return own;
    }

    let Some(container) = link
        .ancestors()
        .filter_map(ElementRef::wrap)
        .find(is_result_container)
    else {
        return String::new();
    };

    container
        .select(&HEADING_SEL)
        .map(|heading| normalize_text(&heading.text().collect::<String>()))
        .find(|text| !text.is_empty())
        .unwrap_or_default()
}

fn is_result_container(element: &ElementRef<'_>) -> bool {
    let el = element.value();
    matches!(el.name(), "li" | "article")
        || el
            .attr("class")
            .is_some_and(|class| class.to_ascii_lowercase().contains("shot"))
}

#[cfg(test)]
#[path = "discovery_test.rs"]
mod tests;
