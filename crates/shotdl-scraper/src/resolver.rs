//! Detail-page image resolution.
//!
//! A shot's detail page exposes its artwork in several places depending on
//! page version. Extraction runs an ordered list of strategies over the
//! rendered markup; the first one that yields a URL wins.

use std::sync::LazyLock;
use std::time::Duration;

use scraper::{Html, Selector};
use url::Url;

use shotdl_core::Candidate;

use crate::browser::{BrowserSession, WaitStrategy};
use crate::parse_helpers::{absolutize_url, parse_dimension, srcset_last};

/// Images at or below this size on both axes are thumbnails, avatars or UI.
const MIN_PRIMARY_DIMENSION: u32 = 400;

static OG_IMAGE_SEL: LazyLock<Selector> = LazyLock::new(|| {
    Selector::parse(r#"meta[property="og:image"], meta[name="og:image"]"#)
        .expect("valid selector")
});
static IMG_SEL: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("img").expect("valid selector"));

type Strategy = fn(&Html, &Url) -> Option<String>;

const STRATEGIES: &[(&str, Strategy)] = &[
    ("og:image", og_image),
    ("shot image", shot_image),
    ("largest image", largest_image),
];

/// Visits the candidate's detail page and returns its best image URL.
///
/// Never fails: navigation and evaluation errors are logged and reported
/// as `None` so one bad item does not stop the batch.
pub async fn resolve(
    session: &mut dyn BrowserSession,
    candidate: &Candidate,
    nav_timeout_ms: u64,
    settle_ms: u64,
) -> Option<String> {
    let url = candidate.detail_url.as_str();
    if let Err(e) = session
        .navigate(url, WaitStrategy::NetworkIdle, nav_timeout_ms)
        .await
    {
        tracing::warn!(shot = url, error = %e, "could not open shot page");
        return None;
    }
    if settle_ms > 0 {
        tokio::time::sleep(Duration::from_millis(settle_ms)).await;
    }

    let html = match session.content().await {
        Ok(html) => html,
        Err(e) => {
            tracing::warn!(shot = url, error = %e, "could not read shot page");
            return None;
        }
    };

    let found = extract_image_url(&html, url);
    if found.is_none() {
        tracing::warn!(shot = url, "no image found on shot page");
    }
    found
}

/// Runs the extraction strategies in priority order over `html`.
#[must_use]
pub fn extract_image_url(html: &str, page_url: &str) -> Option<String> {
    let base = Url::parse(page_url).ok()?;
    let document = Html::parse_document(html);
    STRATEGIES.iter().find_map(|(name, strategy)| {
        let url = strategy(&document, &base)?;
        tracing::debug!(strategy = name, %url, "resolved image");
        Some(url)
    })
}

fn og_image(document: &Html, base: &Url) -> Option<String> {
    document
        .select(&OG_IMAGE_SEL)
        .filter_map(|meta| meta.value().attr("content"))
        .find_map(|content| absolutize_url(base, content))
}

fn shot_image(document: &Html, base: &Url) -> Option<String> {
    document
        .select(&IMG_SEL)
        .filter(|img| {
            let el = img.value();
            [el.attr("alt"), el.attr("class")]
                .into_iter()
                .flatten()
                .any(|hint| hint.to_ascii_lowercase().contains("shot"))
        })
        .find_map(|img| {
            let el = img.value();
            el.attr("src")
                .and_then(|src| absolutize_url(base, src))
                .or_else(|| el.attr("data-src").and_then(|src| absolutize_url(base, src)))
        })
}

fn largest_image(document: &Html, base: &Url) -> Option<String> {
    let mut best: Option<(u64, scraper::ElementRef<'_>)> = None;
    for img in document.select(&IMG_SEL) {
        let el = img.value();
        let width = el.attr("width").and_then(parse_dimension);
        let height = el.attr("height").and_then(parse_dimension);
        let large = width.is_some_and(|w| w > MIN_PRIMARY_DIMENSION)
            || height.is_some_and(|h| h > MIN_PRIMARY_DIMENSION);
        if !large {
            continue;
        }
        // A single declared dimension is treated as a square.
        let w = u64::from(width.or(height).unwrap_or_default());
        let h = u64::from(height.or(width).unwrap_or_default());
        let area = w * h;
        if best.as_ref().map_or(true, |(best_area, _)| area > *best_area) {
            best = Some((area, img));
        }
    }

    let (_, img) = best?;
    let el = img.value();
    el.attr("srcset")
        .and_then(srcset_last)
        .and_then(|src| absolutize_url(base, src))
        .or_else(|| el.attr("src").and_then(|src| absolutize_url(base, src)))
}
