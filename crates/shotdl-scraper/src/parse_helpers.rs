//! Small URL and attribute helpers shared by discovery and resolution.

use std::sync::LazyLock;

use regex::Regex;
use url::Url;

/// A shot detail path: the segment after `/shots/` starts with digits.
/// `/shots/popular` and similar listing links do not match.
static SHOT_PATH_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?:^|/)shots/\d+").expect("valid shot path regex"));

/// Extensions accepted as images when a CDN sends a generic content type.
pub(crate) const IMAGE_EXTENSIONS: &[&str] = &[
    "jpg", "jpeg", "png", "gif", "webp", "avif", "bmp", "svg", "tif", "tiff",
];

/// Resolves `candidate` against `base`, returning `None` for empty,
/// `data:` and unparseable values.
pub(crate) fn absolutize_url(base: &Url, candidate: &str) -> Option<String> {
    let candidate = candidate.trim();
    if candidate.is_empty() || candidate.starts_with("data:") {
        return None;
    }
    base.join(candidate).ok().map(|u| u.to_string())
}

/// Normalized detail URL for a shot link, or `None` if `href` is not one.
/// Query and fragment are dropped so the same shot linked twice dedupes.
pub(crate) fn shot_detail_url(base: &Url, href: &str) -> Option<String> {
    let mut url = base.join(href.trim()).ok()?;
    if !matches!(url.scheme(), "http" | "https") || !SHOT_PATH_RE.is_match(url.path()) {
        return None;
    }
    url.set_query(None);
    url.set_fragment(None);
    Some(url.to_string())
}

/// The last candidate URL of a `srcset` attribute, which by convention is
/// the highest-density variant.
///
/// URLs may contain commas (`/w_800,h_600/a.png`), so a candidate's URL runs
/// to the next whitespace; a comma only separates candidates when it trails
/// the URL or follows its descriptor.
pub(crate) fn srcset_last(srcset: &str) -> Option<&str> {
    let mut rest = srcset;
    let mut last = None;
    loop {
        rest = rest.trim_start_matches(|c: char| c.is_whitespace() || c == ',');
        if rest.is_empty() {
            return last;
        }

        let end = rest.find(char::is_whitespace).unwrap_or(rest.len());
        let (token, after) = rest.split_at(end);
        let url = token.trim_end_matches(',');
        if !url.is_empty() {
            last = Some(url);
        }

        rest = if url.len() < token.len() {
            // No descriptor; the trailing comma already ended this candidate.
            after
        } else {
            after.find(',').map_or("", |i| &after[i + 1..])
        };
    }
}

/// `true` when the URL path ends in a known image extension.
pub(crate) fn has_image_extension(url: &str) -> bool {
    let path = Url::parse(url).map_or_else(
        |_| url.split(['?', '#']).next().unwrap_or(url).to_string(),
        |u| u.path().to_string(),
    );
    path.rsplit_once('.').is_some_and(|(_, ext)| {
        IMAGE_EXTENSIONS
            .iter()
            .any(|known| ext.eq_ignore_ascii_case(known))
    })
}

/// Parses a declared pixel dimension such as `"800"` or `"800px"`.
pub(crate) fn parse_dimension(raw: &str) -> Option<u32> {
    raw.trim()
        .trim_end_matches("px")
        .trim()
        .parse::<u32>()
        .ok()
}

/// Collapses internal whitespace and trims.
pub(crate) fn normalize_text(raw: &str) -> String {
    raw.split_whitespace().collect::<Vec<_>>().join(" ")
}
