// Rich-text facet detection for Bluesky posts.
//
// Facets annotate byte ranges of the UTF-8 post text. Mentions, links and
// hashtags are recognised; the text itself is never modified.

use once_cell::sync::Lazy;
use regex::Regex;
use reqwest::Url;
use serde::Serialize;

const MAX_TAG_CHARS: usize = 64;

static MENTION_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?:^|\s|\()(@[a-zA-Z0-9](?:[a-zA-Z0-9.-]*[a-zA-Z0-9])?)").expect("mention regex")
});

static LINK_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?:^|\s|\()(https?://\S+)").expect("link regex"));

// Tag bodies may contain further '#' but stop at whitespace and the
// invisible separators (soft hyphen, word joiner, zero-width spaces).
static TAG_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?:^|\s)([#＃][^\s\x{00AD}\x{2060}\x{200A}-\x{200D}\x{20E2}]+)")
        .expect("tag regex")
});

/// Byte range `[byte_start, byte_end)` in the post text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ByteSlice {
    pub byte_start: usize,
    pub byte_end: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "$type")]
pub enum FacetFeature {
    #[serde(rename = "app.bsky.richtext.facet#mention")]
    Mention { did: String },
    #[serde(rename = "app.bsky.richtext.facet#link")]
    Link { uri: String },
    #[serde(rename = "app.bsky.richtext.facet#tag")]
    Tag { tag: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Facet {
    pub index: ByteSlice,
    pub features: Vec<FacetFeature>,
}

impl Facet {
    fn new(byte_start: usize, byte_end: usize, feature: FacetFeature) -> Self {
        Facet {
            index: ByteSlice {
                byte_start,
                byte_end,
            },
            features: vec![feature],
        }
    }
}

/// Detect mention, link and tag facets in `text`.
///
/// `resolve` maps a handle (without `@`) to its DID; handles it cannot
/// resolve are left unannotated. Facets come back ordered by start offset.
pub fn detect_facets<F>(text: &str, mut resolve: F) -> Vec<Facet>
where
    F: FnMut(&str) -> Option<String>,
{
    let mut facets = Vec::new();

    for caps in MENTION_RE.captures_iter(text) {
        let Some(m) = caps.get(1) else { continue };
        let handle = &m.as_str()[1..];
        if !handle.contains('.') {
            continue;
        }
        if let Some(did) = resolve(handle) {
            facets.push(Facet::new(m.start(), m.end(), FacetFeature::Mention { did }));
        }
    }

    for caps in LINK_RE.captures_iter(text) {
        let Some(m) = caps.get(1) else { continue };
        let uri = trim_link(m.as_str());
        if !has_host(uri) {
            continue;
        }
        facets.push(Facet::new(
            m.start(),
            m.start() + uri.len(),
            FacetFeature::Link {
                uri: uri.to_string(),
            },
        ));
    }

    for caps in TAG_RE.captures_iter(text) {
        let Some(m) = caps.get(1) else { continue };
        let raw = m.as_str();
        // Skip the leading '#' or '＃', whichever width it has.
        let marker_len = raw.chars().next().map_or(1, char::len_utf8);
        let body = &raw[marker_len..];
        // "#\u{fe0f}\u{20e3}" is the keycap emoji, not a tag.
        if body.starts_with('\u{fe0f}') {
            continue;
        }
        let tag = body.trim_end_matches(is_tag_trailing_punctuation);
        if !is_valid_tag(tag) {
            continue;
        }
        facets.push(Facet::new(
            m.start(),
            m.start() + marker_len + tag.len(),
            FacetFeature::Tag {
                tag: tag.to_string(),
            },
        ));
    }

    facets.sort_by_key(|facet| facet.index.byte_start);
    facets
}

fn trim_link(uri: &str) -> &str {
    let mut uri = uri.trim_end_matches(|c: char| ".,;:!?\"'".contains(c));
    if !uri.contains('(') {
        uri = uri.trim_end_matches(')');
        uri = uri.trim_end_matches(|c: char| ".,;:!?\"'".contains(c));
    }
    uri
}

fn has_host(uri: &str) -> bool {
    Url::parse(uri)
        .ok()
        .and_then(|url| url.host_str().map(|host| !host.is_empty()))
        .unwrap_or(false)
}

fn is_tag_trailing_punctuation(c: char) -> bool {
    c.is_ascii_punctuation() || matches!(c, '…' | '、' | '。' | '！' | '？' | '，')
}

fn is_valid_tag(tag: &str) -> bool {
    let chars = tag.chars().count();
    chars > 0 && chars <= MAX_TAG_CHARS && !tag.chars().all(|c| c.is_ascii_digit())
}
