//! Wikipedia article fetching and content cleaning.
//!
//! [`ArticleExtractor`] performs exactly one outbound GET per call and turns
//! the noisy article HTML into LLM-suitable text. Cleaning is deterministic
//! and operates on a cloned document tree -- the original parse is kept
//! intact so the raw markup can be snapshotted alongside the cleaned text.
//!
//! URL validation happens before any network I/O: anything that is not an
//! `https://en.wikipedia.org/wiki/` article is rejected without a request.

use std::time::Duration;

use scraper::{ElementRef, Html, Selector};
use tracing::{debug, info, warn};

use crate::{Error, Result};

/// Accepted article URL prefix. Everything else is rejected up front.
pub const WIKIPEDIA_PREFIX: &str = "https://en.wikipedia.org/wiki/";

/// Character budget for cleaned text handed to the generation backend.
///
/// Bounds backend input size and token cost; truncation appends a `"..."`
/// marker.
pub const MAX_CONTENT_CHARS: usize = 8000;

/// Maximum number of section headings retained.
const MAX_SECTIONS: usize = 15;

/// Minimum trimmed length for a sentence candidate to survive cleaning.
const MIN_SENTENCE_CHARS: usize = 10;

/// Lowercase phrases that mark a sentence as Wikipedia boilerplate.
const BOILERPLATE_PHRASES: &[&str] = &[
    "citation needed",
    "edit this box",
    "expand this article",
    "this article needs",
];

/// Elements stripped from the content tree before text extraction, in order.
const REMOVE_SELECTORS: &[&str] = &[
    "script",
    "style",
    "noscript",
    "div.reflist",
    "div.navbox",
    "div.infobox",
    "table",
    "sup.reference",
    "div.toc",
    "div.mw-editsection",
    "span.mw-editsection",
];

/// Section headings that are navigation chrome, not article content.
const EXCLUDED_SECTIONS: &[&str] = &["Contents", "See also", "References", "External links"];

/// Everything the extractor produces for one article.
#[derive(Debug, Clone)]
pub struct Extraction {
    /// Boilerplate-free, whitespace-normalized article text, truncated to
    /// [`MAX_CONTENT_CHARS`].
    pub cleaned_text: String,
    /// Article title, `"Unknown Title"` when the page carries none.
    pub title: String,
    /// The raw HTML exactly as fetched.
    pub raw_html: String,
    /// Article section headings (h2/h3), at most [`MAX_SECTIONS`].
    pub sections: Vec<String>,
}

/// HTTP client for fetching and cleaning Wikipedia articles.
pub struct ArticleExtractor {
    client: reqwest::Client,
}

impl ArticleExtractor {
    /// Creates an extractor with the default 10 second fetch timeout.
    pub fn new() -> Result<Self> {
        Self::with_timeout(Duration::from_secs(10))
    }

    /// Creates an extractor with a custom fetch timeout (primarily for tests).
    pub fn with_timeout(timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            // Wikipedia throttles default library user agents.
            .user_agent("Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36")
            .gzip(true)
            .build()
            .map_err(Error::Fetch)?;
        Ok(Self { client })
    }

    /// Rejects anything that is not an English Wikipedia article URL.
    ///
    /// # Errors
    ///
    /// Returns `Error::InvalidSource` for any URL outside the accepted
    /// prefix. Called before any network I/O.
    pub fn validate_url(url: &str) -> Result<()> {
        if url.starts_with(WIKIPEDIA_PREFIX) {
            Ok(())
        } else {
            Err(Error::InvalidSource(url.to_string()))
        }
    }

    /// Fetches an article and returns its cleaned text, title, raw markup
    /// and section headings.
    ///
    /// # Errors
    ///
    /// - `Error::InvalidSource` when the URL fails [`Self::validate_url`]
    /// - `Error::Fetch` on transport failure or non-success status
    /// - `Error::EmptyContent` when no usable text survives cleaning
    pub async fn extract(&self, url: &str) -> Result<Extraction> {
        Self::validate_url(url)?;
        let extraction = self.fetch_and_extract(url).await?;
        info!(
            url,
            title = %extraction.title,
            chars = extraction.cleaned_text.len(),
            "scraped article"
        );
        Ok(extraction)
    }

    async fn fetch_and_extract(&self, url: &str) -> Result<Extraction> {
        let response = self.client.get(url).send().await?.error_for_status()?;
        let raw_html = response.text().await?;
        debug!(url, bytes = raw_html.len(), "fetched article HTML");

        let document = Html::parse_document(&raw_html);
        let title = extract_title(&document);
        let cleaned_text = clean_content(&document);
        if cleaned_text.trim().is_empty() {
            return Err(Error::EmptyContent);
        }
        let sections = extract_sections(&document);

        Ok(Extraction {
            cleaned_text,
            title,
            raw_html,
            sections,
        })
    }
}

// All selectors below are literal and known-valid.
#[allow(clippy::unwrap_used)]
fn sel(css: &str) -> Selector {
    Selector::parse(css).unwrap()
}

/// Extracts the article title with an ordered fallback chain:
/// `h1.firstHeading`, then `meta[property="og:title"]`, then a sentinel.
pub fn extract_title(document: &Html) -> String {
    if let Some(heading) = document.select(&sel("h1.firstHeading")).next() {
        let text = element_text(heading);
        if !text.is_empty() {
            return text;
        }
    }

    if let Some(meta) = document.select(&sel(r#"meta[property="og:title"]"#)).next() {
        if let Some(content) = meta.value().attr("content") {
            return content.trim().to_string();
        }
    }

    "Unknown Title".to_string()
}

/// Cleans the article body into LLM-suitable text.
///
/// Works on a private clone of the document tree; the caller's parse is
/// never mutated. Returns an empty string when the page has neither a
/// content container nor a body.
pub fn clean_content(document: &Html) -> String {
    let mut copy = document.clone();

    let root_id = copy
        .select(&sel("#mw-content-text"))
        .next()
        .map(|el| el.id())
        .or_else(|| {
            warn!("no #mw-content-text container, falling back to body");
            copy.select(&sel("body")).next().map(|el| el.id())
        });
    let Some(root_id) = root_id else {
        return String::new();
    };

    for css in REMOVE_SELECTORS {
        let doomed: Vec<_> = copy.select(&sel(css)).map(|el| el.id()).collect();
        for id in doomed {
            if let Some(mut node) = copy.tree.get_mut(id) {
                node.detach();
            }
        }
    }

    let flattened = copy
        .tree
        .get(root_id)
        .and_then(ElementRef::wrap)
        .map(element_text)
        .unwrap_or_default();

    truncate_for_llm(filter_sentences(&flattened))
}

/// Drops short and boilerplate sentence candidates, rejoining the rest.
///
/// Splits on `'.'`, trims each candidate, drops any with trimmed length
/// <= [`MIN_SENTENCE_CHARS`] or containing a [`BOILERPLATE_PHRASES`] entry
/// (case-insensitive), and rejoins with `". "`. Idempotent on its own
/// output.
pub fn filter_sentences(text: &str) -> String {
    text.split('.')
        .map(str::trim)
        .filter(|candidate| {
            candidate.chars().count() > MIN_SENTENCE_CHARS && {
                let lower = candidate.to_lowercase();
                !BOILERPLATE_PHRASES.iter().any(|phrase| lower.contains(phrase))
            }
        })
        .collect::<Vec<_>>()
        .join(". ")
}

/// Truncates to [`MAX_CONTENT_CHARS`] characters, appending a marker when
/// anything was cut. Counts characters, not bytes, so multi-byte text is
/// never split mid-codepoint.
pub fn truncate_for_llm(mut text: String) -> String {
    if let Some((idx, _)) = text.char_indices().nth(MAX_CONTENT_CHARS) {
        text.truncate(idx);
        text.push_str("...");
    }
    text
}

/// Collects h2/h3 section headings, minus edit controls and navigation
/// chrome, capped at [`MAX_SECTIONS`].
pub fn extract_sections(document: &Html) -> Vec<String> {
    let edit_sel = sel("span.mw-editsection");
    document
        .select(&sel("h2, h3"))
        .take(MAX_SECTIONS)
        .filter_map(|heading| {
            let mut text = element_text(heading);
            for edit in heading.select(&edit_sel) {
                let edit_text = element_text(edit);
                if !edit_text.is_empty() {
                    text = text.replace(&edit_text, "");
                }
            }
            let text = normalize_whitespace(&text);
            if text.is_empty() || EXCLUDED_SECTIONS.contains(&text.as_str()) {
                None
            } else {
                Some(text)
            }
        })
        .collect()
}

/// Flattens an element's text nodes into one whitespace-normalized string.
fn element_text(element: ElementRef<'_>) -> String {
    normalize_whitespace(&element.text().collect::<Vec<_>>().join(" "))
}

/// Collapses every whitespace run (including newlines) into one ASCII space.
fn normalize_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}
