//! Readable-text extraction from archived page markup.
//!
//! This is a best-effort heuristic tuned to common news-site layouts. The
//! first candidate block whose text is longer than the threshold wins:
//!
//! 1. the first `<article>` element
//! 2. the first `<div>` carrying one of [`ARTICLE_BODY_CLASSES`]
//! 3. `<body>`
//!
//! Anything else yields an empty string, which callers treat as "no article".

use once_cell::sync::Lazy;
use scraper::{ElementRef, Html, Selector};
use tracing::debug;

/// Site-specific article-body class names, tried in order.
pub const ARTICLE_BODY_CLASSES: [&str; 5] = [
    "content__article-body",
    "article-body",
    "l-container",
    "zn-body-text",
    "pg-rail-tall__body",
];

/// Default minimum article size in characters (exclusive).
pub const MIN_ARTICLE_CHARS: usize = 1000;

static NON_CONTENT: Lazy<Selector> = Lazy::new(|| Selector::parse("script, style, noscript").unwrap());
static ARTICLE: Lazy<Selector> = Lazy::new(|| Selector::parse("article").unwrap());
static BODY: Lazy<Selector> = Lazy::new(|| Selector::parse("body").unwrap());
static BODY_DIVS: Lazy<Vec<Selector>> = Lazy::new(|| {
    ARTICLE_BODY_CLASSES
        .iter()
        .map(|class| Selector::parse(&format!("div.{class}")).unwrap())
        .collect()
});

/// Extract article text, requiring more than `min_chars` characters.
///
/// Length is measured over the stripped text fragments without separators.
/// The returned text joins those fragments with newlines, so block-level
/// siblings end up on separate lines.
pub fn extract_article_text(html: &str, min_chars: usize) -> String {
    let mut document = Html::parse_document(html);
    strip_non_content(&mut document);

    let candidates = document
        .select(&ARTICLE)
        .next()
        .into_iter()
        .map(|el| ("article", el))
        .chain(
            BODY_DIVS
                .iter()
                .zip(ARTICLE_BODY_CLASSES)
                .filter_map(|(selector, class)| document.select(selector).next().map(|el| (class, el))),
        )
        .chain(document.select(&BODY).next().map(|el| ("body", el)));

    for (label, element) in candidates {
        let fragments = text_fragments(element);
        let chars: usize = fragments.iter().map(|f| f.chars().count()).sum();
        if chars > min_chars {
            debug!(candidate = label, chars, "Selected article block");
            return fragments.join("\n");
        }
        debug!(candidate = label, chars, "Candidate block too short");
    }

    String::new()
}

/// Detach every script/style/noscript node before any text is read.
fn strip_non_content(document: &mut Html) {
    let ids: Vec<_> = document.select(&NON_CONTENT).map(|el| el.id()).collect();
    for id in ids {
        if let Some(mut node) = document.tree.get_mut(id) {
            node.detach();
        }
    }
}

fn text_fragments(element: ElementRef<'_>) -> Vec<&str> {
    element
        .text()
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .collect()
}
