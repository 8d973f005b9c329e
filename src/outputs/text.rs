//! Text-sink block format.
//!
//! ```text
//! ---
//! url: <url>
//! year: <year>
//! text:
//! <extracted text>
//!
//! ```
//!
//! The ledger reads `url:` and `year:` back from the two lines after each
//! delimiter, so their position must not change.

use crate::models::MatchedArticle;

pub fn format_block(article: &MatchedArticle) -> String {
    format!(
        "---\nurl: {}\nyear: {}\ntext:\n{}\n\n",
        article.url, article.year, article.text
    )
}
