//! Multi-keyword URL filtering.
//!
//! All keywords are compiled into one Aho-Corasick automaton so each URL is
//! scanned once, independent of how many keywords the list holds.

use aho_corasick::{AhoCorasick, BuildError};
use std::collections::{BTreeSet, HashSet};
use std::error::Error;
use std::path::Path;
use tracing::{debug, info, instrument};

/// Case-insensitive matcher over a fixed keyword list.
#[derive(Debug)]
pub struct KeywordMatcher {
    automaton: AhoCorasick,
    /// Original spelling per pattern id.
    keywords: Vec<String>,
}

impl KeywordMatcher {
    /// Compile `keywords` into a matcher.
    ///
    /// Keywords are lowercased; blank entries are ignored and keywords that
    /// differ only by case keep the first spelling seen.
    pub fn new<I, S>(keywords: I) -> Result<Self, BuildError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut seen = HashSet::new();
        let mut patterns = Vec::new();
        let mut originals = Vec::new();

        for keyword in keywords {
            let keyword = keyword.as_ref().trim();
            if keyword.is_empty() {
                continue;
            }
            let lowered = keyword.to_lowercase();
            if seen.insert(lowered.clone()) {
                patterns.push(lowered);
                originals.push(keyword.to_string());
            }
        }

        let automaton = AhoCorasick::new(&patterns)?;
        debug!(patterns = patterns.len(), "Compiled keyword automaton");
        Ok(Self {
            automaton,
            keywords: originals,
        })
    }

    /// Distinct keywords occurring anywhere in `text`, ignoring case.
    ///
    /// An empty set means the URL should not be fetched.
    pub fn matches(&self, text: &str) -> BTreeSet<String> {
        let lowered = text.to_lowercase();
        self.automaton
            .find_overlapping_iter(&lowered)
            .map(|m| self.keywords[m.pattern().as_usize()].clone())
            .collect()
    }

    pub fn len(&self) -> usize {
        self.keywords.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keywords.is_empty()
    }
}

/// Load a keyword list with one keyword per line.
#[instrument(level = "info", skip_all, fields(path = %path.display()))]
pub fn load_keywords(path: &Path) -> Result<Vec<String>, Box<dyn Error>> {
    let raw = std::fs::read_to_string(path)?;
    let keywords: Vec<String> = raw
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(str::to_string)
        .collect();
    info!(count = keywords.len(), "Loaded keywords");
    Ok(keywords)
}
