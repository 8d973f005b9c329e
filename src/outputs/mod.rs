//! Append-only output sinks.
//!
//! # Output Structure
//!
//! ```text
//! output_dir/
//! ├── matched_articles.txt         # text blocks, one per article
//! ├── keyword_matches.csv          # one row per article
//! ├── resume_ledger.json           # domain -> latest completed year
//! ├── matched_articles_backup.txt  # written with --backup
//! └── keyword_matches_backup.csv
//! ```
//!
//! # Submodules
//!
//! - [`text`]: text-sink block format
//! - [`table`]: CSV sink
//! - [`backup`]: copies of both sinks

pub mod backup;
pub mod table;
pub mod text;

use crate::models::MatchedArticle;
use std::fs::File;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use table::CsvSink;
use tracing::{debug, instrument};

pub const ARTICLE_TEXT_FILE: &str = "matched_articles.txt";
pub const CSV_FILE: &str = "keyword_matches.csv";
pub const LEDGER_FILE: &str = "resume_ledger.json";
pub const ARTICLE_BACKUP_FILE: &str = "matched_articles_backup.txt";
pub const CSV_BACKUP_FILE: &str = "keyword_matches_backup.csv";

/// Paths of every file the run reads or writes inside the output directory.
#[derive(Debug, Clone)]
pub struct OutputPaths {
    pub articles: PathBuf,
    pub csv: PathBuf,
    pub ledger: PathBuf,
    pub articles_backup: PathBuf,
    pub csv_backup: PathBuf,
}

impl OutputPaths {
    pub fn in_dir(dir: &Path) -> Self {
        Self {
            articles: dir.join(ARTICLE_TEXT_FILE),
            csv: dir.join(CSV_FILE),
            ledger: dir.join(LEDGER_FILE),
            articles_backup: dir.join(ARTICLE_BACKUP_FILE),
            csv_backup: dir.join(CSV_BACKUP_FILE),
        }
    }
}

/// Destination for matched articles.
pub trait ArticleSink {
    /// Durably record one article before the pipeline moves on.
    fn append(&mut self, article: &MatchedArticle) -> io::Result<()>;
}

/// The text sink and the CSV sink, always written together.
pub struct OutputSinks {
    text: File,
    csv: CsvSink,
}

impl OutputSinks {
    /// Open both sinks in append mode, creating them when missing.
    #[instrument(level = "info", skip_all, fields(text = %paths.articles.display(), csv = %paths.csv.display()))]
    pub fn open(paths: &OutputPaths) -> io::Result<Self> {
        let text = File::options().create(true).append(true).open(&paths.articles)?;
        let csv = CsvSink::open(&paths.csv)?;
        Ok(Self { text, csv })
    }
}

impl ArticleSink for OutputSinks {
    /// The CSV row goes first: a failed row leaves no text block behind for
    /// the resume ledger to count.
    fn append(&mut self, article: &MatchedArticle) -> io::Result<()> {
        let block = text::format_block(article);
        self.csv.write_row(article)?;
        self.text.write_all(block.as_bytes())?;
        self.text.flush()?;
        self.text.sync_data()?;
        debug!(url = %article.url, "Appended article to sinks");
        Ok(())
    }
}
