//! CSV sink: `source,url,year,matched_keywords`.

use crate::models::MatchedArticle;
use itertools::Itertools;
use std::fs::File;
use std::io;
use std::path::Path;

const HEADER: [&str; 4] = ["source", "url", "year", "matched_keywords"];

/// Append-mode CSV writer that emits the header only for a new file.
pub struct CsvSink {
    writer: csv::Writer<File>,
}

impl CsvSink {
    pub fn open(path: &Path) -> io::Result<Self> {
        Self::from_file(File::options().create(true).append(true).open(path)?)
    }

    /// Wrap an already opened file, writing the header when it is empty.
    pub fn from_file(file: File) -> io::Result<Self> {
        let is_new = file.metadata()?.len() == 0;
        let mut writer = csv::WriterBuilder::new().has_headers(false).from_writer(file);
        if is_new {
            writer.write_record(HEADER)?;
            writer.flush()?;
        }
        Ok(Self { writer })
    }

    /// Write one row and flush it to the file.
    pub fn write_row(&mut self, article: &MatchedArticle) -> io::Result<()> {
        let year = article.year.to_string();
        let keywords = article.keywords.iter().join(";");
        self.writer
            .write_record([
                article.source_name.as_str(),
                article.url.as_str(),
                year.as_str(),
                keywords.as_str(),
            ])?;
        self.writer.flush()?;
        self.writer.get_ref().sync_data()
    }
}
