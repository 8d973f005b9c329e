//! Source list loading.

use crate::models::Source;
use serde::Deserialize;
use std::error::Error;
use std::path::Path;
use tracing::{info, instrument, warn};

/// Row shape of the source CSV; every column may be blank.
#[derive(Debug, Deserialize)]
struct SourceRow {
    name: Option<String>,
    state: Option<String>,
    city: Option<String>,
    #[serde(rename = "URL")]
    url: Option<String>,
}

impl SourceRow {
    fn into_source(self) -> Option<Source> {
        let present = |v: Option<String>| v.map(|s| s.trim().to_string()).filter(|s| !s.is_empty());
        Some(Source {
            name: present(self.name)?,
            state: present(self.state)?,
            city: present(self.city)?,
            url: present(self.url)?,
        })
    }
}

/// Load sources from a CSV file with `name,state,city,URL` columns.
///
/// Extra columns are ignored. Rows missing any of the four fields are
/// dropped with a warning.
#[instrument(level = "info", skip_all, fields(path = %path.display()))]
pub fn load_sources(path: &Path) -> Result<Vec<Source>, Box<dyn Error>> {
    let mut reader = csv::ReaderBuilder::new().flexible(true).from_path(path)?;
    let mut sources = Vec::new();
    let mut dropped = 0usize;

    for row in reader.deserialize::<SourceRow>() {
        match row?.into_source() {
            Some(source) => sources.push(source),
            None => dropped += 1,
        }
    }

    if dropped > 0 {
        warn!(dropped, "Dropped source rows with missing fields");
    }
    info!(count = sources.len(), "Loaded sources");
    Ok(sources)
}
