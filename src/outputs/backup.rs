//! Backup copies of the two output sinks.

use super::OutputPaths;
use tokio::fs;
use tracing::{info, instrument, warn};

/// Copy both sinks to their backup paths.
///
/// Returns `true` when both copies succeeded. Failures are logged and never
/// abort the run.
#[instrument(level = "info", skip_all)]
pub async fn backup_sinks(paths: &OutputPaths) -> bool {
    let mut ok = true;
    for (from, to) in [
        (&paths.articles, &paths.articles_backup),
        (&paths.csv, &paths.csv_backup),
    ] {
        match fs::copy(from, to).await {
            Ok(bytes) => info!(from = %from.display(), to = %to.display(), bytes, "Backed up sink"),
            Err(e) => {
                warn!(from = %from.display(), error = %e, "Backup failed");
                ok = false;
            }
        }
    }
    ok
}
