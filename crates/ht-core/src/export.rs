//! Local JSON export of the persisted table.

use crate::aggregator::Aggregator;
use crate::flush::flush;
use crate::store::{self, KvStore};
use ht_common::{sorted_by_count, Result};
use std::path::{Path, PathBuf};
use tracing::info;

/// Export file name for a given moment: the ISO timestamp with characters
/// unsafe for file names replaced.
pub fn export_filename(now: chrono::DateTime<chrono::Utc>) -> String {
    let iso = now.to_rfc3339_opts(chrono::SecondsFormat::Millis, true);
    format!("header-stats-{}.json", iso.replace([':', '.'], "-"))
}

/// Flush pending observations, then write the sorted table to `dir`.
///
/// Returns the path of the written file.
pub fn export_stats<S: KvStore + ?Sized>(
    aggregator: &Aggregator,
    store: &S,
    dir: &Path,
) -> Result<PathBuf> {
    flush(aggregator, store)?;

    let table = store::load_table(store)?;
    let sorted = sorted_by_count(&table);

    let path = dir.join(export_filename(chrono::Utc::now()));
    std::fs::create_dir_all(dir)?;
    std::fs::write(&path, serde_json::to_string_pretty(&sorted)?)?;

    info!(entries = sorted.len(), path = %path.display(), "exported stats");
    Ok(path)
}
