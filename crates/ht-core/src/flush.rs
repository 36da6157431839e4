//! Flush: merge the drained pending buffer into the persisted table.

use crate::aggregator::Aggregator;
use crate::store::{self, KvStore};
use ht_common::{merge_entries, Result};
use tracing::debug;

/// Drain the pending buffer and merge it into the persisted table.
///
/// Returns the number of entries flushed. An empty buffer is a no-op that
/// touches no storage. A storage failure propagates; the drained batch is
/// then lost — the deliberate best-effort trade-off of this pipeline.
pub fn flush<S: KvStore + ?Sized>(aggregator: &Aggregator, store: &S) -> Result<usize> {
    if aggregator.is_empty() {
        return Ok(0);
    }

    let drained = aggregator.drain();
    let count = drained.len();

    let mut table = store::load_table(store)?;
    merge_entries(&mut table, drained);
    store::save_table(store, &table)?;

    debug!(entries = count, "flushed pending stats to storage");
    Ok(count)
}
