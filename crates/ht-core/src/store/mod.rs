//! Persistent key/value storage.
//!
//! The store holds opaque JSON values under fixed keys: the aggregated
//! statistics table plus the two user settings. The flush engine is the
//! only writer of the table during a cycle; the scheduler clears it after a
//! confirmed upload.

pub mod file;
pub mod memory;

pub use file::JsonFileStore;
pub use memory::MemoryStore;

use ht_common::{AggregatedTable, Error, Result};
use serde_json::Value;
use tracing::warn;

/// Key of the persisted aggregated table.
pub const KEY_AGGREGATED_STATS: &str = "aggregatedStats";
/// Key of the configured collector endpoint (string URL, blank = disabled).
pub const KEY_SERVER_ENDPOINT: &str = "serverEndpoint";
/// Key of the upload interval in minutes.
pub const KEY_UPLOAD_FREQUENCY: &str = "uploadFrequency";

/// Upload interval applied when no setting is stored.
pub const DEFAULT_UPLOAD_FREQUENCY_MINUTES: u64 = 5;

/// Get/set of JSON-serializable values under string keys.
pub trait KvStore: Send + Sync {
    fn get(&self, key: &str) -> Result<Option<Value>>;
    fn set(&self, key: &str, value: Value) -> Result<()>;
}

/// Read the persisted table; a missing key is an empty table.
pub fn load_table<S: KvStore + ?Sized>(store: &S) -> Result<AggregatedTable> {
    match store.get(KEY_AGGREGATED_STATS)? {
        Some(value) => {
            serde_json::from_value(value).map_err(|e| Error::StorageRead {
                key: KEY_AGGREGATED_STATS.to_string(),
                reason: e.to_string(),
            })
        }
        None => Ok(AggregatedTable::new()),
    }
}

/// Write the full persisted table.
pub fn save_table<S: KvStore + ?Sized>(store: &S, table: &AggregatedTable) -> Result<()> {
    let value = serde_json::to_value(table).map_err(|e| Error::StorageWrite {
        key: KEY_AGGREGATED_STATS.to_string(),
        reason: e.to_string(),
    })?;
    store.set(KEY_AGGREGATED_STATS, value)
}

/// Reset the persisted table to empty.
pub fn clear_table<S: KvStore + ?Sized>(store: &S) -> Result<()> {
    save_table(store, &AggregatedTable::new())
}

/// Read the configured endpoint; blank or missing means local-only mode.
pub fn load_endpoint<S: KvStore + ?Sized>(store: &S) -> Result<Option<String>> {
    let endpoint = store
        .get(KEY_SERVER_ENDPOINT)?
        .and_then(|v| v.as_str().map(|s| s.trim().to_string()))
        .filter(|s| !s.is_empty());
    Ok(endpoint)
}

/// Read the upload interval in minutes, falling back to the default for a
/// missing or unusable value.
pub fn load_upload_frequency<S: KvStore + ?Sized>(store: &S) -> Result<u64> {
    let minutes = match store.get(KEY_UPLOAD_FREQUENCY)? {
        Some(value) => match value.as_u64() {
            Some(m) if m >= 1 => m,
            _ => {
                warn!(%value, "ignoring unusable upload frequency setting");
                DEFAULT_UPLOAD_FREQUENCY_MINUTES
            }
        },
        None => DEFAULT_UPLOAD_FREQUENCY_MINUTES,
    };
    Ok(minutes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use ht_common::{merge_entries, Direction, StatEntry};
    use serde_json::json;

    #[test]
    fn test_load_table_missing_key_is_empty() {
        let store = MemoryStore::new();
        assert!(load_table(&store).expect("load").is_empty());
    }

    #[test]
    fn test_table_roundtrip() {
        let store = MemoryStore::new();
        let mut table = AggregatedTable::new();
        merge_entries(
            &mut table,
            vec![StatEntry {
                name: "Accept".to_string(),
                value: "*/*".to_string(),
                direction: Direction::Request,
                count: 3,
            }],
        );

        save_table(&store, &table).expect("save");
        assert_eq!(load_table(&store).expect("load"), table);

        clear_table(&store).expect("clear");
        assert!(load_table(&store).expect("load").is_empty());
    }

    #[test]
    fn test_load_table_rejects_corrupt_value() {
        let store = MemoryStore::new();
        store
            .set(KEY_AGGREGATED_STATS, json!("not a table"))
            .expect("set");
        let err = load_table(&store).expect_err("corrupt table");
        assert_eq!(err.code(), 20);
    }

    #[test]
    fn test_load_endpoint_blank_is_none() {
        let store = MemoryStore::new();
        assert_eq!(load_endpoint(&store).expect("load"), None);

        store
            .set(KEY_SERVER_ENDPOINT, json!("   "))
            .expect("set");
        assert_eq!(load_endpoint(&store).expect("load"), None);

        store
            .set(KEY_SERVER_ENDPOINT, json!("http://localhost:3000/plugin"))
            .expect("set");
        assert_eq!(
            load_endpoint(&store).expect("load").as_deref(),
            Some("http://localhost:3000/plugin")
        );
    }

    #[test]
    fn test_load_upload_frequency_defaults() {
        let store = MemoryStore::new();
        assert_eq!(
            load_upload_frequency(&store).expect("load"),
            DEFAULT_UPLOAD_FREQUENCY_MINUTES
        );

        store.set(KEY_UPLOAD_FREQUENCY, json!(15)).expect("set");
        assert_eq!(load_upload_frequency(&store).expect("load"), 15);

        // Zero and non-numeric values fall back to the default.
        store.set(KEY_UPLOAD_FREQUENCY, json!(0)).expect("set");
        assert_eq!(
            load_upload_frequency(&store).expect("load"),
            DEFAULT_UPLOAD_FREQUENCY_MINUTES
        );
    }
}
