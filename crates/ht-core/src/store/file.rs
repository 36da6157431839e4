//! File-backed JSON store.
//!
//! All keys live in a single JSON object file. Writes go through a
//! temp-file + rename so a crash mid-write never leaves a torn table.

use super::KvStore;
use ht_common::{Error, Result};
use serde::Serialize;
use serde_json::{Map, Value};
use std::path::{Path, PathBuf};

/// Environment override for the data directory.
pub const ENV_DATA_DIR: &str = "HT_DATA_DIR";

const DIR_NAME: &str = "headertrack";
const STORE_FILE: &str = "store.json";

/// Key/value store persisted as one JSON object file.
pub struct JsonFileStore {
    path: PathBuf,
}

impl JsonFileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Open the store at the resolved default location.
    pub fn open_default() -> Result<Self> {
        Ok(Self::new(resolve_data_dir()?.join(STORE_FILE)))
    }

    /// Open the store file inside an explicit data directory.
    pub fn open_in(dir: &Path) -> Self {
        Self::new(dir.join(STORE_FILE))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read_all(&self, key: &str) -> Result<Map<String, Value>> {
        let content = match std::fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Map::new()),
            Err(e) => {
                return Err(Error::StorageRead {
                    key: key.to_string(),
                    reason: e.to_string(),
                })
            }
        };
        let value: Value = serde_json::from_str(&content).map_err(|e| Error::StorageRead {
            key: key.to_string(),
            reason: format!("store file is not valid JSON: {}", e),
        })?;
        match value {
            Value::Object(map) => Ok(map),
            _ => Err(Error::StorageRead {
                key: key.to_string(),
                reason: "store file is not a JSON object".to_string(),
            }),
        }
    }
}

impl KvStore for JsonFileStore {
    fn get(&self, key: &str) -> Result<Option<Value>> {
        Ok(self.read_all(key)?.get(key).cloned())
    }

    fn set(&self, key: &str, value: Value) -> Result<()> {
        let mut all = self.read_all(key)?;
        all.insert(key.to_string(), value);
        write_json_atomic(&self.path, &Value::Object(all)).map_err(|e| Error::StorageWrite {
            key: key.to_string(),
            reason: e.to_string(),
        })
    }
}

/// Resolve the data directory: explicit env override, then XDG, then the
/// platform default.
pub fn resolve_data_dir() -> Result<PathBuf> {
    if let Ok(dir) = std::env::var(ENV_DATA_DIR) {
        return Ok(PathBuf::from(dir));
    }
    if let Ok(xdg) = std::env::var("XDG_DATA_HOME") {
        return Ok(PathBuf::from(xdg).join(DIR_NAME));
    }
    if let Some(base) = dirs::data_dir() {
        return Ok(base.join(DIR_NAME));
    }
    Err(Error::StorageRead {
        key: STORE_FILE.to_string(),
        reason: "no data directory available".to_string(),
    })
}

/// Serialize `value` as pretty JSON and write it atomically.
pub(crate) fn write_json_atomic<T: Serialize>(path: &Path, value: &T) -> std::io::Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let content = serde_json::to_vec_pretty(value)
        .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))?;
    let file_name = path
        .file_name()
        .and_then(|s| s.to_str())
        .unwrap_or(STORE_FILE);
    let tmp_path = path.with_file_name(format!("{}.tmp.{}", file_name, std::process::id()));
    {
        use std::io::Write;
        let mut file = std::fs::File::create(&tmp_path)?;
        file.write_all(&content)?;
        let _ = file.sync_all();
    }
    std::fs::rename(&tmp_path, path)
}
