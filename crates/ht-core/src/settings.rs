//! User-adjustable collection settings.
//!
//! A blank endpoint disables uploads (local-only mode); anything else must
//! be a parseable URL. The upload frequency is whole minutes, at least one.

use crate::store::{KvStore, KEY_SERVER_ENDPOINT, KEY_UPLOAD_FREQUENCY};
use ht_common::{Error, Result};
use serde_json::{json, Value};
use tracing::info;

/// Store the collector endpoint; an empty string disables collection.
pub fn set_endpoint<S: KvStore + ?Sized>(store: &S, endpoint: &str) -> Result<()> {
    let trimmed = endpoint.trim();
    if trimmed.is_empty() {
        store.set(KEY_SERVER_ENDPOINT, Value::String(String::new()))?;
        info!("collector endpoint cleared, data collection disabled");
        return Ok(());
    }

    reqwest::Url::parse(trimmed).map_err(|e| Error::InvalidEndpoint {
        url: trimmed.to_string(),
        reason: e.to_string(),
    })?;

    store.set(KEY_SERVER_ENDPOINT, Value::String(trimmed.to_string()))?;
    info!(endpoint = trimmed, "collector endpoint saved, collection enabled");
    Ok(())
}

/// Store the upload interval in minutes.
pub fn set_upload_frequency<S: KvStore + ?Sized>(store: &S, minutes: u64) -> Result<()> {
    if minutes == 0 {
        return Err(Error::InvalidFrequency { minutes });
    }
    store.set(KEY_UPLOAD_FREQUENCY, json!(minutes))?;
    info!(minutes, "upload frequency saved");
    Ok(())
}
