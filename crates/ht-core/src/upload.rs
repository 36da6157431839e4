//! Upload payload construction and the collector transport.

use ht_common::{AggregatedTable, Error, Result, UploadPayload};
use std::time::Duration;

/// Snapshot the persisted table as a timestamped payload.
pub fn build_payload(table: &AggregatedTable, now: chrono::DateTime<chrono::Utc>) -> UploadPayload {
    UploadPayload {
        timestamp: now.to_rfc3339_opts(chrono::SecondsFormat::Millis, true),
        stats: table.values().cloned().collect(),
    }
}

/// One-shot delivery of a payload to a collector endpoint.
///
/// `Ok(())` means the collector acknowledged with a 2xx status — the only
/// signal that permits clearing the persisted table.
pub trait UploadTransport: Send + Sync {
    fn post_stats(&self, endpoint: &str, payload: &UploadPayload) -> Result<()>;
}

/// Blocking HTTP transport.
pub struct HttpTransport {
    client: reqwest::blocking::Client,
}

impl HttpTransport {
    pub fn new() -> Result<Self> {
        let client = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(60))
            .build()
            .map_err(|e| Error::UploadTransport(e.to_string()))?;
        Ok(Self { client })
    }
}

impl UploadTransport for HttpTransport {
    fn post_stats(&self, endpoint: &str, payload: &UploadPayload) -> Result<()> {
        let response = self
            .client
            .post(endpoint)
            .json(payload)
            .send()
            .map_err(|e| Error::UploadTransport(e.to_string()))?;

        let status = response.status();
        if status.is_success() {
            Ok(())
        } else {
            Err(Error::UploadServer {
                status: status.as_u16(),
            })
        }
    }
}
