//! Collector-side ingestion server.
//!
//! Receives uploaded statistics batches and maintains the canonical
//! long-term aggregate, merged with the identical fingerprint + count-sum
//! rule the client uses. Runs a lightweight HTTP server on a background
//! thread.
//!
//! ## Endpoints
//!
//! - `POST /plugin` — ingest a `{timestamp, stats: [...]}` batch
//! - `GET /stats` — full table as JSON, sorted by count descending
//! - `GET /stats/download` — the same data as CSV
//! - `GET /` — HTML summary of the top ten entries
//! - `GET /health` — liveness probe

mod render;

pub use render::{escape_html, render_csv, render_index};

use crate::store::file::write_json_atomic;
use ht_common::{merge_entries, sorted_by_count, AggregatedTable, Direction, Error, Result, StatEntry};
use serde::Deserialize;
use serde_json::Value;
use std::io::Read;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::thread;
use tiny_http::{Header, Method, Response};
use tracing::{debug, error, info, warn};

/// Upload bodies over this size are rejected outright.
pub const MAX_BODY_BYTES: usize = 5 * 1024 * 1024;

/// Configuration for the collector server.
#[derive(Debug, Clone)]
pub struct CollectorConfig {
    /// Bind address (default: 127.0.0.1).
    pub bind: String,
    /// Port (default: 3000).
    pub port: u16,
    /// File the aggregate table is persisted to.
    pub data_file: PathBuf,
}

impl Default for CollectorConfig {
    fn default() -> Self {
        Self {
            bind: "127.0.0.1".to_string(),
            port: 3000,
            data_file: PathBuf::from("stats.json"),
        }
    }
}

/// A stat entry as it appears in an upload batch.
///
/// `value` may be null (stored as the empty string); everything else is
/// required — a batch that does not fit is malformed.
#[derive(Debug, Deserialize)]
struct IncomingStat {
    name: String,
    #[serde(default)]
    value: Option<String>,
    #[serde(rename = "type")]
    direction: Direction,
    count: u64,
}

/// The collector's canonical table plus its persistence target.
pub struct CollectorState {
    table: Mutex<AggregatedTable>,
    data_file: PathBuf,
}

impl CollectorState {
    /// Load the table from the data file; a missing file is an empty table.
    pub fn load(data_file: &Path) -> Result<Self> {
        let table = match std::fs::read_to_string(data_file) {
            Ok(content) => serde_json::from_str(&content).map_err(|e| Error::StorageRead {
                key: data_file.display().to_string(),
                reason: e.to_string(),
            })?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                info!(path = %data_file.display(), "no existing stats file, starting empty");
                AggregatedTable::new()
            }
            Err(e) => return Err(e.into()),
        };
        Ok(Self {
            table: Mutex::new(table),
            data_file: data_file.to_path_buf(),
        })
    }

    /// Validate and merge one upload batch, then persist the table.
    ///
    /// Returns the number of entries ingested. The in-memory merge happens
    /// before persistence; a failed write surfaces as a storage error with
    /// the merge already applied, matching the wire contract's 500 case.
    pub fn ingest(&self, body: &Value) -> Result<usize> {
        let stats = match body.get("stats") {
            Some(Value::Array(stats)) => stats.clone(),
            _ => {
                return Err(Error::MalformedPayload(
                    r#"Invalid payload. "stats" array is missing or not an array."#.to_string(),
                ))
            }
        };

        let incoming: Vec<IncomingStat> = serde_json::from_value(Value::Array(stats))
            .map_err(|e| Error::MalformedPayload(format!("unreadable stat entry: {}", e)))?;
        let count = incoming.len();

        let snapshot = {
            let mut table = self.lock_table();
            merge_entries(
                &mut *table,
                incoming.into_iter().map(|stat| StatEntry {
                    name: stat.name,
                    value: stat.value.unwrap_or_default(),
                    direction: stat.direction,
                    count: stat.count,
                }),
            );
            table.clone()
        };

        write_json_atomic(&self.data_file, &snapshot).map_err(|e| Error::StorageWrite {
            key: self.data_file.display().to_string(),
            reason: e.to_string(),
        })?;

        debug!(entries = count, "ingested upload batch");
        Ok(count)
    }

    /// Table contents sorted by count descending.
    pub fn sorted(&self) -> Vec<StatEntry> {
        sorted_by_count(&self.lock_table())
    }

    fn lock_table(&self) -> std::sync::MutexGuard<'_, AggregatedTable> {
        self.table
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }
}

/// Handle to the running collector HTTP server.
pub struct CollectorServer {
    shutdown: Arc<AtomicBool>,
    thread: Option<thread::JoinHandle<()>>,
    addr: SocketAddr,
}

impl CollectorServer {
    /// Start the collector on a background thread.
    pub fn start(config: &CollectorConfig) -> Result<Self> {
        let addr: SocketAddr = format!("{}:{}", config.bind, config.port)
            .parse()
            .map_err(|e| {
                Error::Io(std::io::Error::other(format!(
                    "invalid collector bind address: {}",
                    e
                )))
            })?;

        let state = Arc::new(CollectorState::load(&config.data_file)?);

        let server = tiny_http::Server::http(addr).map_err(|e| {
            Error::Io(std::io::Error::other(format!(
                "failed to start collector on {}: {}",
                addr, e
            )))
        })?;

        info!(addr = %addr, data_file = %config.data_file.display(), "collector server started");

        let shutdown = Arc::new(AtomicBool::new(false));
        let shutdown_clone = shutdown.clone();

        let thread = thread::Builder::new()
            .name("ht-collector".to_string())
            .spawn(move || serve_loop(server, &state, &shutdown_clone))
            .map_err(Error::Io)?;

        Ok(Self {
            shutdown,
            thread: Some(thread),
            addr,
        })
    }

    /// Get the bound address.
    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    /// Shut down the collector server.
    pub fn shutdown(mut self) {
        self.stop();
        info!("collector server stopped");
    }

    fn stop(&mut self) {
        self.shutdown.store(true, Ordering::SeqCst);
        // Send a dummy request to unblock the accept loop
        let _ = std::net::TcpStream::connect(self.addr);
        if let Some(thread) = self.thread.take() {
            let _ = thread.join();
        }
    }
}

impl Drop for CollectorServer {
    fn drop(&mut self) {
        self.stop();
    }
}

fn serve_loop(server: tiny_http::Server, state: &CollectorState, shutdown: &AtomicBool) {
    loop {
        if shutdown.load(Ordering::SeqCst) {
            break;
        }

        // Accept with timeout so we can check the shutdown flag
        let request = match server.recv_timeout(std::time::Duration::from_secs(1)) {
            Ok(Some(req)) => req,
            Ok(None) => continue,
            Err(e) => {
                if !shutdown.load(Ordering::SeqCst) {
                    error!(error = %e, "collector accept error");
                }
                break;
            }
        };

        if shutdown.load(Ordering::SeqCst) {
            let _ = request.respond(Response::from_string("shutting down").with_status_code(503));
            break;
        }

        handle_request(request, state);
    }
}

fn handle_request(mut request: tiny_http::Request, state: &CollectorState) {
    let method = request.method().clone();
    let path = request
        .url()
        .split('?')
        .next()
        .unwrap_or("/")
        .to_string();
    debug!(method = %method, path = %path, "collector request");

    let response_result = match (&method, path.as_str()) {
        (Method::Post, "/plugin") => {
            let outcome = read_body(&mut request).and_then(|body| state.ingest(&body));
            match outcome {
                Ok(entries) => {
                    debug!(entries, "upload batch merged and saved");
                    request.respond(
                        json_response(r#"{"message":"Data received and processed successfully."}"#)
                            .with_status_code(200),
                    )
                }
                Err(Error::MalformedPayload(reason)) => {
                    warn!(%reason, "rejecting malformed upload");
                    let body = serde_json::json!({ "error": reason }).to_string();
                    request.respond(json_response(&body).with_status_code(400))
                }
                Err(error) => {
                    error!(%error, "failed to persist ingested batch");
                    request.respond(
                        json_response(r#"{"message":"Data processed but failed to save."}"#)
                            .with_status_code(500),
                    )
                }
            }
        }
        (Method::Get, "/stats") => {
            let body = serde_json::to_string(&state.sorted()).unwrap_or_else(|_| "[]".to_string());
            request.respond(json_response(&body))
        }
        (Method::Get, "/stats/download") => {
            let csv = render_csv(&state.sorted());
            let response = Response::from_string(csv)
                .with_header(header("Content-Type", "text/csv"))
                .with_header(header(
                    "Content-Disposition",
                    "attachment; filename=\"header-stats.csv\"",
                ));
            request.respond(response)
        }
        (Method::Get, "/") => {
            let sorted = state.sorted();
            let top = &sorted[..sorted.len().min(10)];
            let response = Response::from_string(render_index(top))
                .with_header(header("Content-Type", "text/html; charset=utf-8"));
            request.respond(response)
        }
        (Method::Get, "/health") | (Method::Get, "/healthz") => {
            request.respond(Response::from_string("ok"))
        }
        _ => request.respond(Response::from_string("not found").with_status_code(404)),
    };

    if let Err(e) = response_result {
        warn!(error = %e, "failed to send collector response");
    }
}

/// Read and parse a JSON request body, enforcing the size cap.
fn read_body(request: &mut tiny_http::Request) -> Result<Value> {
    if let Some(declared) = request.body_length() {
        if declared > MAX_BODY_BYTES {
            return Err(Error::MalformedPayload(format!(
                "body of {} bytes exceeds the {} byte limit",
                declared, MAX_BODY_BYTES
            )));
        }
    }

    let mut body = Vec::new();
    request
        .as_reader()
        .take(MAX_BODY_BYTES as u64 + 1)
        .read_to_end(&mut body)?;
    if body.len() > MAX_BODY_BYTES {
        return Err(Error::MalformedPayload(format!(
            "body exceeds the {} byte limit",
            MAX_BODY_BYTES
        )));
    }

    serde_json::from_slice(&body)
        .map_err(|e| Error::MalformedPayload(format!("body is not valid JSON: {}", e)))
}

fn json_response(body: &str) -> Response<std::io::Cursor<Vec<u8>>> {
    Response::from_string(body).with_header(header("Content-Type", "application/json"))
}

fn header(field: &str, value: &str) -> Header {
    Header::from_bytes(field.as_bytes(), value.as_bytes()).unwrap()
}
