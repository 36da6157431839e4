//! Periodic flush/upload cycle.
//!
//! Each cycle: flush the pending buffer, then — if a collector endpoint is
//! configured and the persisted table is non-empty — POST the full table
//! and clear it on a 2xx acknowledgement. Any other outcome leaves the
//! table intact; the next cycle resends the accumulated aggregate
//! (at-least-once delivery against an idempotent merge).
//!
//! An atomic in-flight flag enforces at most one cycle at a time: a tick
//! that fires while the previous upload is outstanding is skipped, never
//! queued. The wait loop re-reads the configured interval, so a changed
//! setting re-arms the timer from now (no drift, no duplicate timers).

use crate::aggregator::Aggregator;
use crate::flush::flush;
use crate::store::{self, KvStore};
use crate::upload::{build_payload, UploadTransport};
use ht_common::{Error, Result};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

/// How often the wait loop re-checks shutdown and the interval setting.
const WAIT_POLL: Duration = Duration::from_secs(1);

/// Outcome of one upload cycle.
#[derive(Debug)]
pub enum CycleOutcome {
    /// A previous cycle is still in flight; this tick was coalesced away.
    Skipped,
    /// No endpoint configured; data stays in the persisted table.
    LocalOnly { flushed: usize },
    /// Endpoint configured but the persisted table was empty.
    NothingToSend,
    /// Full table delivered and cleared.
    Uploaded { entries: usize },
    /// Upload failed; table retained for the next cycle.
    Retained { error: Error },
}

impl std::fmt::Display for CycleOutcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CycleOutcome::Skipped => write!(f, "skipped: previous cycle still in flight"),
            CycleOutcome::LocalOnly { flushed } => {
                write!(f, "local-only: flushed {} entries, no endpoint configured", flushed)
            }
            CycleOutcome::NothingToSend => write!(f, "nothing to upload yet"),
            CycleOutcome::Uploaded { entries } => {
                write!(f, "uploaded {} entries, local table cleared", entries)
            }
            CycleOutcome::Retained { error } => {
                write!(f, "upload failed, table retained: {}", error)
            }
        }
    }
}

/// Owns the flush/upload cadence.
pub struct UploadScheduler<S: KvStore, T: UploadTransport> {
    aggregator: Arc<Aggregator>,
    store: Arc<S>,
    transport: T,
    in_flight: AtomicBool,
}

impl<S: KvStore, T: UploadTransport> UploadScheduler<S, T> {
    pub fn new(aggregator: Arc<Aggregator>, store: Arc<S>, transport: T) -> Self {
        Self {
            aggregator,
            store,
            transport,
            in_flight: AtomicBool::new(false),
        }
    }

    /// Run one flush/upload cycle, single-flight guarded.
    ///
    /// Upload failures are not errors — the table is retained and the
    /// outcome says so. Only storage failures propagate.
    pub fn run_cycle(&self) -> Result<CycleOutcome> {
        if self.in_flight.swap(true, Ordering::SeqCst) {
            debug!("upload cycle already in flight, skipping tick");
            return Ok(CycleOutcome::Skipped);
        }
        let outcome = self.cycle_inner();
        self.in_flight.store(false, Ordering::SeqCst);
        outcome
    }

    fn cycle_inner(&self) -> Result<CycleOutcome> {
        let flushed = flush(&self.aggregator, self.store.as_ref())?;

        let Some(endpoint) = store::load_endpoint(self.store.as_ref())? else {
            debug!(flushed, "local-only mode, stats flushed to storage");
            return Ok(CycleOutcome::LocalOnly { flushed });
        };

        let table = store::load_table(self.store.as_ref())?;
        if table.is_empty() {
            debug!("no stats to upload yet");
            return Ok(CycleOutcome::NothingToSend);
        }

        let payload = build_payload(&table, chrono::Utc::now());
        let entries = payload.stats.len();

        match self.transport.post_stats(&endpoint, &payload) {
            Ok(()) => {
                store::clear_table(self.store.as_ref())?;
                info!(entries, endpoint = %endpoint, "uploaded stats, cleared local table");
                Ok(CycleOutcome::Uploaded { entries })
            }
            Err(error) => {
                warn!(%error, endpoint = %endpoint, "upload failed, retaining table for next cycle");
                Ok(CycleOutcome::Retained { error })
            }
        }
    }

    /// Periodic loop: wait out the configured interval, then run a cycle.
    ///
    /// Returns when `shutdown` is set. A changed `uploadFrequency` re-arms
    /// the timer immediately instead of letting the old interval finish.
    pub fn run_loop(&self, shutdown: &AtomicBool) {
        'armed: while !shutdown.load(Ordering::SeqCst) {
            let minutes = store::load_upload_frequency(self.store.as_ref())
                .unwrap_or(store::DEFAULT_UPLOAD_FREQUENCY_MINUTES);
            let period = Duration::from_secs(minutes * 60);
            let armed_at = Instant::now();
            debug!(minutes, "upload timer armed");

            while armed_at.elapsed() < period {
                if shutdown.load(Ordering::SeqCst) {
                    return;
                }
                std::thread::sleep(WAIT_POLL);

                let current = store::load_upload_frequency(self.store.as_ref())
                    .unwrap_or(store::DEFAULT_UPLOAD_FREQUENCY_MINUTES);
                if current != minutes {
                    info!(from = minutes, to = current, "upload frequency changed, rescheduling");
                    continue 'armed;
                }
            }

            match self.run_cycle() {
                Ok(outcome) => debug!(%outcome, "upload cycle finished"),
                Err(error) => warn!(%error, "upload cycle failed, pending data retried next cycle"),
            }
        }
    }
}
