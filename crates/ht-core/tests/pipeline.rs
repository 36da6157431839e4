//! End-to-end pipeline tests: record → flush → persisted table → upload.

use ht_common::{Direction, Error, UploadPayload, REDACTION_MARKER};
use ht_core::aggregator::Aggregator;
use ht_core::flush::flush;
use ht_core::scheduler::{CycleOutcome, UploadScheduler};
use ht_core::store::{self, KvStore, MemoryStore};
use ht_core::upload::UploadTransport;
use ht_redact::SecrecyClassifier;
use serde_json::json;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

/// Scripted transport: one pre-programmed result per call, remembering
/// every payload.
struct ScriptedTransport {
    script: Mutex<VecDeque<ht_common::Result<()>>>,
    calls: Mutex<Vec<UploadPayload>>,
}

impl ScriptedTransport {
    fn new(script: Vec<ht_common::Result<()>>) -> Self {
        Self {
            script: Mutex::new(script.into()),
            calls: Mutex::new(Vec::new()),
        }
    }

    fn call_count(&self) -> usize {
        self.calls.lock().expect("calls lock").len()
    }

    fn payload(&self, index: usize) -> UploadPayload {
        self.calls.lock().expect("calls lock")[index].clone()
    }
}

/// Handle that lets the test keep inspecting a transport the scheduler
/// owns.
struct SharedTransport(Arc<ScriptedTransport>);

impl UploadTransport for SharedTransport {
    fn post_stats(&self, _endpoint: &str, payload: &UploadPayload) -> ht_common::Result<()> {
        self.0.calls.lock().expect("calls lock").push(payload.clone());
        self.0
            .script
            .lock()
            .expect("script lock")
            .pop_front()
            .unwrap_or(Ok(()))
    }
}

#[allow(clippy::type_complexity)]
fn scheduler(
    script: Vec<ht_common::Result<()>>,
) -> (
    Arc<Aggregator>,
    Arc<MemoryStore>,
    Arc<ScriptedTransport>,
    UploadScheduler<MemoryStore, SharedTransport>,
) {
    let aggregator = Arc::new(Aggregator::new(SecrecyClassifier::default()));
    let store = Arc::new(MemoryStore::new());
    let transport = Arc::new(ScriptedTransport::new(script));
    let sched = UploadScheduler::new(
        aggregator.clone(),
        store.clone(),
        SharedTransport(transport.clone()),
    );
    (aggregator, store, transport, sched)
}

fn enable_endpoint(store: &MemoryStore) {
    store
        .set(
            store::KEY_SERVER_ENDPOINT,
            json!("http://localhost:3000/plugin"),
        )
        .expect("endpoint");
}

#[test]
fn redacted_authorization_observations_become_one_marker_entry() {
    let aggregator = Aggregator::new(SecrecyClassifier::default());
    let store = MemoryStore::new();

    for _ in 0..3 {
        aggregator.record(
            Direction::Request,
            "Authorization",
            Some("Bearer abcdefghijklmnopqrstuvwxyz"),
        );
    }
    flush(&aggregator, &store).expect("flush");

    let table = store::load_table(&store).expect("load");
    assert_eq!(table.len(), 1);
    let entry = table.values().next().expect("entry");
    assert_eq!(entry.name, "Authorization");
    assert_eq!(entry.value, REDACTION_MARKER);
    assert_eq!(entry.count, 3);

    // The raw token must not exist anywhere in the persisted state.
    let persisted = serde_json::to_string(&table).expect("serialize");
    assert!(!persisted.contains("abcdefghijklmnopqrstuvwxyz"));
}

#[test]
fn tick_with_endpoint_unset_flushes_but_stays_local() {
    let (aggregator, store, transport, sched) = scheduler(vec![]);
    aggregator.record(Direction::Request, "Accept", Some("*/*"));
    aggregator.record(Direction::Response, "Server", Some("nginx"));

    let outcome = sched.run_cycle().expect("cycle");
    assert!(matches!(outcome, CycleOutcome::LocalOnly { flushed: 2 }));

    // Flush happened, no network call, table retained.
    assert!(aggregator.is_empty());
    assert_eq!(transport.call_count(), 0);
    assert_eq!(store::load_table(store.as_ref()).expect("load").len(), 2);
}

#[test]
fn failed_upload_retains_table_until_a_later_success_clears_it() {
    let (aggregator, store, transport, sched) = scheduler(vec![
        Err(Error::UploadServer { status: 500 }),
        Ok(()),
    ]);
    enable_endpoint(&store);

    aggregator.record(Direction::Request, "Accept", Some("*/*"));

    // Server errors out: nothing is cleared.
    let outcome = sched.run_cycle().expect("first cycle");
    assert!(matches!(outcome, CycleOutcome::Retained { .. }));
    assert_eq!(store::load_table(store.as_ref()).expect("load").len(), 1);

    // Traffic keeps accumulating between ticks.
    aggregator.record(Direction::Request, "Accept", Some("*/*"));

    // A later 2xx ships the (now larger) aggregate and clears the table.
    let outcome = sched.run_cycle().expect("second cycle");
    assert!(matches!(outcome, CycleOutcome::Uploaded { entries: 1 }));
    assert!(store::load_table(store.as_ref()).expect("load").is_empty());

    assert_eq!(transport.call_count(), 2);
    // The retry carried the accumulated count, not just the delta.
    assert_eq!(transport.payload(1).stats[0].count, 2);
}

#[test]
fn upload_cycle_never_posts_an_empty_table() {
    let (_aggregator, store, transport, sched) = scheduler(vec![]);
    enable_endpoint(&store);

    let outcome = sched.run_cycle().expect("cycle");
    assert!(matches!(outcome, CycleOutcome::NothingToSend));
    assert_eq!(transport.call_count(), 0);
}
