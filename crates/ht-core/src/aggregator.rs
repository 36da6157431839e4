//! In-memory aggregation of header observations.
//!
//! The aggregator owns the volatile pending buffer. `record` runs inside
//! the capture callback; `drain` is called by the flush engine. Draining
//! swaps in a fresh empty buffer, so observations recorded while a previous
//! generation is being persisted land in the next one — every record call
//! lands in exactly one drained batch.
//!
//! Privacy invariant: a value the classifier marks sensitive is replaced by
//! the redaction marker *before* fingerprinting or insertion. The raw
//! secret never outlives the `record` call.

use ht_common::{fingerprint, Direction, StatEntry, REDACTION_MARKER};
use ht_redact::{HeaderCandidate, SecrecyClassifier};
use std::collections::HashMap;
use std::sync::Mutex;
use tracing::warn;

/// Pending-buffer owner, constructed once at startup and shared by the
/// observation intake and the upload scheduler.
pub struct Aggregator {
    classifier: SecrecyClassifier,
    pending: Mutex<HashMap<String, StatEntry>>,
}

impl Aggregator {
    pub fn new(classifier: SecrecyClassifier) -> Self {
        Self {
            classifier,
            pending: Mutex::new(HashMap::new()),
        }
    }

    /// Record one observed header.
    ///
    /// A missing value counts as the empty string. An observation with an
    /// empty name has no usable fingerprint and is dropped with a warning;
    /// the pipeline keeps running.
    pub fn record(&self, direction: Direction, name: &str, value: Option<&str>) {
        let raw = value.unwrap_or("");
        let verdict = match self.classifier.classify(&HeaderCandidate { name, value: raw }) {
            Ok(verdict) => verdict,
            Err(error) => {
                warn!(%error, %direction, "dropping unclassifiable observation");
                return;
            }
        };

        let effective = if verdict.is_some() { REDACTION_MARKER } else { raw };
        let key = fingerprint(direction, name, effective);

        let mut pending = self.lock_pending();
        match pending.entry(key) {
            std::collections::hash_map::Entry::Occupied(mut existing) => {
                existing.get_mut().count += 1;
            }
            std::collections::hash_map::Entry::Vacant(slot) => {
                slot.insert(StatEntry {
                    name: name.to_string(),
                    value: effective.to_string(),
                    direction,
                    count: 1,
                });
            }
        }
    }

    /// Take the current pending generation, leaving a fresh empty buffer.
    pub fn drain(&self) -> Vec<StatEntry> {
        let mut pending = self.lock_pending();
        std::mem::take(&mut *pending).into_values().collect()
    }

    /// Discard the pending buffer without persisting it.
    pub fn clear_pending(&self) {
        self.lock_pending().clear();
    }

    pub fn pending_len(&self) -> usize {
        self.lock_pending().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock_pending().is_empty()
    }

    fn lock_pending(&self) -> std::sync::MutexGuard<'_, HashMap<String, StatEntry>> {
        // A poisoned buffer only means a panicking thread died mid-upsert;
        // the map itself is still a valid table.
        self.pending
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn aggregator() -> Aggregator {
        Aggregator::new(SecrecyClassifier::default())
    }

    #[test]
    fn test_record_counts_per_fingerprint() {
        let agg = aggregator();
        agg.record(Direction::Request, "Accept", Some("*/*"));
        agg.record(Direction::Request, "accept", Some("*/*"));
        agg.record(Direction::Response, "Server", Some("nginx"));

        assert_eq!(agg.pending_len(), 2);
        let drained = agg.drain();
        let accept = drained
            .iter()
            .find(|e| e.name.eq_ignore_ascii_case("accept"))
            .expect("accept entry");
        assert_eq!(accept.count, 2);
        // First-seen casing is kept.
        assert_eq!(accept.name, "Accept");
    }

    #[test]
    fn test_sensitive_value_is_replaced_before_buffering() {
        let agg = aggregator();
        let secret = "Bearer abcdefghijklmnopqrstuvwxyz";
        agg.record(Direction::Request, "Authorization", Some(secret));

        let drained = agg.drain();
        assert_eq!(drained.len(), 1);
        assert_eq!(drained[0].value, REDACTION_MARKER);

        let serialized = serde_json::to_string(&drained).expect("serialize");
        assert!(!serialized.contains("abcdefghijklmnopqrstuvwxyz"));
    }

    #[test]
    fn test_missing_value_treated_as_empty() {
        let agg = aggregator();
        agg.record(Direction::Request, "DNT", None);

        let drained = agg.drain();
        assert_eq!(drained.len(), 1);
        assert_eq!(drained[0].value, "");
    }

    #[test]
    fn test_empty_name_is_dropped() {
        let agg = aggregator();
        agg.record(Direction::Request, "", Some("anything"));
        assert!(agg.is_empty());
    }

    #[test]
    fn test_drain_twice_yields_empty_second_batch() {
        let agg = aggregator();
        agg.record(Direction::Request, "Accept", Some("*/*"));

        assert_eq!(agg.drain().len(), 1);
        assert!(agg.drain().is_empty());
    }

    #[test]
    fn test_records_after_drain_land_in_next_generation() {
        let agg = aggregator();
        agg.record(Direction::Request, "Accept", Some("*/*"));

        let first = agg.drain();
        // Simulates a capture callback firing while the first generation is
        // still being persisted.
        agg.record(Direction::Request, "Accept", Some("*/*"));
        let second = agg.drain();

        assert_eq!(first.len(), 1);
        assert_eq!(second.len(), 1);
        assert_eq!(first[0].count + second[0].count, 2);
    }

    #[test]
    fn test_clear_pending_discards_buffer() {
        let agg = aggregator();
        agg.record(Direction::Request, "Accept", Some("*/*"));
        agg.clear_pending();
        assert!(agg.is_empty());
    }
}
