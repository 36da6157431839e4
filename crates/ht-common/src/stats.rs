//! Header statistics data model.
//!
//! A header observation is keyed by a *fingerprint*: the direction, the
//! lower-cased header name, and the effective value (raw or redaction
//! marker) joined with `::`. One [`StatEntry`] exists per fingerprint; the
//! pending buffer, the persisted table, and the collector's table all merge
//! with the same fingerprint + count-sum rule.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Traffic direction of an observed header.
///
/// Serialized as the wire field `type` with lowercase values, matching the
/// upload protocol.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Request,
    Response,
}

impl Direction {
    /// Wire representation, also used inside fingerprints.
    pub fn as_str(&self) -> &'static str {
        match self {
            Direction::Request => "request",
            Direction::Response => "response",
        }
    }
}

impl std::fmt::Display for Direction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Direction {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "request" => Ok(Direction::Request),
            "response" => Ok(Direction::Response),
            other => Err(format!("unknown direction '{}'", other)),
        }
    }
}

/// One deduplicated header observation with its occurrence count.
///
/// `name` keeps the first-seen casing; `value` is the effective value — the
/// raw header value or the redaction marker, never a redacted secret.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatEntry {
    pub name: String,
    pub value: String,
    #[serde(rename = "type")]
    pub direction: Direction,
    pub count: u64,
}

impl StatEntry {
    /// The fingerprint this entry aggregates under.
    pub fn fingerprint(&self) -> String {
        fingerprint(self.direction, &self.name, &self.value)
    }
}

/// Mapping from fingerprint to stat entry.
///
/// An ordered map keeps serialized tables and payload sequences
/// deterministic.
pub type AggregatedTable = BTreeMap<String, StatEntry>;

/// Payload POSTed to the collector: a timestamped view of the full
/// persisted table.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UploadPayload {
    pub timestamp: String,
    pub stats: Vec<StatEntry>,
}

/// Derive the deduplication key for an observation.
///
/// Two observations with the same direction, case-insensitive name, and
/// effective value always produce the same fingerprint.
pub fn fingerprint(direction: Direction, name: &str, effective_value: &str) -> String {
    format!(
        "{}::{}::{}",
        direction.as_str(),
        name.to_lowercase(),
        effective_value
    )
}

/// Merge entries into a table by fingerprint, summing counts.
///
/// Creates entries for unseen fingerprints; for existing ones only the
/// count changes (name, value, and direction are defined to agree for a
/// given fingerprint). This is the single merge rule shared by the flush
/// engine and the collector, commutative and associative in count.
pub fn merge_entries<I>(table: &mut AggregatedTable, entries: I)
where
    I: IntoIterator<Item = StatEntry>,
{
    for entry in entries {
        let key = entry.fingerprint();
        match table.entry(key) {
            std::collections::btree_map::Entry::Occupied(mut existing) => {
                existing.get_mut().count += entry.count;
            }
            std::collections::btree_map::Entry::Vacant(slot) => {
                slot.insert(entry);
            }
        }
    }
}

/// Table contents sorted by count descending (ties broken by fingerprint
/// for stable output).
pub fn sorted_by_count(table: &AggregatedTable) -> Vec<StatEntry> {
    let mut entries: Vec<(&String, &StatEntry)> = table.iter().collect();
    entries.sort_by(|(ka, a), (kb, b)| b.count.cmp(&a.count).then_with(|| ka.cmp(kb)));
    entries.into_iter().map(|(_, e)| e.clone()).collect()
}
