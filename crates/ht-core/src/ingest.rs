//! Observation intake.
//!
//! The browser-side interception layer is an external collaborator; its
//! stand-in here is a stream of JSON lines, one observation per line:
//!
//! ```text
//! {"type":"request","name":"Accept","value":"*/*"}
//! ```

use crate::aggregator::Aggregator;
use ht_common::{Direction, Result};
use serde::Deserialize;
use std::io::BufRead;
use tracing::warn;

/// One captured header as delivered by the interception collaborator.
#[derive(Debug, Deserialize)]
pub struct ObservationRecord {
    #[serde(rename = "type")]
    pub direction: Direction,
    pub name: String,
    #[serde(default)]
    pub value: Option<String>,
}

/// Feed observations from a line-delimited JSON stream into the
/// aggregator until EOF. Malformed lines are skipped with a warning.
///
/// Returns the number of observations recorded.
pub fn read_observations<R: BufRead>(reader: R, aggregator: &Aggregator) -> Result<u64> {
    let mut recorded = 0u64;
    for line in reader.lines() {
        let line = line?;
        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }
        match serde_json::from_str::<ObservationRecord>(trimmed) {
            Ok(observation) => {
                aggregator.record(
                    observation.direction,
                    &observation.name,
                    observation.value.as_deref(),
                );
                recorded += 1;
            }
            Err(error) => warn!(%error, "skipping malformed observation line"),
        }
    }
    Ok(recorded)
}
