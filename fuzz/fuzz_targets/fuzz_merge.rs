#![no_main]

use arbitrary::Arbitrary;
use libfuzzer_sys::fuzz_target;

use ht_common::{merge_entries, AggregatedTable, Direction, StatEntry};

#[derive(Arbitrary, Debug)]
struct RawEntry {
    request: bool,
    name: String,
    value: String,
    count: u32,
}

fuzz_target!(|entries: Vec<RawEntry>| {
    let mut table = AggregatedTable::new();
    let before: u64 = entries.iter().map(|e| e.count as u64).sum();

    merge_entries(
        &mut table,
        entries.into_iter().map(|e| StatEntry {
            name: e.name,
            value: e.value,
            direction: if e.request {
                Direction::Request
            } else {
                Direction::Response
            },
            count: e.count as u64,
        }),
    );

    // Merging never loses or invents counts.
    let after: u64 = table.values().map(|e| e.count).sum();
    assert_eq!(before, after);
});
