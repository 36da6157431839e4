#![no_main]

use libfuzzer_sys::fuzz_target;

use ht_redact::{HeaderCandidate, SecrecyClassifier};

fuzz_target!(|input: (&str, &str)| {
    let (name, value) = input;
    let classifier = SecrecyClassifier::default();
    // Totality: any name/value pair gets a verdict or MissingName, never a
    // panic.
    let _ = classifier.classify(&HeaderCandidate { name, value });
});
