#![no_main]

use libfuzzer_sys::fuzz_target;
use pagekeep_core::artifact::{classify, response_filename};
use pagekeep_core::Strategy;

fuzz_target!(|data: &[u8]| {
    let Ok(name) = std::str::from_utf8(data) else {
        return;
    };
    let Some(artifact) = classify(name) else {
        return;
    };

    assert!(!artifact.slug.is_empty());
    if artifact.strategy != Strategy::Report {
        let stamp = artifact.timestamp.format("%Y-%m-%d-%H%M%S").to_string();
        let rebuilt = response_filename(&artifact.slug, artifact.strategy.as_str(), &stamp);
        assert_eq!(classify(&rebuilt), Some(artifact));
    }
});
