#![no_main]

use libfuzzer_sys::fuzz_target;
use pagekeep_core::organise::{sanitise_timestamp, slug_from_url};

fuzz_target!(|data: &[u8]| {
    let Ok(input) = std::str::from_utf8(data) else {
        return;
    };
    let _ = slug_from_url(input);
    let _ = sanitise_timestamp(input);
});
