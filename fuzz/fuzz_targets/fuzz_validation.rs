//! Fuzz testing for request validation.
//!
//! Ensures the image query validator and the page parser never panic on
//! arbitrary input, and that every accepted image path is rooted.
//!
//! # Running the Fuzz Tests
//!
//! ```bash
//! cargo +nightly install cargo-fuzz
//! cargo +nightly fuzz run fuzz_validation -- -max_total_time=60
//! ```

#![no_main]

use libfuzzer_sys::fuzz_target;
use moviehub_gateway::validation::{parse_page, validate_image_request};

fuzz_target!(|data: &[u8]| {
    let Ok(s) = std::str::from_utf8(data) else {
        return;
    };

    // Split the input so path and size vary independently.
    let (path, size) = s.split_once('\0').unwrap_or((s, ""));

    if let Ok(req) = validate_image_request(Some(path), Some(size)) {
        assert!(req.path.starts_with('/'));
        assert!(!req.size.is_empty());
    }
    let _ = validate_image_request(Some(path), None);
    let _ = validate_image_request(None, Some(size));

    let _ = parse_page(Some(s));
});
