//! Fuzz target for placeholder extraction.
//!
//! Feeds arbitrary text to the tokenizer. It must never panic, and every
//! successful result must carry one marker per descriptor.
//!
//! Run with:
//! ```bash
//! cargo +nightly fuzz run fuzz_placeholder_tokenizer
//! ```

#![no_main]

use libfuzzer_sys::fuzz_target;
use sqlweave_core::scripting::{Bindings, PlaceholderTokenizer};
use sqlweave_core::{MarkerStyle, TemplateConfig, Value};

fuzz_target!(|data: &[u8]| {
    let Ok(text) = std::str::from_utf8(data) else {
        return;
    };

    let config = TemplateConfig::default().with_marker_style(MarkerStyle::Dollar);
    let param: Value = serde_json::json!({"a": 1, "b": {"c": [1, 2]}, "s": "x"}).into();

    if let Ok(query) = PlaceholderTokenizer::new(&config).tokenize(text, &param, Bindings::new()) {
        let last = query.parameters().len();
        if last > 0 {
            assert!(query.text().contains(&format!("${}", last)));
        }
    }
});
