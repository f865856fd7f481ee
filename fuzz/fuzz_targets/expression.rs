//! Fuzz target for the expression parser and evaluator.
//!
//! Run with:
//! ```bash
//! cargo +nightly fuzz run fuzz_expression
//! ```

#![no_main]

use libfuzzer_sys::fuzz_target;
use sqlweave_core::scripting::Expression;
use sqlweave_core::Value;

fuzz_target!(|data: &[u8]| {
    let Ok(source) = std::str::from_utf8(data) else {
        return;
    };

    // Parsing and evaluation should return errors, never panic
    if let Ok(expr) = Expression::parse(source) {
        let scope: Value = serde_json::json!({"a": 1, "b": "x", "c": [1, 2], "d": {"e": true}}).into();
        let _ = expr.evaluate(&scope);
    }
});
