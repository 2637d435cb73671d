//! Fuzz target for the cell grammar.
//!
//! Arbitrary cells must parse or be rejected without panicking, and any
//! accepted interval must have ordered bounds.

#![no_main]

use libfuzzer_sys::fuzz_target;
use mc_core::data::{parse_cell, parse_column, MisKind, MisVal};

fuzz_target!(|data: &[u8]| {
    let Ok(cell) = std::str::from_utf8(data) else {
        return;
    };

    if let Ok((_, MisVal::Interval(lo, hi))) = parse_cell::<f64>(cell, 0.0) {
        assert!(lo <= hi);
    }
    if let Ok((_, MisVal::Interval(lo, hi))) = parse_cell::<i64>(cell, 1) {
        assert!(lo <= hi);
    }

    let cells: Vec<String> = cell.split('\n').map(str::to_string).collect();
    let _ = parse_column::<i64>("fuzz", &cells, 1, MisKind::ALL);
});
