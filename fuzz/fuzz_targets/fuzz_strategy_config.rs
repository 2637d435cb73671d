//! Fuzz target for strategy configuration loading.
//!
//! Parsing and validation return errors on bad input, never panic.

#![no_main]

use arbitrary::Arbitrary;
use libfuzzer_sys::fuzz_target;
use mc_config::{validate_against_sample, validate_strategy, StrategyConfig};

#[derive(Arbitrary, Debug)]
struct Input {
    json: String,
    nb_sample: usize,
    iteration: usize,
}

fuzz_target!(|input: Input| {
    if let Ok(config) = StrategyConfig::from_str(&input.json) {
        let _ = validate_strategy(&config);
        let _ = validate_against_sample(&config, input.nb_sample);
        let _ = config.is_mis_clas_iteration(input.iteration);
    }
});
