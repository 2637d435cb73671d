//! Fuzz target for in-memory data descriptions.
//!
//! Whatever the handler holds, building the models reports diagnostics
//! instead of panicking.

#![no_main]

use libfuzzer_sys::fuzz_target;
use mc_common::RunMode;
use mc_config::StrategyConfig;
use mc_core::{DataHandler, InMemoryDataHandler, MixtureComposer, MixtureManager};

fuzz_target!(|data: &[u8]| {
    let Ok(handler) = serde_json::from_slice::<InMemoryDataHandler>(data) else {
        return;
    };
    let nb_sample = handler.nb_sample();
    if nb_sample > 10_000 {
        return;
    }
    let manager = MixtureManager::default();
    let mut composer = MixtureComposer::new(nb_sample, &StrategyConfig::default(), RunMode::Learning);
    let _ = manager.create_mixtures(&handler, &mut composer);
    let _ = manager.class_labels(&handler);
});
