//! Configuration loading and validation against real files.

use mc_config::preset::{get_preset, PresetName};
use mc_config::validate::{validate_against_sample, validate_strategy, ValidationError};
use mc_config::StrategyConfig;
use std::fs;
use tempfile::TempDir;

fn write_config(dir: &TempDir, name: &str, body: &str) -> std::path::PathBuf {
    let path = dir.path().join(name);
    fs::write(&path, body).expect("write config");
    path
}

#[test]
fn load_full_config_from_file() {
    let dir = TempDir::new().expect("tempdir");
    let path = write_config(
        &dir,
        "strategy.json",
        r#"{
            "nb_cluster": 3,
            "n_sem_try": 4,
            "n_init_per_class": 8,
            "nb_burn_in_iter": 12,
            "nb_iter": 30,
            "nb_gibbs_burn_in_iter": 6,
            "nb_gibbs_iter": 9,
            "confidence_level": 0.9,
            "min_ind_per_class": 2,
            "nb_sampling_attempts": 40,
            "modulo_mis_class": 5,
            "seed": 1234,
            "parallel": true
        }"#,
    );

    let cfg = StrategyConfig::load(&path).expect("valid config");
    assert_eq!(cfg.nb_cluster, 3);
    assert_eq!(cfg.nb_iter, 30);
    assert_eq!(cfg.modulo_mis_class, 5);
    assert_eq!(cfg.seed, Some(1234));
    assert!(cfg.parallel);
}

#[test]
fn missing_file_is_io_error() {
    let dir = TempDir::new().expect("tempdir");
    let err = StrategyConfig::from_file(&dir.path().join("absent.json")).unwrap_err();
    assert!(matches!(err, ValidationError::IoError(_)));
    assert_eq!(err.code(), 60);
}

#[test]
fn malformed_json_is_parse_error() {
    let dir = TempDir::new().expect("tempdir");
    let path = write_config(&dir, "broken.json", "{ nb_cluster: 3 ");
    let err = StrategyConfig::from_file(&path).unwrap_err();
    assert!(matches!(err, ValidationError::ParseError(_)));
}

#[test]
fn load_rejects_semantically_invalid_file() {
    let dir = TempDir::new().expect("tempdir");
    let path = write_config(&dir, "bad.json", r#"{"confidence_level": 1.5}"#);
    let err = StrategyConfig::load(&path).unwrap_err();
    assert_eq!(err.code(), 65);
}

#[test]
fn presets_roundtrip_through_files() {
    let dir = TempDir::new().expect("tempdir");
    for name in PresetName::ALL {
        let preset = get_preset(*name);
        let json = serde_json::to_string_pretty(&preset).expect("serialize");
        let path = write_config(&dir, &format!("{}.json", name), &json);
        let loaded = StrategyConfig::load(&path).expect("load preset");
        assert_eq!(loaded, preset);
    }
}

#[test]
fn population_requirement_checked_against_sample() {
    let cfg = get_preset(PresetName::Quick).with_nb_cluster(10);
    assert!(validate_strategy(&cfg).is_ok());
    assert!(validate_against_sample(&cfg, 20).is_err());
    assert!(validate_against_sample(&cfg, 100).is_ok());
}
