//! End-to-end learning runs through the public API.

use mc_common::Error;
use mc_config::StrategyConfig;
use mc_core::{learn, predict, InMemoryDataHandler, LearnOutput, Z_CLASS};
use std::io::Write;

/// Deterministic cells cycling through `1..=nb_modality`, skewed so that the
/// two halves of the sample differ.
fn categorical_cells(n: usize, nb_modality: usize) -> Vec<String> {
    (0..n)
        .map(|i| {
            let m = if i < n / 2 { (i * 7) % nb_modality } else { (i * 3 + i / 5) % nb_modality };
            (m + 1).to_string()
        })
        .collect()
}

fn quick_config(nb_cluster: usize) -> StrategyConfig {
    let mut config = StrategyConfig::default()
        .with_nb_cluster(nb_cluster)
        .with_seed(2024)
        .with_sem_iterations(10, 20)
        .with_gibbs_iterations(10, 10);
    config.n_sem_try = 1;
    config.min_ind_per_class = 1;
    config
}

/// Two well separated groups, with every `missing_every`-th cell missing.
fn two_group_handler(n: usize, missing_every: usize) -> InMemoryDataHandler {
    let gaussian: Vec<String> = (0..n)
        .map(|i| {
            if i % missing_every == 3 {
                String::new()
            } else if i % 2 == 0 {
                format!("{}", 0.1 * (i % 7) as f64)
            } else {
                format!("{}", 6.0 + 0.1 * (i % 5) as f64)
            }
        })
        .collect();
    let cats: Vec<String> = (0..n)
        .map(|i| {
            if i % missing_every == 5 {
                "?".to_string()
            } else {
                (1 + i % 2 + 2 * usize::from(i % 11 == 0)).to_string()
            }
        })
        .collect();
    InMemoryDataHandler::new()
        .with_variable("g", "Gaussian", gaussian)
        .with_variable("c", "Categorical", cats)
}

fn point_values(out: &LearnOutput, id: &str) -> Vec<f64> {
    out.parameters
        .iter()
        .find(|p| p.id == id)
        .map(|p| p.point_values())
        .unwrap_or_default()
}

#[test]
fn single_categorical_variable() {
    let handler = InMemoryDataHandler::new().with_variable("color", "Categorical", categorical_cells(100, 3));
    let out = learn(&handler, &quick_config(2)).unwrap();

    assert!(out.warnings.is_empty());
    assert_eq!(out.sem_attempts, 1);
    assert!((out.prop.iter().sum::<f64>() - 1.0).abs() < 1e-9);
    assert!(out.likelihoods.ln_observed.is_finite());
    assert!(out.likelihoods.ln_observed <= 0.0);
    assert_eq!(out.nb_free_parameters, 1 + 2 * 2);
    assert_eq!(out.param_str["color"], "nModality: 3");

    for row in &out.tik {
        assert!((row.iter().sum::<f64>() - 1.0).abs() < 1e-9);
    }
    assert!(out.zi.iter().all(|z| (1..=2).contains(z)));

    assert_eq!(out.parameters[0].id, Z_CLASS);
    assert_eq!(out.parameters[0].columns, vec!["mean", "low", "high"]);
    assert_eq!(out.parameters[1].names.len(), 6);
}

#[test]
fn free_parameters_of_two_categorical_variables() {
    let handler = InMemoryDataHandler::new()
        .with_variable("a", "Categorical", categorical_cells(90, 4))
        .with_variable("b", "Categorical_pjk", categorical_cells(90, 2));
    let mut config = quick_config(3);
    config.n_sem_try = 10;
    let out = learn(&handler, &config).unwrap();
    assert_eq!(out.nb_free_parameters, 2 + 3 * (4 - 1) + 3 * (2 - 1));
    let penalty = 0.5 * 14.0 * (90f64).ln();
    assert!((out.likelihoods.ln_observed - out.bic - penalty).abs() < 1e-6);
}

#[test]
fn mixed_models_with_missing_values() {
    let n = 80;
    let gaussian: Vec<String> = (0..n)
        .map(|i| match i % 17 {
            0 => String::new(),
            5 => "[-1:1]".to_string(),
            9 => "[4:]".to_string(),
            _ => format!("{}", if i < n / 2 { 0.1 * (i % 7) as f64 } else { 5.0 + 0.1 * (i % 5) as f64 }),
        })
        .collect();
    let counts: Vec<String> = (0..n)
        .map(|i| match i % 13 {
            0 => "?".to_string(),
            4 => "{2,3}".to_string(),
            8 => "[:4]".to_string(),
            _ => format!("{}", if i < n / 2 { 1 + i % 3 } else { 6 + i % 4 }),
        })
        .collect();
    let mut cats = categorical_cells(n, 3);
    cats[3] = "abc".to_string();
    cats[7] = "{1,3}".to_string();

    let handler = InMemoryDataHandler::new()
        .with_variable("g", "Gaussian", gaussian)
        .with_variable("p", "Poisson", counts)
        .with_variable("c", "Categorical", cats);
    let mut config = quick_config(2);
    config.n_sem_try = 20;
    let out = learn(&handler, &config).unwrap();

    assert_eq!(out.warnings.len(), 1);
    assert_eq!(out.warnings.iter().next().unwrap().individual, Some(3));

    let g = &out.completed["g"];
    assert!((-1.0..=1.0).contains(&g[5]));
    assert!(g[9] >= 4.0);
    let p = &out.completed["p"];
    assert!(p[4] == 2.0 || p[4] == 3.0);
    assert!((0.0..=4.0).contains(&p[8]));
    let c = &out.completed["c"];
    assert!(c[7] == 1.0 || c[7] == 3.0);
    assert_eq!(out.nb_free_parameters, 1 + 2 * 2 + 2 + 2 * 2);
}

#[test]
fn observed_labels_survive() {
    let n = 60;
    let labels: Vec<String> = (0..n)
        .map(|i| match i {
            0..=9 => "1".to_string(),
            10..=19 => "2".to_string(),
            _ => String::new(),
        })
        .collect();
    let handler = InMemoryDataHandler::new()
        .with_variable("color", "Categorical", categorical_cells(n, 3))
        .with_variable(Z_CLASS, "LatentClass", labels);
    let mut config = quick_config(2);
    config.n_sem_try = 10;
    let out = learn(&handler, &config).unwrap();
    assert!(out.zi[..10].iter().all(|z| *z == 1));
    assert!(out.zi[10..20].iter().all(|z| *z == 2));
}

#[test]
fn parallel_and_sequential_agree() {
    let handler = InMemoryDataHandler::new()
        .with_variable("a", "Categorical", categorical_cells(70, 3))
        .with_variable("b", "Poisson", (0..70).map(|i| (i % 5).to_string()));
    let mut config = quick_config(2);
    config.n_sem_try = 10;
    let sequential = learn(&handler, &config).unwrap();
    let parallel = learn(&handler, &config.clone().with_parallel(true)).unwrap();

    assert_eq!(sequential.zi, parallel.zi);
    assert_eq!(sequential.prop, parallel.prop);
    assert_eq!(sequential.likelihoods, parallel.likelihoods);
}

#[test]
fn handler_from_json_file() {
    let cells: Vec<String> = categorical_cells(40, 2);
    let json = serde_json::json!({
        "variables": [
            {"id": "flag", "model": "Categorical", "data": cells, "param_str": "nModality: 2"}
        ]
    });
    let mut file = tempfile::NamedTempFile::new().unwrap();
    write!(file, "{}", json).unwrap();

    let handler = InMemoryDataHandler::from_file(file.path()).unwrap();
    let mut config = quick_config(2);
    config.n_sem_try = 10;
    let out = learn(&handler, &config).unwrap();
    assert_eq!(out.nb_sample, 40);
    assert_eq!(out.param_str["flag"], "nModality: 2");
    assert!(out.to_json().unwrap().contains("\"bic\""));
}

#[test]
fn declared_modalities_below_data_fail() {
    let handler = InMemoryDataHandler::new()
        .with_variable("a", "Categorical", categorical_cells(40, 3))
        .with_param_str("a", "nModality: 2");
    let err = learn(&handler, &quick_config(2)).unwrap_err();
    assert!(matches!(err, Error::ModelMismatch { ref variable, .. } if variable == "a"));
}

#[test]
fn column_without_valid_cell_fails() {
    let handler = InMemoryDataHandler::new()
        .with_variable("a", "Categorical", categorical_cells(40, 3))
        .with_variable("b", "Gaussian", vec!["oops"; 40]);
    let err = learn(&handler, &quick_config(2)).unwrap_err();
    assert!(matches!(err, Error::NoValidRows { ref variable } if variable == "b"));
    assert_eq!(err.code(), 21);
}

#[test]
fn widest_finite_values_are_estimated() {
    let normal = |i: usize| format!("{}", if i < 20 { 0.1 * (i % 7) as f64 } else { 5.0 + 0.1 * (i % 5) as f64 });
    let mut config = quick_config(2);
    config.n_sem_try = 10;

    let mut interval: Vec<String> = (0..40).map(normal).collect();
    interval[0] = "[-1e308:1e308]".to_string();
    let handler = InMemoryDataHandler::new().with_variable("x", "Gaussian", interval);
    let out = learn(&handler, &config).unwrap();
    assert!((-1e308..=1e308).contains(&out.completed["x"][0]));
    assert!(out.completed["x"].iter().all(|v| v.is_finite()));

    let mut extremes: Vec<String> = (0..40).map(normal).collect();
    extremes[0] = "-1e308".to_string();
    extremes[1] = "1e308".to_string();
    extremes[2] = String::new();
    let handler = InMemoryDataHandler::new().with_variable("x", "Gaussian", extremes);
    let out = learn(&handler, &config).unwrap();
    assert_eq!(out.completed["x"][0], -1e308);
    assert!(out.completed["x"][2].is_finite());
}

#[test]
fn strict_modalities_abandon_attempts() {
    let mut cells: Vec<String> = (0..40).map(|i| (i % 2 + 1).to_string()).collect();
    cells[7] = "3".to_string();
    let handler = InMemoryDataHandler::new().with_variable("c", "Categorical", cells);

    let mut config = quick_config(2);
    config.n_sem_try = 3;
    assert!(learn(&handler, &config).is_ok());

    let err = learn(&handler, &config.with_strict_modalities(true)).unwrap_err();
    assert!(matches!(err, Error::AttemptsExhausted { attempts: 3, ref detail } if detail.contains("modality 3 is absent")));
}

#[test]
fn imputed_cells_match_completed_data() {
    let mut config = quick_config(2);
    config.n_sem_try = 10;
    let out = learn(&two_group_handler(60, 8), &config).unwrap();

    for id in ["g", "c"] {
        let imputed = &out.imputed[id];
        let missing: Vec<usize> = (0..60).filter(|i| i % 8 == if id == "g" { 3 } else { 5 }).collect();
        assert_eq!(imputed.iter().map(|v| v.individual).collect::<Vec<_>>(), missing);
        for v in imputed {
            assert!((v.value - out.completed[id][v.individual]).abs() < 1e-9);
            assert!(v.low <= v.high);
        }
    }
    assert!(out.to_json().unwrap().contains("\"imputed\""));
}

#[test]
fn prediction_keeps_learned_parameters() {
    let mut config = quick_config(2);
    config.n_sem_try = 10;
    let learned = learn(&two_group_handler(80, 9), &config).unwrap();

    let handler = two_group_handler(12, 4);
    let mut predict_config = StrategyConfig::default().with_seed(7);
    predict_config.n_sem_try = 1;
    let out = predict(&handler, &predict_config, &learned).unwrap();

    assert_eq!(out.nb_sample, 12);
    assert_eq!(out.nb_cluster, 2);
    for (p, q) in out.prop.iter().zip(&learned.prop) {
        assert!((p - q).abs() < 1e-9);
    }
    for id in ["g", "c"] {
        let expected = point_values(&learned, id);
        let actual = point_values(&out, id);
        assert_eq!(actual.len(), expected.len());
        for (a, e) in actual.iter().zip(&expected) {
            assert!((a - e).abs() < 1e-9, "{}: {} != {}", id, a, e);
        }
    }
    assert_eq!(out.param_str["c"], learned.param_str["c"]);
    assert!(out.zi.iter().all(|z| (1..=2).contains(z)));
    let g = &out.completed["g"];
    assert!(g.iter().all(|v| v.is_finite()));
    assert_eq!(out.imputed["g"].len(), 3);
}

#[test]
fn prediction_needs_every_parameter_table() {
    let mut config = quick_config(2);
    config.n_sem_try = 10;
    let mut learned = learn(&two_group_handler(60, 9), &config).unwrap();
    learned.parameters.retain(|p| p.id != "g");

    let err = predict(&two_group_handler(10, 4), &StrategyConfig::default(), &learned).unwrap_err();
    assert!(matches!(err, Error::ModelMismatch { ref variable, .. } if variable == "g"));
    assert_eq!(err.code(), 12);
}
