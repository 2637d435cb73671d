//! Property tests of the sampling invariants.

use mc_common::RunMode;
use mc_config::StrategyConfig;
use mc_core::data::{parse_cell, AugmentedData, MisVal};
use mc_core::mixture::{CategoricalMixture, GaussianMixture, Mixture};
use mc_core::rng;
use mc_core::MixtureComposer;
use proptest::prelude::*;

proptest! {
    #![proptest_config(ProptestConfig::with_cases(200))]

    /// Interval draws stay within their bounds and present values never move.
    #[test]
    fn interval_draws_stay_in_bounds(
        lo in -1e3..1e3f64,
        width in 0.0..1e3f64,
        present in -1e3..1e3f64,
        seed in any::<u64>(),
    ) {
        let hi = lo + width;
        let mut d = AugmentedData::new();
        d.push(present, MisVal::Present);
        d.push(0.0, MisVal::Interval(lo, hi));
        d.compute_range();
        let mut r = rng::master(Some(seed));
        for _ in 0..20 {
            d.remove_missing(&mut r);
            prop_assert_eq!(d.data[0], present);
            prop_assert!(d.data[1] >= lo && d.data[1] <= hi);
        }
    }

    /// Truncated Gaussian imputation respects the interval whatever the
    /// class parameters.
    #[test]
    fn gaussian_sampling_respects_interval(
        lo in -50.0..50.0f64,
        width in 0.0..20.0f64,
        mean in -100.0..100.0f64,
        sd in 0.01..30.0f64,
        seed in any::<u64>(),
    ) {
        let hi = lo + width;
        let mut d = AugmentedData::new();
        d.push(0.0, MisVal::Interval(lo, hi));
        d.push(0.0, MisVal::UpperUnbounded(hi));
        d.compute_range();
        let mut model = GaussianMixture::new("g", 1, d, 0.95);
        model.set_param(0, mean, sd);
        let mut r = rng::master(Some(seed));
        for _ in 0..10 {
            model.sampling_step(0, 0, &mut r);
            model.sampling_step(1, 0, &mut r);
            let data = &model.data().data;
            prop_assert!(data[0] >= lo && data[0] <= hi, "{} not in [{}, {}]", data[0], lo, hi);
            prop_assert!(data[1] >= hi);
        }
    }

    /// Parsed intervals keep their bounds in order.
    #[test]
    fn parsed_interval_bounds(lo in -1e6..1e6f64, width in 0.0..1e6f64) {
        let hi = lo + width;
        let (_, mis) = parse_cell::<f64>(&format!("[{}:{}]", lo, hi), 0.0).unwrap();
        prop_assert_eq!(mis, MisVal::Interval(lo, hi));
    }

    /// Every E step leaves row-stochastic responsibilities and every S step
    /// labels in range.
    #[test]
    fn e_and_s_steps_keep_invariants(
        values in prop::collection::vec(0i64..4, 12..40),
        nb_cluster in 1usize..4,
        seed in any::<u64>(),
    ) {
        let n = values.len();
        let mut config = StrategyConfig::default().with_nb_cluster(nb_cluster).with_seed(seed);
        config.min_ind_per_class = 0;
        let mut c = MixtureComposer::new(n, &config, RunMode::Learning);
        let data = AugmentedData::from_present(values);
        c.register_mixture(Box::new(CategoricalMixture::new("x", nb_cluster, 4, data, 0.95))).unwrap();
        c.initialize_step().unwrap();
        c.init_data().unwrap();
        c.init_param(5).unwrap();
        for _ in 0..3 {
            c.e_step().unwrap();
            for row in c.tik().outer_iter() {
                prop_assert!((row.sum() - 1.0).abs() < 1e-9);
            }
            c.s_step().unwrap();
            prop_assert!(c.zi().iter().all(|z| *z < nb_cluster));
            c.sampling_step().unwrap();
            c.m_step().unwrap();
        }
    }
}
