//! Gibbs sampling of the labels and latent values once parameters are fixed.

use crate::composer::{ComposerState, MixtureComposer};
use crate::logging::{event_names, Stage};
use mc_common::Result;
use mc_config::StrategyConfig;

pub struct GibbsStrategy<'a> {
    config: &'a StrategyConfig,
}

impl<'a> GibbsStrategy<'a> {
    pub fn new(config: &'a StrategyConfig) -> Self {
        Self { config }
    }

    /// Burn-in chains without storage, then stored chains whose visit
    /// frequencies become `tik` and whose imputations replace the latent
    /// values. Leaves the composer finalized.
    pub fn run(&self, composer: &mut MixtureComposer) -> Result<()> {
        crate::log_event!(
            INFO,
            event_names::GIBBS_STARTED,
            Stage::Gibbs,
            "Gibbs sampling started",
            burn_in = self.config.nb_gibbs_burn_in_iter,
            iterations = self.config.nb_gibbs_iter
        );
        composer.set_phase(ComposerState::GibbsBurnIn)?;
        composer.gibbs_sampling(self.config.nb_gibbs_burn_in_iter, false)?;

        composer.set_phase(ComposerState::GibbsRun)?;
        composer.gibbs_sampling(self.config.nb_gibbs_iter, true)?;

        composer.set_phase(ComposerState::Finalized)?;
        crate::log_event!(
            INFO,
            event_names::GIBBS_FINISHED,
            Stage::Gibbs,
            "Gibbs sampling finished",
            ln_observed = composer.ln_observed_likelihood()
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::{AugmentedData, MisVal};
    use crate::mixture::{CategoricalMixture, Mixture};
    use mc_common::{Error, RunMode};

    #[test]
    fn finalizes_and_imputes() {
        let config = StrategyConfig::default()
            .with_seed(11)
            .with_gibbs_iterations(5, 10);
        let mut data = AugmentedData::new();
        for i in 0..20 {
            if i == 3 {
                data.push(0, MisVal::FiniteValues(vec![0, 2]));
            } else {
                data.push(i % 3, MisVal::Present);
            }
        }
        let mut c = MixtureComposer::new(20, &config, RunMode::Learning);
        c.register_mixture(Box::new(CategoricalMixture::new("x", 2, 3, data, 0.95)))
            .unwrap();
        c.initialize_step().unwrap();
        c.init_data().unwrap();

        GibbsStrategy::new(&config).run(&mut c).unwrap();
        assert_eq!(c.state(), ComposerState::Finalized);
        let completed = c.mixtures().next().unwrap().completed_data();
        assert!(completed[3] == 1.0 || completed[3] == 3.0);
        for row in c.tik().outer_iter() {
            assert!((row.sum() - 1.0).abs() < 1e-9);
        }
    }

    #[test]
    fn refuses_to_run_twice() {
        let config = StrategyConfig::default().with_gibbs_iterations(1, 1);
        let mut c = MixtureComposer::new(4, &config, RunMode::Learning);
        let data = AugmentedData::from_present(vec![0, 1, 0, 1]);
        c.register_mixture(Box::new(CategoricalMixture::new("x", 2, 2, data, 0.95)))
            .unwrap();
        c.initialize_step().unwrap();
        GibbsStrategy::new(&config).run(&mut c).unwrap();
        let err = GibbsStrategy::new(&config).run(&mut c).unwrap_err();
        assert!(matches!(err, Error::InvalidState { .. }));
    }
}
