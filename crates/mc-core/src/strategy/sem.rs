//! Stochastic EM with bounded restarts.

use crate::composer::{ComposerError, ComposerState, MixtureComposer};
use crate::logging::{event_names, Stage};
use mc_common::{Diagnostics, Error, Result};
use mc_config::StrategyConfig;
use serde::{Deserialize, Serialize};

/// Return the diagnostics from the enclosing attempt when there are any.
macro_rules! abandon_on {
    ($diags:expr) => {{
        let diags = $diags;
        if !diags.is_empty() {
            return Ok(diags);
        }
    }};
}

/// Outcome of a successful SEM run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SemReport {
    /// Attempts used, the successful one included.
    pub attempts: usize,
    /// Diagnostics of the abandoned attempts, in order.
    pub abandoned: Vec<Diagnostics>,
}

pub struct SemStrategy<'a> {
    config: &'a StrategyConfig,
}

impl<'a> SemStrategy<'a> {
    pub fn new(config: &'a StrategyConfig) -> Self {
        Self { config }
    }

    /// Run up to `n_sem_try` attempts. Each one starts again from fresh data
    /// and parameters; only the last, successful one is kept.
    ///
    /// Diagnostics that a new attempt cannot fix are returned immediately.
    pub fn run(&self, composer: &mut MixtureComposer) -> Result<SemReport> {
        let mut abandoned = Vec::new();
        for attempt in 1..=self.config.n_sem_try {
            crate::log_event!(
                INFO,
                event_names::SEM_ATTEMPT_STARTED,
                Stage::Sem,
                "SEM attempt started",
                attempt = attempt,
                n_sem_try = self.config.n_sem_try
            );
            let diags = self.attempt(composer)?;
            if diags.is_empty() {
                crate::log_event!(
                    INFO,
                    event_names::SEM_FINISHED,
                    Stage::Sem,
                    "SEM finished",
                    attempt = attempt,
                    ln_observed = composer.ln_observed_likelihood()
                );
                return Ok(SemReport {
                    attempts: attempt,
                    abandoned,
                });
            }
            if diags.iter().any(|d| !d.kind.is_retryable()) {
                return Err(Error::from_diagnostics(&diags));
            }
            crate::log_event!(
                WARN,
                event_names::SEM_ATTEMPT_ABANDONED,
                Stage::Sem,
                "SEM attempt abandoned",
                attempt = attempt,
                reason = diags.to_string().as_str()
            );
            abandoned.push(diags);
        }
        let detail = abandoned
            .last()
            .map(|d| d.to_string())
            .unwrap_or_else(|| "no attempt was made".to_string());
        Err(Error::AttemptsExhausted {
            attempts: self.config.n_sem_try,
            detail,
        })
    }

    fn attempt(&self, composer: &mut MixtureComposer) -> std::result::Result<Diagnostics, ComposerError> {
        composer.set_phase(ComposerState::SemBurnIn)?;
        abandon_on!(composer.init_data()?);
        abandon_on!(composer.init_param(self.config.n_init_per_class)?);
        abandon_on!(composer.initialize_latent()?);
        abandon_on!(self.iterate(composer, self.config.nb_burn_in_iter, true)?);

        composer.set_phase(ComposerState::SemRun)?;
        self.iterate(composer, self.config.nb_iter, false)
    }

    /// One SEM phase. Burn-in iterations on the class-unlocking cadence use
    /// the completed-probability E step.
    fn iterate(
        &self,
        composer: &mut MixtureComposer,
        nb_iter: usize,
        burn_in: bool,
    ) -> std::result::Result<Diagnostics, ComposerError> {
        for iteration in 0..nb_iter {
            if burn_in && self.config.is_mis_clas_iteration(iteration) {
                composer.mis_clas_step(iteration)?;
            } else {
                composer.e_step()?;
            }
            abandon_on!(composer.s_step_checked()?);
            composer.sampling_step()?;
            abandon_on!(composer.check_sample_condition());
            abandon_on!(composer.m_step()?);

            if burn_in {
                composer.store_sem_burn_in(iteration, nb_iter - 1)?;
            } else {
                composer.store_sem_run(iteration, nb_iter - 1)?;
            }
            crate::log_event!(
                TRACE,
                event_names::SEM_ITERATION,
                Stage::Sem,
                "SEM iteration",
                iteration = iteration,
                burn_in = burn_in
            );
        }
        Ok(Diagnostics::new())
    }
}
