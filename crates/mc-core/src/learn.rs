//! End-to-end learning pipeline.

use crate::composer::MixtureComposer;
use crate::data::AugmentedData;
use crate::logging::{event_names, Stage};
use crate::manager::{DataHandler, MixtureManager, VariableSpec};
use crate::mixture::ParamExport;
use crate::stat::ImputedValue;
use crate::strategy::{GibbsStrategy, SemStrategy};
use mc_common::{Diagnostics, Error, Result, RunMode};
use mc_config::{validate_against_sample, validate_strategy, StrategyConfig};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::{debug, info_span};

/// Fit statistics of the final model.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Likelihoods {
    pub ln_observed: f64,
    pub ln_completed: f64,
    pub ln_semi_completed: f64,
}

/// Everything a learning run produces.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LearnOutput {
    pub nb_sample: usize,
    pub nb_cluster: usize,
    pub prop: Vec<f64>,
    pub tik: Vec<Vec<f64>>,
    /// Class labels, 1-based.
    pub zi: Vec<i64>,
    pub likelihoods: Likelihoods,
    pub nb_free_parameters: usize,
    pub bic: f64,
    pub icl: f64,
    /// Parameter tables, `z_class` first.
    pub parameters: Vec<ParamExport>,
    /// Parameter strings to reuse for prediction.
    pub param_str: BTreeMap<String, String>,
    /// Completed columns in the external encoding.
    pub completed: BTreeMap<String, Vec<f64>>,
    /// Point estimate and interval of every missing or partially observed
    /// cell, in the external encoding.
    pub imputed: BTreeMap<String, Vec<ImputedValue>>,
    /// Cells that could not be used and were treated as missing.
    pub warnings: Diagnostics,
    /// SEM attempts used.
    pub sem_attempts: usize,
}

impl LearnOutput {
    fn collect(composer: &MixtureComposer, warnings: Diagnostics, sem_attempts: usize) -> Self {
        let mut param_str = BTreeMap::new();
        let mut completed = BTreeMap::new();
        let mut imputed = BTreeMap::new();
        for m in composer.mixtures() {
            param_str.insert(m.id_name().to_string(), m.param_str());
            completed.insert(m.id_name().to_string(), m.completed_data());
            imputed.insert(m.id_name().to_string(), m.imputed());
        }
        Self {
            nb_sample: composer.nb_sample(),
            nb_cluster: composer.nb_cluster(),
            prop: composer.prop().to_vec(),
            tik: composer.tik().outer_iter().map(|r| r.to_vec()).collect(),
            zi: composer.labels(),
            likelihoods: Likelihoods {
                ln_observed: composer.ln_observed_likelihood(),
                ln_completed: composer.ln_completed_likelihood(),
                ln_semi_completed: composer.ln_semi_completed_likelihood(),
            },
            nb_free_parameters: composer.nb_free_parameters(),
            bic: composer.bic(),
            icl: composer.icl(),
            parameters: composer.export_parameters(),
            param_str,
            completed,
            imputed,
            warnings,
            sem_attempts,
        }
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

/// Estimate a mixture on the data of `handler`.
///
/// Malformed cells only produce warnings. Unknown models, unusable columns,
/// invalid labels and an invalid configuration stop the run before any
/// estimation.
pub fn learn(handler: &dyn DataHandler, config: &StrategyConfig) -> Result<LearnOutput> {
    learn_with(&MixtureManager::default(), handler, config)
}

/// [`learn`] with a caller-supplied model registry.
pub fn learn_with(
    manager: &MixtureManager,
    handler: &dyn DataHandler,
    config: &StrategyConfig,
) -> Result<LearnOutput> {
    let nb_sample = handler.nb_sample();
    let _span = info_span!("learn", nb_sample, nb_cluster = config.nb_cluster).entered();
    crate::log_event!(
        INFO,
        event_names::LEARN_STARTED,
        Stage::Setup,
        "learning started",
        nb_variable = handler.variables().len()
    );

    validate_against_sample(config, nb_sample).map_err(|e| Error::InvalidStrategy(e.to_string()))?;
    let (mut composer, warnings, labels) = prepare(manager, handler, config, RunMode::Learning)?;
    composer.initialize_step()?;
    let diags = composer.set_z_class(labels)?;
    if !diags.is_empty() {
        return Err(Error::from_diagnostics(&diags));
    }

    let output = estimate(&mut composer, config, warnings)?;
    crate::log_event!(
        INFO,
        event_names::LEARN_FINISHED,
        Stage::Output,
        "learning finished",
        ln_observed = output.likelihoods.ln_observed,
        bic = output.bic,
        icl = output.icl
    );
    Ok(output)
}

/// Classify the individuals of `handler` and impute their missing cells
/// with the parameters of a previous run held fixed.
///
/// The number of classes and the parameter strings come from `learned`; a
/// parameter string given by `handler` takes precedence. Every variable of
/// `handler` needs a parameter table in `learned`.
pub fn predict(handler: &dyn DataHandler, config: &StrategyConfig, learned: &LearnOutput) -> Result<LearnOutput> {
    predict_with(&MixtureManager::default(), handler, config, learned)
}

/// [`predict`] with a caller-supplied model registry.
pub fn predict_with(
    manager: &MixtureManager,
    handler: &dyn DataHandler,
    config: &StrategyConfig,
    learned: &LearnOutput,
) -> Result<LearnOutput> {
    let nb_sample = handler.nb_sample();
    let _span = info_span!("predict", nb_sample, nb_cluster = learned.nb_cluster).entered();
    crate::log_event!(
        INFO,
        event_names::PREDICT_STARTED,
        Stage::Setup,
        "prediction started",
        nb_variable = handler.variables().len()
    );

    let config = StrategyConfig {
        nb_cluster: learned.nb_cluster,
        ..config.clone()
    };
    validate_strategy(&config).map_err(|e| Error::InvalidStrategy(e.to_string()))?;
    if nb_sample == 0 {
        return Err(Error::InvalidStrategy("no individual to classify".to_string()));
    }

    let handler = LearnedParamStr {
        inner: handler,
        learned: &learned.param_str,
    };
    let (mut composer, warnings, labels) = prepare(manager, &handler, &config, RunMode::Prediction)?;
    composer.initialize_step()?;
    let diags = composer.import_parameters(&learned.parameters)?;
    if !diags.is_empty() {
        return Err(Error::from_diagnostics(&diags));
    }
    let diags = composer.set_z_class(labels)?;
    if !diags.is_empty() {
        return Err(Error::from_diagnostics(&diags));
    }

    let output = estimate(&mut composer, &config, warnings)?;
    crate::log_event!(
        INFO,
        event_names::PREDICT_FINISHED,
        Stage::Output,
        "prediction finished",
        ln_observed = output.likelihoods.ln_observed
    );
    Ok(output)
}

type Prepared = (MixtureComposer, Diagnostics, Option<AugmentedData<i64>>);

/// Composer holding one model per variable, the parse warnings and the
/// observed class labels.
fn prepare(
    manager: &MixtureManager,
    handler: &dyn DataHandler,
    config: &StrategyConfig,
    mode: RunMode,
) -> Result<Prepared> {
    if let Some(spec) = manager.find_unknown(handler) {
        return Err(Error::UnknownModel {
            variable: spec.id,
            model: spec.model,
        });
    }

    let mut composer = MixtureComposer::new(handler.nb_sample(), config, mode);
    let mut warnings = manager
        .create_mixtures(handler, &mut composer)
        .map_err(|d| Error::from_diagnostics(&d))?;
    let labels = match manager
        .class_labels(handler)
        .map_err(|d| Error::from_diagnostics(&d))?
    {
        Some((labels, w)) => {
            warnings.extend(w);
            Some(labels)
        }
        None => None,
    };
    Ok((composer, warnings, labels))
}

fn estimate(composer: &mut MixtureComposer, config: &StrategyConfig, warnings: Diagnostics) -> Result<LearnOutput> {
    let report = SemStrategy::new(config).run(composer)?;
    GibbsStrategy::new(config).run(composer)?;
    debug!(parameters = %composer.write_parameters(), "final parameters");
    Ok(LearnOutput::collect(composer, warnings, report.attempts))
}

/// Falls back on the parameter strings of a learning run.
struct LearnedParamStr<'a> {
    inner: &'a dyn DataHandler,
    learned: &'a BTreeMap<String, String>,
}

impl DataHandler for LearnedParamStr<'_> {
    fn nb_sample(&self) -> usize {
        self.inner.nb_sample()
    }

    fn variables(&self) -> Vec<VariableSpec> {
        self.inner.variables()
    }

    fn cells(&self, id: &str) -> Option<&[String]> {
        self.inner.cells(id)
    }

    fn param_str(&self, id: &str) -> Option<&str> {
        self.inner
            .param_str(id)
            .or_else(|| self.learned.get(id).map(String::as_str))
    }
}
