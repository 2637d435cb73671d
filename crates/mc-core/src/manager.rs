//! Construction of variable models from a data description.
//!
//! The [`MixtureManager`] is the single registration point for distribution
//! families: it maps a model name to a constructor and turns every variable
//! exposed by a [`DataHandler`] into a registered [`Mixture`].

use crate::composer::{MixtureComposer, Z_CLASS};
use crate::data::{parse_column, AugmentedData, MisKind};
use crate::logging::{event_names, Stage};
use crate::mixture::{CategoricalMixture, GaussianMixture, Mixture, ModelContext, PoissonMixture};
use mc_common::{Diagnostic, Diagnostics, MIN_MODALITY};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

/// A variable and the model it is described by.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VariableSpec {
    pub id: String,
    pub model: String,
}

/// Source of raw data for a run.
pub trait DataHandler {
    /// Number of individuals.
    fn nb_sample(&self) -> usize;

    /// Every variable, `z_class` included when labels are provided.
    fn variables(&self) -> Vec<VariableSpec>;

    /// Raw cells of a variable, one per individual.
    fn cells(&self, id: &str) -> Option<&[String]>;

    /// Parameter string of a variable, if one was provided.
    fn param_str(&self, id: &str) -> Option<&str>;
}

/// One column of an [`InMemoryDataHandler`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VariableData {
    pub id: String,
    pub model: String,
    pub data: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub param_str: Option<String>,
}

/// Data held in memory, loadable from JSON:
///
/// ```json
/// {"variables": [{"id": "color", "model": "Categorical", "data": ["1", "2", "?"]}]}
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct InMemoryDataHandler {
    pub variables: Vec<VariableData>,
}

impl InMemoryDataHandler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_file(path: &Path) -> mc_common::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_str(&content)
    }

    #[allow(clippy::should_implement_trait)]
    pub fn from_str(json: &str) -> mc_common::Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Append a column of raw cells.
    pub fn with_variable<S: Into<String>>(
        mut self,
        id: &str,
        model: &str,
        data: impl IntoIterator<Item = S>,
    ) -> Self {
        self.variables.push(VariableData {
            id: id.to_string(),
            model: model.to_string(),
            data: data.into_iter().map(Into::into).collect(),
            param_str: None,
        });
        self
    }

    /// Set the parameter string of an existing column.
    pub fn with_param_str(mut self, id: &str, param_str: &str) -> Self {
        if let Some(v) = self.variables.iter_mut().find(|v| v.id == id) {
            v.param_str = Some(param_str.to_string());
        }
        self
    }
}

impl DataHandler for InMemoryDataHandler {
    fn nb_sample(&self) -> usize {
        self.variables.first().map(|v| v.data.len()).unwrap_or(0)
    }

    fn variables(&self) -> Vec<VariableSpec> {
        self.variables
            .iter()
            .map(|v| VariableSpec {
                id: v.id.clone(),
                model: v.model.clone(),
            })
            .collect()
    }

    fn cells(&self, id: &str) -> Option<&[String]> {
        self.variables.iter().find(|v| v.id == id).map(|v| v.data.as_slice())
    }

    fn param_str(&self, id: &str) -> Option<&str> {
        self.variables
            .iter()
            .find(|v| v.id == id)
            .and_then(|v| v.param_str.as_deref())
    }
}

/// Model constructor: the model and its per-cell warnings, or every
/// diagnostic that makes the variable unusable.
pub type Constructor =
    Box<dyn Fn(&ModelContext<'_>) -> Result<(Box<dyn Mixture>, Diagnostics), Diagnostics> + Send + Sync>;

/// Model families that exist but are not provided by this crate.
const NOT_IMPLEMENTED: &[&str] = &[
    "Rank",
    "Rank_ISR",
    "Weibull",
    "Functional",
    "Func_CS",
    "Func_SharedAlpha_CS",
];

const LABEL_KINDS: &[MisKind] = &[
    MisKind::Present,
    MisKind::Missing,
    MisKind::FiniteValues,
    MisKind::Interval,
];

pub struct MixtureManager {
    constructors: BTreeMap<String, Constructor>,
}

impl Default for MixtureManager {
    /// Manager with the built-in models.
    fn default() -> Self {
        let mut manager = Self::empty();
        for name in [CategoricalMixture::NAME, "Categorical_pjk"] {
            manager.register(name, |ctx| {
                CategoricalMixture::from_context(ctx).map(|(m, w)| (Box::new(m) as Box<dyn Mixture>, w))
            });
        }
        for name in [GaussianMixture::NAME, "Gaussian_sjk"] {
            manager.register(name, |ctx| {
                GaussianMixture::from_context(ctx).map(|(m, w)| (Box::new(m) as Box<dyn Mixture>, w))
            });
        }
        for name in [PoissonMixture::NAME, "Poisson_k"] {
            manager.register(name, |ctx| {
                PoissonMixture::from_context(ctx).map(|(m, w)| (Box::new(m) as Box<dyn Mixture>, w))
            });
        }
        manager
    }
}

impl MixtureManager {
    /// Manager without any model.
    pub fn empty() -> Self {
        Self {
            constructors: BTreeMap::new(),
        }
    }

    /// Register, or replace, the constructor of a model name.
    pub fn register<F>(&mut self, name: &str, constructor: F)
    where
        F: Fn(&ModelContext<'_>) -> Result<(Box<dyn Mixture>, Diagnostics), Diagnostics>
            + Send
            + Sync
            + 'static,
    {
        self.constructors.insert(name.to_string(), Box::new(constructor));
    }

    pub fn is_registered(&self, name: &str) -> bool {
        self.constructors.contains_key(name)
    }

    pub fn model_names(&self) -> impl Iterator<Item = &str> + '_ {
        self.constructors.keys().map(String::as_str)
    }

    /// First variable whose model has no constructor.
    pub fn find_unknown(&self, handler: &dyn DataHandler) -> Option<VariableSpec> {
        handler
            .variables()
            .into_iter()
            .find(|v| v.id != Z_CLASS && !self.is_registered(&v.model))
    }

    /// Build and register a model for every variable of `handler`.
    ///
    /// Returns the per-cell warnings when every variable could be built, all
    /// the blocking diagnostics otherwise.
    pub fn create_mixtures(
        &self,
        handler: &dyn DataHandler,
        composer: &mut MixtureComposer,
    ) -> Result<Diagnostics, Diagnostics> {
        let nb_sample = composer.nb_sample();
        let mut warnings = Diagnostics::new();
        let mut errors = Diagnostics::new();

        for spec in handler.variables() {
            if spec.id == Z_CLASS {
                continue;
            }
            let Some(constructor) = self.constructors.get(&spec.model) else {
                let message = if NOT_IMPLEMENTED.contains(&spec.model.as_str()) {
                    format!("model '{}' is not implemented", spec.model)
                } else {
                    format!("unknown model '{}'", spec.model)
                };
                errors.push(Diagnostic::model_mismatch(message).for_variable(&spec.id));
                continue;
            };
            let Some(cells) = handler.cells(&spec.id) else {
                errors.push(Diagnostic::data_format("no data provided").for_variable(&spec.id));
                continue;
            };
            if cells.len() != nb_sample {
                errors.push(
                    Diagnostic::data_format(format!(
                        "{} cells provided for {} individuals",
                        cells.len(),
                        nb_sample
                    ))
                    .for_variable(&spec.id),
                );
                continue;
            }

            let ctx = ModelContext {
                id: &spec.id,
                cells,
                param_str: handler.param_str(&spec.id),
                nb_class: composer.nb_cluster(),
                mode: composer.mode(),
                confidence_level: composer.confidence_level(),
                strict_modalities: composer.strict_modalities(),
            };
            match constructor(&ctx) {
                Ok((mixture, w)) => {
                    if !w.is_empty() {
                        crate::log_event!(
                            WARN,
                            event_names::SETUP_DATA_WARNING,
                            Stage::Setup,
                            "cells treated as missing",
                            variable = spec.id.as_str(),
                            count = w.len()
                        );
                    }
                    warnings.extend(w);
                    if let Err(e) = composer.register_mixture(mixture) {
                        errors.push(Diagnostic::usage(e.to_string()).for_variable(&spec.id));
                        continue;
                    }
                    crate::log_event!(
                        DEBUG,
                        event_names::SETUP_VARIABLE_CREATED,
                        Stage::Setup,
                        "variable created",
                        variable = spec.id.as_str(),
                        model = spec.model.as_str()
                    );
                }
                Err(d) => errors.extend(d),
            }
        }

        if errors.is_empty() && composer.nb_variable() == 0 {
            errors.push(Diagnostic::usage("no variable to estimate"));
        }
        if errors.is_empty() {
            Ok(warnings)
        } else {
            Err(errors)
        }
    }

    /// Observed class labels, 0-based, when the handler provides `z_class`.
    pub fn class_labels(
        &self,
        handler: &dyn DataHandler,
    ) -> Result<Option<(AugmentedData<i64>, Diagnostics)>, Diagnostics> {
        let Some(cells) = handler.cells(Z_CLASS) else {
            return Ok(None);
        };
        let parsed = parse_column::<i64>(Z_CLASS, cells, MIN_MODALITY, LABEL_KINDS)?;
        Ok(Some((parsed.data, parsed.warnings)))
    }
}
