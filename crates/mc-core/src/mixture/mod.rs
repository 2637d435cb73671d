//! Variable models.
//!
//! A variable model owns one column of augmented data and its per-class
//! parameters. The composer drives every model through [`Mixture`] only and
//! lends it the class labels it needs, one call at a time:
//! - `m_step` and `check_sample_condition` receive the individuals of each class
//! - `sampling_step` receives the label of the individual being resampled
//!
//! Models never see `zi`, `tik` or the proportions.

pub mod categorical;
pub mod gaussian;
pub mod poisson;

pub use categorical::CategoricalMixture;
pub use gaussian::GaussianMixture;
pub use poisson::PoissonMixture;

use crate::rng::McRng;
use crate::stat::ImputedValue;
use mc_common::{Diagnostics, RunMode};
use serde::{Deserialize, Serialize};

/// Individuals of each class, indexed by class.
pub type ClassIndices = [Vec<usize>];

/// Capability set of a variable model.
pub trait Mixture: Send + Sync {
    /// Variable identifier.
    fn id_name(&self) -> &str;

    /// Registry name of the model.
    fn model_name(&self) -> &'static str;

    /// Complete missing values without using the parameters.
    fn init_data(&mut self, rng: &mut McRng);

    /// Re-estimate the parameters from the completed data.
    fn m_step(&mut self, class_ind: &ClassIndices) -> Diagnostics;

    /// log p(x_i | z_i = k) on the completed value.
    fn ln_completed_probability(&self, i: usize, k: usize) -> f64;

    /// log p(x_i | z_i = k) marginalised over the missing part.
    fn ln_observed_probability(&self, i: usize, k: usize) -> f64;

    /// Redraw the missing value of `i` given its class.
    fn sampling_step(&mut self, i: usize, z_i: usize, rng: &mut McRng);

    /// Per-class conditions the next `m_step` needs to be well defined.
    fn check_sample_condition(&self, class_ind: &ClassIndices) -> Diagnostics;

    fn nb_free_parameter(&self) -> usize;

    /// Human-readable parameter dump.
    fn write_parameters(&self) -> String;

    fn store_sem_burn_in(&mut self, _iteration: usize, _iteration_max: usize) {}

    /// Record the current parameters; at the last iteration they are
    /// replaced by their expectation over the run.
    fn store_sem_run(&mut self, iteration: usize, iteration_max: usize);

    /// Record the current value of `i`; at the last iteration it is replaced
    /// by its point estimate over the chain.
    fn store_gibbs_run(&mut self, i: usize, iteration: usize, iteration_max: usize);

    fn export_param(&self) -> ParamExport;

    /// Install parameters from a table laid out like [`Mixture::export_param`],
    /// typically the output of a learning run reused for prediction.
    fn import_param(&mut self, param: &ParamExport) -> Diagnostics;

    /// Parameter-space descriptor, reused verbatim for prediction.
    fn param_str(&self) -> String;

    /// Completed column in the external encoding.
    fn completed_data(&self) -> Vec<f64>;

    /// Point estimate and interval of every value imputed by the Gibbs run,
    /// external encoding.
    fn imputed(&self) -> Vec<ImputedValue>;
}

/// Everything a model constructor gets from the manager.
#[derive(Debug, Clone, Copy)]
pub struct ModelContext<'a> {
    pub id: &'a str,
    pub cells: &'a [String],
    pub param_str: Option<&'a str>,
    pub nb_class: usize,
    pub mode: RunMode,
    pub confidence_level: f64,
    /// Unobserved categorical modalities are degeneracies.
    pub strict_modalities: bool,
}

/// Exported parameter table of one variable.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParamExport {
    pub id: String,
    pub names: Vec<String>,
    pub columns: Vec<String>,
    /// One row per name.
    pub values: Vec<Vec<f64>>,
}

impl ParamExport {
    /// Table from a finalised running statistic, or the current values when
    /// no run has been stored yet.
    pub fn from_stat(
        id: &str,
        names: Vec<String>,
        stat: &crate::stat::RunningStatistic,
        current: &[f64],
    ) -> Self {
        if stat.is_finalized() && stat.export().nrows() == names.len() {
            Self {
                id: id.to_string(),
                names,
                columns: vec!["mean".into(), "low".into(), "high".into()],
                values: stat.rows(),
            }
        } else {
            Self {
                id: id.to_string(),
                names,
                columns: vec!["value".into()],
                values: current.iter().map(|v| vec![*v]).collect(),
            }
        }
    }

    /// Point values, whatever the table layout.
    pub fn point_values(&self) -> Vec<f64> {
        self.values.iter().filter_map(|row| row.first().copied()).collect()
    }
}

/// Empty class diagnostic shared by the models.
pub(crate) fn empty_class_check(id: &str, class_ind: &ClassIndices) -> Diagnostics {
    class_ind
        .iter()
        .enumerate()
        .filter(|(_, members)| members.is_empty())
        .map(|(k, _)| {
            mc_common::Diagnostic::degeneracy(format!(
                "class {} is empty",
                k + mc_common::MIN_MODALITY as usize
            ))
            .for_variable(id)
        })
        .collect()
}

/// Point values of an imported table, `expected` finite numbers.
pub(crate) fn imported_values(id: &str, param: &ParamExport, expected: usize) -> Result<Vec<f64>, Diagnostics> {
    let values = param.point_values();
    if values.len() != expected {
        return Err(mc_common::Diagnostic::model_mismatch(format!(
            "expected {} parameters, got {}",
            expected,
            values.len()
        ))
        .for_variable(id)
        .into());
    }
    if let Some(v) = values.iter().find(|v| !v.is_finite()) {
        return Err(mc_common::Diagnostic::model_mismatch(format!("parameter {} is not finite", v))
            .for_variable(id)
            .into());
    }
    Ok(values)
}

/// Parse `"key: value"` from a parameter string.
pub(crate) fn param_value(param_str: &str, key: &str) -> Option<String> {
    param_str.split(',').find_map(|part| {
        let (k, v) = part.split_once(':')?;
        (k.trim() == key).then(|| v.trim().to_string())
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn param_value_lookup() {
        assert_eq!(param_value("nModality: 4", "nModality").as_deref(), Some("4"));
        assert_eq!(param_value("a: 1, nModality:7", "nModality").as_deref(), Some("7"));
        assert_eq!(param_value("", "nModality"), None);
    }

    #[test]
    fn export_falls_back_to_current_values() {
        let stat = crate::stat::RunningStatistic::new(0.95);
        let e = ParamExport::from_stat("v", vec!["a".into()], &stat, &[0.3]);
        assert_eq!(e.columns, vec!["value"]);
        assert_eq!(e.point_values(), vec![0.3]);
    }

    #[test]
    fn imported_values_are_checked() {
        let table = |values: Vec<Vec<f64>>| ParamExport {
            id: "v".into(),
            names: vec!["a".into(), "b".into()],
            columns: vec!["mean".into(), "low".into(), "high".into()],
            values,
        };
        let ok = imported_values("v", &table(vec![vec![0.5, 0.4, 0.6], vec![2.0, 1.0, 3.0]]), 2).unwrap();
        assert_eq!(ok, vec![0.5, 2.0]);
        assert!(imported_values("v", &table(vec![vec![0.5]]), 2).is_err());
        let d = imported_values("v", &table(vec![vec![0.5], vec![f64::NAN]]), 2).unwrap_err();
        assert!(d.to_string().contains("not finite"));
    }

    #[test]
    fn empty_classes_are_reported_one_based() {
        let ind = vec![vec![0, 1], vec![], vec![2]];
        let d = empty_class_check("x", &ind);
        assert_eq!(d.len(), 1);
        assert!(d.iter().next().unwrap().message.contains("class 2"));
    }
}
