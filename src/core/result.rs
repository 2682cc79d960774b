//! Fit results produced by completed phases

use crate::core::path::{ParamPath, PathPrefix};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Identifies the data a phase was fitted against
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DatasetInfo {
    /// Dataset label, e.g. `lens_sie__source_sersic`
    pub name: String,

    /// Radius of the circular mask in arc-seconds
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mask_radius: Option<f64>,
}

/// Point estimate of one parameter
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Estimate {
    /// Most likely value
    pub value: f64,

    /// One-sigma uncertainty, when the sampler reports it
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sigma: Option<f64>,
}

impl Estimate {
    pub fn new(value: f64, sigma: Option<f64>) -> Self {
        Self { value, sigma }
    }
}

/// Outcome of a completed phase
///
/// Fields are only reachable through accessors; a result is never changed
/// after it has been built.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FitResult {
    phase: String,
    dataset: DatasetInfo,
    estimates: BTreeMap<ParamPath, Estimate>,

    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    hyper: BTreeMap<ParamPath, Estimate>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    max_log_likelihood: Option<f64>,
}

impl FitResult {
    pub fn new(phase: impl Into<String>, dataset: DatasetInfo) -> Self {
        Self {
            phase: phase.into(),
            dataset,
            estimates: BTreeMap::new(),
            hyper: BTreeMap::new(),
            max_log_likelihood: None,
        }
    }

    pub fn with_estimate(mut self, path: ParamPath, value: f64, sigma: Option<f64>) -> Self {
        self.estimates.insert(path, Estimate::new(value, sigma));
        self
    }

    pub fn with_hyper_estimate(mut self, path: ParamPath, value: f64, sigma: Option<f64>) -> Self {
        self.hyper.insert(path, Estimate::new(value, sigma));
        self
    }

    pub fn with_estimates(mut self, estimates: BTreeMap<ParamPath, Estimate>) -> Self {
        self.estimates.extend(estimates);
        self
    }

    pub fn with_hyper_estimates(mut self, estimates: BTreeMap<ParamPath, Estimate>) -> Self {
        self.hyper.extend(estimates);
        self
    }

    pub fn with_max_log_likelihood(mut self, value: f64) -> Self {
        self.max_log_likelihood = Some(value);
        self
    }

    pub fn phase(&self) -> &str {
        &self.phase
    }

    pub fn dataset(&self) -> &DatasetInfo {
        &self.dataset
    }

    pub fn estimate(&self, path: &ParamPath) -> Option<&Estimate> {
        self.estimates.get(path)
    }

    pub fn hyper_estimate(&self, path: &ParamPath) -> Option<&Estimate> {
        self.hyper.get(path)
    }

    pub fn estimates(&self) -> &BTreeMap<ParamPath, Estimate> {
        &self.estimates
    }

    pub fn hyper_estimates(&self) -> &BTreeMap<ParamPath, Estimate> {
        &self.hyper
    }

    /// Estimates living under a prefix, in path order
    pub fn estimates_under<'a>(
        &'a self,
        prefix: &'a PathPrefix,
    ) -> impl Iterator<Item = (&'a ParamPath, &'a Estimate)> + 'a {
        self.estimates.iter().filter(move |(path, _)| prefix.contains(path))
    }

    pub fn hyper_estimates_under<'a>(
        &'a self,
        prefix: &'a PathPrefix,
    ) -> impl Iterator<Item = (&'a ParamPath, &'a Estimate)> + 'a {
        self.hyper.iter().filter(move |(path, _)| prefix.contains(path))
    }

    /// Copy of this result labelled as `phase`
    pub fn with_phase(mut self, phase: impl Into<String>) -> Self {
        self.phase = phase.into();
        self
    }

    /// Best-fit value of every parameter
    pub fn most_likely_instance(&self) -> BTreeMap<ParamPath, f64> {
        self.estimates
            .iter()
            .map(|(path, estimate)| (path.clone(), estimate.value))
            .collect()
    }

    pub fn max_log_likelihood(&self) -> Option<f64> {
        self.max_log_likelihood
    }
}
