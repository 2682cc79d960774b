//! Fitter request and response types

use crate::core::{
    path::ParamPath,
    result::{DatasetInfo, Estimate, FitResult},
    settings::{PhaseSettings, SolverConfig},
};
use crate::linking::ConcreteModel;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use thiserror::Error;

/// Error types for fitting operations
///
/// These come from the external program and are passed on untouched.
#[derive(Debug, Error)]
pub enum FitError {
    #[error("failed to launch fitter: {0}")]
    Launch(String),

    #[error("fitter exited with code {code}: {stderr}")]
    Exit { code: i32, stderr: String },

    #[error("fitter returned an unreadable result: {0}")]
    Protocol(String),

    #[error("fit did not converge: {0}")]
    Numerical(String),
}

/// Everything the fitter needs for one phase
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FitRequest {
    pub pipeline: String,
    pub phase: String,
    pub dataset: DatasetInfo,
    pub solver: SolverConfig,
    pub settings: PhaseSettings,
    pub model: ConcreteModel,
}

/// What the fitter reports back
///
/// It must report an estimate for every parameter of the model, fixed ones
/// included, so later phases can reference any of them.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FitResponse {
    pub estimates: BTreeMap<ParamPath, Estimate>,

    #[serde(default)]
    pub hyper: BTreeMap<ParamPath, Estimate>,

    #[serde(default)]
    pub max_log_likelihood: Option<f64>,
}

impl FitResponse {
    /// Attach the response to the phase and data it was produced for
    pub fn into_result(self, request: &FitRequest) -> FitResult {
        let result = FitResult::new(request.phase.clone(), request.dataset.clone())
            .with_estimates(self.estimates)
            .with_hyper_estimates(self.hyper);
        match self.max_log_likelihood {
            Some(value) => result.with_max_log_likelihood(value),
            None => result,
        }
    }
}
