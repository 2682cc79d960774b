//! Phase executor - hands one resolved phase to the fitter

use crate::{
    core::{FitResult, Pipeline, PipelineStep},
    fitter::{FitError, FitRequest, Fitter},
    linking::ConcreteModel,
};
use tracing::{debug, info, warn};

/// Build the request the fitter receives for `step`
pub fn build_request(pipeline: &Pipeline, step: &PipelineStep, model: ConcreteModel) -> FitRequest {
    FitRequest {
        pipeline: pipeline.name.clone(),
        phase: step.name.clone(),
        dataset: pipeline.dataset.clone(),
        solver: step.solver.clone(),
        settings: step.settings.clone(),
        model,
    }
}

/// Executes a single phase
pub struct PhaseExecutor<F> {
    fitter: F,
}

impl<F: Fitter> PhaseExecutor<F> {
    pub fn new(fitter: F) -> Self {
        Self { fitter }
    }

    /// Fit `step` with its resolved `model`
    ///
    /// Fitting errors are returned as the fitter reported them.
    pub async fn execute(
        &self,
        pipeline: &Pipeline,
        step: &PipelineStep,
        model: ConcreteModel,
    ) -> Result<FitResult, FitError> {
        info!(
            "Fitting phase {} ({} free parameters, sampler {})",
            step.name,
            model.free_parameter_count(),
            step.solver.sampler
        );

        let request = build_request(pipeline, step, model);
        let mut result = self.fitter.fit(&request).await?;
        if result.phase() != step.name {
            // Name selectors look results up by phase name
            warn!(
                "Fitter labelled the result of phase {} as '{}'",
                step.name,
                result.phase()
            );
            result = result.with_phase(step.name.clone());
        }

        let missing: Vec<_> = request
            .model
            .parameters()
            .filter(|(path, parameter)| !parameter.is_absent() && result.estimate(path).is_none())
            .map(|(path, _)| path.to_string())
            .collect();
        if !missing.is_empty() {
            // Later phases referencing these paths will fail to resolve
            warn!(
                "Fitter reported no estimate for {} parameter(s) of phase {}: {}",
                missing.len(),
                step.name,
                missing.join(", ")
            );
        }

        debug!(
            "Phase {} produced {} estimates (max log likelihood {:?})",
            step.name,
            result.estimates().len(),
            result.max_log_likelihood()
        );
        Ok(result)
    }
}
