//! Pipeline domain model

use crate::core::{
    result::{DatasetInfo, FitResult},
    settings::GeneralSettings,
    state::{ExecutionStatus, PipelineState, StepState},
    step::PipelineStep,
};
use crate::linking::{validate_chain, LinkError};

/// A linear chain of fitting phases
#[derive(Debug, Clone)]
pub struct Pipeline {
    /// Pipeline name
    pub name: String,

    /// Settings shared by every phase
    pub settings: GeneralSettings,

    /// Data every phase is fitted against
    pub dataset: DatasetInfo,

    /// Phases in execution order
    pub steps: Vec<PipelineStep>,

    /// Execution state
    pub state: PipelineState,

    /// `results[i]` belongs to `steps[i]`
    results: Vec<FitResult>,
}

impl Pipeline {
    pub fn new(name: impl Into<String>, dataset: DatasetInfo) -> Self {
        Self {
            name: name.into(),
            settings: GeneralSettings::default(),
            dataset,
            steps: Vec::new(),
            state: PipelineState::new(),
            results: Vec::new(),
        }
    }

    pub fn with_settings(mut self, settings: GeneralSettings) -> Self {
        self.settings = settings;
        self
    }

    /// Append a phase to the end of the chain
    pub fn with_step(mut self, step: PipelineStep) -> Self {
        self.steps.push(step);
        self
    }

    /// Get a step by name
    pub fn step(&self, name: &str) -> Option<&PipelineStep> {
        self.steps.iter().find(|s| s.name == name)
    }

    pub fn step_index(&self, name: &str) -> Option<usize> {
        self.steps.iter().position(|s| s.name == name)
    }

    /// Results of the phases completed so far, in order
    pub fn results(&self) -> &[FitResult] {
        &self.results
    }

    pub fn result(&self, name: &str) -> Option<&FitResult> {
        self.step_index(name).and_then(|index| self.results.get(index))
    }

    /// Record the result of the next phase in the chain
    ///
    /// The result is labelled with that phase's name, whatever it carried.
    pub(crate) fn push_result(&mut self, result: FitResult) {
        let result = match self.steps.get(self.results.len()) {
            Some(step) if result.phase() != step.name => result.with_phase(step.name.clone()),
            _ => result,
        };
        self.results.push(result);
    }

    /// Index of the first phase without a result
    pub fn next_step_index(&self) -> usize {
        self.results.len()
    }

    /// Tag of the settings directory all phases are stored under
    pub fn settings_tag(&self) -> String {
        self.settings.tag()
    }

    /// Check the whole chain before fitting anything
    pub fn validate(&self) -> Result<(), LinkError> {
        validate_chain(&self.steps)
    }

    /// Check if every phase has a result
    pub fn is_complete(&self) -> bool {
        self.steps
            .iter()
            .all(|s| matches!(s.state, StepState::Completed { .. }))
    }

    /// Check if pipeline has failed
    pub fn has_failed(&self) -> bool {
        self.state.status == ExecutionStatus::Failed
    }
}
