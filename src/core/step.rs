//! Step domain model

use crate::core::{
    declaration::ModelDeclaration,
    settings::{PhaseSettings, SolverConfig},
    state::StepState,
};

/// A single fitting phase in a pipeline
#[derive(Debug, Clone)]
pub struct PipelineStep {
    /// Phase name, unique within the pipeline
    pub name: String,

    /// What this phase fits
    pub declaration: ModelDeclaration,

    /// Non-linear search configuration
    pub solver: SolverConfig,

    /// Data-preparation settings
    pub settings: PhaseSettings,

    /// Runtime state (not serialized)
    pub state: StepState,
}

impl PipelineStep {
    pub fn new(name: impl Into<String>, declaration: ModelDeclaration) -> Self {
        Self {
            name: name.into(),
            declaration,
            solver: SolverConfig::default(),
            settings: PhaseSettings::default(),
            state: StepState::Pending,
        }
    }

    pub fn with_solver(mut self, solver: SolverConfig) -> Self {
        self.solver = solver;
        self
    }

    pub fn with_settings(mut self, settings: PhaseSettings) -> Self {
        self.settings = settings;
        self
    }

    /// Name of the phase's output directory
    pub fn tagged_name(&self) -> String {
        format!("{}{}", self.name, self.settings.tag())
    }
}
