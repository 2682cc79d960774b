//! Core domain models for phaselink
//!
//! This module defines the fundamental data structures that represent
//! pipelines, phases, parameter declarations and fit results.

pub mod config;
pub mod declaration;
pub mod parameter;
pub mod path;
pub mod pipeline;
pub mod result;
pub mod settings;
pub mod state;
pub mod step;

pub use declaration::ModelDeclaration;
pub use parameter::{ComponentLink, ParameterSpec, Passing, Prior, Reference, StepSelector};
pub use path::{ParamPath, PathError, PathPrefix};
pub use pipeline::Pipeline;
pub use result::{DatasetInfo, Estimate, FitResult};
pub use settings::{GeneralSettings, HyperFeature, PhaseSettings, SolverConfig};
pub use state::{ExecutionStatus, PipelineState, StepState};
pub use step::PipelineStep;
