//! phaselink - chains lens-model fitting phases, passing each phase's
//! results into the priors of the next

pub mod cli;
pub mod core;
pub mod execution;
pub mod fitter;
pub mod linking;
pub mod persistence;

// Re-export commonly used types
pub use core::{
    ExecutionStatus, FitResult, ModelDeclaration, ParamPath, Pipeline, PipelineStep, StepState,
};
pub use execution::{EngineError, ExecutionEngine, ExecutionEvent};
pub use fitter::{FitError, FitRequest, Fitter, SubprocessFitter};
pub use linking::{resolve, ConcreteModel, LinkError, Resolver, UnresolvedReferenceError};
pub use persistence::{DirectoryResultStore, InMemoryResultStore, ResultStore};
