//! Pipeline execution engine

pub mod engine;
pub mod executor;

pub use engine::{restore_results, EngineError, EventHandler, ExecutionEngine, ExecutionEvent};
pub use executor::{build_request, PhaseExecutor};
