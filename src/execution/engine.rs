//! Main execution engine - runs the phases of a pipeline in order

use crate::{
    core::{ExecutionStatus, FitResult, Pipeline, StepState},
    execution::PhaseExecutor,
    fitter::{FitError, Fitter},
    linking::{LinkError, Resolver},
    persistence::{ResultKey, ResultStore},
};
use chrono::Utc;
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, error, info};
use uuid::Uuid;

/// Why a pipeline run stopped
#[derive(Debug, Error)]
pub enum EngineError {
    /// The chain is inconsistent; nothing was fitted
    #[error("invalid pipeline configuration: {0}")]
    Config(#[source] LinkError),

    #[error("phase '{phase}' could not be resolved: {source}")]
    Link {
        phase: String,
        #[source]
        source: LinkError,
    },

    #[error("phase '{phase}' failed: {source}")]
    Fit {
        phase: String,
        #[source]
        source: FitError,
    },

    #[error("result store failed for phase '{phase}': {message}")]
    Store { phase: String, message: String },
}

impl EngineError {
    /// Name of the phase the run stopped at, if it got that far
    pub fn phase(&self) -> Option<&str> {
        match self {
            EngineError::Config(_) => None,
            EngineError::Link { phase, .. }
            | EngineError::Fit { phase, .. }
            | EngineError::Store { phase, .. } => Some(phase),
        }
    }
}

/// Events that can occur during pipeline execution
#[derive(Debug, Clone)]
pub enum ExecutionEvent {
    PipelineStarted {
        run_id: Uuid,
        pipeline_name: String,
        total_phases: usize,
    },
    PhaseResolved {
        phase: String,
        free_parameters: usize,
    },
    PhaseStarted {
        phase: String,
        index: usize,
    },
    /// A stored result was found, so the phase is not fitted again
    PhaseResumed {
        phase: String,
    },
    PhaseCompleted {
        phase: String,
        max_log_likelihood: Option<f64>,
    },
    PhaseFailed {
        phase: String,
        error: String,
    },
    PipelineCompleted {
        run_id: Uuid,
        status: ExecutionStatus,
    },
}

/// Type for event handlers
pub type EventHandler = Arc<dyn Fn(ExecutionEvent) + Send + Sync>;

/// Load stored results for the leading phases of `pipeline`
///
/// Stops at the first phase without a stored result and returns how many
/// results were restored.
pub async fn restore_results(
    store: &dyn ResultStore,
    pipeline: &mut Pipeline,
) -> Result<usize, EngineError> {
    let mut restored = 0;
    for index in pipeline.next_step_index()..pipeline.steps.len() {
        let key = ResultKey::for_step(pipeline, index);
        let stored = store.load(&key).await.map_err(|e| EngineError::Store {
            phase: pipeline.steps[index].name.clone(),
            message: format!("{:#}", e),
        })?;
        let Some(result) = stored else {
            break;
        };

        let now = Utc::now();
        pipeline.steps[index].state = StepState::Completed {
            resumed: true,
            started_at: now,
            completed_at: now,
        };
        pipeline.push_result(result);
        pipeline.state.record_completed(true);
        restored += 1;
    }
    Ok(restored)
}

/// Sequential pipeline execution engine
///
/// Each phase is resolved against the results of the phases before it,
/// then either restored from the result store or fitted. The first failure
/// halts the chain; later phases are never resolved.
pub struct ExecutionEngine<F> {
    executor: PhaseExecutor<F>,
    store: Arc<dyn ResultStore>,
    event_handlers: Vec<EventHandler>,
}

impl<F: Fitter> ExecutionEngine<F> {
    pub fn new(fitter: F, store: Arc<dyn ResultStore>) -> Self {
        Self {
            executor: PhaseExecutor::new(fitter),
            store,
            event_handlers: Vec::new(),
        }
    }

    /// Add an event handler
    pub fn with_event_handler<H>(mut self, handler: H) -> Self
    where
        H: Fn(ExecutionEvent) + Send + Sync + 'static,
    {
        self.event_handlers.push(Arc::new(handler));
        self
    }

    fn emit_event(&self, event: ExecutionEvent) {
        for handler in &self.event_handlers {
            handler(event.clone());
        }
    }

    /// Execute the entire pipeline
    pub async fn execute(&self, pipeline: &mut Pipeline) -> Result<(), EngineError> {
        let run_id = pipeline.state.run_id;
        info!("Starting pipeline {} ({})", pipeline.name, run_id);

        // The whole chain is checked before the first fit
        if let Err(e) = pipeline.validate() {
            error!("Pipeline {} is invalid: {}", pipeline.name, e);
            pipeline.state.fail();
            self.emit_event(ExecutionEvent::PipelineCompleted {
                run_id,
                status: ExecutionStatus::Failed,
            });
            return Err(EngineError::Config(e));
        }

        pipeline.state.start(pipeline.steps.len());
        self.emit_event(ExecutionEvent::PipelineStarted {
            run_id,
            pipeline_name: pipeline.name.clone(),
            total_phases: pipeline.steps.len(),
        });

        for index in pipeline.next_step_index()..pipeline.steps.len() {
            if let Err(e) = self.execute_step(pipeline, index).await {
                error!("Pipeline {} halted: {}", pipeline.name, e);
                pipeline.steps[index].state = StepState::Failed {
                    error: e.to_string(),
                    failed_at: Utc::now(),
                };
                pipeline.state.fail();
                self.emit_event(ExecutionEvent::PhaseFailed {
                    phase: pipeline.steps[index].name.clone(),
                    error: e.to_string(),
                });
                self.emit_event(ExecutionEvent::PipelineCompleted {
                    run_id,
                    status: ExecutionStatus::Failed,
                });
                return Err(e);
            }
        }

        pipeline.state.complete();
        info!(
            "Pipeline {} finished: {} phases, {} restored",
            pipeline.name, pipeline.state.completed_steps, pipeline.state.resumed_steps
        );
        self.emit_event(ExecutionEvent::PipelineCompleted {
            run_id,
            status: ExecutionStatus::Completed,
        });

        Ok(())
    }

    /// Resolve, then restore or fit, phase `index`
    async fn execute_step(&self, pipeline: &mut Pipeline, index: usize) -> Result<(), EngineError> {
        let phase = pipeline.steps[index].name.clone();
        let started_at = Utc::now();

        let model = Resolver::new(&pipeline.settings)
            .resolve(index, &pipeline.steps[index].declaration, pipeline.results())
            .map_err(|source| EngineError::Link {
                phase: phase.clone(),
                source,
            })?;
        debug!("Resolved model for phase {}: {:?}", phase, model);
        self.emit_event(ExecutionEvent::PhaseResolved {
            phase: phase.clone(),
            free_parameters: model.free_parameter_count(),
        });

        let key = ResultKey::for_step(pipeline, index);
        let store_error = |e: anyhow::Error| EngineError::Store {
            phase: phase.clone(),
            message: format!("{:#}", e),
        };

        let (result, resumed): (FitResult, bool) = match self.store.load(&key).await.map_err(store_error)? {
            Some(result) => {
                info!("Phase {} already has a stored result, skipping fit", phase);
                self.emit_event(ExecutionEvent::PhaseResumed {
                    phase: phase.clone(),
                });
                (result, true)
            }
            None => {
                pipeline.steps[index].state = StepState::Running { started_at };
                self.emit_event(ExecutionEvent::PhaseStarted {
                    phase: phase.clone(),
                    index,
                });

                let result = self
                    .executor
                    .execute(&*pipeline, &pipeline.steps[index], model)
                    .await
                    .map_err(|source| EngineError::Fit {
                        phase: phase.clone(),
                        source,
                    })?;
                self.store.save(&key, &result).await.map_err(store_error)?;
                (result, false)
            }
        };

        self.emit_event(ExecutionEvent::PhaseCompleted {
            phase: phase.clone(),
            max_log_likelihood: result.max_log_likelihood(),
        });
        pipeline.push_result(result);
        pipeline.state.record_completed(resumed);
        pipeline.steps[index].state = StepState::Completed {
            resumed,
            started_at,
            completed_at: Utc::now(),
        };

        Ok(())
    }
}
