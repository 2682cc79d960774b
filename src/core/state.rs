//! Execution state models

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Overall pipeline execution status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ExecutionStatus {
    /// Pipeline has not started
    Pending,
    /// Pipeline is currently running
    Running,
    /// Every phase has a result
    Completed,
    /// A phase could not be configured or fitted
    Failed,
}

/// State of a single phase
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum StepState {
    /// Waiting for earlier phases
    Pending,
    /// Fitting in progress
    Running {
        started_at: DateTime<Utc>,
    },
    /// Result available; `resumed` when it was loaded instead of fitted
    Completed {
        resumed: bool,
        started_at: DateTime<Utc>,
        completed_at: DateTime<Utc>,
    },
    /// Resolution or fitting failed; later phases never run
    Failed {
        error: String,
        failed_at: DateTime<Utc>,
    },
}

/// Overall pipeline state
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineState {
    /// Unique run ID
    pub run_id: Uuid,

    /// Current execution status
    pub status: ExecutionStatus,

    /// When execution started
    pub started_at: Option<DateTime<Utc>>,

    /// When execution completed/failed
    pub completed_at: Option<DateTime<Utc>>,

    /// Total number of phases
    pub total_steps: usize,

    /// Phases with a result, fitted or resumed
    pub completed_steps: usize,

    /// Phases whose result came from the store
    pub resumed_steps: usize,
}

impl PipelineState {
    pub fn new() -> Self {
        Self {
            run_id: Uuid::new_v4(),
            status: ExecutionStatus::Pending,
            started_at: None,
            completed_at: None,
            total_steps: 0,
            completed_steps: 0,
            resumed_steps: 0,
        }
    }

    /// Mark pipeline as started
    pub fn start(&mut self, total_steps: usize) {
        self.status = ExecutionStatus::Running;
        self.started_at = Some(Utc::now());
        self.total_steps = total_steps;
    }

    /// Mark pipeline as completed
    pub fn complete(&mut self) {
        self.status = ExecutionStatus::Completed;
        self.completed_at = Some(Utc::now());
    }

    /// Mark pipeline as failed
    pub fn fail(&mut self) {
        self.status = ExecutionStatus::Failed;
        self.completed_at = Some(Utc::now());
    }

    /// Record one more phase with a result
    pub fn record_completed(&mut self, resumed: bool) {
        self.completed_steps += 1;
        if resumed {
            self.resumed_steps += 1;
        }
    }

    /// Calculate progress (0.0 to 1.0)
    pub fn progress(&self) -> f64 {
        if self.total_steps == 0 {
            return 0.0;
        }
        self.completed_steps as f64 / self.total_steps as f64
    }
}

impl Default for PipelineState {
    fn default() -> Self {
        Self::new()
    }
}
