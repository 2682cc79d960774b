//! Persistence for phase results and run history
//!
//! Results are keyed by pipeline name, settings tag and tagged phase name,
//! so a later run with the same settings picks them up instead of fitting
//! again.

pub mod directory;
#[cfg(feature = "sqlite")]
pub mod store;

pub use directory::DirectoryResultStore;
#[cfg(feature = "sqlite")]
pub use store::SqliteRunHistory;

pub use crate::core::ExecutionStatus;
use crate::core::{FitResult, Pipeline};
use anyhow::Result;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::PathBuf;
use tokio::sync::RwLock;
use uuid::Uuid;

/// Where a phase result lives
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ResultKey {
    pub pipeline: String,
    pub settings_tag: String,
    /// Phase name including its settings tag
    pub phase: String,
}

impl ResultKey {
    /// Key of phase `index` of `pipeline`
    ///
    /// Panics if `index` is out of range.
    pub fn for_step(pipeline: &Pipeline, index: usize) -> Self {
        Self {
            pipeline: pipeline.name.clone(),
            settings_tag: pipeline.settings_tag(),
            phase: pipeline.steps[index].tagged_name(),
        }
    }

    /// `<pipeline>/<settings tag>/<phase>`
    pub fn relative_dir(&self) -> PathBuf {
        [&self.pipeline, &self.settings_tag, &self.phase].iter().collect()
    }
}

/// Trait for phase result backends
#[async_trait::async_trait]
pub trait ResultStore: Send + Sync {
    /// Load a stored result, if any
    async fn load(&self, key: &ResultKey) -> Result<Option<FitResult>>;

    /// Store a result, replacing any previous one
    async fn save(&self, key: &ResultKey, result: &FitResult) -> Result<()>;
}

/// In-memory result store (for testing or dry runs)
#[derive(Default)]
pub struct InMemoryResultStore {
    results: RwLock<HashMap<ResultKey, FitResult>>,
}

impl InMemoryResultStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.results.read().await.len()
    }
}

#[async_trait::async_trait]
impl ResultStore for InMemoryResultStore {
    async fn load(&self, key: &ResultKey) -> Result<Option<FitResult>> {
        Ok(self.results.read().await.get(key).cloned())
    }

    async fn save(&self, key: &ResultKey, result: &FitResult) -> Result<()> {
        self.results.write().await.insert(key.clone(), result.clone());
        Ok(())
    }
}

/// Summary of a pipeline run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunSummary {
    /// Unique run ID
    pub run_id: Uuid,

    /// Pipeline name
    pub pipeline_name: String,

    /// Settings tag the run was stored under
    pub settings_tag: String,

    /// Run status
    pub status: ExecutionStatus,

    /// When the run started
    pub started_at: DateTime<Utc>,

    /// When the run finished (if it did)
    pub completed_at: Option<DateTime<Utc>>,

    /// Phases with a result
    pub completed_steps: usize,

    /// Phases whose result was loaded instead of fitted
    pub resumed_steps: usize,

    /// Total number of phases
    pub total_steps: usize,
}

impl RunSummary {
    /// Fraction of phases with a result (0.0 to 1.0)
    pub fn progress(&self) -> f64 {
        if self.total_steps == 0 {
            return 0.0;
        }
        self.completed_steps as f64 / self.total_steps as f64
    }
}

/// Trait for run history backends
#[async_trait::async_trait]
pub trait RunHistory: Send + Sync {
    /// Save a run
    async fn save_run(&self, run: &RunSummary) -> Result<()>;

    /// Load a run by ID
    async fn load_run(&self, run_id: Uuid) -> Result<Option<RunSummary>>;

    /// List runs of a pipeline, newest first
    async fn list_runs(&self, pipeline_name: &str) -> Result<Vec<RunSummary>>;

    /// List all pipeline names
    async fn list_pipelines(&self) -> Result<Vec<String>>;
}

/// In-memory run history (for `--no-history` runs and tests)
#[derive(Default)]
pub struct InMemoryRunHistory {
    runs: RwLock<HashMap<Uuid, RunSummary>>,
}

impl InMemoryRunHistory {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait::async_trait]
impl RunHistory for InMemoryRunHistory {
    async fn save_run(&self, run: &RunSummary) -> Result<()> {
        self.runs.write().await.insert(run.run_id, run.clone());
        Ok(())
    }

    async fn load_run(&self, run_id: Uuid) -> Result<Option<RunSummary>> {
        Ok(self.runs.read().await.get(&run_id).cloned())
    }

    async fn list_runs(&self, pipeline_name: &str) -> Result<Vec<RunSummary>> {
        let runs = self.runs.read().await;
        let mut matching: Vec<_> = runs
            .values()
            .filter(|run| run.pipeline_name == pipeline_name)
            .cloned()
            .collect();
        matching.sort_by(|a, b| b.started_at.cmp(&a.started_at));
        Ok(matching)
    }

    async fn list_pipelines(&self) -> Result<Vec<String>> {
        let runs = self.runs.read().await;
        let mut names: Vec<_> = runs.values().map(|run| run.pipeline_name.clone()).collect();
        names.sort();
        names.dedup();
        Ok(names)
    }
}

/// Create a run summary from a pipeline
pub fn create_summary(pipeline: &Pipeline) -> RunSummary {
    RunSummary {
        run_id: pipeline.state.run_id,
        pipeline_name: pipeline.name.clone(),
        settings_tag: pipeline.settings_tag(),
        status: pipeline.state.status,
        started_at: pipeline.state.started_at.unwrap_or_else(Utc::now),
        completed_at: pipeline.state.completed_at,
        completed_steps: pipeline.state.completed_steps,
        resumed_steps: pipeline.state.resumed_steps,
        total_steps: pipeline.state.total_steps,
    }
}
