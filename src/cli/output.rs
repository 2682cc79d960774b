//! CLI output formatting

use crate::{
    core::{ExecutionStatus, StepState},
    execution::ExecutionEvent,
    linking::{ConcreteModel, ResolvedParameter},
    persistence::RunSummary,
};
use console::Emoji;
use indicatif::{ProgressBar, ProgressStyle};
use std::sync::Mutex;
use std::time::Duration;

// Re-export style
pub use console::style;

// Emojis for output
pub static CHECK: Emoji<'_, '_> = Emoji("✅ ", "✓ ");
pub static CROSS: Emoji<'_, '_> = Emoji("❌ ", "✗ ");
pub static SPINNER: Emoji<'_, '_> = Emoji("⏳ ", "~ ");
pub static INFO: Emoji<'_, '_> = Emoji("ℹ️  ", "i ");
pub static WARN: Emoji<'_, '_> = Emoji("⚠️  ", "!");
pub static ROCKET: Emoji<'_, '_> = Emoji("🚀 ", "> ");
pub static RESUME: Emoji<'_, '_> = Emoji("♻️  ", "= ");

/// Create a spinner shown while a phase is being fitted
pub fn create_spinner(message: String) -> ProgressBar {
    let spinner = ProgressBar::new_spinner();
    spinner.set_style(
        ProgressStyle::default_spinner()
            .template("{spinner:.green} [{elapsed_precise}] {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner()),
    );
    spinner.set_message(message);
    spinner.enable_steady_tick(Duration::from_millis(100));
    spinner
}

/// Format a step state for display
pub fn format_step_state(state: &StepState) -> String {
    match state {
        StepState::Pending => style("PENDING").dim().to_string(),
        StepState::Running { .. } => style("FITTING").yellow().to_string(),
        StepState::Completed { resumed: true, .. } => style("RESUMED").cyan().to_string(),
        StepState::Completed { .. } => style("COMPLETED").green().to_string(),
        StepState::Failed { .. } => style("FAILED").red().to_string(),
    }
}

/// Format an execution status for display
pub fn format_status(status: ExecutionStatus) -> String {
    match status {
        ExecutionStatus::Pending => style("PENDING").dim().to_string(),
        ExecutionStatus::Running => style("RUNNING").yellow().to_string(),
        ExecutionStatus::Completed => style("COMPLETED").green().to_string(),
        ExecutionStatus::Failed => style("FAILED").red().to_string(),
    }
}

/// Format a run summary for display
pub fn format_run_summary(summary: &RunSummary) -> String {
    let status_icon = match summary.status {
        ExecutionStatus::Completed => CHECK,
        ExecutionStatus::Failed => CROSS,
        ExecutionStatus::Running => SPINNER,
        ExecutionStatus::Pending => INFO,
    };

    format!(
        "{} {} - {} [{}] - {} ({}/{}, {} resumed) - {}",
        status_icon,
        style(&summary.run_id.to_string()[..8]).dim(),
        style(&summary.pipeline_name).bold(),
        style(&summary.settings_tag).dim(),
        format_status(summary.status),
        summary.completed_steps,
        summary.total_steps,
        summary.resumed_steps,
        style(format!("{:.0}%", summary.progress() * 100.0)).cyan()
    )
}

/// Format a resolved model, one parameter per line
pub fn format_model(model: &ConcreteModel) -> String {
    let mut lines = Vec::with_capacity(model.len() + 1);
    lines.push(format!(
        "{} parameters, {} free",
        style(model.len()).cyan(),
        style(model.free_parameter_count()).cyan()
    ));
    for (path, parameter) in model.parameters() {
        let value = match parameter {
            ResolvedParameter::Fixed { value } => style(format!("= {}", value)).green().to_string(),
            ResolvedParameter::Prior { prior } => style(format!("~ {}", prior)).yellow().to_string(),
            ResolvedParameter::Aligned { to } => style(format!("-> {}", to)).cyan().to_string(),
            ResolvedParameter::Absent => style("absent").dim().to_string(),
        };
        lines.push(format!("  {} {}", style(path).bold(), value));
    }
    lines.join("\n")
}

/// Format an execution event for display
pub fn format_execution_event(event: &ExecutionEvent) -> String {
    match event {
        ExecutionEvent::PipelineStarted {
            run_id,
            pipeline_name,
            total_phases,
        } => format!(
            "{} Starting pipeline {} with {} phases ({})",
            ROCKET,
            style(pipeline_name).bold(),
            style(total_phases).cyan(),
            style(&run_id.to_string()[..8]).dim()
        ),
        ExecutionEvent::PhaseResolved {
            phase,
            free_parameters,
        } => format!(
            "{} {} resolved ({} free parameters)",
            INFO,
            style(phase).cyan(),
            free_parameters
        ),
        ExecutionEvent::PhaseStarted { phase, index } => format!(
            "{} {} (phase {})",
            SPINNER,
            style(phase).cyan(),
            style(index + 1).dim()
        ),
        ExecutionEvent::PhaseResumed { phase } => format!(
            "{} {} {}",
            RESUME,
            style(phase).cyan(),
            style("(stored result)").dim()
        ),
        ExecutionEvent::PhaseCompleted {
            phase,
            max_log_likelihood,
        } => match max_log_likelihood {
            Some(value) => format!(
                "{} {} {}",
                CHECK,
                style(phase).green(),
                style(format!("(max log likelihood {:.3})", value)).dim()
            ),
            None => format!("{} {}", CHECK, style(phase).green()),
        },
        ExecutionEvent::PhaseFailed { phase, error } => {
            format!("{} {}: {}", CROSS, style(phase).red(), style(error).dim())
        }
        ExecutionEvent::PipelineCompleted { run_id, status } => {
            let status_str = match status {
                ExecutionStatus::Completed => format!("{} completed", style("successfully").green()),
                ExecutionStatus::Failed => style("failed").red().to_string(),
                _ => format!("{:?}", status),
            };
            format!(
                "{} Pipeline ({}) {}",
                INFO,
                style(&run_id.to_string()[..8]).dim(),
                status_str
            )
        }
    }
}

/// Prints execution events, with a spinner while a fit runs
#[derive(Default)]
pub struct EventPrinter {
    spinner: Mutex<Option<ProgressBar>>,
}

impl EventPrinter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn handle(&self, event: &ExecutionEvent) {
        let Ok(mut spinner) = self.spinner.lock() else {
            println!("{}", format_execution_event(event));
            return;
        };

        match event {
            ExecutionEvent::PhaseStarted { phase, .. } => {
                println!("{}", format_execution_event(event));
                *spinner = Some(create_spinner(format!("fitting {}", phase)));
            }
            ExecutionEvent::PhaseCompleted { .. } | ExecutionEvent::PhaseFailed { .. } => {
                if let Some(bar) = spinner.take() {
                    bar.finish_and_clear();
                }
                println!("{}", format_execution_event(event));
            }
            _ => println!("{}", format_execution_event(event)),
        }
    }
}
