use anyhow::{bail, Context, Result};
use phaselink::cli::commands::{HistoryCommand, ResolveCommand, RunCommand, ValidateCommand};
use phaselink::cli::output::*;
use phaselink::cli::{Cli, Command};
use phaselink::core::config::PipelineConfig;
use phaselink::execution::{build_request, restore_results, ExecutionEngine};
use phaselink::fitter::SubprocessFitter;
use phaselink::linking::Resolver;
use phaselink::persistence::{create_summary, DirectoryResultStore, RunHistory, RunSummary};
use std::sync::Arc;
use tracing::{error, Level};
use tracing_subscriber::FmtSubscriber;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::from_args();

    // Initialize logging
    let log_level = if cli.verbose { Level::DEBUG } else { Level::INFO };
    let subscriber = FmtSubscriber::builder()
        .with_max_level(log_level)
        .with_writer(std::io::stderr)
        .finish();
    tracing::subscriber::set_global_default(subscriber)
        .context("Failed to set logging subscriber")?;

    // Execute command
    match &cli.command {
        Command::Run(cmd) => run_pipeline(cmd).await?,
        Command::Validate(cmd) => validate_pipeline(cmd)?,
        Command::Resolve(cmd) => resolve_phase(cmd).await?,
        Command::History(cmd) => show_history(cmd).await?,
    }

    Ok(())
}

#[cfg(feature = "sqlite")]
async fn open_history() -> Result<Arc<dyn RunHistory>> {
    let history = phaselink::persistence::SqliteRunHistory::with_default_path()
        .await
        .context("Failed to open run history")?;
    Ok(Arc::new(history))
}

#[cfg(not(feature = "sqlite"))]
async fn open_history() -> Result<Arc<dyn RunHistory>> {
    tracing::warn!("Built without the sqlite feature; run history is not persisted");
    Ok(Arc::new(phaselink::persistence::InMemoryRunHistory::new()))
}

async fn run_pipeline(cmd: &RunCommand) -> Result<()> {
    // Load pipeline config
    let mut config =
        PipelineConfig::from_file(&cmd.file).context("Failed to load pipeline config")?;
    if let Some(output) = &cmd.output {
        config.output = Some(output.clone());
    }
    if let Some(fitter) = &cmd.fitter {
        config.fitter.command = Some(fitter.clone());
    }

    println!("{} Loaded pipeline: {}", INFO, style(&config.name).bold());

    let mut pipeline = config.to_pipeline()?;
    let store = Arc::new(DirectoryResultStore::new(config.output_root()));
    println!(
        "{} Results under {}",
        INFO,
        style(store.root().join(&pipeline.name).join(pipeline.settings_tag()).display()).dim()
    );

    if cmd.dry_run {
        let restored = restore_results(store.as_ref(), &mut pipeline).await?;
        println!("\n{} Dry run: nothing will be fitted", INFO);
        for step in &pipeline.steps {
            println!(
                "  {} {}",
                format_step_state(&step.state),
                style(step.tagged_name()).bold()
            );
        }
        if let Some(next) = pipeline.steps.get(restored) {
            let model = Resolver::new(&pipeline.settings).resolve(
                restored,
                &next.declaration,
                pipeline.results(),
            )?;
            println!("\n{} Next phase {}:", SPINNER, style(&next.name).cyan());
            println!("{}", format_model(&model));
        } else {
            println!("\n{} Every phase already has a stored result", CHECK);
        }
        return Ok(());
    }

    let fitter = SubprocessFitter::new(&config.fitter);
    let printer = Arc::new(EventPrinter::new());
    let engine = ExecutionEngine::new(fitter, store)
        .with_event_handler(move |event| printer.handle(&event));

    // Execute pipeline
    println!();
    let result = engine.execute(&mut pipeline).await;

    // Save to history
    if !cmd.no_history {
        let summary = create_summary(&pipeline);
        let history = open_history().await?;
        history.save_run(&summary).await?;
        println!(
            "\n{} Run saved to history (ID: {})",
            INFO,
            style(&summary.run_id.to_string()[..8]).dim()
        );
    }

    // Print final status
    match result {
        Ok(()) => {
            println!(
                "\n{} {} completed {}",
                CHECK,
                style(&pipeline.name).bold(),
                style("successfully").green()
            );
            Ok(())
        }
        Err(e) => {
            println!(
                "\n{} {} {}",
                CROSS,
                style(&pipeline.name).bold(),
                style("failed").red()
            );
            error!("{}", e);
            std::process::exit(1);
        }
    }
}

fn validate_pipeline(cmd: &ValidateCommand) -> Result<()> {
    println!("{} Validating pipeline...", INFO);

    match PipelineConfig::from_file(&cmd.file) {
        Ok(config) => {
            println!("{} Pipeline configuration is valid!", CHECK);
            println!("  Name: {}", style(&config.name).bold());
            println!("  Settings: {}", style(config.settings.tag()).cyan());
            println!("  Phases: {}", style(config.phases.len()).cyan());
            for phase in &config.phases {
                println!(
                    "    {} ({} parameters, {} links, sampler {})",
                    style(&phase.name).bold(),
                    phase.parameters.len(),
                    phase.links.len(),
                    phase.solver.sampler
                );
            }

            if cmd.json {
                let json = serde_json::to_string_pretty(&config)?;
                println!("\n{}", json);
            }
            Ok(())
        }
        Err(e) => {
            println!("{} Validation failed:", CROSS);
            println!("  {}", style(format!("{:#}", e)).red());
            std::process::exit(1);
        }
    }
}

async fn resolve_phase(cmd: &ResolveCommand) -> Result<()> {
    let config = PipelineConfig::from_file(&cmd.file).context("Failed to load pipeline config")?;
    let mut pipeline = config.to_pipeline()?;
    let index = pipeline
        .step_index(&cmd.phase)
        .with_context(|| format!("Unknown phase '{}'", cmd.phase))?;

    let root = cmd.output.clone().unwrap_or_else(|| config.output_root());
    let store = DirectoryResultStore::new(root);
    let restored = restore_results(&store, &mut pipeline).await?;
    if restored < index {
        bail!(
            "Phase '{}' needs the result of '{}', which has not been stored yet",
            cmd.phase,
            pipeline.steps[restored].name
        );
    }

    let step = &pipeline.steps[index];
    let model = Resolver::new(&pipeline.settings)
        .resolve(index, &step.declaration, &pipeline.results()[..index])
        .with_context(|| format!("Failed to resolve phase '{}'", cmd.phase))?;

    if cmd.json {
        let request = build_request(&pipeline, step, model);
        println!("{}", serde_json::to_string_pretty(&request)?);
    } else {
        println!("{} Phase {}", INFO, style(step.tagged_name()).bold());
        println!("{}", format_model(&model));
    }

    Ok(())
}

async fn show_history(cmd: &HistoryCommand) -> Result<()> {
    let history = open_history().await?;

    // If a specific run is requested
    if let Some(run_id) = &cmd.run_id {
        let run_id = uuid::Uuid::parse_str(run_id).context("Invalid run ID format")?;
        match history.load_run(run_id).await? {
            Some(summary) => print_run_details(&summary, cmd.json)?,
            None => println!("{} Run not found", WARN),
        }
        return Ok(());
    }

    // List runs for pipeline or all
    let mut runs = if let Some(pipeline_name) = &cmd.pipeline {
        history.list_runs(pipeline_name).await?
    } else {
        let mut all_runs = Vec::new();
        for pipeline in history.list_pipelines().await? {
            all_runs.extend(history.list_runs(&pipeline).await?);
        }
        all_runs.sort_by(|a, b| b.started_at.cmp(&a.started_at));
        all_runs
    };
    runs.truncate(cmd.limit);

    if runs.is_empty() {
        println!("{} No runs found", INFO);
        return Ok(());
    }

    if cmd.json {
        let data = serde_json::json!({ "runs": runs });
        println!("{}", serde_json::to_string_pretty(&data)?);
    } else {
        println!("{} Run history (showing latest {}):", INFO, cmd.limit);
        for summary in &runs {
            println!("  {}", format_run_summary(summary));
        }
    }

    Ok(())
}

fn print_run_details(summary: &RunSummary, json: bool) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(summary)?);
        return Ok(());
    }

    println!("{} Run Details", INFO);
    println!("  ID: {}", style(summary.run_id).cyan());
    println!("  Pipeline: {}", style(&summary.pipeline_name).bold());
    println!("  Settings: {}", style(&summary.settings_tag).dim());
    println!("  Status: {}", format_status(summary.status));
    println!("  Started: {}", style(summary.started_at.to_rfc3339()).dim());
    if let Some(completed) = summary.completed_at {
        println!("  Completed: {}", style(completed.to_rfc3339()).dim());
        if let Ok(duration) = completed.signed_duration_since(summary.started_at).to_std() {
            println!("  Duration: {}", style(format_duration(duration)).dim());
        }
    }
    println!(
        "  Phases: {}/{} ({} resumed)",
        summary.completed_steps, summary.total_steps, summary.resumed_steps
    );

    Ok(())
}

fn format_duration(duration: std::time::Duration) -> String {
    let secs = duration.as_secs();
    if secs < 60 {
        format!("{}s", secs)
    } else if secs < 3600 {
        format!("{}m {}s", secs / 60, secs % 60)
    } else {
        format!("{}h {}m {}s", secs / 3600, (secs % 3600) / 60, secs % 60)
    }
}
