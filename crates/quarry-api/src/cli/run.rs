//! Workflow and run commands: run, resume, workflows, runs, show.

use std::time::Duration;

use comfy_table::{Cell, Color, ContentArrangement, Table, presets};
use console::style;
use indicatif::{ProgressBar, ProgressStyle};
use uuid::Uuid;

use quarry_core::pipeline::{EngineError, RunOutcome};
use quarry_types::workflow::RunStatus;

use super::RequestArgs;
use crate::state::AppState;

/// Output flags shared by every command.
#[derive(Debug, Clone, Copy)]
pub struct Output {
    pub json: bool,
    pub quiet: bool,
}

fn spinner(output: Output, message: String) -> ProgressBar {
    if output.json || output.quiet {
        return ProgressBar::hidden();
    }
    let spinner = ProgressBar::new_spinner();
    spinner.set_style(
        ProgressStyle::default_spinner()
            .template("{spinner:.cyan} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner()),
    );
    spinner.set_message(message);
    spinner.enable_steady_tick(Duration::from_millis(80));
    spinner
}

/// Run a workflow to completion and print where the artifacts landed.
pub async fn run_workflow(
    state: &AppState,
    workflow: &str,
    args: RequestArgs,
    output: Output,
) -> anyhow::Result<()> {
    let request = args.into_request(state.config.search.default_limit);
    let spinner = spinner(output, format!("Researching \"{}\"...", request.topic.trim()));

    let result = state.engine.execute(workflow, request).await;
    spinner.finish_and_clear();
    report(result, output)
}

/// Resume a run after its last checkpoint.
pub async fn resume_run(state: &AppState, run_id: Uuid, output: Output) -> anyhow::Result<()> {
    let spinner = spinner(output, format!("Resuming run {run_id}..."));
    let result = state.engine.resume(run_id).await;
    spinner.finish_and_clear();
    report(result, output)
}

fn report(result: Result<RunOutcome, EngineError>, output: Output) -> anyhow::Result<()> {
    let outcome = match result {
        Ok(outcome) => outcome,
        Err(err) => {
            if let Some(run_id) = err.run_id()
                && !output.json
            {
                eprintln!(
                    "  {} Run {} stopped. Resume with: {}",
                    style("!").yellow().bold(),
                    style(run_id).dim(),
                    style(format!("quarry resume {run_id}")).cyan()
                );
            }
            return Err(err.into());
        }
    };

    if output.json {
        println!("{}", serde_json::to_string_pretty(&outcome)?);
        return Ok(());
    }
    if output.quiet {
        return Ok(());
    }

    let state = &outcome.state;
    println!();
    println!(
        "  {} Research on {} {}",
        style("*").green().bold(),
        style(&state.topic).cyan().bold(),
        style(outcome.status).green()
    );
    println!();
    println!("  {:<12} {}", style("Run:").bold(), outcome.run_id);
    println!("  {:<12} {}", style("Sources:").bold(), state.sources.len());
    println!("  {:<12} {}", style("Notes:").bold(), state.atomic_notes.len());
    if let Some(path) = &state.report_path {
        println!("  {:<12} {}", style("Report:").bold(), path);
    }
    if !state.key_insights.is_empty() {
        println!();
        println!("  {}", style("Key insights").bold());
        for insight in &state.key_insights {
            println!("    - {insight}");
        }
    }
    println!();
    Ok(())
}

/// List registered workflows.
pub fn list_workflows(state: &AppState, output: Output) -> anyhow::Result<()> {
    let workflows = state.engine.workflows();

    if output.json {
        println!("{}", serde_json::to_string_pretty(&workflows)?);
        return Ok(());
    }

    let mut table = Table::new();
    table
        .load_preset(presets::UTF8_FULL_CONDENSED)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(vec![
            Cell::new("Workflow").fg(Color::Cyan),
            Cell::new("Stages").fg(Color::Cyan),
        ]);
    for workflow in &workflows {
        table.add_row(vec![
            Cell::new(&workflow.name),
            Cell::new(workflow.stages.join(" -> ")),
        ]);
    }
    println!("{table}");
    Ok(())
}

/// List recent runs, newest first.
pub async fn list_runs(state: &AppState, limit: u32, output: Output) -> anyhow::Result<()> {
    let runs = state.engine.runs(limit).await?;

    if output.json {
        println!("{}", serde_json::to_string_pretty(&runs)?);
        return Ok(());
    }

    if runs.is_empty() {
        println!("  No runs yet. Start one with: quarry run research --topic \"...\"");
        return Ok(());
    }

    let mut table = Table::new();
    table
        .load_preset(presets::UTF8_FULL_CONDENSED)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(vec![
            Cell::new("Run").fg(Color::Cyan),
            Cell::new("Workflow").fg(Color::Cyan),
            Cell::new("Topic").fg(Color::Cyan),
            Cell::new("Status").fg(Color::Cyan),
            Cell::new("Stage").fg(Color::Cyan),
            Cell::new("Started").fg(Color::Cyan),
        ]);

    for run in &runs {
        let topic = run.request["topic"].as_str().unwrap_or_default().trim();
        let stage = run
            .last_stage_index
            .map(|i| i.to_string())
            .unwrap_or_else(|| "-".to_string());
        table.add_row(vec![
            Cell::new(run.id),
            Cell::new(&run.workflow),
            Cell::new(topic),
            format_status(run.status),
            Cell::new(stage),
            Cell::new(run.started_at.format("%Y-%m-%d %H:%M:%S")),
        ]);
    }
    println!("{table}");
    Ok(())
}

/// Show a run and its checkpoints.
pub async fn show_run(state: &AppState, run_id: Uuid, output: Output) -> anyhow::Result<()> {
    let run = state.engine.run(run_id).await?;
    let checkpoints = state.engine.checkpoints(run_id).await?;

    if output.json {
        let detail = serde_json::json!({ "run": run, "checkpoints": checkpoints });
        println!("{}", serde_json::to_string_pretty(&detail)?);
        return Ok(());
    }

    println!();
    println!("  {:<12} {}", style("Run:").bold(), run.id);
    println!("  {:<12} {}", style("Workflow:").bold(), run.workflow);
    println!(
        "  {:<12} {}",
        style("Topic:").bold(),
        run.request["topic"].as_str().unwrap_or_default()
    );
    println!("  {:<12} {}", style("Status:").bold(), run.status);
    println!("  {:<12} {}", style("Started:").bold(), run.started_at);
    if let Some(completed) = run.completed_at {
        println!("  {:<12} {}", style("Completed:").bold(), completed);
    }
    if let Some(error) = &run.error {
        println!("  {:<12} {}", style("Error:").bold(), style(error).red());
    }

    if !checkpoints.is_empty() {
        println!();
        let mut table = Table::new();
        table
            .load_preset(presets::UTF8_FULL_CONDENSED)
            .set_content_arrangement(ContentArrangement::Dynamic)
            .set_header(vec![
                Cell::new("#").fg(Color::Cyan),
                Cell::new("Stage").fg(Color::Cyan),
                Cell::new("Updated fields").fg(Color::Cyan),
                Cell::new("At").fg(Color::Cyan),
            ]);
        for cp in &checkpoints {
            let fields = cp
                .update
                .as_object()
                .map(|o| o.keys().cloned().collect::<Vec<_>>().join(", "))
                .unwrap_or_default();
            table.add_row(vec![
                Cell::new(cp.stage_index),
                Cell::new(&cp.stage),
                Cell::new(fields),
                Cell::new(cp.created_at.format("%H:%M:%S")),
            ]);
        }
        println!("{table}");
    }

    if !run.status.is_finished() && !state.engine.active_runs().contains(&run.id) {
        println!();
        println!(
            "  {}",
            style(format!("Resume with: quarry resume {}", run.id)).dim()
        );
    }
    println!();
    Ok(())
}

fn format_status(status: RunStatus) -> Cell {
    match status {
        RunStatus::Running => Cell::new("running").fg(Color::Blue),
        RunStatus::Completed => Cell::new("completed").fg(Color::Green),
        RunStatus::Failed => Cell::new("failed").fg(Color::Red),
        RunStatus::Cancelled => Cell::new("cancelled").fg(Color::DarkYellow),
    }
}
