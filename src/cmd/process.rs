//! Reply pipeline command: `forgechat process`.

use anyhow::{Context, Result};
use console::style;
use std::path::Path;

use forgechat::config::ChatConfig;
use forgechat::pipeline::{ResponseOutcome, ResponsePipeline, WorkMode};

use super::{print_json, read_input};

pub async fn cmd_process(
    config: &ChatConfig,
    file: Option<&Path>,
    mode: WorkMode,
    json: bool,
) -> Result<()> {
    let reply = read_input(file)?;
    let pipeline = ResponsePipeline::from_config(config).context("Failed to set up sandbox")?;
    let outcome = pipeline.process(&reply, mode).await;

    if json {
        return print_json(&outcome);
    }
    print_outcome(&outcome, mode);
    Ok(())
}

fn print_outcome(outcome: &ResponseOutcome, mode: WorkMode) {
    if outcome.is_empty() {
        println!("Nothing to do for this reply in {} mode.", mode);
        return;
    }

    for (i, run) in outcome.executions.iter().enumerate() {
        println!();
        println!("{}", style(format!("Code block {}", i + 1)).bold().cyan());
        if run.result.success {
            println!("{}", style("Execution succeeded").green());
            if !run.result.output.is_empty() {
                print!("{}", run.result.output);
            }
            if let Some(warnings) = &run.result.error {
                println!("{} {}", style("Warnings:").yellow(), warnings.trim_end());
            }
        } else {
            println!("{}", style("Execution failed").red().bold());
            if let Some(error) = &run.result.error {
                println!("{}", error.trim_end());
            }
        }
    }

    if let Some(project) = &outcome.project {
        println!();
        println!(
            "{} {}",
            style("Project created:").green().bold(),
            project.name
        );
        println!("  Directory: {}", project.project.root.display());
        for file in &project.project.created_files {
            println!("  - {}", file);
        }
        if let Some(archive) = &project.archive {
            println!("  Archive: {} ({})", archive.display(), project.download_name);
        }
        for warning in &project.warnings {
            println!("  {} {}", style("warning:").yellow(), warning);
        }
    }

    for notice in &outcome.notices {
        println!("{} {}", style("!").yellow(), notice);
    }
}
