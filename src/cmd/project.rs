//! Project commands: `forgechat project {create, archive, list}`.

use anyhow::{Context, Result, bail};
use console::style;
use serde::Serialize;
use std::path::{Path, PathBuf};

use forgechat::config::ChatConfig;
use forgechat::extract::extract_project_manifest;
use forgechat::project::{
    MaterializedProject, ProjectMaterializer, create_download_archive, validate_manifest,
};

use super::super::ProjectCommands;
use super::{print_json, read_input};

#[derive(Serialize)]
struct CreateReport<'a> {
    project: &'a MaterializedProject,
    archive: Option<&'a Path>,
    warnings: &'a [String],
}

pub fn cmd_project(config: &ChatConfig, command: ProjectCommands) -> Result<()> {
    match command {
        ProjectCommands::Create {
            file,
            no_archive,
            force,
            json,
        } => create(config, file.as_deref(), no_archive, force, json),
        ProjectCommands::Archive { dir } => {
            let dir = if dir.is_absolute() {
                dir
            } else {
                config.project_dir.join(dir)
            };
            if !dir.is_dir() {
                bail!("Not a directory: {}", dir.display());
            }
            let archive = create_download_archive(&dir)
                .with_context(|| format!("Failed to archive {}", dir.display()))?;
            println!("{}", archive.display());
            Ok(())
        }
        ProjectCommands::List { limit } => list(config, limit),
    }
}

fn create(
    config: &ChatConfig,
    file: Option<&Path>,
    no_archive: bool,
    force: bool,
    json: bool,
) -> Result<()> {
    let input = read_input(file)?;
    let Some(manifest) = extract_project_manifest(&input) else {
        bail!("No project manifest found in input");
    };

    let report = validate_manifest(&manifest, &config.toml.projects);
    if !report.is_valid {
        for error in &report.errors {
            eprintln!("{} {}", style("error:").red().bold(), error);
        }
        if !force {
            bail!("Manifest failed validation (use --force to create it anyway)");
        }
    }

    let materializer = ProjectMaterializer::new(config.projects_root());
    let project = materializer
        .create_project(&manifest)
        .context("Failed to create project")?;

    let archive: Option<PathBuf> = if no_archive || project.created_files.is_empty() {
        None
    } else {
        Some(create_download_archive(&project.root).context("Failed to create archive")?)
    };

    if json {
        return print_json(&CreateReport {
            project: &project,
            archive: archive.as_deref(),
            warnings: &report.warnings,
        });
    }

    println!(
        "{} {} ({} files)",
        style("Created").green().bold(),
        project.root.display(),
        project.created_files.len()
    );
    for file in &project.created_files {
        println!("  - {}", file);
    }
    if let Some(archive) = &archive {
        println!("Archive: {}", archive.display());
    }
    for warning in &report.warnings {
        println!("{} {}", style("warning:").yellow(), warning);
    }
    Ok(())
}

fn list(config: &ChatConfig, limit: usize) -> Result<()> {
    let materializer = ProjectMaterializer::new(config.projects_root());
    let projects = materializer.list_projects(limit)?;

    if projects.is_empty() {
        println!("No projects in {}", materializer.root().display());
        return Ok(());
    }

    println!("{:<20} Project", "Modified");
    println!("{:<20} -------", "--------------------");
    for project in projects {
        println!(
            "{:<20} {}",
            project.modified.format("%Y-%m-%d %H:%M:%S"),
            project.dir_name
        );
    }
    Ok(())
}
