//! Post-processing of a model reply.
//!
//! [`ResponsePipeline`] takes the reply text and the [`WorkMode`] it was
//! produced in, then:
//!
//! 1. runs every ```` ```python ```` block through the sandbox when the mode
//!    is [`WorkMode::CodeExecution`] or `auto_execute` is on
//! 2. materializes and archives the project manifest when project creation
//!    is enabled and the mode generates projects
//!
//! Manifest validation findings are advisory here: they are attached to the
//! project as warnings. Only a manifest with nothing writable is refused.
//!
//! Failures never abort processing; they are reported as notices next to
//! whatever did succeed.

mod mode;

pub use mode::WorkMode;

use std::path::PathBuf;

use serde::Serialize;
use tracing::{debug, info, warn};

use crate::config::{ChatConfig, FeaturesSection, ProjectsSection};
use crate::errors::SandboxError;
use crate::extract::{contains_fence, extract_code_blocks, extract_project_manifest};
use crate::project::{
    MaterializedProject, ProjectMaterializer, create_download_archive, sanitize_filename,
    validate_manifest,
};
use crate::sandbox::{ExecutionResult, SandboxExecutor};

/// Switches from the `[features]` section.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PipelineOptions {
    pub auto_execute: bool,
    pub create_projects: bool,
}

impl From<&FeaturesSection> for PipelineOptions {
    fn from(features: &FeaturesSection) -> Self {
        Self {
            auto_execute: features.auto_execute,
            create_projects: features.create_projects,
        }
    }
}

/// One code block and what running it produced.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CodeRun {
    pub code: String,
    pub result: ExecutionResult,
}

/// A project written from the reply's manifest.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProjectOutcome {
    pub name: String,
    pub description: String,
    pub project: MaterializedProject,
    /// Zip of the project, absent when no file was written or packaging failed
    pub archive: Option<PathBuf>,
    /// Suggested file name for offering the archive as a download
    pub download_name: String,
    pub warnings: Vec<String>,
}

/// Everything the pipeline did with one reply.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ResponseOutcome {
    pub executions: Vec<CodeRun>,
    pub project: Option<ProjectOutcome>,
    pub notices: Vec<String>,
}

impl ResponseOutcome {
    /// Whether the pipeline did nothing with the reply.
    pub fn is_empty(&self) -> bool {
        self.executions.is_empty() && self.project.is_none() && self.notices.is_empty()
    }
}

pub struct ResponsePipeline {
    executor: SandboxExecutor,
    materializer: ProjectMaterializer,
    limits: ProjectsSection,
    options: PipelineOptions,
}

impl ResponsePipeline {
    pub fn new(
        executor: SandboxExecutor,
        materializer: ProjectMaterializer,
        limits: ProjectsSection,
        options: PipelineOptions,
    ) -> Self {
        Self {
            executor,
            materializer,
            limits,
            options,
        }
    }

    /// Build the pipeline described by a loaded configuration.
    pub fn from_config(config: &ChatConfig) -> Result<Self, SandboxError> {
        Ok(Self::new(
            SandboxExecutor::from_config(&config.toml.sandbox)?,
            ProjectMaterializer::new(config.projects_root()),
            config.toml.projects.clone(),
            PipelineOptions::from(&config.toml.features),
        ))
    }

    /// Process one reply produced in `mode`.
    pub async fn process(&self, reply: &str, mode: WorkMode) -> ResponseOutcome {
        let mut outcome = ResponseOutcome::default();

        let execute = mode == WorkMode::CodeExecution || self.options.auto_execute;
        if execute && contains_fence(reply, "python") {
            for code in extract_code_blocks(reply, "python") {
                let result = self.executor.execute(&code).await;
                debug!(success = result.success, "code block executed");
                outcome.executions.push(CodeRun { code, result });
            }
        }

        if self.options.create_projects && mode.creates_projects() {
            self.materialize(reply, &mut outcome);
        }

        outcome
    }

    fn materialize(&self, reply: &str, outcome: &mut ResponseOutcome) {
        let Some(manifest) = extract_project_manifest(reply) else {
            debug!("reply carries no project manifest");
            return;
        };

        let report = validate_manifest(&manifest, &self.limits);
        let mut warnings = report.errors;
        warnings.extend(report.warnings);
        for warning in &warnings {
            warn!(project = manifest.display_name(), "{}", warning);
        }

        if !manifest.files.iter().any(|entry| entry.writable().is_some()) {
            outcome.notices.push(
                "Project not created: manifest has no file with both name and content"
                    .to_string(),
            );
            return;
        }

        let project = match self.materializer.create_project(&manifest) {
            Ok(project) => project,
            Err(e) => {
                warn!(error = %e, "project creation failed");
                outcome.notices.push(format!("Project creation failed: {}", e));
                return;
            }
        };

        let archive = if project.created_files.is_empty() {
            None
        } else {
            match create_download_archive(&project.root) {
                Ok(path) => Some(path),
                Err(e) => {
                    warn!(error = %e, "archive creation failed");
                    outcome.notices.push(format!("Archive creation failed: {}", e));
                    None
                }
            }
        };

        info!(
            project = manifest.display_name(),
            files = project.created_files.len(),
            archived = archive.is_some(),
            "project created from reply"
        );

        outcome.project = Some(ProjectOutcome {
            name: manifest.display_name().to_string(),
            description: manifest.description.clone(),
            download_name: sanitize_filename(&format!("{}.zip", manifest.display_name())),
            project,
            archive,
            warnings,
        });
    }
}
