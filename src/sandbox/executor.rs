//! Validate-then-run execution of model-generated code.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tokio::sync::Semaphore;
use tracing::{debug, info, warn};

use super::policy::{SecurityPolicy, ValidationOutcome};
use super::runner::{CodeRunner, PythonRunner, RunOutput};
use crate::config::SandboxSection;
use crate::errors::SandboxError;

/// Outcome of one execution request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecutionResult {
    pub success: bool,
    pub output: String,
    pub error: Option<String>,
}

impl ExecutionResult {
    /// A run that completed; `stderr` becomes the error text only if non-empty.
    pub fn completed(stdout: String, stderr: String) -> Self {
        Self {
            success: true,
            output: stdout,
            error: (!stderr.is_empty()).then_some(stderr),
        }
    }

    /// A run that was rejected or faulted. No output is reported.
    pub fn failed(error: impl Into<String>) -> Self {
        Self {
            success: false,
            output: String::new(),
            error: Some(error.into()),
        }
    }
}

/// Executes code after validating it against the [`SecurityPolicy`].
///
/// Each call moves through `Received -> Validated -> {Rejected | Executing} -> Completed`.
/// Concurrent calls are bounded by a semaphore sized from `max_concurrent`.
pub struct SandboxExecutor {
    policy: SecurityPolicy,
    runner: Arc<dyn CodeRunner>,
    permits: Arc<Semaphore>,
}

impl SandboxExecutor {
    /// Build the executor described by the `[sandbox]` section.
    pub fn from_config(section: &SandboxSection) -> Result<Self, SandboxError> {
        let policy = SecurityPolicy::from_config(section)?;
        let runner = Arc::new(PythonRunner::from_config(section));
        Ok(Self::with_runner(policy, runner, section.max_concurrent))
    }

    /// Build an executor around any runner.
    pub fn with_runner(
        policy: SecurityPolicy,
        runner: Arc<dyn CodeRunner>,
        max_concurrent: usize,
    ) -> Self {
        Self {
            policy,
            runner,
            permits: Arc::new(Semaphore::new(max_concurrent.max(1))),
        }
    }

    /// Check code without running it.
    pub fn validate(&self, code: &str) -> ValidationOutcome {
        self.policy.validate(code)
    }

    /// Validate and, if safe, run `code`.
    ///
    /// Never returns an error: rejections, faults, timeouts and spawn
    /// failures are all reported through [`ExecutionResult::error`].
    pub async fn execute(&self, code: &str) -> ExecutionResult {
        let outcome = self.policy.validate(code);
        if !outcome.is_safe {
            let reason = outcome.first_error().unwrap_or("Code rejected");
            info!(reason, violations = outcome.errors.len(), "code rejected by policy");
            return ExecutionResult::failed(reason);
        }

        let _permit = match self.permits.acquire().await {
            Ok(permit) => permit,
            Err(_) => return ExecutionResult::failed(SandboxError::Closed.to_string()),
        };

        debug!(runner = self.runner.name(), "executing validated code");
        match self.runner.run(code.trim()).await {
            Ok(run) => Self::interpret(run),
            Err(e) => {
                warn!(error = %e, "sandboxed run failed");
                ExecutionResult::failed(e.to_string())
            }
        }
    }

    fn interpret(run: RunOutput) -> ExecutionResult {
        if run.success() {
            return ExecutionResult::completed(run.stdout, run.stderr);
        }

        let fault = if !run.stderr.trim().is_empty() {
            run.stderr
        } else {
            match run.exit_code {
                Some(code) => format!("Interpreter exited with status {}", code),
                None => "Interpreter was terminated by a signal (resource limit reached?)"
                    .to_string(),
            }
        };
        ExecutionResult::failed(fault)
    }
}
