use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// What the user is asking the model to do.
///
/// The mode picks the system prompt and decides which post-processing a
/// reply gets: code execution, project materialization, or neither.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum WorkMode {
    #[default]
    Chat,
    CodeGeneration,
    CodeExecution,
    AppCreation,
}

impl WorkMode {
    pub const ALL: [WorkMode; 4] = [
        WorkMode::Chat,
        WorkMode::CodeGeneration,
        WorkMode::CodeExecution,
        WorkMode::AppCreation,
    ];

    /// Modes whose replies may carry a project manifest.
    pub fn creates_projects(self) -> bool {
        matches!(self, WorkMode::CodeGeneration | WorkMode::AppCreation)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            WorkMode::Chat => "chat",
            WorkMode::CodeGeneration => "code-generation",
            WorkMode::CodeExecution => "code-execution",
            WorkMode::AppCreation => "app-creation",
        }
    }
}

impl fmt::Display for WorkMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for WorkMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().replace('_', "-").as_str() {
            "chat" => Ok(WorkMode::Chat),
            "code-generation" | "codegen" | "code" => Ok(WorkMode::CodeGeneration),
            "code-execution" | "exec" | "python" => Ok(WorkMode::CodeExecution),
            "app-creation" | "app" => Ok(WorkMode::AppCreation),
            other => Err(format!(
                "Unknown mode '{}'. Valid modes: chat, code-generation, code-execution, app-creation",
                other
            )),
        }
    }
}
