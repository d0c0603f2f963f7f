//! Unified configuration for forgechat.
//!
//! Settings are read from `.forgechat/forgechat.toml` and layered:
//! file → environment (`.env` is honored) → CLI.
//!
//! # Configuration File Format
//!
//! ```toml
//! [model]
//! name = "openai/gpt-oss-120b:together"
//! temperature = 0.8
//! max_tokens = 2500
//!
//! [features]
//! auto_execute = false
//! create_projects = true
//!
//! [sandbox]
//! interpreter = "python3"
//! max_execution_time = 15
//! max_memory_mb = 150
//! max_code_length = 10000
//! blocked_functions = ["exec", "eval", "open"]
//! blocked_patterns = ['\bos\.', '__.*__', '\._\w']
//!
//! [projects]
//! root = "generated_projects"
//! max_files = 20
//! ```

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// The name of the forgechat configuration directory.
pub const CONFIG_DIR: &str = ".forgechat";

/// The configuration file name inside [`CONFIG_DIR`].
pub const CONFIG_FILE: &str = "forgechat.toml";

/// Model request settings used when building chat requests.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelSection {
    /// Model identifier sent in the request body
    #[serde(default = "default_model_name")]
    pub name: String,
    /// Sampling temperature (0.0 - 2.0)
    #[serde(default = "default_temperature")]
    pub temperature: f64,
    /// Maximum tokens per reply
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
}

fn default_model_name() -> String {
    "openai/gpt-oss-120b:together".to_string()
}

fn default_temperature() -> f64 {
    0.8
}

fn default_max_tokens() -> u32 {
    2500
}

impl Default for ModelSection {
    fn default() -> Self {
        Self {
            name: default_model_name(),
            temperature: default_temperature(),
            max_tokens: default_max_tokens(),
        }
    }
}

/// Post-processing switches for model replies.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeaturesSection {
    /// Run python blocks in every mode, not just code execution mode
    #[serde(default)]
    pub auto_execute: bool,
    /// Materialize project manifests in generation modes
    #[serde(default = "default_create_projects")]
    pub create_projects: bool,
}

fn default_create_projects() -> bool {
    true
}

impl Default for FeaturesSection {
    fn default() -> Self {
        Self {
            auto_execute: false,
            create_projects: default_create_projects(),
        }
    }
}

/// Code execution policy and limits.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SandboxSection {
    /// Interpreter binary used to run code
    #[serde(default = "default_interpreter")]
    pub interpreter: String,
    /// Wall-clock and CPU ceiling in seconds
    #[serde(default = "default_max_execution_time")]
    pub max_execution_time: u64,
    /// Address space ceiling in MiB (0 disables the limit)
    #[serde(default = "default_max_memory_mb")]
    pub max_memory_mb: u64,
    /// Maximum code length in characters
    #[serde(default = "default_max_code_length")]
    pub max_code_length: usize,
    /// Captured stdout/stderr ceiling in bytes, per stream
    #[serde(default = "default_max_output_bytes")]
    pub max_output_bytes: usize,
    /// Executions allowed to run at the same time
    #[serde(default = "default_max_concurrent")]
    pub max_concurrent: usize,
    /// Modules the code may use
    #[serde(default = "default_allowed_modules")]
    pub allowed_modules: Vec<String>,
    /// Builtins exposed to the code
    #[serde(default = "default_allowed_builtins")]
    pub allowed_builtins: Vec<String>,
    /// Names rejected when they appear anywhere in the code
    #[serde(default = "default_blocked_functions")]
    pub blocked_functions: Vec<String>,
    /// Case-insensitive regexes rejected when they match the code
    #[serde(default = "default_blocked_patterns")]
    pub blocked_patterns: Vec<String>,
}

fn default_interpreter() -> String {
    "python3".to_string()
}

fn default_max_execution_time() -> u64 {
    15
}

fn default_max_memory_mb() -> u64 {
    150
}

fn default_max_code_length() -> usize {
    10_000
}

fn default_max_output_bytes() -> usize {
    1_000_000
}

fn default_max_concurrent() -> usize {
    1
}

fn strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

fn default_allowed_modules() -> Vec<String> {
    strings(&[
        "math",
        "datetime",
        "json",
        "random",
        "time",
        "re",
        "statistics",
        "numpy",
        "pandas",
        "matplotlib",
    ])
}

fn default_allowed_builtins() -> Vec<String> {
    strings(&[
        "print",
        "len",
        "range",
        "list",
        "dict",
        "str",
        "int",
        "float",
        "bool",
        "tuple",
        "set",
        "sum",
        "max",
        "min",
        "sorted",
        "reversed",
        "enumerate",
        "zip",
        "map",
        "filter",
        "any",
        "all",
        "abs",
        "round",
        "type",
        "isinstance",
        "Exception",
        "ValueError",
        "TypeError",
        "KeyError",
        "IndexError",
        "ZeroDivisionError",
    ])
}

fn default_blocked_functions() -> Vec<String> {
    strings(&[
        "exec",
        "eval",
        "compile",
        "__import__",
        "open",
        "file",
        "input",
        "raw_input",
        "reload",
        "vars",
        "globals",
        "locals",
        "setattr",
        "getattr",
        "hasattr",
        "delattr",
    ])
}

fn default_blocked_patterns() -> Vec<String> {
    strings(&[
        r"\bos\.",
        r"\bsys\.",
        r"\bsubprocess\.",
        r"__.*__",
        // Private attributes (`random._os`) and frame objects reach
        // modules outside the allow-list.
        r"\._\w",
        r"\b(gi|cr|ag|tb)_frame\b",
        r"\bf_(back|globals|builtins|locals)\b",
        r"import\s+os",
        r"from\s+os",
        r"import\s+sys",
        r"from\s+sys",
    ])
}

impl Default for SandboxSection {
    fn default() -> Self {
        Self {
            interpreter: default_interpreter(),
            max_execution_time: default_max_execution_time(),
            max_memory_mb: default_max_memory_mb(),
            max_code_length: default_max_code_length(),
            max_output_bytes: default_max_output_bytes(),
            max_concurrent: default_max_concurrent(),
            allowed_modules: default_allowed_modules(),
            allowed_builtins: default_allowed_builtins(),
            blocked_functions: default_blocked_functions(),
            blocked_patterns: default_blocked_patterns(),
        }
    }
}

/// Where and how projects are written.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProjectsSection {
    /// Projects root, relative to the working directory unless absolute
    #[serde(default = "default_projects_root")]
    pub root: PathBuf,
    /// Maximum number of files in one manifest
    #[serde(default = "default_max_files")]
    pub max_files: usize,
    /// File size (in characters) above which a warning is reported
    #[serde(default = "default_max_file_size")]
    pub max_file_size: usize,
}

fn default_projects_root() -> PathBuf {
    PathBuf::from("generated_projects")
}

fn default_max_files() -> usize {
    20
}

fn default_max_file_size() -> usize {
    100_000
}

impl Default for ProjectsSection {
    fn default() -> Self {
        Self {
            root: default_projects_root(),
            max_files: default_max_files(),
            max_file_size: default_max_file_size(),
        }
    }
}

/// The complete forgechat.toml configuration structure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ChatToml {
    #[serde(default)]
    pub model: ModelSection,
    #[serde(default)]
    pub features: FeaturesSection,
    #[serde(default)]
    pub sandbox: SandboxSection,
    #[serde(default)]
    pub projects: ProjectsSection,
}

impl ChatToml {
    /// Load configuration from a TOML file.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        Self::parse(&content)
    }

    /// Parse configuration from a TOML string.
    pub fn parse(content: &str) -> Result<Self> {
        toml::from_str(content).context("Failed to parse forgechat.toml")
    }

    /// Load `forgechat.toml` from `config_dir`, or defaults if it doesn't exist.
    pub fn load_or_default(config_dir: &Path) -> Result<Self> {
        let config_path = config_dir.join(CONFIG_FILE);
        if config_path.exists() {
            Self::load(&config_path)
        } else {
            Ok(Self::default())
        }
    }

    /// Save configuration to a TOML file.
    pub fn save(&self, path: &Path) -> Result<()> {
        let content =
            toml::to_string_pretty(self).context("Failed to serialize forgechat.toml")?;
        std::fs::write(path, content)
            .with_context(|| format!("Failed to write config file: {}", path.display()))?;
        Ok(())
    }

    /// Apply environment overrides through `lookup`.
    ///
    /// Recognized: `FORGECHAT_PYTHON`, `FORGECHAT_PROJECTS_DIR`, `FORGECHAT_MODEL`.
    pub fn apply_env<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(interpreter) = lookup("FORGECHAT_PYTHON").filter(|v| !v.is_empty()) {
            self.sandbox.interpreter = interpreter;
        }
        if let Some(root) = lookup("FORGECHAT_PROJECTS_DIR").filter(|v| !v.is_empty()) {
            self.projects.root = PathBuf::from(root);
        }
        if let Some(model) = lookup("FORGECHAT_MODEL").filter(|v| !v.is_empty()) {
            self.model.name = model;
        }
    }

    /// Validate the configuration and return any warnings.
    pub fn validate(&self) -> Vec<String> {
        let mut warnings = Vec::new();

        if !(0.0..=2.0).contains(&self.model.temperature) {
            warnings.push(format!(
                "Invalid temperature {}: should be between 0.0 and 2.0",
                self.model.temperature
            ));
        }
        if !(100..=8000).contains(&self.model.max_tokens) {
            warnings.push(format!(
                "Invalid max_tokens {}: should be between 100 and 8000",
                self.model.max_tokens
            ));
        }

        if self.sandbox.interpreter.trim().is_empty() {
            warnings.push("sandbox.interpreter is empty".to_string());
        }
        if self.sandbox.max_execution_time == 0 {
            warnings.push("sandbox.max_execution_time must be greater than 0".to_string());
        }
        if self.sandbox.max_code_length == 0 {
            warnings.push("sandbox.max_code_length must be greater than 0".to_string());
        }
        if self.sandbox.max_concurrent == 0 {
            warnings.push("sandbox.max_concurrent must be greater than 0".to_string());
        }
        if !self.sandbox.allowed_builtins.iter().any(|b| b == "print") {
            warnings.push("sandbox.allowed_builtins has no 'print'; output cannot be captured".to_string());
        }
        for pattern in &self.sandbox.blocked_patterns {
            if let Err(e) = regex::Regex::new(pattern) {
                warnings.push(format!("Invalid blocked pattern '{}': {}", pattern, e));
            }
        }

        if self.projects.max_files == 0 {
            warnings.push("projects.max_files must be greater than 0".to_string());
        }

        warnings
    }
}

/// Unified configuration that combines [`ChatToml`] with runtime settings.
///
/// Merges settings from:
/// 1. forgechat.toml
/// 2. Environment variables
/// 3. CLI arguments
#[derive(Debug, Clone)]
pub struct ChatConfig {
    /// Working directory all relative paths resolve against
    pub project_dir: PathBuf,
    /// Parsed and env-adjusted configuration
    pub toml: ChatToml,
}

impl ChatConfig {
    /// Create a ChatConfig for `project_dir`, reading the process environment.
    pub fn new(project_dir: PathBuf) -> Result<Self> {
        Self::with_env(project_dir, |key| std::env::var(key).ok())
    }

    /// Create a ChatConfig with an explicit environment lookup.
    pub fn with_env<F>(project_dir: PathBuf, lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let project_dir = project_dir
            .canonicalize()
            .context("Failed to resolve project directory")?;
        let mut toml = ChatToml::load_or_default(&project_dir.join(CONFIG_DIR))?;
        toml.apply_env(lookup);

        Ok(Self { project_dir, toml })
    }

    /// Absolute projects root.
    pub fn projects_root(&self) -> PathBuf {
        if self.toml.projects.root.is_absolute() {
            self.toml.projects.root.clone()
        } else {
            self.project_dir.join(&self.toml.projects.root)
        }
    }
}
