use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

mod cmd;

use forgechat::config::ChatConfig;
use forgechat::pipeline::WorkMode;

#[derive(Parser)]
#[command(name = "forgechat")]
#[command(
    version,
    about = "Extract code and project manifests from LLM replies, run code in a sandbox, materialize projects"
)]
pub struct Cli {
    /// Log at debug level (RUST_LOG takes precedence)
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Directory holding .forgechat/ and the projects root (defaults to the current directory)
    #[arg(long, global = true)]
    pub project_dir: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Validate Python code against the sandbox policy without running it
    Check {
        /// Code file (reads stdin when omitted or "-")
        file: Option<PathBuf>,
        /// Print the validation outcome as JSON
        #[arg(long)]
        json: bool,
    },
    /// Validate and run Python code in the sandbox
    Exec {
        /// Code file (reads stdin when omitted or "-")
        file: Option<PathBuf>,
        /// Print the execution result as JSON
        #[arg(long)]
        json: bool,
    },
    /// Extract fenced code blocks or a project manifest from a reply
    Extract {
        /// Reply file (reads stdin when omitted or "-")
        file: Option<PathBuf>,
        /// Fence language tag to extract
        #[arg(short, long, default_value = "python")]
        language: String,
        /// Extract the project manifest instead of code blocks
        #[arg(long)]
        manifest: bool,
        /// Print results as JSON
        #[arg(long)]
        json: bool,
    },
    /// Run the full reply pipeline: execute code and/or create the project
    Process {
        /// Reply file (reads stdin when omitted or "-")
        file: Option<PathBuf>,
        /// Work mode the reply was produced in
        #[arg(short, long, default_value = "chat")]
        mode: WorkMode,
        /// Execute python blocks regardless of mode
        #[arg(long)]
        auto_execute: bool,
        /// Do not create projects
        #[arg(long)]
        no_projects: bool,
        /// Print the outcome as JSON
        #[arg(long)]
        json: bool,
    },
    /// Build the chat request body for a user message
    Prompt {
        /// The user message
        message: String,
        /// Work mode selecting the system prompt
        #[arg(short, long, default_value = "chat")]
        mode: WorkMode,
        /// JSON file with prior messages ([{"role": "...", "content": "..."}])
        #[arg(long)]
        history: Option<PathBuf>,
    },
    /// Create, archive or list generated projects
    Project {
        #[command(subcommand)]
        command: ProjectCommands,
    },
    /// View or validate configuration
    Config {
        #[command(subcommand)]
        command: Option<ConfigCommands>,
    },
}

#[derive(Subcommand, Clone)]
pub enum ProjectCommands {
    /// Create a project from a manifest JSON file or a reply containing one
    Create {
        /// Manifest or reply file (reads stdin when omitted or "-")
        file: Option<PathBuf>,
        /// Skip writing the zip archive
        #[arg(long)]
        no_archive: bool,
        /// Create the project even if validation reports errors
        #[arg(long)]
        force: bool,
        /// Print the result as JSON
        #[arg(long)]
        json: bool,
    },
    /// Write the zip archive for an existing project directory
    Archive {
        /// Project directory
        dir: PathBuf,
    },
    /// List the most recently modified projects
    List {
        /// Maximum number of projects to show
        #[arg(short = 'n', long, default_value = "5")]
        limit: usize,
    },
}

#[derive(Subcommand, Clone)]
pub enum ConfigCommands {
    /// Show current configuration
    Show,
    /// Validate configuration and show any warnings
    Validate,
    /// Initialize a default forgechat.toml file
    Init,
}

fn init_tracing(verbose: bool) {
    let default_level = if verbose { "debug" } else { "warn" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    // A missing .env is normal.
    let _ = dotenvy::dotenv();

    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let project_dir = match cli.project_dir.clone() {
        Some(dir) => dir,
        None => std::env::current_dir().context("Failed to get current directory")?,
    };

    if let Commands::Config { command } = &cli.command {
        return cmd::cmd_config(&project_dir, command.clone());
    }

    let mut config = ChatConfig::new(project_dir)?;

    match &cli.command {
        Commands::Check { file, json } => cmd::cmd_check(&config, file.as_deref(), *json)?,
        Commands::Exec { file, json } => cmd::cmd_exec(&config, file.as_deref(), *json).await?,
        Commands::Extract {
            file,
            language,
            manifest,
            json,
        } => cmd::cmd_extract(file.as_deref(), language, *manifest, *json)?,
        Commands::Process {
            file,
            mode,
            auto_execute,
            no_projects,
            json,
        } => {
            if *auto_execute {
                config.toml.features.auto_execute = true;
            }
            if *no_projects {
                config.toml.features.create_projects = false;
            }
            cmd::cmd_process(&config, file.as_deref(), *mode, *json).await?
        }
        Commands::Prompt {
            message,
            mode,
            history,
        } => cmd::cmd_prompt(&config, message, *mode, history.as_deref())?,
        Commands::Project { command } => cmd::cmd_project(&config, command.clone())?,
        Commands::Config { .. } => {}
    }

    Ok(())
}
