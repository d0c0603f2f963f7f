//! Configuration view and validation commands: `forgechat config`.

use anyhow::{Context, Result};
use std::path::Path;

use forgechat::config::{CONFIG_DIR, CONFIG_FILE, ChatConfig, ChatToml};

use super::super::ConfigCommands;

pub fn cmd_config(project_dir: &Path, command: Option<ConfigCommands>) -> Result<()> {
    let config_dir = project_dir.join(CONFIG_DIR);
    let config_path = config_dir.join(CONFIG_FILE);

    match command {
        None | Some(ConfigCommands::Show) => {
            println!();
            println!("forgechat Configuration");
            println!("=======================");
            println!();

            if config_path.exists() {
                println!("Config file: {}", config_path.display());
            } else {
                println!("No forgechat.toml found at {}", config_path.display());
                println!("Using default configuration.");
            }
            println!();

            // Effective values include env overrides
            let config = ChatConfig::new(project_dir.to_path_buf())?;
            let toml = &config.toml;

            println!("[model]");
            println!("  name = \"{}\"", toml.model.name);
            println!("  temperature = {}", toml.model.temperature);
            println!("  max_tokens = {}", toml.model.max_tokens);
            println!();

            println!("[features]");
            println!("  auto_execute = {}", toml.features.auto_execute);
            println!("  create_projects = {}", toml.features.create_projects);
            println!();

            println!("[sandbox]");
            println!("  interpreter = \"{}\"", toml.sandbox.interpreter);
            println!("  max_execution_time = {}", toml.sandbox.max_execution_time);
            println!("  max_memory_mb = {}", toml.sandbox.max_memory_mb);
            println!("  max_code_length = {}", toml.sandbox.max_code_length);
            println!("  max_output_bytes = {}", toml.sandbox.max_output_bytes);
            println!("  max_concurrent = {}", toml.sandbox.max_concurrent);
            println!(
                "  allowed_modules = [{}]",
                toml.sandbox.allowed_modules.join(", ")
            );
            println!(
                "  blocked_functions = {} entries, blocked_patterns = {} entries",
                toml.sandbox.blocked_functions.len(),
                toml.sandbox.blocked_patterns.len()
            );
            println!();

            println!("[projects]");
            println!("  root = \"{}\"", config.projects_root().display());
            println!("  max_files = {}", toml.projects.max_files);
            println!("  max_file_size = {}", toml.projects.max_file_size);
            println!();

            if !config_path.exists() {
                println!("Run 'forgechat config init' to create a forgechat.toml file.");
                println!();
            }
        }
        Some(ConfigCommands::Validate) => {
            println!();
            println!("Validating configuration...");
            println!();

            if !config_path.exists() {
                println!("No forgechat.toml found. Using defaults (valid).");
                return Ok(());
            }

            let toml = ChatToml::load(&config_path)?;
            let warnings = toml.validate();

            if warnings.is_empty() {
                println!("Configuration is valid.");
            } else {
                println!("Configuration warnings:");
                for warning in warnings {
                    println!("  - {}", warning);
                }
            }
            println!();
        }
        Some(ConfigCommands::Init) => {
            if config_path.exists() {
                println!("forgechat.toml already exists at {}", config_path.display());
                println!("Delete it first if you want to recreate it.");
                return Ok(());
            }

            std::fs::create_dir_all(&config_dir)
                .with_context(|| format!("Failed to create {}", config_dir.display()))?;

            ChatToml::default().save(&config_path)?;

            println!("Created forgechat.toml at {}", config_path.display());
            println!();
            println!("You can now customize:");
            println!("  - [model] name, temperature, max_tokens");
            println!("  - [sandbox] limits, allowed modules and the deny-list");
            println!("  - [projects] root and size limits");
            println!();
        }
    }

    Ok(())
}
