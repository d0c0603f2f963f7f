//! Code validation and execution commands: `forgechat check`, `forgechat exec`.

use anyhow::{Context, Result, bail};
use console::style;
use std::path::Path;

use forgechat::config::ChatConfig;
use forgechat::sandbox::{SandboxExecutor, SecurityPolicy};

use super::{print_json, read_input};

pub fn cmd_check(config: &ChatConfig, file: Option<&Path>, json: bool) -> Result<()> {
    let code = read_input(file)?;
    let policy = SecurityPolicy::from_config(&config.toml.sandbox)
        .context("Failed to compile sandbox policy")?;
    let outcome = policy.validate(&code);

    if json {
        print_json(&outcome)?;
    } else if outcome.is_safe {
        println!("{} code passed validation", style("✓").green());
    } else {
        println!(
            "{} code rejected (risk: {})",
            style("✗").red(),
            style(outcome.risk_level).red().bold()
        );
        for error in &outcome.errors {
            println!("  - {}", error);
        }
    }

    if !outcome.is_safe {
        bail!("Code failed validation");
    }
    Ok(())
}

pub async fn cmd_exec(config: &ChatConfig, file: Option<&Path>, json: bool) -> Result<()> {
    let code = read_input(file)?;
    let executor = SandboxExecutor::from_config(&config.toml.sandbox)
        .context("Failed to set up sandbox")?;
    let result = executor.execute(&code).await;

    if json {
        print_json(&result)?;
    } else if result.success {
        print!("{}", result.output);
        if let Some(warnings) = &result.error {
            eprintln!("{} {}", style("warnings:").yellow(), warnings.trim_end());
        }
    } else {
        eprintln!(
            "{} {}",
            style("Execution failed:").red().bold(),
            result.error.as_deref().unwrap_or("unknown error").trim_end()
        );
    }

    if !result.success {
        bail!("Execution failed");
    }
    Ok(())
}
