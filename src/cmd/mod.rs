//! CLI command implementations.
//!
//! Each submodule owns one or more related `Commands` variants:
//!
//! | Module     | Commands handled   |
//! |------------|--------------------|
//! | `sandbox`  | `Check`, `Exec`    |
//! | `extract`  | `Extract`          |
//! | `process`  | `Process`          |
//! | `prompt`   | `Prompt`           |
//! | `project`  | `Project`          |
//! | `config`   | `Config`           |

pub mod config;
pub mod extract;
pub mod process;
pub mod project;
pub mod prompt;
pub mod sandbox;

pub use config::cmd_config;
pub use extract::cmd_extract;
pub use process::cmd_process;
pub use project::cmd_project;
pub use prompt::cmd_prompt;
pub use sandbox::{cmd_check, cmd_exec};

use anyhow::{Context, Result};
use std::io::Read;
use std::path::Path;

/// Read a whole input: the file at `path`, or stdin when `path` is `None` or `-`.
pub fn read_input(path: Option<&Path>) -> Result<String> {
    match path {
        Some(p) if p != Path::new("-") => std::fs::read_to_string(p)
            .with_context(|| format!("Failed to read {}", p.display())),
        _ => {
            let mut buf = String::new();
            std::io::stdin()
                .read_to_string(&mut buf)
                .context("Failed to read stdin")?;
            Ok(buf)
        }
    }
}

/// Print `value` as pretty JSON on stdout.
pub fn print_json<T: serde::Serialize>(value: &T) -> Result<()> {
    let json = serde_json::to_string_pretty(value).context("Failed to serialize output")?;
    println!("{}", json);
    Ok(())
}
