//! Request body command: `forgechat prompt`.

use anyhow::{Context, Result};
use std::path::Path;

use forgechat::config::ChatConfig;
use forgechat::pipeline::WorkMode;
use forgechat::prompts::{ChatMessage, ChatRequest, build_messages};

use super::print_json;

pub fn cmd_prompt(
    config: &ChatConfig,
    message: &str,
    mode: WorkMode,
    history: Option<&Path>,
) -> Result<()> {
    let history: Vec<ChatMessage> = match history {
        Some(path) => {
            let content = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read history file {}", path.display()))?;
            serde_json::from_str(&content).context("Failed to parse history file")?
        }
        None => Vec::new(),
    };

    let messages = build_messages(message, mode, &history, &config.toml.sandbox);
    print_json(&ChatRequest::new(&config.toml.model, messages))
}
