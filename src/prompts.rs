//! Prompt construction for the chat model.
//!
//! Builds the system prompt for each [`WorkMode`], assembles the message list
//! with a bounded slice of history, and shapes the request body. Sending the
//! request is left to the caller.

use serde::{Deserialize, Serialize};

use crate::config::{ModelSection, SandboxSection};
use crate::pipeline::WorkMode;

/// History messages carried into a request.
pub const HISTORY_WINDOW: usize = 3;
/// History messages this long or longer are left out entirely.
pub const HISTORY_SKIP_CHARS: usize = 2000;
/// Longer history messages are cut to this many characters plus `...`.
pub const HISTORY_TRUNCATE_CHARS: usize = 1500;

const PROJECT_FORMAT: &str = r#"```json
{
  "name": "project_name",
  "description": "Full description of the project",
  "type": "web|desktop|mobile|api|tool",
  "files": [
    {
      "name": "index.html",
      "content": "<!DOCTYPE html>\n<html>...</html>",
      "description": "Main page"
    },
    {
      "name": "style.css",
      "content": "body { margin: 0; }",
      "description": "Styles"
    }
  ],
  "installation": "Installation steps",
  "usage": "How to use the application"
}
```"#;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
}

impl ChatMessage {
    pub fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
        }
    }
}

/// Request body for an OpenAI-compatible chat completions endpoint.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChatRequest {
    pub model: String,
    pub messages: Vec<ChatMessage>,
    pub temperature: f64,
    pub max_tokens: u32,
}

impl ChatRequest {
    pub fn new(model: &ModelSection, messages: Vec<ChatMessage>) -> Self {
        Self {
            model: model.name.clone(),
            messages,
            temperature: model.temperature,
            max_tokens: model.max_tokens,
        }
    }
}

/// System prompt for `mode`.
///
/// The execution prompt lists the modules the sandbox actually admits.
pub fn system_prompt(mode: WorkMode, sandbox: &SandboxSection) -> String {
    match mode {
        WorkMode::Chat => "You are a capable assistant with full development skills.\n\n\
             You can help with:\n\
             - Development (web, mobile, desktop, APIs)\n\
             - Writing and running Python code\n\
             - Data analysis and visualization\n\
             - Problem solving and design\n\n\
             Answer clearly and completely, with practical examples where useful."
            .to_string(),

        WorkMode::CodeGeneration | WorkMode::AppCreation => {
            let mut prompt = String::from(
                "You are an expert developer who builds complete, working applications.\n\n\
                 You build:\n\
                 - Web applications (HTML/CSS/JS, React, Vue)\n\
                 - Desktop tools (Electron, Python tkinter)\n\
                 - APIs and backends (Flask, FastAPI, Node.js)\n\
                 - Data tools and browser games\n\n\
                 To deliver a project, reply with a manifest in exactly this format:\n\n",
            );
            prompt.push_str(PROJECT_FORMAT);
            prompt.push_str(
                "\n\nRules:\n\
                 - Every file must be complete and functional\n\
                 - Include every file the project needs\n\
                 - Use relative file names without `..`\n\
                 - Comment the code and keep the design responsive",
            );
            prompt
        }

        WorkMode::CodeExecution => format!(
            "You are a Python expert who solves problems by writing and running code.\n\n\
             Your code runs in a sandbox:\n\
             - Available modules: {}\n\
             - No file, network, process or system access\n\
             - Execution is limited to {} seconds\n\n\
             Rules:\n\
             - Put the program in a single ```python block\n\
             - Use print() for every result you want to show\n\
             - Handle errors and comment the code",
            sandbox.allowed_modules.join(", "),
            sandbox.max_execution_time
        ),
    }
}

/// Assemble the messages for one request.
///
/// Order: system prompt, recent history, then the user message. Only the
/// last [`HISTORY_WINDOW`] history messages are considered; any of
/// [`HISTORY_SKIP_CHARS`] or more characters is dropped, and any longer than
/// [`HISTORY_TRUNCATE_CHARS`] is cut and suffixed with `...`.
pub fn build_messages(
    user: &str,
    mode: WorkMode,
    history: &[ChatMessage],
    sandbox: &SandboxSection,
) -> Vec<ChatMessage> {
    let mut messages = vec![ChatMessage::new(Role::System, system_prompt(mode, sandbox))];

    let start = history.len().saturating_sub(HISTORY_WINDOW);
    for msg in &history[start..] {
        let chars = msg.content.chars().count();
        if chars >= HISTORY_SKIP_CHARS {
            continue;
        }
        let content = if chars > HISTORY_TRUNCATE_CHARS {
            let head: String = msg.content.chars().take(HISTORY_TRUNCATE_CHARS).collect();
            format!("{}...", head)
        } else {
            msg.content.clone()
        };
        messages.push(ChatMessage::new(msg.role, content));
    }

    messages.push(ChatMessage::new(Role::User, user));
    messages
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sandbox() -> SandboxSection {
        SandboxSection::default()
    }

    #[test]
    fn test_generation_prompts_describe_manifest() {
        for mode in [WorkMode::CodeGeneration, WorkMode::AppCreation] {
            let prompt = system_prompt(mode, &sandbox());
            assert!(prompt.contains("```json"));
            assert!(prompt.contains("\"files\""));
        }
    }

    #[test]
    fn test_execution_prompt_lists_modules() {
        let section = SandboxSection {
            allowed_modules: vec!["math".to_string(), "json".to_string()],
            max_execution_time: 7,
            ..Default::default()
        };
        let prompt = system_prompt(WorkMode::CodeExecution, &section);
        assert!(prompt.contains("Available modules: math, json"));
        assert!(prompt.contains("7 seconds"));
    }

    #[test]
    fn test_build_messages_without_history() {
        let messages = build_messages("hello", WorkMode::Chat, &[], &sandbox());
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[0].role, Role::System);
        assert_eq!(messages[1], ChatMessage::new(Role::User, "hello"));
    }

    #[test]
    fn test_build_messages_keeps_last_three() {
        let history: Vec<_> = (0..5)
            .map(|i| ChatMessage::new(Role::User, format!("m{}", i)))
            .collect();
        let messages = build_messages("now", WorkMode::Chat, &history, &sandbox());
        let contents: Vec<_> = messages.iter().map(|m| m.content.as_str()).collect();
        assert_eq!(&contents[1..], ["m2", "m3", "m4", "now"]);
    }

    #[test]
    fn test_build_messages_skips_and_truncates() {
        let history = vec![
            ChatMessage::new(Role::User, "x".repeat(2000)),
            ChatMessage::new(Role::Assistant, "y".repeat(1600)),
            ChatMessage::new(Role::User, "z".repeat(1500)),
        ];
        let messages = build_messages("q", WorkMode::Chat, &history, &sandbox());

        assert_eq!(messages.len(), 4);
        assert_eq!(messages[1].role, Role::Assistant);
        assert_eq!(messages[1].content, format!("{}...", "y".repeat(1500)));
        assert_eq!(messages[2].content, "z".repeat(1500));
    }

    #[test]
    fn test_chat_request_body() {
        let model = ModelSection::default();
        let request = ChatRequest::new(&model, build_messages("hi", WorkMode::Chat, &[], &sandbox()));
        let json = serde_json::to_value(&request).unwrap();

        assert_eq!(json["model"], "openai/gpt-oss-120b:together");
        assert_eq!(json["max_tokens"], 2500);
        assert_eq!(json["messages"][0]["role"], "system");
        assert_eq!(json["messages"][1]["role"], "user");
    }
}
