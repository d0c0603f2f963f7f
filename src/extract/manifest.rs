//! Project manifest extraction.
//!
//! A manifest is the JSON object a model emits to describe a multi-file
//! project:
//!
//! ```json
//! {
//!   "name": "todo_app",
//!   "description": "A small todo list",
//!   "type": "web",
//!   "files": [
//!     {"name": "index.html", "content": "<h1>Todo</h1>", "description": "Entry page"}
//!   ],
//!   "installation": "Open index.html",
//!   "usage": "Add items"
//! }
//! ```

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use tracing::debug;

use super::fence::extract_code_blocks;
use crate::util::object_regions;

/// A single file declared by a manifest.
///
/// `name` and `content` are optional at parse time; entries missing either
/// are skipped when the project is written.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileEntry {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    #[serde(
        default,
        deserialize_with = "lenient_note",
        skip_serializing_if = "Option::is_none"
    )]
    pub description: Option<String>,
}

impl FileEntry {
    pub fn new(name: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
            content: Some(content.into()),
            description: None,
        }
    }

    /// Both `name` and `content`, when the entry is writable.
    pub fn writable(&self) -> Option<(&str, &str)> {
        match (&self.name, &self.content) {
            (Some(name), Some(content)) => Some((name.as_str(), content.as_str())),
            _ => None,
        }
    }
}

/// Structured description of a multi-file project.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectManifest {
    #[serde(default, deserialize_with = "lenient_text")]
    pub name: String,
    #[serde(default, deserialize_with = "lenient_text")]
    pub description: String,
    #[serde(default, rename = "type", deserialize_with = "lenient_text")]
    pub project_type: String,
    #[serde(default, deserialize_with = "lenient_files")]
    pub files: Vec<FileEntry>,
    #[serde(default, deserialize_with = "lenient_text")]
    pub installation: String,
    #[serde(default, deserialize_with = "lenient_text")]
    pub usage: String,
}

impl ProjectManifest {
    /// Parse a JSON object into a manifest.
    ///
    /// The object must carry a `files` key; anything else is not a manifest.
    pub fn from_json(json: &str) -> Option<Self> {
        let value: Value = match serde_json::from_str(json) {
            Ok(value) => value,
            Err(e) => {
                debug!(error = %e, "skipping malformed manifest candidate");
                return None;
            }
        };

        let object = value.as_object()?;
        if !object.contains_key("files") {
            return None;
        }

        match serde_json::from_value(value) {
            Ok(manifest) => Some(manifest),
            Err(e) => {
                debug!(error = %e, "manifest candidate has unexpected field types");
                None
            }
        }
    }

    /// Name to show to users, falling back to `project` when unset.
    pub fn display_name(&self) -> &str {
        if self.name.trim().is_empty() {
            "project"
        } else {
            &self.name
        }
    }
}

/// Read a descriptive field whatever JSON type the model chose.
///
/// `null` becomes empty, arrays become one line per item and any other
/// non-string value keeps its JSON text.
fn lenient_text<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(text_of(Value::deserialize(deserializer)?))
}

fn lenient_note<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let text = text_of(Value::deserialize(deserializer)?);
    Ok((!text.is_empty()).then_some(text))
}

fn text_of(value: Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(text) => text,
        Value::Array(items) => items
            .into_iter()
            .map(text_of)
            .filter(|line| !line.is_empty())
            .collect::<Vec<_>>()
            .join("\n"),
        other => other.to_string(),
    }
}

/// Keep only the `files` entries that are objects with correctly typed fields.
fn lenient_files<'de, D>(deserializer: D) -> Result<Vec<FileEntry>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<Vec<Value>>::deserialize(deserializer)?.unwrap_or_default();
    Ok(raw
        .into_iter()
        .filter(Value::is_object)
        .filter_map(|v| serde_json::from_value(v).ok())
        .collect())
}

const FILES_KEY: &str = "\"files\"";

/// Find the project manifest in a model reply.
///
/// Fenced `json` blocks are tried first, in order. If none parses, every
/// balanced brace region containing `"files"` is tried, outermost first.
/// Returns the first candidate that parses, or `None`.
pub fn extract_project_manifest(text: &str) -> Option<ProjectManifest> {
    for block in extract_code_blocks(text, "json") {
        if let Some(manifest) = ProjectManifest::from_json(block.trim()) {
            return Some(manifest);
        }
    }

    // Offsets of every `"files"` key, so nested regions are not rescanned.
    let markers: Vec<usize> = text.match_indices(FILES_KEY).map(|(at, _)| at).collect();
    let mentions_files = |start: usize, end: usize| {
        let next = markers.partition_point(|&at| at < start);
        markers
            .get(next)
            .is_some_and(|&at| at + FILES_KEY.len() <= end)
    };

    object_regions(text)
        .into_iter()
        .filter(|region| mentions_files(region.start, region.end))
        .find_map(|region| ProjectManifest::from_json(&text[region]))
}
