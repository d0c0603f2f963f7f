//! Fenced code block extraction.

use regex::Regex;
use tracing::debug;

/// Build the matcher for blocks tagged with `language`.
///
/// The opening fence may be followed by trailing whitespace before the
/// newline; the body runs lazily up to the first `\n```` that follows.
fn fence_regex(language: &str) -> Option<Regex> {
    let pattern = format!(r"(?s)```{}[ \t\r\f\v]*\n(.*?)\n```", regex::escape(language));
    match Regex::new(&pattern) {
        Ok(re) => Some(re),
        Err(e) => {
            debug!(language, error = %e, "could not build fence pattern");
            None
        }
    }
}

/// Extract the bodies of all code blocks tagged with `language`, in document order.
///
/// Bodies are returned exactly as written between the fence lines.
/// Returns an empty vector when no block matches.
pub fn extract_code_blocks(text: &str, language: &str) -> Vec<String> {
    let Some(re) = fence_regex(language) else {
        return Vec::new();
    };

    re.captures_iter(text)
        .filter_map(|cap| cap.get(1).map(|m| m.as_str().to_string()))
        .collect()
}

/// Cheap check for an opening fence tagged with `language`.
pub fn contains_fence(text: &str, language: &str) -> bool {
    text.contains(&format!("```{}", language))
}
