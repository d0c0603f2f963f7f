//! Shared utility functions for the forgechat crate.

use std::ops::Range;

/// Byte ranges of every balanced `{...}` region in `text`, outermost first.
///
/// One pass over the text with a stack of open-brace offsets. Inside a
/// region, braces within string literals (including escaped quotes) are
/// ignored, so `{"a": "}"}` is one region. Quotes outside any region are
/// treated as prose. Braces that never close produce no region.
pub fn object_regions(text: &str) -> Vec<Range<usize>> {
    let mut regions = Vec::new();
    let mut open: Vec<usize> = Vec::new();
    let mut in_string = false;
    let mut escaped = false;

    for (i, ch) in text.char_indices() {
        if in_string {
            match ch {
                _ if escaped => escaped = false,
                '\\' => escaped = true,
                '"' => in_string = false,
                _ => {}
            }
            continue;
        }

        match ch {
            '"' if !open.is_empty() => in_string = true,
            '{' => open.push(i),
            '}' => {
                if let Some(start) = open.pop() {
                    regions.push(start..i + 1);
                }
            }
            _ => {}
        }
    }

    // Regions are recorded as they close, innermost first.
    regions.sort_unstable_by_key(|region| region.start);
    regions
}
