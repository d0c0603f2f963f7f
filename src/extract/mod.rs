//! Extraction of structured payloads from model replies.
//!
//! A reply is untrusted free text. Two payloads are recognized:
//!
//! - fenced code blocks tagged with a language (```` ```python ````)
//! - a single JSON project manifest, fenced as ```` ```json ```` or embedded
//!   as a bare object carrying a `"files"` key
//!
//! Extraction is tolerant: malformed candidates are skipped and absence is
//! reported as an empty result, never as an error.

mod fence;
mod manifest;

pub use fence::{contains_fence, extract_code_blocks};
pub use manifest::{FileEntry, ProjectManifest, extract_project_manifest};
