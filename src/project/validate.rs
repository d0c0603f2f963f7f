//! Manifest sanity checks and download-name cleanup.

use std::sync::LazyLock;

use regex::Regex;
use serde::Serialize;

use crate::config::ProjectsSection;
use crate::extract::ProjectManifest;

static SAFE_FILE_NAME: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z0-9._/-]+$").expect("valid regex"));

static UNSAFE_CHARS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"[<>:"/\\|?*]"#).expect("valid regex"));

/// Longest download name [`sanitize_filename`] keeps untouched.
const MAX_FILENAME_CHARS: usize = 100;

/// Outcome of [`validate_manifest`].
///
/// Errors block materialization; warnings are informational.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ManifestReport {
    pub is_valid: bool,
    pub errors: Vec<String>,
    pub warnings: Vec<String>,
}

impl ManifestReport {
    fn error(&mut self, message: String) {
        self.is_valid = false;
        self.errors.push(message);
    }
}

/// Check a manifest against the `[projects]` limits.
pub fn validate_manifest(manifest: &ProjectManifest, limits: &ProjectsSection) -> ManifestReport {
    let mut report = ManifestReport {
        is_valid: true,
        ..Default::default()
    };

    if manifest.name.trim().is_empty() {
        report.error("Missing required field: name".to_string());
    }
    if manifest.files.is_empty() {
        report.error("Missing required field: files".to_string());
    }
    if manifest.files.len() > limits.max_files {
        report.error(format!("Too many files (max {})", limits.max_files));
    }

    for entry in &manifest.files {
        let Some((name, content)) = entry.writable() else {
            report
                .warnings
                .push("File entry without name or content".to_string());
            continue;
        };

        if !SAFE_FILE_NAME.is_match(name) {
            report.warnings.push(format!("Suspicious file name: {}", name));
        }
        if content.len() > limits.max_file_size {
            report.warnings.push(format!("Large file: {}", name));
        }
    }

    report
}

/// Make `filename` safe to offer as a download name.
///
/// Replaces `<>:"/\|?*` with `_`. Names longer than 100 characters are cut
/// to 95 characters of stem plus the original extension.
pub fn sanitize_filename(filename: &str) -> String {
    let sanitized = UNSAFE_CHARS.replace_all(filename, "_").into_owned();
    if sanitized.chars().count() <= MAX_FILENAME_CHARS {
        return sanitized;
    }

    let (stem, ext) = match sanitized.rfind('.') {
        Some(dot) if dot > 0 => sanitized.split_at(dot),
        _ => (sanitized.as_str(), ""),
    };
    let stem: String = stem.chars().take(MAX_FILENAME_CHARS - 5).collect();
    format!("{}{}", stem, ext)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extract::FileEntry;

    fn manifest(name: &str, files: Vec<FileEntry>) -> ProjectManifest {
        ProjectManifest {
            name: name.to_string(),
            files,
            ..Default::default()
        }
    }

    #[test]
    fn test_valid_manifest() {
        let report = validate_manifest(
            &manifest("app", vec![FileEntry::new("src/main.py", "print(1)")]),
            &ProjectsSection::default(),
        );
        assert!(report.is_valid);
        assert!(report.errors.is_empty());
        assert!(report.warnings.is_empty());
    }

    #[test]
    fn test_missing_name_and_files() {
        let report = validate_manifest(&manifest("  ", vec![]), &ProjectsSection::default());
        assert!(!report.is_valid);
        assert_eq!(report.errors.len(), 2);
    }

    #[test]
    fn test_too_many_files() {
        let files = (0..21)
            .map(|i| FileEntry::new(format!("f{}.txt", i), "x"))
            .collect();
        let report = validate_manifest(&manifest("big", files), &ProjectsSection::default());
        assert!(!report.is_valid);
        assert!(report.errors[0].contains("max 20"));
    }

    #[test]
    fn test_warnings_do_not_invalidate() {
        let limits = ProjectsSection {
            max_file_size: 4,
            ..Default::default()
        };
        let files = vec![
            FileEntry::new("my file.txt", "x"),
            FileEntry::new("big.txt", "12345"),
            FileEntry {
                name: Some("orphan.txt".to_string()),
                ..Default::default()
            },
        ];
        let report = validate_manifest(&manifest("warn", files), &limits);
        assert!(report.is_valid);
        assert_eq!(
            report.warnings,
            vec![
                "Suspicious file name: my file.txt".to_string(),
                "Large file: big.txt".to_string(),
                "File entry without name or content".to_string(),
            ]
        );
    }

    #[test]
    fn test_sanitize_replaces_unsafe_chars() {
        assert_eq!(sanitize_filename(r#"a<b>c:d"e/f\g|h?i*j.zip"#), "a_b_c_d_e_f_g_h_i_j.zip");
        assert_eq!(sanitize_filename("plain_name.zip"), "plain_name.zip");
    }

    #[test]
    fn test_sanitize_caps_length_keeping_extension() {
        let long = format!("{}.zip", "a".repeat(120));
        let sanitized = sanitize_filename(&long);
        assert_eq!(sanitized, format!("{}.zip", "a".repeat(95)));
    }

    #[test]
    fn test_sanitize_without_extension() {
        let sanitized = sanitize_filename(&"b".repeat(150));
        assert_eq!(sanitized, "b".repeat(95));
    }
}
