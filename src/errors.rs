//! Typed error hierarchy for forgechat.
//!
//! Two top-level enums cover the two subsystems that can fail:
//! - `SandboxError` — policy compilation and interpreter process failures
//! - `ProjectError` — project directory, file and archive failures
//!
//! Extraction never fails: a reply without a usable block is simply "nothing found".

use std::path::PathBuf;

use thiserror::Error;

/// Errors from the sandbox subsystem (policy setup and interpreter runs).
#[derive(Debug, Error)]
pub enum SandboxError {
    #[error("Invalid deny-list pattern '{pattern}': {source}")]
    InvalidPattern {
        pattern: String,
        #[source]
        source: regex::Error,
    },

    #[error("Failed to start interpreter '{interpreter}': {source}")]
    SpawnFailed {
        interpreter: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Sandbox I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Execution timed out after {secs} seconds")]
    Timeout { secs: u64 },

    #[error("Sandbox is shutting down")]
    Closed,
}

/// Errors from project materialization and archiving.
#[derive(Debug, Error)]
pub enum ProjectError {
    #[error("Failed to create directory {path}: {source}")]
    CreateDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to write file {path}: {source}")]
    WriteFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to read directory {path}: {source}")]
    ReadDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("File entry '{name}' escapes the project directory")]
    PathEscape { name: String },

    #[error("Failed to walk project directory: {0}")]
    Walk(#[from] walkdir::Error),

    #[error("Failed to write archive {path}: {source}")]
    Archive {
        path: PathBuf,
        #[source]
        source: zip::result::ZipError,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sandbox_error_timeout_carries_seconds() {
        let err = SandboxError::Timeout { secs: 15 };
        match &err {
            SandboxError::Timeout { secs } => assert_eq!(*secs, 15),
            _ => panic!("Expected Timeout"),
        }
        assert!(err.to_string().contains("15"));
    }

    #[test]
    fn sandbox_error_spawn_failed_carries_interpreter() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "no such file");
        let err = SandboxError::SpawnFailed {
            interpreter: "python3".to_string(),
            source: io_err,
        };
        match &err {
            SandboxError::SpawnFailed {
                interpreter,
                source,
            } => {
                assert_eq!(interpreter, "python3");
                assert_eq!(source.kind(), std::io::ErrorKind::NotFound);
            }
            _ => panic!("Expected SpawnFailed"),
        }
    }

    #[test]
    fn sandbox_error_converts_from_io_error() {
        let io_err = std::io::Error::new(std::io::ErrorKind::BrokenPipe, "pipe closed");
        let err: SandboxError = io_err.into();
        assert!(matches!(err, SandboxError::Io(_)));
    }

    #[test]
    fn project_error_path_escape_names_entry() {
        let err = ProjectError::PathEscape {
            name: "../evil.txt".to_string(),
        };
        assert!(err.to_string().contains("../evil.txt"));
    }

    #[test]
    fn project_error_write_file_carries_path() {
        let path = PathBuf::from("/projects/demo/index.html");
        let err = ProjectError::WriteFile {
            path: path.clone(),
            source: std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied"),
        };
        match &err {
            ProjectError::WriteFile { path: p, source } => {
                assert_eq!(p, &path);
                assert_eq!(source.kind(), std::io::ErrorKind::PermissionDenied);
            }
            _ => panic!("Expected WriteFile"),
        }
    }

    #[test]
    fn all_error_types_implement_std_error_trait() {
        fn assert_std_error<E: std::error::Error>(_: &E) {}
        assert_std_error(&SandboxError::Closed);
        assert_std_error(&ProjectError::PathEscape {
            name: "x".to_string(),
        });
    }
}
