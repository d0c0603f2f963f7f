//! Writing a manifest to disk as a project directory.

use std::fs;
use std::io::ErrorKind;
use std::path::{Component, Path, PathBuf};
use std::time::SystemTime;

use chrono::{DateTime, Local};
use serde::Serialize;
use tracing::{debug, info};

use crate::errors::ProjectError;
use crate::extract::ProjectManifest;

/// A project directory produced by [`ProjectMaterializer::create_project`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MaterializedProject {
    /// Absolute or projects-root-relative path of the project directory
    pub root: PathBuf,
    /// Final path component of `root`
    pub dir_name: String,
    /// Written files as `/`-separated paths relative to `root`, in manifest order
    pub created_files: Vec<String>,
}

/// A project directory found under the projects root.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProjectSummary {
    pub dir_name: String,
    pub path: PathBuf,
    pub modified: DateTime<Local>,
}

/// Creates project directories under a projects root.
#[derive(Debug, Clone)]
pub struct ProjectMaterializer {
    root: PathBuf,
}

impl ProjectMaterializer {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Write every file of `manifest` into a fresh, timestamped directory.
    ///
    /// All entry names are checked before the directory is created; any
    /// entry that would land outside the project directory fails the whole
    /// call with [`ProjectError::PathEscape`]. Entries missing a name or
    /// content are skipped. Writes are not transactional: a later I/O
    /// failure leaves the files already written in place.
    pub fn create_project(
        &self,
        manifest: &ProjectManifest,
    ) -> Result<MaterializedProject, ProjectError> {
        let files = manifest
            .files
            .iter()
            .filter_map(|entry| entry.writable())
            .map(|(name, content)| relative_path(name).map(|path| (path, content)))
            .collect::<Result<Vec<_>, ProjectError>>()?;

        let base = format!(
            "{}_{}",
            slug(&manifest.name),
            Local::now().format("%Y%m%d_%H%M%S")
        );
        let root = self.create_unique_dir(&base)?;
        let dir_name = root
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or(base);

        let mut created_files = Vec::with_capacity(files.len());
        for (relative, content) in files {
            let target = root.join(&relative);
            if let Some(parent) = target.parent() {
                fs::create_dir_all(parent).map_err(|source| ProjectError::CreateDir {
                    path: parent.to_path_buf(),
                    source,
                })?;
            }
            fs::write(&target, content).map_err(|source| ProjectError::WriteFile {
                path: target.clone(),
                source,
            })?;
            debug!(file = %target.display(), bytes = content.len(), "wrote project file");
            created_files.push(slash_path(&relative));
        }

        info!(
            project = %root.display(),
            files = created_files.len(),
            "project materialized"
        );

        Ok(MaterializedProject {
            root,
            dir_name,
            created_files,
        })
    }

    /// Project directories under the root, most recently modified first.
    ///
    /// A missing root yields an empty list.
    pub fn list_projects(&self, limit: usize) -> Result<Vec<ProjectSummary>, ProjectError> {
        let read_err = |source: std::io::Error| ProjectError::ReadDir {
            path: self.root.clone(),
            source,
        };

        let entries = match fs::read_dir(&self.root) {
            Ok(entries) => entries,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(read_err(e)),
        };

        let mut projects = Vec::new();
        for entry in entries {
            let entry = entry.map_err(read_err)?;
            let metadata = entry.metadata().map_err(read_err)?;
            if !metadata.is_dir() {
                continue;
            }
            let modified = metadata.modified().unwrap_or(SystemTime::UNIX_EPOCH);
            projects.push(ProjectSummary {
                dir_name: entry.file_name().to_string_lossy().into_owned(),
                path: entry.path(),
                modified: DateTime::<Local>::from(modified),
            });
        }

        projects.sort_by(|a, b| {
            b.modified
                .cmp(&a.modified)
                .then_with(|| b.dir_name.cmp(&a.dir_name))
        });
        projects.truncate(limit);
        Ok(projects)
    }

    /// Create `<root>/<base>`, or `<base>_2`, `<base>_3`, ... if taken.
    fn create_unique_dir(&self, base: &str) -> Result<PathBuf, ProjectError> {
        fs::create_dir_all(&self.root).map_err(|source| ProjectError::CreateDir {
            path: self.root.clone(),
            source,
        })?;

        let mut attempt = 1u32;
        loop {
            let name = if attempt == 1 {
                base.to_string()
            } else {
                format!("{}_{}", base, attempt)
            };
            let candidate = self.root.join(&name);
            match fs::create_dir(&candidate) {
                Ok(()) => return Ok(candidate),
                Err(e) if e.kind() == ErrorKind::AlreadyExists => attempt += 1,
                Err(source) => {
                    return Err(ProjectError::CreateDir {
                        path: candidate,
                        source,
                    });
                }
            }
        }
    }
}

/// Directory-safe form of a project name.
///
/// Lower-cased, spaces become `_`, anything outside `[a-z0-9_]` is dropped.
/// Empty results become `project`.
pub fn slug(name: &str) -> String {
    let slug: String = name
        .to_lowercase()
        .replace(' ', "_")
        .chars()
        .filter(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || *c == '_')
        .collect();

    if slug.is_empty() {
        "project".to_string()
    } else {
        slug
    }
}

/// Normalize an entry name to a path that stays inside the project directory.
fn relative_path(name: &str) -> Result<PathBuf, ProjectError> {
    let escape = || ProjectError::PathEscape {
        name: name.to_string(),
    };

    let mut path = PathBuf::new();
    for component in Path::new(name).components() {
        match component {
            Component::Normal(part) => path.push(part),
            Component::CurDir => {}
            Component::ParentDir | Component::RootDir | Component::Prefix(_) => {
                return Err(escape());
            }
        }
    }

    // A name like "." or "" would resolve to the project directory itself.
    if path.as_os_str().is_empty() {
        return Err(escape());
    }
    Ok(path)
}

fn slash_path(path: &Path) -> String {
    path.components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extract::FileEntry;
    use tempfile::TempDir;

    fn manifest(name: &str, files: Vec<FileEntry>) -> ProjectManifest {
        ProjectManifest {
            name: name.to_string(),
            files,
            ..Default::default()
        }
    }

    #[test]
    fn test_slug() {
        assert_eq!(slug("My Cool App!"), "my_cool_app");
        assert_eq!(slug("todo_app"), "todo_app");
        assert_eq!(slug("Ünïcode 2"), "ncode_2");
        assert_eq!(slug("!!!"), "project");
        assert_eq!(slug(""), "project");
    }

    #[test]
    fn test_create_project_writes_files() {
        let dir = TempDir::new().unwrap();
        let materializer = ProjectMaterializer::new(dir.path().join("generated"));
        let project = materializer
            .create_project(&manifest(
                "Todo App",
                vec![
                    FileEntry::new("index.html", "<h1>Todo</h1>"),
                    FileEntry::new("static/app.js", "console.log(1);"),
                ],
            ))
            .unwrap();

        assert!(project.dir_name.starts_with("todo_app_"));
        assert!(project.root.starts_with(dir.path().join("generated")));
        assert_eq!(project.created_files, vec!["index.html", "static/app.js"]);
        assert_eq!(
            fs::read_to_string(project.root.join("index.html")).unwrap(),
            "<h1>Todo</h1>"
        );
        assert_eq!(
            fs::read_to_string(project.root.join("static").join("app.js")).unwrap(),
            "console.log(1);"
        );
    }

    #[test]
    fn test_dir_name_has_timestamp_suffix() {
        let dir = TempDir::new().unwrap();
        let project = ProjectMaterializer::new(dir.path())
            .create_project(&manifest("demo", vec![]))
            .unwrap();
        // demo_YYYYMMDD_HHMMSS
        let stamp = project.dir_name.strip_prefix("demo_").unwrap();
        assert_eq!(stamp.len(), 15);
        assert_eq!(&stamp[8..9], "_");
        assert!(stamp.chars().filter(|c| *c != '_').all(|c| c.is_ascii_digit()));
    }

    #[test]
    fn test_empty_files_creates_empty_dir() {
        let dir = TempDir::new().unwrap();
        let project = ProjectMaterializer::new(dir.path())
            .create_project(&manifest("empty", vec![]))
            .unwrap();
        assert!(project.root.is_dir());
        assert!(project.created_files.is_empty());
        assert_eq!(fs::read_dir(&project.root).unwrap().count(), 0);
    }

    #[test]
    fn test_unnamed_project_uses_fallback_slug() {
        let dir = TempDir::new().unwrap();
        let project = ProjectMaterializer::new(dir.path())
            .create_project(&manifest("", vec![FileEntry::new("a.txt", "a")]))
            .unwrap();
        assert!(project.dir_name.starts_with("project_"));
    }

    #[test]
    fn test_incomplete_entries_skipped() {
        let dir = TempDir::new().unwrap();
        let no_content = FileEntry {
            name: Some("b.txt".to_string()),
            ..Default::default()
        };
        let no_name = FileEntry {
            content: Some("orphan".to_string()),
            ..Default::default()
        };
        let project = ProjectMaterializer::new(dir.path())
            .create_project(&manifest(
                "partial",
                vec![FileEntry::new("a.txt", "a"), no_content, no_name],
            ))
            .unwrap();
        assert_eq!(project.created_files, vec!["a.txt"]);
        assert!(!project.root.join("b.txt").exists());
    }

    #[test]
    fn test_path_escape_rejected_before_writing() {
        for bad in ["../evil.txt", "/etc/evil", "a/../../evil.txt", "."] {
            let dir = TempDir::new().unwrap();
            let root = dir.path().join("generated");
            let err = ProjectMaterializer::new(&root)
                .create_project(&manifest(
                    "evil",
                    vec![FileEntry::new("ok.txt", "fine"), FileEntry::new(bad, "x")],
                ))
                .unwrap_err();

            assert!(matches!(err, ProjectError::PathEscape { .. }), "{bad}");
            assert!(!root.exists(), "nothing should be written for {bad}");
            assert!(!dir.path().join("evil.txt").exists());
        }
    }

    #[test]
    fn test_current_dir_components_are_normalized() {
        let dir = TempDir::new().unwrap();
        let project = ProjectMaterializer::new(dir.path())
            .create_project(&manifest("dots", vec![FileEntry::new("./src/./main.py", "x")]))
            .unwrap();
        assert_eq!(project.created_files, vec!["src/main.py"]);
    }

    #[test]
    fn test_same_name_same_second_gets_distinct_dirs() {
        let dir = TempDir::new().unwrap();
        let materializer = ProjectMaterializer::new(dir.path());
        let m = manifest("twin", vec![FileEntry::new("a.txt", "a")]);

        let projects: Vec<_> = (0..3)
            .map(|_| materializer.create_project(&m).unwrap())
            .collect();

        let mut names: Vec<_> = projects.iter().map(|p| p.dir_name.clone()).collect();
        names.sort();
        names.dedup();
        assert_eq!(names.len(), 3);
        for project in &projects {
            assert!(project.root.join("a.txt").is_file());
        }
    }

    #[test]
    fn test_existing_file_is_overwritten() {
        let dir = TempDir::new().unwrap();
        let project = ProjectMaterializer::new(dir.path())
            .create_project(&manifest(
                "dupes",
                vec![FileEntry::new("a.txt", "first"), FileEntry::new("a.txt", "second")],
            ))
            .unwrap();
        assert_eq!(fs::read_to_string(project.root.join("a.txt")).unwrap(), "second");
        assert_eq!(project.created_files, vec!["a.txt", "a.txt"]);
    }

    #[test]
    fn test_list_projects_missing_root() {
        let dir = TempDir::new().unwrap();
        let projects = ProjectMaterializer::new(dir.path().join("nope"))
            .list_projects(5)
            .unwrap();
        assert!(projects.is_empty());
    }

    #[test]
    fn test_list_projects_newest_first_and_limited() {
        let dir = TempDir::new().unwrap();
        for name in ["old", "mid", "new"] {
            fs::create_dir(dir.path().join(name)).unwrap();
            std::thread::sleep(std::time::Duration::from_millis(20));
        }
        fs::write(dir.path().join("new.zip"), b"zip").unwrap();

        let projects = ProjectMaterializer::new(dir.path()).list_projects(2).unwrap();
        let names: Vec<_> = projects.iter().map(|p| p.dir_name.as_str()).collect();
        assert_eq!(names, vec!["new", "mid"]);
    }
}
