//! Zip packaging of a materialized project.

use std::fs::File;
use std::io;
use std::path::{Path, PathBuf};

use tracing::debug;
use walkdir::WalkDir;
use zip::CompressionMethod;
use zip::write::SimpleFileOptions;

use crate::errors::ProjectError;

/// Package every regular file under `root` into `<root-parent>/<dir_name>.zip`.
///
/// Entries are named by their `/`-separated path relative to `root` and
/// added in sorted order; directories are implied by the entry names. The
/// zip is assembled in a temporary file next to the target and moved into
/// place only once complete, so a failure leaves any previous archive intact.
pub fn create_download_archive(root: &Path) -> Result<PathBuf, ProjectError> {
    let dir_name = root
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "project".to_string());
    let parent = match root.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        Some(_) => Path::new("."),
        None => root,
    };
    let archive_path = parent.join(format!("{}.zip", dir_name));

    let archive_err = |source: zip::result::ZipError| ProjectError::Archive {
        path: archive_path.clone(),
        source,
    };

    let write_err = |source: io::Error| ProjectError::WriteFile {
        path: archive_path.clone(),
        source,
    };

    let staging = tempfile::Builder::new()
        .prefix(".forgechat-archive-")
        .suffix(".zip")
        .tempfile_in(parent)
        .map_err(write_err)?;
    let mut writer = zip::ZipWriter::new(staging);
    let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);

    let mut entries = 0usize;
    for entry in WalkDir::new(root).sort_by_file_name() {
        let entry = entry?;
        if !entry.file_type().is_file() {
            continue;
        }
        let Ok(relative) = entry.path().strip_prefix(root) else {
            continue;
        };
        let name = relative
            .components()
            .map(|c| c.as_os_str().to_string_lossy())
            .collect::<Vec<_>>()
            .join("/");

        writer.start_file(name, options).map_err(archive_err)?;
        let mut source = File::open(entry.path()).map_err(|e| archive_err(e.into()))?;
        io::copy(&mut source, &mut writer).map_err(|e| archive_err(e.into()))?;
        entries += 1;
    }

    let staging = writer.finish().map_err(archive_err)?;
    staging
        .persist(&archive_path)
        .map_err(|e| write_err(e.error))?;
    debug!(archive = %archive_path.display(), entries, "archive written");
    Ok(archive_path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Read;
    use tempfile::TempDir;

    fn read_archive(path: &Path) -> Vec<(String, String)> {
        let mut archive = zip::ZipArchive::new(File::open(path).unwrap()).unwrap();
        (0..archive.len())
            .map(|i| {
                let mut file = archive.by_index(i).unwrap();
                let mut content = String::new();
                file.read_to_string(&mut content).unwrap();
                (file.name().to_string(), content)
            })
            .collect()
    }

    #[test]
    fn test_archive_contains_files_with_relative_names() {
        let dir = TempDir::new().unwrap();
        let root = dir.path().join("demo_20250101_120000");
        std::fs::create_dir_all(root.join("src")).unwrap();
        std::fs::write(root.join("README.md"), "# Demo").unwrap();
        std::fs::write(root.join("src").join("main.py"), "print(1)").unwrap();

        let archive = create_download_archive(&root).unwrap();

        assert_eq!(archive, dir.path().join("demo_20250101_120000.zip"));
        assert_eq!(
            read_archive(&archive),
            vec![
                ("README.md".to_string(), "# Demo".to_string()),
                ("src/main.py".to_string(), "print(1)".to_string()),
            ]
        );
    }

    #[test]
    fn test_empty_directory_gives_empty_archive() {
        let dir = TempDir::new().unwrap();
        let root = dir.path().join("empty");
        std::fs::create_dir(&root).unwrap();
        std::fs::create_dir(root.join("nested")).unwrap();

        let archive = create_download_archive(&root).unwrap();
        assert!(read_archive(&archive).is_empty());
    }

    #[test]
    fn test_archive_is_regenerated() {
        let dir = TempDir::new().unwrap();
        let root = dir.path().join("proj");
        std::fs::create_dir(&root).unwrap();
        std::fs::write(root.join("a.txt"), "a").unwrap();
        create_download_archive(&root).unwrap();

        std::fs::write(root.join("b.txt"), "b").unwrap();
        let archive = create_download_archive(&root).unwrap();
        let names: Vec<_> = read_archive(&archive).into_iter().map(|(n, _)| n).collect();
        assert_eq!(names, vec!["a.txt", "b.txt"]);
    }

    #[test]
    fn test_missing_root_is_walk_error() {
        let dir = TempDir::new().unwrap();
        let err = create_download_archive(&dir.path().join("missing")).unwrap_err();
        assert!(matches!(err, ProjectError::Walk(_)));
        // Nothing is left behind next to the projects.
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
    }

    #[test]
    fn test_failed_run_keeps_previous_archive() {
        let dir = TempDir::new().unwrap();
        let previous = dir.path().join("gone.zip");
        std::fs::write(&previous, "previous archive").unwrap();

        assert!(create_download_archive(&dir.path().join("gone")).is_err());
        assert_eq!(std::fs::read_to_string(&previous).unwrap(), "previous archive");
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 1);
    }
}
