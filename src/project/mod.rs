//! Project materialization.
//!
//! Turns an extracted [`ProjectManifest`](crate::extract::ProjectManifest)
//! into files on disk and packages the result for download:
//!
//! - [`validate_manifest`] - limit and naming checks before anything is written
//! - [`ProjectMaterializer`] - timestamped project directories under a root
//! - [`create_download_archive`] - zip of a project directory

mod archive;
mod materializer;
mod validate;

pub use archive::create_download_archive;
pub use materializer::{MaterializedProject, ProjectMaterializer, ProjectSummary, slug};
pub use validate::{ManifestReport, sanitize_filename, validate_manifest};
