//! Project-root discovery and manifest introspection.
//!
//! A full build belongs to the enclosing Cargo project when one exists.
//! `find_project_root` walks ancestor directories for the manifest;
//! `load_metadata` asks the project tool for the first declared build
//! target. Neither is required to succeed: callers without a project fall
//! back to single-file behavior.

use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use thiserror::Error;
use tracing::debug;

use crate::invoke::{InvokeError, ToolRequest, ToolRunner};
use crate::types::ProjectMetadata;

/// Canonical manifest filename marking a project root. Directory entries
/// are matched against it case-insensitively.
pub const MANIFEST_FILE: &str = "Cargo.toml";

// ============================================================================
// Error Types
// ============================================================================

/// Errors from manifest introspection.
///
/// Callers treat any of these as "no project metadata available" and check
/// the file standalone rather than aborting.
#[derive(Debug, Error)]
pub enum ManifestError {
    /// No manifest file present under the given root.
    #[error("no manifest found in {root}")]
    NotFound { root: PathBuf },

    /// The manifest subcommand could not be run.
    #[error("manifest read failed: {source}")]
    Tool {
        #[from]
        source: InvokeError,
    },

    /// The manifest subcommand exited unsuccessfully.
    #[error("manifest read exited with code {code:?}: {stderr}")]
    Subcommand { code: Option<i32>, stderr: String },

    /// Output was not the expected structured form.
    #[error("manifest output not parseable: {reason}")]
    Unparseable { reason: String },

    /// The manifest declares no build targets.
    #[error("manifest declares no build targets")]
    NoTargets,
}

/// Result type for manifest operations.
pub type ManifestResult<T> = Result<T, ManifestError>;

// ============================================================================
// Root Discovery
// ============================================================================

/// Find the nearest ancestor directory of `path` containing a manifest.
///
/// The walk is iterative, starting at the directory containing `path` and
/// terminating cleanly at the filesystem root. Returns `None` when no
/// manifest exists anywhere in the ancestry - callers operating on
/// non-project files rely on that.
pub fn find_project_root(path: &Path) -> Option<PathBuf> {
    let mut dir = path.parent()?.to_path_buf();
    loop {
        if manifest_in(&dir).is_some() {
            return Some(dir);
        }
        match dir.parent() {
            // Root reached when a directory is its own parent.
            Some(parent) if parent != dir => dir = parent.to_path_buf(),
            _ => return None,
        }
    }
}

/// Path of the manifest inside `dir`, if an entry matches the canonical
/// name case-insensitively.
fn manifest_in(dir: &Path) -> Option<PathBuf> {
    let entries = fs::read_dir(dir).ok()?;
    for entry in entries.flatten() {
        let name = entry.file_name();
        if name.to_string_lossy().eq_ignore_ascii_case(MANIFEST_FILE) && entry.path().is_file() {
            return Some(entry.path());
        }
    }
    None
}

// ============================================================================
// Manifest Introspection
// ============================================================================

/// First build target of `cargo read-manifest` output. Unknown fields are
/// ignored.
#[derive(Debug, Deserialize)]
struct RawManifest {
    targets: Vec<RawTarget>,
}

#[derive(Debug, Deserialize)]
struct RawTarget {
    kind: Vec<String>,
    src_path: PathBuf,
}

/// Introspect the project at `root` via the project tool's manifest reader.
///
/// Extracts the first declared build target's kind and entry-point source
/// file, and computes the conventional dependency-artifact path beneath
/// the root.
pub fn load_metadata(
    runner: &dyn ToolRunner,
    project_tool: &Path,
    root: &Path,
) -> ManifestResult<ProjectMetadata> {
    let manifest = manifest_in(root).ok_or_else(|| ManifestError::NotFound {
        root: root.to_path_buf(),
    })?;

    let request = ToolRequest::new(project_tool)
        .arg("read-manifest")
        .arg(format!("--manifest-path={}", manifest.display()))
        .with_cwd(root.to_path_buf());
    let output = runner.run(&request)?;
    if !output.success() {
        return Err(ManifestError::Subcommand {
            code: output.exit_code,
            stderr: output.stderr,
        });
    }

    let raw: RawManifest = serde_json::from_str(&output.stdout)
        .map_err(|e| ManifestError::Unparseable {
            reason: e.to_string(),
        })?;
    let target = raw.targets.first().ok_or(ManifestError::NoTargets)?;

    let metadata = ProjectMetadata {
        is_library: target.kind.iter().any(|kind| kind == "lib"),
        dependency_search_path: root.join("target").join("deps"),
        root_source_file: target.src_path.clone(),
    };
    debug!(
        root = %root.display(),
        is_library = metadata.is_library,
        "project metadata loaded"
    );
    Ok(metadata)
}

// ============================================================================
// Tests
// ============================================================================
