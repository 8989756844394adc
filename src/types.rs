//! Core data types: diagnostics, scope keys, editable units, project metadata.
//!
//! Everything here is a value object. Diagnostics carry no identity beyond
//! their fields and keep the order they appeared in the tool's output
//! stream; they are never sorted by line and never de-duplicated.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;

// ============================================================================
// Diagnostic
// ============================================================================

/// One structured problem extracted from compiler output.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Diagnostic {
    /// File the problem is attributed to. Present only when the problem
    /// belongs to a file other than the unit under direct edit (e.g. module
    /// expansion elsewhere in a project).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub filename: Option<String>,
    /// 1-based line number. Present only when the originating text matched
    /// a location-bearing pattern.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub line: Option<u32>,
    /// Error message, whitespace-trimmed.
    pub message: String,
}

impl Diagnostic {
    /// Diagnostic at a line of the unit under edit.
    pub fn at_line(line: u32, message: impl Into<String>) -> Self {
        Diagnostic {
            filename: None,
            line: Some(line),
            message: message.into(),
        }
    }

    /// Diagnostic located in a named file.
    pub fn in_file(filename: impl Into<String>, line: u32, message: impl Into<String>) -> Self {
        Diagnostic {
            filename: Some(filename.into()),
            line: Some(line),
            message: message.into(),
        }
    }

    /// Location-less diagnostic, optionally attributed to a fallback file.
    pub fn unlocated(filename: Option<String>, message: impl Into<String>) -> Self {
        Diagnostic {
            filename,
            line: None,
            message: message.into(),
        }
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (&self.filename, self.line) {
            (Some(file), Some(line)) => write!(f, "{}:{}: {}", file, line, self.message),
            (Some(file), None) => write!(f, "{}: {}", file, self.message),
            (None, Some(line)) => write!(f, "Line {}: {}", line, self.message),
            (None, None) => write!(f, "{}", self.message),
        }
    }
}

// ============================================================================
// Diagnostic Kind
// ============================================================================

/// The two check categories, tracked independently per scope.
///
/// A parse check and a compile check can disagree; both stay visible.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DiagnosticKind {
    /// Fast syntax-only check against in-memory buffer text.
    ParseError,
    /// Full type check against the file on disk, potentially project-wide.
    CompileError,
}

// ============================================================================
// Editable Units
// ============================================================================

/// Opaque handle for "a file currently open for editing", assigned by the
/// host layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct UnitId(pub u64);

impl fmt::Display for UnitId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unit#{}", self.0)
    }
}

/// An editable unit together with its on-disk location, if any.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnitRef {
    pub id: UnitId,
    /// Absent for buffers that have never been saved.
    pub path: Option<PathBuf>,
}

impl UnitRef {
    /// Unit with no on-disk backing.
    pub fn anonymous(id: UnitId) -> Self {
        UnitRef { id, path: None }
    }

    /// Unit backed by a file on disk.
    pub fn on_disk(id: UnitId, path: impl Into<PathBuf>) -> Self {
        UnitRef {
            id,
            path: Some(path.into()),
        }
    }
}

// ============================================================================
// Scope Keys
// ============================================================================

/// Identity under which a set of diagnostics of a given kind is stored.
///
/// Parse errors are relative to the exact in-memory text, so they are
/// always buffer-local. Compile errors from a project build span multiple
/// files and belong to the project root, not to whichever unit happened to
/// trigger the build.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ScopeKey {
    /// Scoped to a single editable unit.
    Buffer(UnitId),
    /// Scoped to an enclosing project root directory.
    Project(PathBuf),
}

// ============================================================================
// Project Metadata
// ============================================================================

/// Build metadata for the first declared target of a project manifest.
///
/// Derived per invocation from the project tool's manifest reader; never
/// persisted or cached across checks.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectMetadata {
    /// Whether the first declared target is a library.
    pub is_library: bool,
    /// Conventional dependency-artifact path beneath the project root.
    pub dependency_search_path: PathBuf,
    /// The target's declared entry-point source file.
    pub root_source_file: PathBuf,
}

// ============================================================================
// Diagnostics View
// ============================================================================

/// Read-model returned to the host for rendering: whatever is currently
/// stored for both kinds' keys of one unit.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DiagnosticsView {
    pub parse_errors: Vec<Diagnostic>,
    pub compile_errors: Vec<Diagnostic>,
}

impl DiagnosticsView {
    /// Total number of problems across both kinds.
    pub fn error_count(&self) -> usize {
        self.parse_errors.len() + self.compile_errors.len()
    }

    /// True when neither kind has a stored problem.
    pub fn is_clean(&self) -> bool {
        self.parse_errors.is_empty() && self.compile_errors.is_empty()
    }
}

// ============================================================================
// Tests
// ============================================================================
