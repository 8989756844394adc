//! Unified error type for checks.
//!
//! Subsystem errors ([`InvokeError`], [`ManifestError`]) are bridged into a
//! single [`LintError`] via `From` impls, so the host-facing session API
//! has one error surface.
//!
//! Only tool failures abort a check. A manifest that cannot be introspected
//! degrades to standalone-file behavior inside the session and normally
//! never reaches the host; its variant exists for callers that drive
//! [`crate::project`] directly.

use std::io;
use std::time::Duration;

use thiserror::Error;

use crate::invoke::InvokeError;
use crate::project::ManifestError;

// ============================================================================
// Unified Error Type
// ============================================================================

/// Errors surfaced to the host layer.
///
/// An `Err` means "no result available" - distinct from an empty
/// diagnostics list, which means the tool ran and found nothing.
#[derive(Debug, Error)]
pub enum LintError {
    /// The external tool could not be found or spawned.
    #[error("tool unavailable: {program}")]
    ToolUnavailable { program: String },

    /// The external tool exceeded its deadline and was killed.
    #[error("tool timed out after {after:?}: {program}")]
    ToolTimeout { program: String, after: Duration },

    /// Project-metadata introspection failed.
    #[error("manifest read failed: {reason}")]
    ManifestRead { reason: String },

    /// IO error while driving a check.
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
}

/// Result type for check operations.
pub type LintResult<T> = Result<T, LintError>;

// ============================================================================
// Bridges
// ============================================================================

impl From<InvokeError> for LintError {
    fn from(err: InvokeError) -> Self {
        match err {
            InvokeError::ToolUnavailable { program } => LintError::ToolUnavailable { program },
            InvokeError::ToolTimeout { program, after } => {
                LintError::ToolTimeout { program, after }
            }
            InvokeError::Io(e) => LintError::Io(e),
        }
    }
}

impl From<ManifestError> for LintError {
    fn from(err: ManifestError) -> Self {
        LintError::ManifestRead {
            reason: err.to_string(),
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
