//! Rustlint: editor diagnostics core for Rust toolchain checks.
//!
//! Invokes the Rust toolchain out-of-process, parses its textual error
//! output into structured records, resolves the scope each record belongs
//! to (single buffer vs. enclosing Cargo project), and tracks the current
//! known problems per editable unit across repeated incremental checks.
//!
//! The host editor is an external collaborator: it decides *when* to check
//! (on change, on save), feeds raw text or file paths in through
//! [`CheckSession`], and renders the structured [`DiagnosticsView`] that
//! comes back.

// Core infrastructure
pub mod error;
pub mod types;

// Toolchain plumbing
pub mod invoke;
pub mod parse;
pub mod project;

// Diagnostics state
pub mod session;
pub mod store;

pub use error::{LintError, LintResult};
pub use session::{CheckSession, LintConfig};
pub use store::DiagnosticStore;
pub use types::{Diagnostic, DiagnosticKind, DiagnosticsView, ScopeKey, UnitId, UnitRef};
