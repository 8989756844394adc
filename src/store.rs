//! Keyed diagnostics store with stale-completion rejection.
//!
//! Maps `ScopeKey -> DiagnosticKind -> ordered diagnostics`. The store is
//! plain data - no I/O, no state machine. The interesting behavior is the
//! scope-keying policy ([`resolve_scope_key`]) and the sequence tickets
//! that make the last-writer-wins window explicit: a caller firing
//! overlapping checks gets the newest completed result, and a slow older
//! check can never flicker stale problems back onto a fixed file.

use std::collections::HashMap;
use std::path::Path;

use tracing::{debug, warn};

use crate::types::{Diagnostic, DiagnosticKind, DiagnosticsView, ScopeKey, UnitRef};

// ============================================================================
// Scope Policy
// ============================================================================

/// Resolve the scope a set of diagnostics of `kind` applies to.
///
/// Parse errors are relative to the exact in-memory text, so they stay
/// buffer-local. Compile errors belong to the enclosing project when one
/// is discoverable - a project build produces diagnostics spanning multiple
/// files, and those must stay visible when switching among units of the
/// same project.
///
/// Pure policy: the caller supplies the discovered project root, so the
/// store never touches the filesystem.
pub fn resolve_scope_key(
    kind: DiagnosticKind,
    unit: &UnitRef,
    project_root: Option<&Path>,
) -> ScopeKey {
    match (kind, project_root) {
        (DiagnosticKind::CompileError, Some(root)) => ScopeKey::Project(root.to_path_buf()),
        _ => ScopeKey::Buffer(unit.id),
    }
}

// ============================================================================
// Check Tickets
// ============================================================================

/// Sequence token for one check against one `(scope, kind)` slot.
///
/// Issued by [`DiagnosticStore::begin_check`] before the external tool is
/// spawned and consumed by [`DiagnosticStore::set`] when its output has
/// been parsed. A ticket issued earlier than the last applied one is stale
/// and its result is discarded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckTicket {
    key: ScopeKey,
    kind: DiagnosticKind,
    seq: u64,
}

impl CheckTicket {
    pub fn key(&self) -> &ScopeKey {
        &self.key
    }

    pub fn kind(&self) -> DiagnosticKind {
        self.kind
    }
}

// ============================================================================
// Store
// ============================================================================

#[derive(Debug, Default)]
struct Slot {
    /// Highest sequence number handed out for this slot.
    issued: u64,
    /// Sequence number of the currently applied result; 0 before any.
    applied: u64,
    items: Vec<Diagnostic>,
}

/// Current known problems, keyed by scope and kind.
///
/// Entries are created on first use of a key. Buffer-local entries die
/// with their unit ([`release_unit`](DiagnosticStore::release_unit));
/// project-scoped entries are only ever overwritten by a fresher compile,
/// never evicted.
#[derive(Debug, Default)]
pub struct DiagnosticStore {
    scopes: HashMap<ScopeKey, HashMap<DiagnosticKind, Slot>>,
}

impl DiagnosticStore {
    pub fn new() -> Self {
        DiagnosticStore::default()
    }

    /// Start a check against `(key, kind)`, reserving its sequence number.
    pub fn begin_check(&mut self, key: ScopeKey, kind: DiagnosticKind) -> CheckTicket {
        let slot = self
            .scopes
            .entry(key.clone())
            .or_default()
            .entry(kind)
            .or_default();
        slot.issued += 1;
        CheckTicket {
            key,
            kind,
            seq: slot.issued,
        }
    }

    /// Replace the diagnostics for the ticket's slot wholesale.
    ///
    /// This is the sole mutation entry point; there is no incremental merge
    /// within a kind. Returns `false` when a check that began later has
    /// already applied its result - the stale result is discarded and the
    /// store is unchanged.
    pub fn set(&mut self, ticket: &CheckTicket, diagnostics: Vec<Diagnostic>) -> bool {
        let slot = self
            .scopes
            .entry(ticket.key.clone())
            .or_default()
            .entry(ticket.kind)
            .or_default();
        if ticket.seq <= slot.applied {
            warn!(
                seq = ticket.seq,
                applied = slot.applied,
                "stale check result discarded"
            );
            return false;
        }
        slot.applied = ticket.seq;
        slot.items = diagnostics;
        true
    }

    /// Diagnostics currently stored for `(key, kind)`; empty when the key
    /// has never been set.
    pub fn get(&self, key: &ScopeKey, kind: DiagnosticKind) -> &[Diagnostic] {
        self.scopes
            .get(key)
            .and_then(|kinds| kinds.get(&kind))
            .map(|slot| slot.items.as_slice())
            .unwrap_or(&[])
    }

    /// Assemble the current view for `unit`, given its discovered project
    /// root (if any).
    pub fn view(&self, unit: &UnitRef, project_root: Option<&Path>) -> DiagnosticsView {
        let parse_key = resolve_scope_key(DiagnosticKind::ParseError, unit, project_root);
        let compile_key = resolve_scope_key(DiagnosticKind::CompileError, unit, project_root);
        DiagnosticsView {
            parse_errors: self.get(&parse_key, DiagnosticKind::ParseError).to_vec(),
            compile_errors: self
                .get(&compile_key, DiagnosticKind::CompileError)
                .to_vec(),
        }
    }

    /// Drop the buffer-local entry for a closed unit.
    ///
    /// Project-scoped compile entries are deliberately left behind: sibling
    /// units of the same project still reference them.
    pub fn release_unit(&mut self, unit: &UnitRef) {
        if self.scopes.remove(&ScopeKey::Buffer(unit.id)).is_some() {
            debug!(unit = %unit.id, "buffer-local diagnostics released");
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
