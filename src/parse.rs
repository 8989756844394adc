//! Line grammars over compiler stderr.
//!
//! Two grammars, selected by check kind: the syntax-check grammar for
//! parse-only runs against in-memory text, and the full-build grammar for
//! compiles against files on disk. Both are pure functions over text - no
//! side effects, no I/O - and best-effort over noisy output: lines that
//! match neither pattern are skipped, never fatal.

use std::sync::LazyLock;

use regex::Regex;

use crate::types::Diagnostic;

/// Error line of a parse-only run, where the compiler reports the virtual
/// name it gives stdin-fed input.
static SYNTAX_ERROR: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^<anon>:(\d+):(\d+):.*error: (.+)$").unwrap());

/// Location-bearing error line of a full build.
static LOCATED_ERROR: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^([^:\s][^:]*):(\d+):(\d+):.*error: (.+)$").unwrap());

/// Location-less error line of a full build.
static BARE_ERROR: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^error: (.+)$").unwrap());

/// A parse-only run cannot resolve on-disk module references, so this
/// message is a known false positive of the fast path and never reaches
/// the user.
const MODULE_NOT_FOUND: &str = "file not found for module";

/// Parse the stderr of a syntax-only check against in-memory buffer text.
///
/// Yields buffer-local diagnostics in stream order. Module-resolution
/// errors are discarded.
pub fn parse_syntax_check(raw: &str) -> Vec<Diagnostic> {
    let mut diagnostics = Vec::new();
    for line in raw.lines() {
        let Some(caps) = SYNTAX_ERROR.captures(line) else {
            continue;
        };
        let message = caps[3].trim();
        if message.contains(MODULE_NOT_FOUND) {
            continue;
        }
        let Ok(line_no) = caps[1].parse::<u32>() else {
            continue;
        };
        diagnostics.push(Diagnostic::at_line(line_no, message));
    }
    diagnostics
}

/// Parse the stderr of a full build.
///
/// Each line is tested first against the location-bearing form, then the
/// location-less form. Location-less errors are attributed to
/// `fallback_file` (the project's root source file when metadata resolved,
/// else nothing).
pub fn parse_full_build(raw: &str, fallback_file: Option<&str>) -> Vec<Diagnostic> {
    let mut diagnostics = Vec::new();
    for line in raw.lines() {
        if let Some(caps) = LOCATED_ERROR.captures(line) {
            let Ok(line_no) = caps[2].parse::<u32>() else {
                continue;
            };
            diagnostics.push(Diagnostic::in_file(&caps[1], line_no, caps[4].trim()));
        } else if let Some(caps) = BARE_ERROR.captures(line) {
            diagnostics.push(Diagnostic::unlocated(
                fallback_file.map(str::to_string),
                caps[1].trim(),
            ));
        }
    }
    diagnostics
}

// ============================================================================
// Tests
// ============================================================================
