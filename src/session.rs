//! Check orchestration: the facade the host editor drives.
//!
//! The host layer calls in with raw text or file paths on its document
//! lifecycle events and reads back structured diagnostics to render. Each
//! check spawns exactly one external process and blocks until its error
//! stream is drained; the store's sequence tickets decide between
//! overlapping completions.

use std::path::{Path, PathBuf};
use std::time::Duration;

use tracing::debug;
use which::which;

use crate::error::{LintError, LintResult};
use crate::invoke::{SystemToolRunner, ToolRequest, ToolRunner};
use crate::parse;
use crate::project;
use crate::store::{resolve_scope_key, DiagnosticStore};
use crate::types::{DiagnosticKind, DiagnosticsView, UnitRef};

// ============================================================================
// Configuration
// ============================================================================

/// Configuration for toolchain checks.
#[derive(Debug, Clone)]
pub struct LintConfig {
    /// Compiler program used for syntax and full-build checks.
    pub compiler: PathBuf,
    /// Project tool used for manifest introspection.
    pub project_tool: PathBuf,
    /// Deadline for a single check; `None` waits indefinitely.
    pub timeout: Option<Duration>,
    /// Additional environment variables for spawned tools.
    pub extra_env: Vec<(String, String)>,
}

impl Default for LintConfig {
    fn default() -> Self {
        LintConfig {
            compiler: PathBuf::from("rustc"),
            project_tool: PathBuf::from("cargo"),
            timeout: Some(Duration::from_secs(60)),
            extra_env: Vec::new(),
        }
    }
}

impl LintConfig {
    /// Use a specific compiler binary.
    pub fn with_compiler(mut self, compiler: impl Into<PathBuf>) -> Self {
        self.compiler = compiler.into();
        self
    }

    /// Use a specific project tool binary.
    pub fn with_project_tool(mut self, project_tool: impl Into<PathBuf>) -> Self {
        self.project_tool = project_tool.into();
        self
    }

    /// Set the per-check deadline.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Verify the configured tools resolve on `PATH`, so a host can report
    /// a missing toolchain up front instead of on the first keystroke.
    pub fn preflight(&self) -> LintResult<()> {
        for tool in [&self.compiler, &self.project_tool] {
            which(tool).map_err(|_| LintError::ToolUnavailable {
                program: tool.display().to_string(),
            })?;
        }
        Ok(())
    }
}

// ============================================================================
// Session
// ============================================================================

/// Diagnostics pipeline facade.
///
/// Owns the execution backend, the configuration, and the store. One
/// session serves all open units of one host editor instance.
pub struct CheckSession<R: ToolRunner> {
    runner: R,
    config: LintConfig,
    store: DiagnosticStore,
}

impl CheckSession<SystemToolRunner> {
    /// Session backed by real child processes.
    pub fn new(config: LintConfig) -> Self {
        CheckSession::with_runner(SystemToolRunner, config)
    }
}

impl<R: ToolRunner> CheckSession<R> {
    /// Session with a custom execution backend.
    pub fn with_runner(runner: R, config: LintConfig) -> Self {
        CheckSession {
            runner,
            config,
            store: DiagnosticStore::new(),
        }
    }

    /// Fast path: parse-only check of the unit's in-memory text.
    ///
    /// On success the unit's parse-error slot is replaced wholesale. On
    /// [`LintError::ToolUnavailable`] or [`LintError::ToolTimeout`] the
    /// check aborts with the store untouched, so the host can tell "tool
    /// broken" apart from "no problems".
    pub fn buffer_changed(&mut self, unit: &UnitRef, text: &str) -> LintResult<()> {
        let key = resolve_scope_key(DiagnosticKind::ParseError, unit, None);
        let ticket = self.store.begin_check(key, DiagnosticKind::ParseError);

        let request = ToolRequest::new(&self.config.compiler)
            .arg("--parse-only")
            .arg("-")
            .with_input(text.as_bytes().to_vec())
            .with_timeout(self.config.timeout)
            .with_env(self.config.extra_env.clone());
        let output = self.runner.run(&request)?;

        let diagnostics = parse::parse_syntax_check(&output.stderr);
        debug!(
            unit = %unit.id,
            count = diagnostics.len(),
            "syntax check complete"
        );
        self.store.set(&ticket, diagnostics);
        Ok(())
    }

    /// Full-build check against the unit's saved file.
    ///
    /// Skipped when `path` is not reachable on disk. When the file sits in
    /// a project, diagnostics are keyed to the project root; a manifest
    /// that cannot be introspected degrades to a standalone-file build
    /// rather than failing the check.
    pub fn unit_saved(&mut self, unit: &UnitRef, path: &Path) -> LintResult<()> {
        if !path.is_file() {
            debug!(path = %path.display(), "save target not on disk, full build skipped");
            return Ok(());
        }

        let project_root = project::find_project_root(path);
        let metadata = match project_root.as_deref() {
            Some(root) => {
                match project::load_metadata(&self.runner, &self.config.project_tool, root) {
                    Ok(metadata) => Some(metadata),
                    Err(err) => {
                        debug!(error = %err, "manifest introspection failed, standalone build");
                        None
                    }
                }
            }
            None => None,
        };

        let key = resolve_scope_key(DiagnosticKind::CompileError, unit, project_root.as_deref());
        let ticket = self.store.begin_check(key, DiagnosticKind::CompileError);

        let mut request = ToolRequest::new(&self.config.compiler)
            .arg("--no-trans")
            .with_timeout(self.config.timeout)
            .with_env(self.config.extra_env.clone());

        match (&metadata, project_root.as_deref()) {
            (Some(metadata), Some(root)) => {
                if metadata.is_library {
                    request = request.arg("--crate-type").arg("lib");
                }
                request = request
                    .arg(format!("-L{}", metadata.dependency_search_path.display()))
                    .arg(metadata.root_source_file.display().to_string())
                    .with_cwd(root.to_path_buf());
            }
            _ => {
                request = request.arg(path.display().to_string());
                if let Some(dir) = path.parent() {
                    request = request.with_cwd(dir.to_path_buf());
                }
            }
        }

        let output = self.runner.run(&request)?;

        let fallback = metadata
            .as_ref()
            .map(|m| m.root_source_file.display().to_string());
        let diagnostics = parse::parse_full_build(&output.stderr, fallback.as_deref());
        debug!(
            unit = %unit.id,
            count = diagnostics.len(),
            "full build complete"
        );
        self.store.set(&ticket, diagnostics);
        Ok(())
    }

    /// Release buffer-local diagnostics for a closed unit. Project-scoped
    /// compile errors stay for the project's other units.
    pub fn unit_closed(&mut self, unit: &UnitRef) {
        self.store.release_unit(unit);
    }

    /// Current diagnostics for `unit`, for rendering.
    pub fn view(&self, unit: &UnitRef) -> DiagnosticsView {
        let project_root = unit
            .path
            .as_deref()
            .and_then(project::find_project_root);
        self.store.view(unit, project_root.as_deref())
    }

    /// Direct read access to the underlying store.
    pub fn store(&self) -> &DiagnosticStore {
        &self.store
    }

    /// The execution backend.
    pub fn runner(&self) -> &R {
        &self.runner
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::invoke::{InvokeError, InvokeResult, ToolOutput};
    use crate::types::UnitId;
    use std::cell::RefCell;

    /// Scripted runner: canned results in call order, every request
    /// recorded.
    struct ScriptedRunner {
        results: RefCell<Vec<InvokeResult<ToolOutput>>>,
        requests: RefCell<Vec<ToolRequest>>,
    }

    impl ScriptedRunner {
        fn new(results: Vec<InvokeResult<ToolOutput>>) -> Self {
            ScriptedRunner {
                results: RefCell::new(results),
                requests: RefCell::new(Vec::new()),
            }
        }
    }

    impl ToolRunner for ScriptedRunner {
        fn run(&self, request: &ToolRequest) -> InvokeResult<ToolOutput> {
            self.requests.borrow_mut().push(request.clone());
            self.results.borrow_mut().remove(0)
        }
    }

    fn stderr_output(stderr: &str) -> InvokeResult<ToolOutput> {
        Ok(ToolOutput {
            stdout: String::new(),
            stderr: stderr.to_string(),
            exit_code: Some(if stderr.is_empty() { 0 } else { 101 }),
        })
    }

    fn session(results: Vec<InvokeResult<ToolOutput>>) -> CheckSession<ScriptedRunner> {
        CheckSession::with_runner(ScriptedRunner::new(results), LintConfig::default())
    }

    #[test]
    fn buffer_changed_stores_parse_errors() {
        let mut s = session(vec![stderr_output("<anon>:7:3: error: missing semicolon\n")]);
        let unit = UnitRef::anonymous(UnitId(1));

        s.buffer_changed(&unit, "fn main() { let x = 1 }").unwrap();

        let view = s.view(&unit);
        assert_eq!(view.parse_errors.len(), 1);
        assert_eq!(view.parse_errors[0].line, Some(7));
        assert_eq!(view.parse_errors[0].message, "missing semicolon");

        let requests = s.runner.requests.borrow();
        assert_eq!(requests[0].args, vec!["--parse-only", "-"]);
        assert_eq!(
            requests[0].input.as_deref(),
            Some("fn main() { let x = 1 }".as_bytes())
        );
    }

    #[test]
    fn clean_recheck_clears_previous_parse_errors() {
        let mut s = session(vec![
            stderr_output("<anon>:7:3: error: missing semicolon\n"),
            stderr_output(""),
        ]);
        let unit = UnitRef::anonymous(UnitId(1));

        s.buffer_changed(&unit, "fn main() { let x = 1 }").unwrap();
        assert_eq!(s.view(&unit).parse_errors.len(), 1);

        s.buffer_changed(&unit, "fn main() { let x = 1; }").unwrap();
        assert!(s.view(&unit).is_clean());
    }

    #[test]
    fn tool_unavailable_aborts_and_leaves_store_untouched() {
        let mut s = session(vec![
            stderr_output("<anon>:7:3: error: missing semicolon\n"),
            Err(InvokeError::ToolUnavailable {
                program: "rustc".to_string(),
            }),
        ]);
        let unit = UnitRef::anonymous(UnitId(1));

        s.buffer_changed(&unit, "broken").unwrap();
        let err = s.buffer_changed(&unit, "still broken").unwrap_err();
        assert!(matches!(err, LintError::ToolUnavailable { .. }));

        // "No result available" is not "zero diagnostics".
        assert_eq!(s.view(&unit).parse_errors.len(), 1);
    }

    #[test]
    fn unit_saved_skips_missing_file_without_spawning() {
        let mut s = session(vec![]);
        let unit = UnitRef::anonymous(UnitId(1));
        s.unit_saved(&unit, Path::new("/no/such/file.rs")).unwrap();
        assert!(s.runner.requests.borrow().is_empty());
    }

    #[test]
    fn standalone_file_build_uses_file_path_and_buffer_scope() {
        let temp = tempfile::tempdir().unwrap();
        let file = temp.path().join("loose.rs");
        std::fs::write(&file, "fn main() {}").unwrap();

        let mut s = session(vec![stderr_output("error: aborting due to previous error\n")]);
        let unit = UnitRef::on_disk(UnitId(1), &file);

        s.unit_saved(&unit, &file).unwrap();

        let requests = s.runner.requests.borrow();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].args[0], "--no-trans");
        assert_eq!(requests[0].args[1], file.display().to_string());
        drop(requests);

        // No project, no metadata: the bare error has no fallback filename.
        let view = s.view(&unit);
        assert_eq!(view.compile_errors.len(), 1);
        assert_eq!(view.compile_errors[0].filename, None);
    }

    const MANIFEST_JSON: &str = r#"{
        "targets": [
            { "kind": ["lib"], "name": "demo", "src_path": "/work/demo/src/lib.rs" }
        ]
    }"#;

    fn project_fixture() -> (tempfile::TempDir, PathBuf, PathBuf) {
        let temp = tempfile::tempdir().unwrap();
        let root = temp.path().join("demo");
        std::fs::create_dir_all(root.join("src")).unwrap();
        std::fs::write(root.join("Cargo.toml"), "[package]\nname = \"demo\"\n").unwrap();
        let file = root.join("src").join("lib.rs");
        std::fs::write(&file, "pub fn frob() {}").unwrap();
        (temp, root, file)
    }

    #[test]
    fn project_build_uses_metadata_argv() {
        let (_temp, root, file) = project_fixture();
        let mut s = session(vec![
            Ok(ToolOutput {
                stdout: MANIFEST_JSON.to_string(),
                stderr: String::new(),
                exit_code: Some(0),
            }),
            stderr_output("src/lib.rs:10:5: error: mismatched types\n"),
        ]);
        let unit = UnitRef::on_disk(UnitId(1), &file);

        s.unit_saved(&unit, &file).unwrap();

        let requests = s.runner.requests.borrow();
        assert_eq!(requests.len(), 2);
        assert_eq!(requests[0].args[0], "read-manifest");

        let build = &requests[1];
        assert_eq!(build.args[0], "--no-trans");
        assert_eq!(build.args[1], "--crate-type");
        assert_eq!(build.args[2], "lib");
        assert!(build.args[3].starts_with("-L"));
        assert!(build.args[3].ends_with("deps"));
        assert_eq!(build.args[4], "/work/demo/src/lib.rs");
        assert_eq!(build.cwd.as_deref(), Some(root.as_path()));
    }

    #[test]
    fn project_compile_errors_visible_from_sibling_unit() {
        let (_temp, root, file) = project_fixture();
        let sibling = root.join("src").join("other.rs");
        std::fs::write(&sibling, "").unwrap();

        let mut s = session(vec![
            Ok(ToolOutput {
                stdout: MANIFEST_JSON.to_string(),
                stderr: String::new(),
                exit_code: Some(0),
            }),
            stderr_output("src/lib.rs:10:5: error: mismatched types\nerror: aborting due to previous error\n"),
        ]);
        let unit_a = UnitRef::on_disk(UnitId(1), &file);
        let unit_b = UnitRef::on_disk(UnitId(2), &sibling);

        s.unit_saved(&unit_a, &file).unwrap();

        let view_b = s.view(&unit_b);
        assert_eq!(view_b.compile_errors.len(), 2);
        assert_eq!(
            view_b.compile_errors[0].filename.as_deref(),
            Some("src/lib.rs")
        );
        // The bare error fell back to the project's root source file.
        assert_eq!(
            view_b.compile_errors[1].filename.as_deref(),
            Some("/work/demo/src/lib.rs")
        );

        // Closing the triggering unit leaves the project entry visible.
        s.unit_closed(&unit_a);
        assert_eq!(s.view(&unit_b).compile_errors.len(), 2);
    }

    #[test]
    fn manifest_failure_degrades_to_standalone_argv_with_project_scope() {
        let (_temp, root, file) = project_fixture();
        let mut s = session(vec![
            Ok(ToolOutput {
                stdout: "not json".to_string(),
                stderr: String::new(),
                exit_code: Some(0),
            }),
            stderr_output("error: aborting due to previous error\n"),
        ]);
        let unit = UnitRef::on_disk(UnitId(1), &file);

        s.unit_saved(&unit, &file).unwrap();

        let requests = s.runner.requests.borrow();
        let build = &requests[1];
        // Standalone argv: no --crate-type, no -L, the saved file itself.
        assert_eq!(build.args, vec!["--no-trans".to_string(), file.display().to_string()]);
        drop(requests);

        // The root is still discoverable, so the scope stays project-wide.
        let sibling = UnitRef::on_disk(UnitId(2), root.join("src").join("other.rs"));
        assert_eq!(s.view(&sibling).compile_errors.len(), 1);
        // Degraded build has no metadata, so the bare error is unattributed.
        assert_eq!(s.view(&sibling).compile_errors[0].filename, None);
    }

    #[test]
    fn parse_and_compile_kinds_stay_independent() {
        let (_temp, _root, file) = project_fixture();
        let mut s = session(vec![
            stderr_output("<anon>:2:1: error: expected `;`\n"),
            Ok(ToolOutput {
                stdout: MANIFEST_JSON.to_string(),
                stderr: String::new(),
                exit_code: Some(0),
            }),
            stderr_output("src/lib.rs:9:1: error: mismatched types\n"),
        ]);
        let unit = UnitRef::on_disk(UnitId(1), &file);

        s.buffer_changed(&unit, "pub fn frob() {").unwrap();
        s.unit_saved(&unit, &file).unwrap();

        let view = s.view(&unit);
        assert_eq!(view.parse_errors.len(), 1);
        assert_eq!(view.compile_errors.len(), 1);
        assert_eq!(view.error_count(), 2);
    }

    #[test]
    fn default_config_points_at_the_toolchain() {
        let config = LintConfig::default();
        assert_eq!(config.compiler, PathBuf::from("rustc"));
        assert_eq!(config.project_tool, PathBuf::from("cargo"));
        assert!(config.timeout.is_some());
    }

    #[test]
    fn config_builders_override_tools() {
        let config = LintConfig::default()
            .with_compiler("/opt/rust/bin/rustc")
            .with_project_tool("/opt/rust/bin/cargo")
            .with_timeout(Duration::from_secs(5));
        assert_eq!(config.compiler, PathBuf::from("/opt/rust/bin/rustc"));
        assert_eq!(config.project_tool, PathBuf::from("/opt/rust/bin/cargo"));
        assert_eq!(config.timeout, Some(Duration::from_secs(5)));
    }
}
