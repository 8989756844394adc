//! Out-of-process execution of toolchain commands.
//!
//! Pure process plumbing: spawn, feed stdin, wait (optionally bounded),
//! capture and decode output. No parsing happens here.
//!
//! An empty diagnostic list must mean "tool ran and found nothing" - a tool
//! that could not run at all surfaces as [`InvokeError::ToolUnavailable`],
//! never as silence.

use std::io::{self, Read, Write};
use std::path::PathBuf;
use std::process::{Command, Stdio};
use std::time::Duration;

use thiserror::Error;
use tracing::warn;
use wait_timeout::ChildExt;

// ============================================================================
// Request / Output
// ============================================================================

/// A single toolchain command to execute.
#[derive(Debug, Clone)]
pub struct ToolRequest {
    /// Program name or path, resolved against `PATH` at spawn time.
    pub program: PathBuf,
    pub args: Vec<String>,
    /// Bytes written to the child's stdin. Stdin is closed after writing;
    /// `None` attaches a null stdin.
    pub input: Option<Vec<u8>>,
    pub cwd: Option<PathBuf>,
    /// Deadline for the child; `None` waits indefinitely.
    pub timeout: Option<Duration>,
    /// Additional environment variables for the child.
    pub env: Vec<(String, String)>,
}

impl ToolRequest {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        ToolRequest {
            program: program.into(),
            args: Vec::new(),
            input: None,
            cwd: None,
            timeout: None,
            env: Vec::new(),
        }
    }

    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn with_input(mut self, input: Vec<u8>) -> Self {
        self.input = Some(input);
        self
    }

    pub fn with_cwd(mut self, cwd: impl Into<PathBuf>) -> Self {
        self.cwd = Some(cwd.into());
        self
    }

    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_env(mut self, env: Vec<(String, String)>) -> Self {
        self.env = env;
        self
    }
}

/// Captured output of a completed toolchain command.
///
/// Both streams are captured: diagnostics callers read only `stderr` (the
/// tools in question produce no usable stdout for diagnostics), while the
/// manifest reader consumes `stdout`.
#[derive(Debug, Clone)]
pub struct ToolOutput {
    pub stdout: String,
    pub stderr: String,
    /// `None` when the child was terminated by a signal.
    pub exit_code: Option<i32>,
}

impl ToolOutput {
    pub fn success(&self) -> bool {
        self.exit_code == Some(0)
    }
}

// ============================================================================
// Error Types
// ============================================================================

/// Errors from running an external tool.
#[derive(Debug, Error)]
pub enum InvokeError {
    /// The executable could not be found or spawned.
    #[error("tool unavailable: {program}")]
    ToolUnavailable { program: String },

    /// The child exceeded the requested deadline and was killed.
    #[error("tool timed out after {after:?}: {program}")]
    ToolTimeout { program: String, after: Duration },

    /// IO error while driving the child process.
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
}

/// Result type for invocation operations.
pub type InvokeResult<T> = Result<T, InvokeError>;

// ============================================================================
// Runner Seam
// ============================================================================

/// Execution backend for checks.
///
/// Production code uses [`SystemToolRunner`]; tests substitute a scripted
/// implementation so no real toolchain is spawned.
pub trait ToolRunner {
    fn run(&self, request: &ToolRequest) -> InvokeResult<ToolOutput>;
}

/// Runs requests as real child processes, blocking until exit.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemToolRunner;

impl ToolRunner for SystemToolRunner {
    fn run(&self, request: &ToolRequest) -> InvokeResult<ToolOutput> {
        let mut cmd = Command::new(&request.program);
        cmd.args(&request.args)
            .stdin(if request.input.is_some() {
                Stdio::piped()
            } else {
                Stdio::null()
            })
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());

        if let Some(cwd) = &request.cwd {
            cmd.current_dir(cwd);
        }
        for (key, value) in &request.env {
            cmd.env(key, value);
        }

        let mut child = cmd.spawn().map_err(|e| {
            if e.kind() == io::ErrorKind::NotFound {
                InvokeError::ToolUnavailable {
                    program: request.program.display().to_string(),
                }
            } else {
                InvokeError::Io(e)
            }
        })?;

        if let Some(input) = &request.input {
            if let Some(mut stdin) = child.stdin.take() {
                // A child that exits without draining stdin closes the pipe;
                // that is its answer, not our failure.
                if let Err(e) = stdin.write_all(input) {
                    if e.kind() != io::ErrorKind::BrokenPipe {
                        let _ = child.kill();
                        let _ = child.wait();
                        return Err(InvokeError::Io(e));
                    }
                }
            }
        }

        // Wait with timeout using OS-level waiting (no polling).
        let status = match request.timeout {
            Some(limit) => match child.wait_timeout(limit)? {
                Some(status) => status,
                None => {
                    let _ = child.kill();
                    let _ = child.wait(); // Reap the zombie
                    warn!(
                        "tool timed out after {:?}: {}",
                        limit,
                        request.program.display()
                    );
                    return Err(InvokeError::ToolTimeout {
                        program: request.program.display().to_string(),
                        after: limit,
                    });
                }
            },
            None => child.wait()?,
        };

        let stdout = drain_lossy(child.stdout.take());
        let stderr = drain_lossy(child.stderr.take());

        Ok(ToolOutput {
            stdout,
            stderr,
            exit_code: status.code(),
        })
    }
}

/// Read a completed child's stream to the end and decode it.
fn drain_lossy(stream: Option<impl Read>) -> String {
    let mut buf = Vec::new();
    if let Some(mut stream) = stream {
        let _ = stream.read_to_end(&mut buf);
    }
    decode_lossy(&buf)
}

/// Decode tool output as UTF-8, replacing invalid sequences rather than
/// failing.
fn decode_lossy(bytes: &[u8]) -> String {
    match std::str::from_utf8(bytes) {
        Ok(text) => text.to_string(),
        Err(_) => {
            warn!("tool output contained invalid UTF-8; decoded lossily");
            String::from_utf8_lossy(bytes).into_owned()
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
