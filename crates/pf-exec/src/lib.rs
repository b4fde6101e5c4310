pub mod scripted;
pub mod subprocess;
pub mod table;

pub use scripted::*;
pub use subprocess::*;
pub use table::*;

use std::time::Duration;

use pf_types::{ParamSet, PfResult, Table};

/// A single external-program invocation.
#[derive(Debug, Clone)]
pub struct RunRequest {
    /// Program name, resolved by the runner.
    pub executable: String,
    /// Arguments, rendered as `key=value` pairs.
    pub params: ParamSet,
    /// Text piped to the program's standard input.
    pub stdin: Option<String>,
    /// Wall-clock budget; expiry kills the process.
    pub timeout: Option<Duration>,
}

impl RunRequest {
    pub fn new(executable: impl Into<String>, params: ParamSet) -> Self {
        Self {
            executable: executable.into(),
            params,
            stdin: None,
            timeout: None,
        }
    }

    pub fn with_stdin(mut self, text: impl Into<String>) -> Self {
        self.stdin = Some(text.into());
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }
}

/// Parsed outcome of one invocation.
#[derive(Debug, Clone, PartialEq)]
pub struct RunOutput {
    pub stdout: Table,
    pub stderr: Table,
    /// Exit code when the process terminated normally. A non-zero code is
    /// not an error here; solvers report diagnostics on stderr.
    pub status: Option<i32>,
}

impl RunOutput {
    pub fn new(stdout: Table, stderr: Table) -> Self {
        Self {
            stdout,
            stderr,
            status: Some(0),
        }
    }
}

/// Capability to execute external programs and hand back their parsed
/// output tables.
///
/// The orchestration layers only depend on this trait, so deterministic
/// in-memory runners can stand in for real subprocesses.
pub trait ProcessRunner: Send + Sync {
    fn run(&self, request: &RunRequest) -> PfResult<RunOutput>;
}
