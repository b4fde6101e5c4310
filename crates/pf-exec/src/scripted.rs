//! Deterministic in-memory [`ProcessRunner`] for tests and dry runs.

use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;

use pf_types::{ExecError, PfResult};

use crate::table::parse_table;
use crate::{ProcessRunner, RunOutput, RunRequest};

/// What a [`ScriptedRunner`] does when a given executable name is invoked.
#[derive(Debug, Clone)]
pub enum Script {
    /// Same streams on every call.
    Fixed { stdout: String, stderr: String },
    /// One stdout text per call, consumed in order; further calls fail.
    Sequence(VecDeque<String>),
    /// Report the executable as missing.
    Missing,
}

/// Replays scripted outputs instead of spawning processes, recording every
/// request so callers can assert on how the externals were driven.
///
/// Outputs are scripted as raw text and go through the same table parsing
/// as real subprocess streams.
#[derive(Debug, Default)]
pub struct ScriptedRunner {
    inner: Mutex<Inner>,
}

#[derive(Debug, Default)]
struct Inner {
    scripts: HashMap<String, Script>,
    calls: Vec<RunRequest>,
}

impl ScriptedRunner {
    pub fn new() -> Self {
        Self::default()
    }

    /// Respond to `executable` with the same stdout text on every call.
    pub fn stub(self, executable: impl Into<String>, stdout: impl Into<String>) -> Self {
        self.stub_script(
            executable,
            Script::Fixed {
                stdout: stdout.into(),
                stderr: String::new(),
            },
        )
    }

    /// Respond with fixed stdout and stderr texts.
    pub fn stub_with_stderr(
        self,
        executable: impl Into<String>,
        stdout: impl Into<String>,
        stderr: impl Into<String>,
    ) -> Self {
        self.stub_script(
            executable,
            Script::Fixed {
                stdout: stdout.into(),
                stderr: stderr.into(),
            },
        )
    }

    /// Respond with one stdout text per call, in order.
    pub fn stub_sequence(
        self,
        executable: impl Into<String>,
        outputs: impl IntoIterator<Item = impl Into<String>>,
    ) -> Self {
        let queue = outputs.into_iter().map(Into::into).collect();
        self.stub_script(executable, Script::Sequence(queue))
    }

    /// Report the executable as missing on every call.
    pub fn stub_missing(self, executable: impl Into<String>) -> Self {
        self.stub_script(executable, Script::Missing)
    }

    pub fn stub_script(self, executable: impl Into<String>, script: Script) -> Self {
        self.lock().scripts.insert(executable.into(), script);
        self
    }

    /// Every request seen so far, in order.
    pub fn calls(&self) -> Vec<RunRequest> {
        self.lock().calls.clone()
    }

    /// Number of calls made to one executable.
    pub fn call_count(&self, executable: &str) -> usize {
        self.lock()
            .calls
            .iter()
            .filter(|c| c.executable == executable)
            .count()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl ProcessRunner for ScriptedRunner {
    fn run(&self, request: &RunRequest) -> PfResult<RunOutput> {
        let mut inner = self.lock();
        inner.calls.push(request.clone());
        let (stdout, stderr) = match inner.scripts.get_mut(&request.executable) {
            None | Some(Script::Missing) => {
                return Err(ExecError::ExecutableNotFound {
                    path: request.executable.clone(),
                }
                .into());
            }
            Some(Script::Fixed { stdout, stderr }) => (stdout.clone(), stderr.clone()),
            Some(Script::Sequence(queue)) => match queue.pop_front() {
                Some(stdout) => (stdout, String::new()),
                None => {
                    return Err(ExecError::Spawn {
                        executable: request.executable.clone(),
                        message: "scripted sequence exhausted".to_string(),
                    }
                    .into());
                }
            },
        };
        drop(inner);
        Ok(RunOutput {
            stdout: parse_table(&stdout, &request.executable)?,
            stderr: parse_table(&stderr, &request.executable)?,
            status: Some(0),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pf_types::{ParamSet, PfError};

    #[test]
    fn fixed_scripts_replay() {
        let runner = ScriptedRunner::new().stub("solve", "1.0 2.0\n3.0 4.0\n");
        let request = RunRequest::new("solve", ParamSet::new());
        let first = runner.run(&request).unwrap();
        let second = runner.run(&request).unwrap();
        assert_eq!(first, second);
        assert_eq!(first.stdout, vec![vec![1.0, 2.0], vec![3.0, 4.0]]);
        assert_eq!(runner.call_count("solve"), 2);
    }

    #[test]
    fn sequences_consume_in_order() {
        let runner = ScriptedRunner::new().stub_sequence("solve", ["1.0\n", "2.0\n"]);
        let request = RunRequest::new("solve", ParamSet::new());
        assert_eq!(runner.run(&request).unwrap().stdout, vec![vec![1.0]]);
        assert_eq!(runner.run(&request).unwrap().stdout, vec![vec![2.0]]);
        let err = runner.run(&request).unwrap_err();
        assert!(matches!(err, PfError::Exec(ExecError::Spawn { .. })));
    }

    #[test]
    fn unknown_and_missing_executables_fail() {
        let runner = ScriptedRunner::new().stub_missing("gone");
        let err = runner
            .run(&RunRequest::new("gone", ParamSet::new()))
            .unwrap_err();
        assert!(matches!(
            err,
            PfError::Exec(ExecError::ExecutableNotFound { .. })
        ));
        let err = runner
            .run(&RunRequest::new("never-stubbed", ParamSet::new()))
            .unwrap_err();
        assert!(matches!(
            err,
            PfError::Exec(ExecError::ExecutableNotFound { .. })
        ));
    }

    #[test]
    fn scripted_text_goes_through_real_parsing() {
        let runner = ScriptedRunner::new().stub("solve", "not a number\n");
        let err = runner
            .run(&RunRequest::new("solve", ParamSet::new()))
            .unwrap_err();
        assert!(matches!(err, PfError::Exec(ExecError::Parse { .. })));
    }

    #[test]
    fn requests_are_recorded_with_parameters() {
        let runner = ScriptedRunner::new().stub("solve", "1\n");
        let mut params = ParamSet::new();
        params.set("seed", 4242u64);
        runner
            .run(&RunRequest::new("solve", params).with_stdin("x"))
            .unwrap();
        let calls = runner.calls();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].stdin.as_deref(), Some("x"));
        assert_eq!(calls[0].params.to_args(), vec!["seed=4242"]);
    }
}
