//! Subprocess-backed [`ProcessRunner`].

use std::io::{Read, Write};
use std::path::{Path, PathBuf};
use std::process::{Child, Command, ExitStatus, Stdio};
use std::thread;
use std::time::{Duration, Instant};

use tracing::debug;

use pf_types::{ExecError, PfError, PfResult};

use crate::table::parse_table;
use crate::{ProcessRunner, RunOutput, RunRequest};

/// Poll interval while waiting on a time-limited child.
const WAIT_POLL: Duration = Duration::from_millis(10);

/// Runs executables out of a fixed binary directory.
#[derive(Debug, Clone)]
pub struct SubprocessRunner {
    bin_dir: PathBuf,
}

impl SubprocessRunner {
    pub fn new<P: AsRef<Path>>(bin_dir: P) -> Self {
        Self {
            bin_dir: bin_dir.as_ref().to_path_buf(),
        }
    }

    pub fn bin_dir(&self) -> &Path {
        &self.bin_dir
    }

    fn resolve(&self, executable: &str) -> PfResult<PathBuf> {
        let path = self.bin_dir.join(executable);
        if !path.is_file() {
            return Err(ExecError::ExecutableNotFound {
                path: path.display().to_string(),
            }
            .into());
        }
        Ok(path)
    }
}

impl ProcessRunner for SubprocessRunner {
    fn run(&self, request: &RunRequest) -> PfResult<RunOutput> {
        let path = self.resolve(&request.executable)?;
        let args = request.params.to_args();
        debug!(executable = %request.executable, args = args.len(), "spawning");

        let mut child = Command::new(&path)
            .args(&args)
            .stdin(if request.stdin.is_some() {
                Stdio::piped()
            } else {
                Stdio::null()
            })
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| spawn_error(&request.executable, &path, e))?;

        // Both pipes drain on their own threads so a chatty child cannot
        // fill one and deadlock against our stdin write or wait. On kill
        // paths the threads are dropped rather than joined: the kill only
        // reaches the direct child, and a grandchild still holding the pipe
        // write ends would block the join past any deadline.
        let stdout_reader = spawn_reader(child.stdout.take());
        let stderr_reader = spawn_reader(child.stderr.take());

        if let Some(text) = &request.stdin {
            if let Err(error) = feed_stdin(&mut child, &request.executable, text) {
                let _ = child.kill();
                let _ = child.wait();
                return Err(error);
            }
        }

        let status = match request.timeout {
            None => child.wait()?,
            Some(limit) => match wait_with_limit(&mut child, limit)? {
                Some(status) => status,
                None => {
                    let _ = child.kill();
                    let _ = child.wait();
                    return Err(ExecError::Timeout {
                        executable: request.executable.clone(),
                        timeout_secs: limit.as_secs(),
                    }
                    .into());
                }
            },
        };

        let stdout_text = join_reader(stdout_reader)?;
        let stderr_text = join_reader(stderr_reader)?;

        Ok(RunOutput {
            stdout: parse_table(&stdout_text, &request.executable)?,
            stderr: parse_table(&stderr_text, &request.executable)?,
            status: status.code(),
        })
    }
}

fn spawn_error(executable: &str, path: &Path, error: std::io::Error) -> PfError {
    if error.kind() == std::io::ErrorKind::NotFound {
        ExecError::ExecutableNotFound {
            path: path.display().to_string(),
        }
        .into()
    } else {
        ExecError::Spawn {
            executable: executable.to_string(),
            message: error.to_string(),
        }
        .into()
    }
}

fn spawn_reader<R: Read + Send + 'static>(
    pipe: Option<R>,
) -> thread::JoinHandle<std::io::Result<String>> {
    thread::spawn(move || {
        let mut text = String::new();
        if let Some(mut pipe) = pipe {
            pipe.read_to_string(&mut text)?;
        }
        Ok(text)
    })
}

fn join_reader(handle: thread::JoinHandle<std::io::Result<String>>) -> PfResult<String> {
    match handle.join() {
        Ok(result) => Ok(result?),
        Err(_) => Err(PfError::Internal(
            "output reader thread panicked".to_string(),
        )),
    }
}

fn feed_stdin(child: &mut Child, executable: &str, text: &str) -> PfResult<()> {
    let mut stdin = match child.stdin.take() {
        Some(stdin) => stdin,
        None => {
            return Err(PfError::Internal(format!(
                "stdin pipe missing for {executable}"
            )));
        }
    };
    match stdin.write_all(text.as_bytes()) {
        Ok(()) => Ok(()),
        // A child that exits without reading all of its input is fine; its
        // exit status and streams still get collected.
        Err(e) if e.kind() == std::io::ErrorKind::BrokenPipe => Ok(()),
        Err(e) => Err(ExecError::Stdin {
            executable: executable.to_string(),
            message: e.to_string(),
        }
        .into()),
    }
}

fn wait_with_limit(child: &mut Child, limit: Duration) -> PfResult<Option<ExitStatus>> {
    let deadline = Instant::now() + limit;
    loop {
        if let Some(status) = child.try_wait()? {
            return Ok(Some(status));
        }
        if Instant::now() >= deadline {
            return Ok(None);
        }
        thread::sleep(WAIT_POLL);
    }
}
