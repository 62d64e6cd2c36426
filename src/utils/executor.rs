//! Command execution inside containers
//!
//! This module provides a trait-based abstraction over `docker exec`,
//! enabling dependency injection and mocking for tests.
//!
//! Standard output is spooled to an anonymous temporary file as it is
//! produced, so a dump is never held in memory. The file has no name on
//! disk; closing the [`CapturedOutput`] releases its storage.

use std::collections::BTreeMap;
use std::fs::File;
use std::future::Future;
use std::io::{self, Read, Seek, SeekFrom, Write};
use std::process::Stdio;
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncSeekExt, AsyncWriteExt};
use tokio::process::Command;
use tracing::debug;

#[derive(Debug, thiserror::Error)]
pub enum ExecError {
    #[error("Failed to start '{program}': {source}")]
    Spawn {
        program: String,
        #[source]
        source: io::Error,
    },

    #[error("Command timed out after {0:?}")]
    Timeout(Duration),

    #[error("Failed to capture {0} of child process")]
    MissingPipe(&'static str),

    #[error("I/O error while capturing command output: {0}")]
    Io(#[from] io::Error),
}

/// A command to run inside a container
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecCommand {
    pub container: String,
    pub executable: String,
    pub args: Vec<String>,
    /// Forwarded with `-e KEY=VALUE`; empty when nothing is forwarded
    pub env: BTreeMap<String, String>,
}

impl ExecCommand {
    pub fn new(container: impl Into<String>, executable: impl Into<String>) -> Self {
        Self {
            container: container.into(),
            executable: executable.into(),
            args: Vec::new(),
            env: BTreeMap::new(),
        }
    }

    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    pub fn env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.insert(key.into(), value.into());
        self
    }

    /// Arguments for the container runtime binary:
    /// `exec [-e KEY=VALUE ...] <container> <executable> [args...]`
    pub fn runtime_args(&self) -> Vec<String> {
        let mut args = vec!["exec".to_string()];
        for (key, value) in &self.env {
            args.push("-e".to_string());
            args.push(format!("{}={}", key, value));
        }
        args.push(self.container.clone());
        args.push(self.executable.clone());
        args.extend(self.args.iter().cloned());
        args
    }

    /// Command line safe for logs: env values are masked
    pub fn display_redacted(&self) -> String {
        let mut parts = vec!["exec".to_string()];
        for key in self.env.keys() {
            parts.push(format!("-e {}=***", key));
        }
        parts.push(self.container.clone());
        parts.push(self.executable.clone());
        parts.extend(self.args.iter().cloned());
        parts.join(" ")
    }
}

/// Captured standard output of a finished command.
///
/// Reads once from the start of the capture. Dropping it deletes the
/// backing storage.
#[derive(Debug)]
pub struct CapturedOutput {
    file: File,
}

impl CapturedOutput {
    /// Spool in-memory bytes into a fresh capture
    pub fn from_bytes(bytes: &[u8]) -> io::Result<Self> {
        let mut file = tempfile::tempfile()?;
        file.write_all(bytes)?;
        file.seek(SeekFrom::Start(0))?;
        Ok(Self { file })
    }
}

impl Read for CapturedOutput {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.file.read(buf)
    }
}

/// Outcome of a command that was started
#[derive(Debug)]
pub struct ExecResult {
    pub exit_code: i32,
    pub output: CapturedOutput,
    pub stderr: String,
}

impl ExecResult {
    pub fn is_success(&self) -> bool {
        self.exit_code == 0
    }
}

/// Abstraction for command execution, enabling mocking in tests
pub trait ProcessExecutor: Send + Sync {
    /// Run a command inside its container and capture the output.
    ///
    /// A nonzero exit is reported through [`ExecResult::exit_code`], not as
    /// an error. Errors mean the command could not be run or captured.
    fn execute(
        &self,
        command: &ExecCommand,
    ) -> impl Future<Output = Result<ExecResult, ExecError>> + Send;
}

/// Default implementation using the Docker CLI
#[derive(Debug, Clone)]
pub struct DockerExecutor {
    runtime: String,
    timeout: Option<Duration>,
}

impl DockerExecutor {
    pub fn new() -> Self {
        Self {
            runtime: "docker".to_string(),
            timeout: None,
        }
    }

    /// Use another runtime CLI with the same `exec` interface (e.g. podman)
    pub fn with_runtime(mut self, runtime: impl Into<String>) -> Self {
        self.runtime = runtime.into();
        self
    }

    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }
}

impl Default for DockerExecutor {
    fn default() -> Self {
        Self::new()
    }
}

impl ProcessExecutor for DockerExecutor {
    async fn execute(&self, command: &ExecCommand) -> Result<ExecResult, ExecError> {
        debug!("Running command: {} {}", self.runtime, command.display_redacted());

        let mut child = Command::new(&self.runtime)
            .args(command.runtime_args())
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|source| ExecError::Spawn {
                program: self.runtime.clone(),
                source,
            })?;

        let mut stdout = child.stdout.take().ok_or(ExecError::MissingPipe("stdout"))?;
        let mut stderr = child.stderr.take().ok_or(ExecError::MissingPipe("stderr"))?;
        let mut capture = tokio::fs::File::from_std(tempfile::tempfile()?);

        let run = async {
            let mut stderr_buf = Vec::new();
            let (copied, _) = tokio::try_join!(
                tokio::io::copy(&mut stdout, &mut capture),
                stderr.read_to_end(&mut stderr_buf),
            )?;
            let status = child.wait().await?;
            Ok::<_, io::Error>((copied, status, stderr_buf))
        };

        let (copied, status, stderr_buf) = match self.timeout {
            Some(limit) => tokio::time::timeout(limit, run)
                .await
                .map_err(|_| ExecError::Timeout(limit))??,
            None => run.await?,
        };

        capture.flush().await?;
        capture.seek(SeekFrom::Start(0)).await?;
        let file = capture.into_std().await;

        // Killed by a signal: no exit code
        let exit_code = status.code().unwrap_or(-1);
        debug!("Command exited with code {} ({} bytes captured)", exit_code, copied);

        Ok(ExecResult {
            exit_code,
            output: CapturedOutput { file },
            stderr: String::from_utf8_lossy(&stderr_buf).trim_end().to_string(),
        })
    }
}

/// A mock executor for testing that records calls and returns configured responses
/// Available for use in external test crates
pub mod mock {
    use super::*;
    use std::collections::{HashMap, VecDeque};
    use std::sync::{Arc, Mutex};

    /// Response configuration for mock
    #[derive(Clone, Debug)]
    pub enum MockResponse {
        Success { stdout: Vec<u8> },
        Failure { stderr: String, exit_code: i32 },
        SpawnError,
    }

    impl Default for MockResponse {
        fn default() -> Self {
            MockResponse::Success { stdout: Vec::new() }
        }
    }

    impl MockResponse {
        pub fn stdout(bytes: impl Into<Vec<u8>>) -> Self {
            MockResponse::Success { stdout: bytes.into() }
        }

        pub fn failure(exit_code: i32, stderr: &str) -> Self {
            MockResponse::Failure {
                stderr: stderr.to_string(),
                exit_code,
            }
        }
    }

    /// Mock executor for testing
    #[derive(Clone, Default)]
    pub struct MockExecutor {
        /// Recorded command invocations
        pub calls: Arc<Mutex<Vec<ExecCommand>>>,
        /// Queued responses per executable; the last one repeats
        responses: Arc<Mutex<HashMap<String, VecDeque<MockResponse>>>>,
        /// Default response when no specific response is configured
        default_response: Arc<Mutex<MockResponse>>,
    }

    impl MockExecutor {
        pub fn new() -> Self {
            Self::default()
        }

        /// Queue a response for a specific executable
        pub fn expect(self, executable: &str, response: MockResponse) -> Self {
            self.responses
                .lock()
                .unwrap()
                .entry(executable.to_string())
                .or_default()
                .push_back(response);
            self
        }

        /// Set the default response for unconfigured executables
        pub fn with_default_response(self, response: MockResponse) -> Self {
            *self.default_response.lock().unwrap() = response;
            self
        }

        /// Get all recorded calls
        pub fn get_calls(&self) -> Vec<ExecCommand> {
            self.calls.lock().unwrap().clone()
        }

        /// Check if an executable was called
        pub fn was_called(&self, executable: &str) -> bool {
            self.call_count(executable) > 0
        }

        /// Get number of calls to a specific executable
        pub fn call_count(&self, executable: &str) -> usize {
            self.calls
                .lock()
                .unwrap()
                .iter()
                .filter(|c| c.executable == executable)
                .count()
        }

        fn next_response(&self, executable: &str) -> MockResponse {
            let mut responses = self.responses.lock().unwrap();
            match responses.get_mut(executable) {
                Some(queue) if queue.len() > 1 => queue.pop_front().unwrap_or_default(),
                Some(queue) => queue.front().cloned().unwrap_or_default(),
                None => self.default_response.lock().unwrap().clone(),
            }
        }
    }

    impl ProcessExecutor for MockExecutor {
        async fn execute(&self, command: &ExecCommand) -> Result<ExecResult, ExecError> {
            self.calls.lock().unwrap().push(command.clone());

            match self.next_response(&command.executable) {
                MockResponse::Success { stdout } => Ok(ExecResult {
                    exit_code: 0,
                    output: CapturedOutput::from_bytes(&stdout)?,
                    stderr: String::new(),
                }),
                MockResponse::Failure { stderr, exit_code } => Ok(ExecResult {
                    exit_code,
                    output: CapturedOutput::from_bytes(&[])?,
                    stderr,
                }),
                MockResponse::SpawnError => Err(ExecError::Spawn {
                    program: "docker".to_string(),
                    source: io::Error::new(io::ErrorKind::NotFound, "mock spawn failure"),
                }),
            }
        }
    }
}
