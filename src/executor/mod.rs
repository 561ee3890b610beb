//! Command Execution
//!
//! The narrow "run and capture" contract every vendor utility adapter goes
//! through. Production code uses [`HostExecutor`]; tests swap in
//! [`FakeExecutor`] with canned output.
//!
//! Every invocation honours a [`CancellationToken`]: a cancelled or timed
//! out child process is killed and none of its output is returned.

mod fake;

pub use fake::FakeExecutor;

use std::collections::BTreeMap;
use std::process::Stdio;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tokio_util::sync::CancellationToken;
use tracing::{debug, trace};

use crate::error::{Error, Result};

// =============================================================================
// Command Types
// =============================================================================

/// A utility invocation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandSpec {
    pub program: String,
    pub args: Vec<String>,
    pub env: BTreeMap<String, String>,
    pub stdin: Option<Vec<u8>>,
}

impl CommandSpec {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            ..Default::default()
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

    pub fn stdin(mut self, input: impl Into<Vec<u8>>) -> Self {
        self.stdin = Some(input.into());
        self
    }
}

impl std::fmt::Display for CommandSpec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.program)?;
        for arg in &self.args {
            write!(f, " {}", arg)?;
        }
        Ok(())
    }
}

/// Captured result of a completed invocation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Output {
    pub stdout: Vec<u8>,
    pub stderr: Vec<u8>,
    pub exit_code: i32,
}

impl Output {
    /// Successful output with the given stdout.
    pub fn success(stdout: impl Into<Vec<u8>>) -> Self {
        Self {
            stdout: stdout.into(),
            ..Default::default()
        }
    }

    /// Failed output with the given exit code and stderr.
    pub fn failure(exit_code: i32, stderr: impl Into<Vec<u8>>) -> Self {
        Self {
            exit_code,
            stderr: stderr.into(),
            ..Default::default()
        }
    }

    pub fn stdout_str(&self) -> String {
        String::from_utf8_lossy(&self.stdout).into_owned()
    }

    pub fn stderr_str(&self) -> String {
        String::from_utf8_lossy(&self.stderr).into_owned()
    }

    /// Turn a non-zero exit into [`Error::CommandFailed`].
    pub fn check(self, command: &CommandSpec) -> Result<Self> {
        if self.exit_code == 0 {
            return Ok(self);
        }
        Err(Error::CommandFailed {
            command: command.to_string(),
            exit_code: self.exit_code,
            stderr: self.stderr_str().trim().to_string(),
        })
    }
}

// =============================================================================
// Executor Port
// =============================================================================

/// Shared handle to an executor.
pub type BoxedExecutor = Arc<dyn Executor>;

/// Runs a utility and captures its output.
///
/// Implementations return [`Error::ExecutableNotFound`] for a missing
/// binary, [`Error::CommandFailed`] for a non-zero exit and
/// [`Error::Cancelled`] when the token fires before the process exits.
#[async_trait]
pub trait Executor: Send + Sync {
    async fn exec(&self, cancel: &CancellationToken, command: &CommandSpec) -> Result<Output>;
}

// =============================================================================
// Host Executor
// =============================================================================

/// Executes utilities on the local host.
#[derive(Debug, Clone)]
pub struct HostExecutor {
    timeout: Duration,
    trace_output: bool,
}

impl Default for HostExecutor {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(300),
            trace_output: false,
        }
    }
}

impl HostExecutor {
    pub fn new(timeout: Duration) -> Self {
        Self {
            timeout,
            ..Default::default()
        }
    }

    /// Log stdout/stderr of every command at trace level.
    pub fn with_trace_output(mut self, enabled: bool) -> Self {
        self.trace_output = enabled;
        self
    }

    pub fn into_boxed(self) -> BoxedExecutor {
        Arc::new(self)
    }
}

#[async_trait]
impl Executor for HostExecutor {
    async fn exec(&self, cancel: &CancellationToken, command: &CommandSpec) -> Result<Output> {
        if cancel.is_cancelled() {
            return Err(Error::Cancelled);
        }

        debug!(command = %command, "running command");

        let mut cmd = Command::new(&command.program);
        cmd.args(&command.args)
            .envs(&command.env)
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .stdin(if command.stdin.is_some() {
                Stdio::piped()
            } else {
                Stdio::null()
            })
            .kill_on_drop(true);

        let mut child = cmd.spawn().map_err(|e| match e.kind() {
            std::io::ErrorKind::NotFound => Error::ExecutableNotFound {
                program: command.program.clone(),
            },
            _ => Error::Io(e),
        })?;

        // Feeding stdin runs alongside the wait so a child that never reads
        // cannot stall the pass outside the timeout and cancellation.
        let feed = child.stdin.take().zip(command.stdin.clone());
        let run = async move {
            let write = async move {
                if let Some((mut stdin, input)) = feed {
                    match stdin.write_all(&input).await {
                        // The child exited without reading all of it
                        Err(e) if e.kind() == std::io::ErrorKind::BrokenPipe => {}
                        other => other?,
                    }
                }
                Ok::<_, std::io::Error>(())
            };
            let (written, output) = tokio::join!(write, child.wait_with_output());
            written?;
            output
        };

        // Dropping `run` drops the child, which kills it.
        let output = tokio::select! {
            _ = cancel.cancelled() => return Err(Error::Cancelled),
            result = tokio::time::timeout(self.timeout, run) => match result {
                Ok(output) => output?,
                Err(_) => {
                    return Err(Error::CommandTimeout {
                        command: command.to_string(),
                        seconds: self.timeout.as_secs(),
                    })
                }
            },
        };

        let output = Output {
            stdout: output.stdout,
            stderr: output.stderr,
            exit_code: output.status.code().unwrap_or(-1),
        };

        debug!(command = %command, exit_code = output.exit_code, "command finished");
        if self.trace_output {
            trace!(command = %command, stdout = %output.stdout_str(), stderr = %output.stderr_str(), "command output");
        }

        output.check(command)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    #[test]
    fn test_command_spec_display() {
        let cmd = CommandSpec::new("smartctl").args(["--scan", "-j"]);
        assert_eq!(cmd.to_string(), "smartctl --scan -j");
    }

    #[test]
    fn test_output_check() {
        let cmd = CommandSpec::new("mlxup").arg("--query");

        assert!(Output::success("ok").check(&cmd).is_ok());

        let err = Output::failure(2, "no devices\n").check(&cmd).unwrap_err();
        assert_matches!(
            err,
            Error::CommandFailed { ref command, exit_code: 2, ref stderr }
                if command == "mlxup --query" && stderr == "no devices"
        );
    }

    #[tokio::test]
    async fn test_host_executor_missing_binary() {
        let executor = HostExecutor::default();
        let cmd = CommandSpec::new("definitely-not-a-real-utility-4242");

        let err = executor
            .exec(&CancellationToken::new(), &cmd)
            .await
            .unwrap_err();
        assert_matches!(err, Error::ExecutableNotFound { .. });
    }

    #[tokio::test]
    async fn test_host_executor_respects_prior_cancellation() {
        let executor = HostExecutor::default();
        let cancel = CancellationToken::new();
        cancel.cancel();

        let err = executor
            .exec(&cancel, &CommandSpec::new("true"))
            .await
            .unwrap_err();
        assert_matches!(err, Error::Cancelled);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_host_executor_captures_output() {
        let executor = HostExecutor::default();
        let cmd = CommandSpec::new("sh").args(["-c", "echo hello"]);

        let output = executor.exec(&CancellationToken::new(), &cmd).await.unwrap();
        assert_eq!(output.stdout_str().trim(), "hello");
        assert_eq!(output.exit_code, 0);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_host_executor_feeds_stdin() {
        let executor = HostExecutor::default();
        let cmd = CommandSpec::new("cat").stdin("raw fru bytes");

        let output = executor.exec(&CancellationToken::new(), &cmd).await.unwrap();
        assert_eq!(output.stdout_str(), "raw fru bytes");
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_host_executor_times_out() {
        let executor = HostExecutor::new(Duration::from_millis(100));
        let cmd = CommandSpec::new("sleep").arg("30");

        let err = executor.exec(&CancellationToken::new(), &cmd).await.unwrap_err();
        assert_matches!(
            err,
            Error::CommandTimeout { ref command, seconds: 0 } if command == "sleep 30"
        );
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_host_executor_times_out_on_unread_stdin() {
        let executor = HostExecutor::new(Duration::from_millis(200));
        // Far beyond a pipe buffer, and the child never reads it
        let cmd = CommandSpec::new("sleep").arg("30").stdin(vec![b'x'; 4 << 20]);

        let err = tokio::time::timeout(
            Duration::from_secs(10),
            executor.exec(&CancellationToken::new(), &cmd),
        )
        .await
        .expect("exec must return on its own timeout")
        .unwrap_err();
        assert_matches!(err, Error::CommandTimeout { .. });
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_host_executor_cancel_interrupts_stdin_feed() {
        let executor = HostExecutor::default();
        let cancel = CancellationToken::new();
        let cmd = CommandSpec::new("sleep").arg("30").stdin(vec![b'x'; 4 << 20]);

        let trigger = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(50)).await;
            trigger.cancel();
        });

        let err = tokio::time::timeout(Duration::from_secs(10), executor.exec(&cancel, &cmd))
            .await
            .expect("exec must return once cancelled")
            .unwrap_err();
        assert_matches!(err, Error::Cancelled);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_host_executor_kills_on_cancel() {
        let executor = HostExecutor::default();
        let cancel = CancellationToken::new();
        let cmd = CommandSpec::new("sleep").arg("30");

        let trigger = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(50)).await;
            trigger.cancel();
        });

        let err = executor.exec(&cancel, &cmd).await.unwrap_err();
        assert_matches!(err, Error::Cancelled);
    }
}
