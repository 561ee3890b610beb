//! Fake executor returning canned output, for tests and dry runs.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use super::{BoxedExecutor, CommandSpec, Executor, Output};
use crate::error::{Error, Result};

/// An executor which responds to known command lines with canned output.
///
/// Responses are keyed by the full command line (`program arg1 arg2`), with a
/// per-program fallback. Unknown programs behave like a missing binary.
#[derive(Debug, Default)]
pub struct FakeExecutor {
    by_command: Mutex<HashMap<String, Output>>,
    by_program: Mutex<HashMap<String, Output>>,
    invocations: Mutex<Vec<CommandSpec>>,
}

impl FakeExecutor {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Respond to an exact command line.
    pub fn on_command(&self, command_line: &str, output: Output) -> &Self {
        self.by_command
            .lock()
            .insert(command_line.to_string(), output);
        self
    }

    /// Respond to any invocation of `program` without an exact match.
    pub fn on_program(&self, program: &str, output: Output) -> &Self {
        self.by_program.lock().insert(program.to_string(), output);
        self
    }

    /// Every command executed so far, in order.
    pub fn invocations(&self) -> Vec<CommandSpec> {
        self.invocations.lock().clone()
    }

    /// Command lines executed so far, in order.
    pub fn command_lines(&self) -> Vec<String> {
        self.invocations
            .lock()
            .iter()
            .map(ToString::to_string)
            .collect()
    }

    pub fn as_executor(self: Arc<Self>) -> BoxedExecutor {
        self
    }
}

#[async_trait]
impl Executor for FakeExecutor {
    async fn exec(&self, cancel: &CancellationToken, command: &CommandSpec) -> Result<Output> {
        if cancel.is_cancelled() {
            return Err(Error::Cancelled);
        }

        self.invocations.lock().push(command.clone());
        let line = command.to_string();
        debug!(command = %line, "fake executor invoked");

        let output = self
            .by_command
            .lock()
            .get(&line)
            .cloned()
            .or_else(|| self.by_program.lock().get(&command.program).cloned());

        match output {
            Some(output) => output.check(command),
            None => Err(Error::ExecutableNotFound {
                program: command.program.clone(),
            }),
        }
    }
}
