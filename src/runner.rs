/*! Executing [`CommandLine`]s

[`CommandRunner`] is the seam between disk image operations and the processes they spawn. The
default [`ShellRunner`] hands the formatted line to `/bin/sh -c` and waits for it to exit.
*/
use std::{path::PathBuf, process::Stdio};

use tokio::{io::AsyncWriteExt, process::Command};

use crate::command::CommandLine;

/// `hdiutil` reports this when an image must be attached (or detached) for the command to run
pub const RESOURCE_UNAVAILABLE: &str = "Resource temporarily unavailable";

/// Default shell used by [`ShellRunner`]
pub const DEFAULT_SHELL: &str = "/bin/sh";

/// Captured output of a successful command
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct CommandResult {
    pub stdout: Vec<u8>,
    pub exit_status: Option<i32>,
}

impl CommandResult {
    pub fn new(stdout: impl Into<Vec<u8>>) -> Self {
        Self {
            stdout: stdout.into(),
            exit_status: Some(0),
        }
    }

    pub fn stdout_lossy(&self) -> String {
        String::from_utf8_lossy(&self.stdout).into_owned()
    }
}

#[non_exhaustive]
#[derive(thiserror::Error, Debug, strum::IntoStaticStr)]
pub enum CommandError {
    /// The command ran and either exited unsuccessfully or wrote to stderr
    #[error("Command `{command}` failed{}, stderr:\n{stderr}", code.map(|code| format!(" with status {code}")).unwrap_or_default())]
    Failed {
        command: String,
        code: Option<i32>,
        stderr: String,
    },
    /// The shell could not be spawned or waited on
    #[error("Failed to execute command `{command}`")]
    Spawn {
        command: String,
        #[source]
        source: std::io::Error,
    },
}

impl CommandError {
    pub fn failed(command: &CommandLine, code: Option<i32>, stderr: impl Into<String>) -> Self {
        Self::Failed {
            command: command.to_string(),
            code,
            stderr: stderr.into(),
        }
    }

    /// Raw stderr text of a failed command
    pub fn stderr(&self) -> Option<&str> {
        match self {
            Self::Failed { stderr, .. } => Some(stderr),
            Self::Spawn { .. } => None,
        }
    }

    /// If the failure may clear after attaching or detaching the image
    pub fn is_resource_unavailable(&self) -> bool {
        self.stderr()
            .map(|stderr| stderr.contains(RESOURCE_UNAVAILABLE))
            .unwrap_or(false)
    }
}

#[async_trait::async_trait]
pub trait CommandRunner: Send + Sync + std::fmt::Debug {
    /// Run `command` to completion, writing `stdin` to it if given
    async fn run(
        &self,
        command: &CommandLine,
        stdin: Option<&[u8]>,
    ) -> Result<CommandResult, CommandError>;
}

#[derive(Debug, Clone)]
pub struct ShellRunner {
    shell: PathBuf,
}

impl ShellRunner {
    pub fn new(shell: impl Into<PathBuf>) -> Self {
        Self {
            shell: shell.into(),
        }
    }
}

impl Default for ShellRunner {
    fn default() -> Self {
        Self::new(DEFAULT_SHELL)
    }
}

#[async_trait::async_trait]
impl CommandRunner for ShellRunner {
    #[tracing::instrument(level = "debug", skip_all, fields(command = %command))]
    async fn run(
        &self,
        command: &CommandLine,
        stdin: Option<&[u8]>,
    ) -> Result<CommandResult, CommandError> {
        let command_str = command.to_string();
        tracing::trace!("Executing");

        let spawn_error = |source| CommandError::Spawn {
            command: command_str.clone(),
            source,
        };

        let mut child = Command::new(&self.shell)
            .process_group(0)
            .arg("-c")
            .arg(&command_str)
            .stdin(if stdin.is_some() {
                Stdio::piped()
            } else {
                Stdio::null()
            })
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(spawn_error)?;

        if let (Some(input), Some(mut handle)) = (stdin, child.stdin.take()) {
            handle.write_all(input).await.map_err(spawn_error)?;
            handle.shutdown().await.map_err(spawn_error)?;
        }

        let output = child.wait_with_output().await.map_err(spawn_error)?;
        let stderr = String::from_utf8_lossy(&output.stderr).into_owned();

        if !output.status.success() || !stderr.trim().is_empty() {
            tracing::trace!(status = ?output.status.code(), "Command failed");
            return Err(CommandError::failed(command, output.status.code(), stderr));
        }

        Ok(CommandResult {
            stdout: output.stdout,
            exit_status: output.status.code(),
        })
    }
}

#[cfg(test)]
pub(crate) mod scripted {
    use std::{collections::VecDeque, sync::Mutex};

    use super::*;

    /// Replays canned results in order, recording every command line it is handed
    #[derive(Debug, Default)]
    pub(crate) struct ScriptedRunner {
        responses: Mutex<VecDeque<Result<CommandResult, String>>>,
        calls: Mutex<Vec<(String, Option<Vec<u8>>)>>,
    }

    impl ScriptedRunner {
        pub(crate) fn new() -> Self {
            Self::default()
        }

        pub(crate) fn ok(self, stdout: impl Into<Vec<u8>>) -> Self {
            self.responses
                .lock()
                .unwrap()
                .push_back(Ok(CommandResult::new(stdout)));
            self
        }

        pub(crate) fn fail(self, stderr: impl Into<String>) -> Self {
            self.responses
                .lock()
                .unwrap()
                .push_back(Err(stderr.into()));
            self
        }

        pub(crate) fn calls(&self) -> Vec<String> {
            self.calls
                .lock()
                .unwrap()
                .iter()
                .map(|(line, _)| line.clone())
                .collect()
        }

        pub(crate) fn stdin_of(&self, index: usize) -> Option<Vec<u8>> {
            self.calls.lock().unwrap()[index].1.clone()
        }

        pub(crate) fn remaining(&self) -> usize {
            self.responses.lock().unwrap().len()
        }
    }

    #[async_trait::async_trait]
    impl CommandRunner for ScriptedRunner {
        async fn run(
            &self,
            command: &CommandLine,
            stdin: Option<&[u8]>,
        ) -> Result<CommandResult, CommandError> {
            self.calls
                .lock()
                .unwrap()
                .push((command.to_string(), stdin.map(<[u8]>::to_vec)));
            match self.responses.lock().unwrap().pop_front() {
                Some(Ok(result)) => Ok(result),
                Some(Err(stderr)) => Err(CommandError::failed(command, Some(1), stderr)),
                None => panic!("Unexpected command `{command}`"),
            }
        }
    }
}
