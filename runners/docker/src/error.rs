use crate::shell::shell_join;
use std::fmt;
use std::io;
use std::path::PathBuf;
use std::process::ExitStatus;
use thiserror::Error;

/// A container run that finished with a non-zero (or signal) exit status.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandFailure {
    /// `None` when the process was terminated by a signal.
    pub exit_code: Option<i32>,
    pub signal: Option<i32>,
    pub docker_args: Vec<String>,
    pub command_args: Vec<String>,
}

impl CommandFailure {
    pub fn new(status: ExitStatus, docker_args: Vec<String>, command_args: Vec<String>) -> Self {
        Self {
            exit_code: status.code(),
            signal: exit_signal(&status),
            docker_args,
            command_args,
        }
    }

    /// Multi-line diagnostic text.
    pub fn render(&self) -> String {
        let mut message = String::from("Command failed.");
        match (self.exit_code, self.signal) {
            (Some(code), _) => message.push_str(&format!("\n- Return code: {}", code)),
            (None, Some(signal)) => message.push_str(&format!("\n- Terminated by signal: {}", signal)),
            (None, None) => message.push_str("\n- Return code: unknown"),
        }
        message.push_str(&format!("\n- Docker args: {}", shell_join(&self.docker_args)));
        message.push_str(&format!("\n- Command args: {}", shell_join(&self.command_args)));
        message
    }
}

impl fmt::Display for CommandFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.render())
    }
}

#[cfg(unix)]
fn exit_signal(status: &ExitStatus) -> Option<i32> {
    use std::os::unix::process::ExitStatusExt;
    status.signal()
}

#[cfg(not(unix))]
fn exit_signal(_status: &ExitStatus) -> Option<i32> {
    None
}

#[derive(Debug, Error)]
pub enum StyxDockerError {
    #[error("No container image tag specified in metadata for '{name}'")]
    MissingImageTag { name: String },
    #[error("{0}")]
    CommandFailed(CommandFailure),
    #[error("Failed to spawn container runtime '{executable}': {source}")]
    Spawn {
        executable: String,
        #[source]
        source: io::Error,
    },
    #[error(transparent)]
    Io(#[from] io::Error),
}

impl StyxDockerError {
    pub fn code(&self) -> &'static str {
        match self {
            StyxDockerError::MissingImageTag { .. } => "STYX_DOCKER_MISSING_IMAGE",
            StyxDockerError::CommandFailed(_) => "STYX_DOCKER_COMMAND_FAILED",
            StyxDockerError::Spawn { .. } => "STYX_DOCKER_RUNTIME_ERROR",
            StyxDockerError::Io(_) => "STYX_DOCKER_IO_ERROR",
        }
    }

    pub fn command_failure(&self) -> Option<&CommandFailure> {
        match self {
            StyxDockerError::CommandFailed(failure) => Some(failure),
            _ => None,
        }
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid value for {key}: {message}")]
    InvalidValue { key: String, message: String },

    #[error("Failed to read config file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Failed to parse config file {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },
}
