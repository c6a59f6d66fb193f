use std::process::ExitStatus;

use readme::Command;
use thiserror::Error;

/// A lifecycle step that could not be run to a successful exit.
/// `step` is 1-based.
#[derive(Debug, Error)]
pub enum ExecError {
    #[error("step {step} `{command}`: failed to start: {source}")]
    Spawn {
        step: usize,
        command: Command,
        source: std::io::Error,
    },

    #[error("step {step} `{command}`: {status}")]
    Failed {
        step: usize,
        command: Command,
        status: ExitStatus,
    },
}

impl ExecError {
    pub fn step(&self) -> usize {
        match self {
            ExecError::Spawn { step, .. } | ExecError::Failed { step, .. } => *step,
        }
    }

    pub fn command(&self) -> &Command {
        match self {
            ExecError::Spawn { command, .. } | ExecError::Failed { command, .. } => command,
        }
    }
}
