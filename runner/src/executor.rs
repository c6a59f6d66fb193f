use std::path::{Path, PathBuf};
use std::process;

use readme::{Command, Lifecycle};
use tracing::{debug, info};

use crate::error::ExecError;

/// Runs lifecycle commands one at a time in a fixed working directory.
/// Child processes inherit stdin, stdout and stderr.
#[derive(Debug, Clone)]
pub struct Executor {
    working_dir: PathBuf,
}

impl Executor {
    pub fn new(working_dir: impl Into<PathBuf>) -> Self {
        Executor {
            working_dir: working_dir.into(),
        }
    }

    pub fn working_dir(&self) -> &Path {
        &self.working_dir
    }

    /// Execute every command in order. Stops at the first command that
    /// fails to start or exits unsuccessfully; earlier steps are not undone.
    pub fn run(&self, lifecycle: &Lifecycle) -> Result<(), ExecError> {
        let total = lifecycle.len();
        for (index, command) in lifecycle.iter().enumerate() {
            self.run_step(index + 1, total, command)?;
        }
        Ok(())
    }

    fn run_step(&self, step: usize, total: usize, command: &Command) -> Result<(), ExecError> {
        info!(step, total, command = %command, "running");
        debug!(working_dir = ?self.working_dir, "spawning process");

        let status = process::Command::new(command.name())
            .args(command.args())
            .current_dir(&self.working_dir)
            .status()
            .map_err(|source| ExecError::Spawn {
                step,
                command: command.clone(),
                source,
            })?;

        if !status.success() {
            return Err(ExecError::Failed {
                step,
                command: command.clone(),
                status,
            });
        }

        debug!(step, "finished");
        Ok(())
    }
}

/// Execute `lifecycle` with `working_dir` as every command's working directory.
pub fn execute_lifecycle(lifecycle: &Lifecycle, working_dir: &Path) -> Result<(), ExecError> {
    Executor::new(working_dir).run(lifecycle)
}

/// `lifecycle.execute(dir)` for anything that can be run as a lifecycle.
pub trait Execute {
    fn execute(&self, working_dir: &Path) -> Result<(), ExecError>;
}

impl Execute for Lifecycle {
    fn execute(&self, working_dir: &Path) -> Result<(), ExecError> {
        execute_lifecycle(self, working_dir)
    }
}
