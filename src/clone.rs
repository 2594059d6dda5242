use std::process::Command;
use thiserror::Error;
use tracing::{debug, instrument};

use crate::config::CloneConfig;

/// Default external command, resolved via PATH like any git-<subcommand>
/// helper. Overridable through config or --clone-with.
const DEFAULT_CLONE_COMMAND: &str = "git-clone-pr";

#[derive(Debug, Error)]
pub enum CloneError {
    #[error("Failed to run clone command '{command}': {source}")]
    Spawn {
        command: String,
        source: std::io::Error,
    },

    #[error("Clone command '{command}' failed ({status}): {stderr}")]
    Failed {
        command: String,
        status: std::process::ExitStatus,
        stderr: String,
    },
}

/// The external "clone pull request by URL" command.
///
/// Each invocation is independent: the caller decides whether a failure
/// stops the run (it does not — failures are reported per URL).
pub struct CloneCommand {
    program: String,
    args: Vec<String>,
}

impl CloneCommand {
    /// Build from config, with an optional CLI override taking precedence
    /// over the config file, which takes precedence over the default.
    pub fn from_config(config: &CloneConfig, override_program: Option<&str>) -> Self {
        let program = override_program
            .map(str::to_string)
            .or_else(|| config.command.clone())
            .unwrap_or_else(|| DEFAULT_CLONE_COMMAND.to_string());
        CloneCommand {
            program,
            args: config.args.clone(),
        }
    }

    pub fn program(&self) -> &str {
        &self.program
    }

    /// Invoke the clone command with the URL as the final argument and wait
    /// for it to finish.
    #[instrument(skip(self), fields(command = %self.program))]
    pub fn clone_pull_request(&self, url: &str) -> Result<(), CloneError> {
        debug!(url, "invoking clone command");
        let output = Command::new(&self.program)
            .args(&self.args)
            .arg(url)
            .output()
            .map_err(|source| CloneError::Spawn {
                command: self.program.clone(),
                source,
            })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
            return Err(CloneError::Failed {
                command: self.program.clone(),
                status: output.status,
                stderr,
            });
        }

        debug!(url, "clone command succeeded");
        Ok(())
    }
}
