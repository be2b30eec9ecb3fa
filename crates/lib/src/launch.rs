//! Launching commands and shells inside a provisioned environment.
//!
//! The environment is applied to the child process only: `PATH` is rebuilt
//! with the environment's entries ahead of the parent's value, and nothing
//! in the parent process is modified. Whatever the session changes dies
//! with it, so the parent's state is restored on every exit path.
//!
//! Stdio is inherited, making `launch_shell` a usable interactive session.
//! The child's exit status is passed through unmodified.

use std::io;
use std::process::ExitStatus;

use thiserror::Error;
use tokio::process::Command;
use tracing::{debug, info};

use crate::pins::compose::Environment;

/// Errors that can occur when launching a session.
#[derive(Debug, Error)]
pub enum LaunchError {
  /// The command could not be spawned.
  #[error("failed to launch '{program}': {source}")]
  Spawn {
    program: String,
    #[source]
    source: io::Error,
  },
}

/// Run a command inside the environment and wait for it to finish.
///
/// Returns the child's exit status; interpreting it is up to the caller so
/// that exit codes pass through unmodified.
pub async fn launch_command(env: &Environment, program: &str, args: &[String]) -> Result<ExitStatus, LaunchError> {
  info!(program, entries = env.len(), "launching command");

  let path_value = env.path_value(std::env::var_os("PATH").as_deref());
  debug!(path = %path_value.to_string_lossy(), "session PATH");

  let mut command = Command::new(program);
  command.args(args).env("PATH", path_value);

  let status = command
    .status()
    .await
    .map_err(|e| LaunchError::Spawn {
      program: program.to_string(),
      source: e,
    })?;

  debug!(code = ?status.code(), "command finished");
  Ok(status)
}

/// Launch an interactive shell inside the environment.
pub async fn launch_shell(env: &Environment) -> Result<ExitStatus, LaunchError> {
  let shell = default_shell();
  launch_command(env, &shell, &[]).await
}

/// Exit code for a finished child, with signal termination mapped to a
/// non-zero code.
pub fn exit_code(status: ExitStatus) -> i32 {
  status.code().unwrap_or(1)
}

/// The user's interactive shell.
#[cfg(unix)]
fn default_shell() -> String {
  std::env::var("SHELL").unwrap_or_else(|_| "/bin/sh".to_string())
}

/// The user's interactive shell.
#[cfg(windows)]
fn default_shell() -> String {
  std::env::var("COMSPEC").unwrap_or_else(|_| "powershell.exe".to_string())
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::pins::ResolvedInput;
  use crate::pins::compose::compose;
  use std::collections::BTreeSet;
  use std::path::PathBuf;

  fn env_with_paths(paths: &[&str]) -> Environment {
    let mut set = crate::pins::ResolvedSet::new();
    for (i, path) in paths.iter().enumerate() {
      let name = format!("input{}", i);
      set.insert(
        name.clone(),
        ResolvedInput {
          name,
          path: PathBuf::from(path),
          capabilities: BTreeSet::new(),
        },
      );
    }
    compose(&set)
  }

  #[tokio::test]
  #[cfg(unix)]
  async fn successful_command_exits_zero() {
    let status = launch_command(&Environment::default(), "sh", &["-c".to_string(), "exit 0".to_string()])
      .await
      .unwrap();

    assert!(status.success());
    assert_eq!(exit_code(status), 0);
  }

  #[tokio::test]
  #[cfg(unix)]
  async fn child_exit_code_passes_through() {
    let status = launch_command(&Environment::default(), "sh", &["-c".to_string(), "exit 7".to_string()])
      .await
      .unwrap();

    assert_eq!(exit_code(status), 7);
  }

  #[tokio::test]
  #[cfg(unix)]
  async fn environment_paths_lead_the_session_path() {
    let env = env_with_paths(&["/provisioned/rust"]);

    // The child sees the provisioned entry at the front of PATH.
    let script = r#"case "$PATH" in /provisioned/rust:*) exit 0;; *) exit 3;; esac"#;
    let status = launch_command(&env, "sh", &["-c".to_string(), script.to_string()])
      .await
      .unwrap();

    assert_eq!(exit_code(status), 0);
  }

  #[tokio::test]
  async fn missing_program_is_a_spawn_error() {
    let result = launch_command(&Environment::default(), "pinsh-test-does-not-exist", &[]).await;

    assert!(matches!(result, Err(LaunchError::Spawn { .. })));
  }
}
