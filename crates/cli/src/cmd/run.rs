//! Implementation of the `pinsh run` command.
//!
//! Provisions the environment declared by the pin file and runs the given
//! command inside it, passing the command's exit code through.

use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::info;

use pinsh_lib::launch::{exit_code, launch_command};
use pinsh_lib::provision::{ProvisionOptions, provision};
use pinsh_lib::store::ContentStore;

/// Execute the run command.
///
/// Returns the launched command's exit code. Provisioning failures are
/// returned as errors so the caller can map them onto the reserved exit
/// code.
pub fn cmd_run(pins: &Path, command: &[String]) -> Result<i32> {
  let (program, args) = command.split_first().context("No command given")?;

  let engine = Arc::new(ContentStore::new());

  let rt = tokio::runtime::Runtime::new().context("Failed to create async runtime")?;
  rt.block_on(async {
    let result = provision(pins, engine, &ProvisionOptions::default())
      .await
      .context("Provisioning failed")?;

    info!(
      inputs = result.pins.len(),
      entries = result.environment.len(),
      "environment provisioned"
    );

    let status = launch_command(&result.environment, program, args)
      .await
      .context("Failed to launch command")?;

    Ok(exit_code(status))
  })
}
