//! Implementation of the `pinsh shell` command.
//!
//! Provisions the environment declared by the pin file and launches an
//! interactive shell inside it.

use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};

use pinsh_lib::launch::{exit_code, launch_shell};
use pinsh_lib::provision::{ProvisionOptions, provision};
use pinsh_lib::store::ContentStore;

use crate::output::print_info;

/// Execute the shell command.
///
/// Returns the shell's exit code once the session ends.
pub fn cmd_shell(pins: &Path) -> Result<i32> {
  let engine = Arc::new(ContentStore::new());

  let rt = tokio::runtime::Runtime::new().context("Failed to create async runtime")?;
  rt.block_on(async {
    let result = provision(pins, engine, &ProvisionOptions::default())
      .await
      .context("Provisioning failed")?;

    print_info(&format!(
      "Provisioned {} input(s), {} path entr{}",
      result.pins.len(),
      result.environment.len(),
      if result.environment.len() == 1 { "y" } else { "ies" }
    ));

    let status = launch_shell(&result.environment)
      .await
      .context("Failed to launch shell")?;

    Ok(exit_code(status))
  })
}
