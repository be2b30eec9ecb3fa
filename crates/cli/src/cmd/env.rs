//! Implementation of the `pinsh env` command.
//!
//! Provisions the environment and prints the resolved inputs and the
//! composed path list without launching anything.

use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use owo_colors::OwoColorize;
use serde::Serialize;

use pinsh_lib::provision::{ProvisionOptions, ProvisionResult, provision};
use pinsh_lib::store::ContentStore;

use crate::output::print_json;

/// JSON rendering of a provisioning result.
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct EnvReport<'a> {
  inputs: Vec<&'a pinsh_lib::pins::ResolvedInput>,
  paths: &'a pinsh_lib::pins::compose::Environment,
}

/// Execute the env command.
pub fn cmd_env(pins: &Path, json: bool) -> Result<()> {
  let engine = Arc::new(ContentStore::new());

  let rt = tokio::runtime::Runtime::new().context("Failed to create async runtime")?;
  let result: ProvisionResult = rt
    .block_on(provision(pins, engine, &ProvisionOptions::default()))
    .context("Provisioning failed")?;

  if json {
    let report = EnvReport {
      inputs: result.resolved.values().collect(),
      paths: &result.environment,
    };
    return print_json(&report);
  }

  for input in result.resolved.values() {
    let capabilities = if input.capabilities.is_empty() {
      String::new()
    } else {
      format!(
        " [{}]",
        input.capabilities.iter().cloned().collect::<Vec<_>>().join(", ")
      )
    };

    println!(
      "  {} {}{}",
      input.name.cyan(),
      input.path.display().to_string().dimmed(),
      capabilities.dimmed()
    );
  }

  println!();
  for path in result.environment.paths() {
    println!("{}", path.display());
  }

  Ok(())
}
