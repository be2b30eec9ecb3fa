//! Provisioning orchestration.
//!
//! This module provides the high-level [`provision`] function that runs the
//! full pipeline for one environment:
//!
//! 1. Load the pin file into a [`PinSet`]
//! 2. Resolve every input through the resolution engine
//! 3. Compose the resolved inputs into an [`Environment`]
//!
//! Launching a session inside the environment is a separate step (see
//! [`crate::launch`]), so callers can inspect the result first.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use thiserror::Error;
use tracing::info;

use crate::pins::compose::{Environment, compose};
use crate::pins::load::{LoadError, load};
use crate::pins::resolve::{ResolutionEngine, ResolveError, ResolveOptions, resolve_pins};
use crate::pins::{PinSet, ResolvedSet};

/// Result of a provisioning run.
#[derive(Debug)]
pub struct ProvisionResult {
  /// The loaded pin set.
  pub pins: PinSet,

  /// Resolved inputs, in pin set order.
  pub resolved: ResolvedSet,

  /// The composed environment.
  pub environment: Environment,
}

/// Errors that can occur during provisioning.
#[derive(Debug, Error)]
pub enum ProvisionError {
  /// Pin file not found.
  #[error("pin file not found: {0}")]
  PinsNotFound(PathBuf),

  /// Pin file could not be loaded.
  #[error(transparent)]
  Load(#[from] LoadError),

  /// An input could not be resolved.
  #[error(transparent)]
  Resolve(#[from] ResolveError),
}

/// Options for a provisioning run.
#[derive(Debug, Clone, Default)]
pub struct ProvisionOptions {
  /// Resolution options (parallelism).
  pub resolve: ResolveOptions,
}

/// Provision an environment from a pin file.
///
/// # Errors
///
/// Returns [`ProvisionError`] if the pin file is missing or malformed, or
/// if any input fails to resolve. A failed run never yields a partial
/// environment.
pub async fn provision(
  pins_path: &Path,
  engine: Arc<dyn ResolutionEngine>,
  options: &ProvisionOptions,
) -> Result<ProvisionResult, ProvisionError> {
  if !pins_path.exists() {
    return Err(ProvisionError::PinsNotFound(pins_path.to_path_buf()));
  }

  info!(pins = %pins_path.display(), "provisioning environment");

  let pins = load(pins_path)?;
  let resolved = resolve_pins(engine, &pins, &options.resolve).await?;
  let environment = compose(&resolved);

  info!(inputs = pins.len(), entries = environment.len(), "environment ready");

  Ok(ProvisionResult {
    pins,
    resolved,
    environment,
  })
}
