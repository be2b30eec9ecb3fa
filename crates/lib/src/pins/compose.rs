//! Environment composition from resolved inputs.
//!
//! The composer folds a [`ResolvedSet`] into an [`Environment`]: the
//! ordered, de-duplicated list of paths exposed to a launched session.
//! Entries appear in pin set declaration order; a path contributed by more
//! than one input appears once, at its first position. Composition is a
//! pure transformation with no failure mode of its own — missing inputs are
//! already a resolution failure.

use std::collections::HashSet;
use std::env;
use std::ffi::{OsStr, OsString};
use std::path::PathBuf;

use serde::Serialize;
use tracing::debug;

use super::types::ResolvedSet;

/// The ordered, de-duplicated list of paths for one provisioned session.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct Environment {
  paths: Vec<PathBuf>,
}

impl Environment {
  /// Paths in composition order.
  pub fn paths(&self) -> &[PathBuf] {
    &self.paths
  }

  /// Number of entries.
  pub fn len(&self) -> usize {
    self.paths.len()
  }

  /// Whether the environment has no entries.
  pub fn is_empty(&self) -> bool {
    self.paths.is_empty()
  }

  /// Build a `PATH`-style value with this environment's entries ahead of an
  /// existing value.
  ///
  /// Entries containing the platform path separator cannot be joined and
  /// are skipped.
  pub fn path_value(&self, existing: Option<&OsStr>) -> OsString {
    let entries = self
      .paths
      .iter()
      .map(|p| p.as_os_str().to_os_string())
      .chain(existing.into_iter().flat_map(|v| env::split_paths(v).map(OsString::from)));

    match env::join_paths(entries) {
      Ok(joined) => joined,
      Err(_) => existing.map(OsStr::to_os_string).unwrap_or_default(),
    }
  }
}

/// Compose resolved inputs into an environment.
///
/// Iterates in set order (pin set declaration order), appending each path
/// not already present. De-duplication is by path equality, not by input
/// name.
pub fn compose(resolved: &ResolvedSet) -> Environment {
  let mut paths = Vec::new();
  let mut seen: HashSet<&PathBuf> = HashSet::new();

  for input in resolved.values() {
    if seen.insert(&input.path) {
      paths.push(input.path.clone());
    } else {
      debug!(name = %input.name, path = %input.path.display(), "skipping duplicate path");
    }
  }

  Environment { paths }
}
