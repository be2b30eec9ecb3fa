//! Pin file loading and validation.
//!
//! The pin file (`pins.toml`) declares the named, version-pinned inputs of
//! one environment. It is parsed permissively into a raw form and validated
//! into strongly-typed [`InputDecl`] values at load time, so that schema
//! problems surface before any resolution is attempted.
//!
//! # Pin File Format
//!
//! ```toml
//! [[input]]
//! name = "rust"
//! locator = "nixpkgs"
//! pin = "abc123"
//! hash = "sha256-XYZ"
//! capabilities = ["toolchain"]
//! ```
//!
//! `name`, `locator`, and `pin` are required; `hash` and `capabilities` are
//! optional. Input order in the file defines resolution and composition
//! order.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use thiserror::Error;
use tracing::debug;

use super::types::{InputDecl, PinSet};

/// Errors that can occur when loading a pin file.
#[derive(Debug, Error)]
pub enum LoadError {
  /// Failed to read the pin file.
  #[error("failed to read pin file '{path}': {source}")]
  Read {
    path: PathBuf,
    #[source]
    source: io::Error,
  },

  /// Failed to parse the pin file TOML.
  #[error("failed to parse pin file: {0}")]
  Parse(#[source] Box<toml::de::Error>),

  /// An input is missing a required field.
  #[error("input '{name}' is missing required field '{field}'")]
  MissingField { name: String, field: &'static str },

  /// Two inputs share the same name.
  #[error("duplicate input '{name}'")]
  DuplicateInput { name: String },
}

/// Raw pin file as deserialized, before validation.
#[derive(Debug, Default, Deserialize)]
struct RawPinFile {
  #[serde(default, rename = "input")]
  inputs: Vec<RawInput>,
}

/// A raw input entry. Every field is optional here so that missing fields
/// can be reported per input instead of as an opaque parse error.
#[derive(Debug, Deserialize)]
struct RawInput {
  name: Option<String>,
  locator: Option<String>,
  pin: Option<String>,
  hash: Option<String>,
  #[serde(default)]
  capabilities: Vec<String>,
}

/// Load a pin set from the given file.
///
/// # Errors
///
/// Returns [`LoadError`] if the file cannot be read, is not valid TOML, an
/// input is missing a required field, or a name is declared twice. All of
/// these are reported before any resolution is attempted.
pub fn load(path: &Path) -> Result<PinSet, LoadError> {
  let content = fs::read_to_string(path).map_err(|e| LoadError::Read {
    path: path.to_path_buf(),
    source: e,
  })?;

  let pins = load_str(&content)?;
  debug!(path = %path.display(), inputs = pins.len(), "loaded pin file");
  Ok(pins)
}

/// Load a pin set from pin file content.
pub fn load_str(content: &str) -> Result<PinSet, LoadError> {
  let raw: RawPinFile = toml::from_str(content).map_err(|e| LoadError::Parse(Box::new(e)))?;

  let mut pins = PinSet::new();

  for input in raw.inputs {
    let name = required(input.name, &pins, "name")?;
    let locator = named_required(&name, input.locator, "locator")?;
    let pin = named_required(&name, input.pin, "pin")?;

    if pins.contains(&name) {
      return Err(LoadError::DuplicateInput { name });
    }

    let mut decl = InputDecl::new(locator, pin);
    if let Some(hash) = input.hash {
      decl = decl.with_hash(hash);
    }
    for capability in input.capabilities {
      decl = decl.with_capability(capability);
    }

    pins.insert(name, decl);
  }

  Ok(pins)
}

/// Validate the name field itself, reporting the position of the nameless
/// input for diagnostics.
fn required(value: Option<String>, pins: &PinSet, field: &'static str) -> Result<String, LoadError> {
  match value {
    Some(v) if !v.is_empty() => Ok(v),
    _ => Err(LoadError::MissingField {
      name: format!("#{}", pins.len() + 1),
      field,
    }),
  }
}

/// Validate a required field on a named input.
fn named_required(name: &str, value: Option<String>, field: &'static str) -> Result<String, LoadError> {
  match value {
    Some(v) if !v.is_empty() => Ok(v),
    _ => Err(LoadError::MissingField {
      name: name.to_string(),
      field,
    }),
  }
}
