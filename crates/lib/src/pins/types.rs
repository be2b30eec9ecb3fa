//! Input types for declaration and resolution.
//!
//! This module defines the types used throughout the provisioning process:
//! - [`InputDecl`] - A validated input declaration from the pin file
//! - [`PinSet`] - The ordered collection of declarations for one run
//! - [`ResolvedInput`] - A fully resolved input with store path and
//!   capabilities

use std::collections::BTreeSet;
use std::path::PathBuf;

use indexmap::IndexMap;
use serde::Serialize;

/// A validated input declaration (before resolution).
///
/// Declarations are immutable once loaded. The input's name lives in the
/// owning [`PinSet`], keyed uniquely.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InputDecl {
  /// Where the input is fetched from (e.g. a channel or repository id).
  pub locator: String,

  /// The exact version, commit, or snapshot the input is pinned to.
  pub pin: String,

  /// Expected content hash, verified by the resolution engine when present.
  pub hash: Option<String>,

  /// Capability tags this input must provide (e.g. "toolchain").
  pub capabilities: BTreeSet<String>,
}

impl InputDecl {
  /// Create a declaration without a hash or capabilities.
  pub fn new(locator: impl Into<String>, pin: impl Into<String>) -> Self {
    Self {
      locator: locator.into(),
      pin: pin.into(),
      hash: None,
      capabilities: BTreeSet::new(),
    }
  }

  /// Set the expected content hash.
  pub fn with_hash(mut self, hash: impl Into<String>) -> Self {
    self.hash = Some(hash.into());
    self
  }

  /// Add a required capability tag.
  pub fn with_capability(mut self, capability: impl Into<String>) -> Self {
    self.capabilities.insert(capability.into());
    self
  }
}

/// The ordered collection of named input declarations for one run.
///
/// Names are unique. Iteration order is declaration order, which defines
/// resolution and composition order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PinSet {
  inputs: IndexMap<String, InputDecl>,
}

impl PinSet {
  /// Create an empty pin set.
  pub fn new() -> Self {
    Self::default()
  }

  /// Number of declared inputs.
  pub fn len(&self) -> usize {
    self.inputs.len()
  }

  /// Whether the set has no declarations.
  pub fn is_empty(&self) -> bool {
    self.inputs.is_empty()
  }

  /// Whether an input with the given name is declared.
  pub fn contains(&self, name: &str) -> bool {
    self.inputs.contains_key(name)
  }

  /// Get a declaration by name.
  pub fn get(&self, name: &str) -> Option<&InputDecl> {
    self.inputs.get(name)
  }

  /// Append a declaration, preserving insertion order.
  ///
  /// Callers are responsible for rejecting duplicate names first; a repeated
  /// name replaces the earlier declaration in place.
  pub fn insert(&mut self, name: String, decl: InputDecl) {
    self.inputs.insert(name, decl);
  }

  /// Iterate declarations in declaration order.
  pub fn iter(&self) -> impl Iterator<Item = (&str, &InputDecl)> {
    self.inputs.iter().map(|(name, decl)| (name.as_str(), decl))
  }

  /// Input names in declaration order.
  pub fn names(&self) -> impl Iterator<Item = &str> {
    self.inputs.keys().map(String::as_str)
  }
}

/// A resolved input ready for composition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResolvedInput {
  /// The input name, as declared in the pin set.
  pub name: String,

  /// Absolute path to the resolved content.
  pub path: PathBuf,

  /// Capability tags the resolved content provides.
  pub capabilities: BTreeSet<String>,
}

/// Map of input names to their resolved state, in pin set order.
pub type ResolvedSet = IndexMap<String, ResolvedInput>;
